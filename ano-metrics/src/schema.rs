use std::collections::BTreeMap;

use ano_common::UnixTimestamp;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::protocol::serialize_value;
use crate::sanitize;

/// A metric record of the Anodot 3.0 protocol, reported against a stream schema.
///
/// Unlike [`CanonicalMetric`](crate::CanonicalMetric), identifiers are stored as given and
/// sanitized when the record is serialized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaMetric {
    /// Identifier of the schema the record belongs to.
    pub schema_id: String,
    /// The time of the measurements.
    pub timestamp: UnixTimestamp,
    /// Dimension values by dimension name.
    pub dimensions: BTreeMap<String, String>,
    /// Measurement values by measurement name.
    pub measurements: BTreeMap<String, f64>,
    /// Tags by key, each with an ordered list of values.
    pub tags: BTreeMap<String, Vec<String>>,
}

struct WireValue(f64);

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_value(&self.0, serializer)
    }
}

impl Serialize for SchemaMetric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let dimensions: BTreeMap<_, _> = self
            .dimensions
            .iter()
            .map(|(k, v)| (sanitize(k), sanitize(v)))
            .collect();

        let measurements: BTreeMap<_, _> = self
            .measurements
            .iter()
            .map(|(k, v)| (sanitize(k), WireValue(*v)))
            .collect();

        let tags: BTreeMap<_, Vec<_>> = self
            .tags
            .iter()
            .map(|(k, values)| (sanitize(k), values.iter().map(|v| sanitize(v)).collect()))
            .collect();

        let mut state = serializer.serialize_struct("SchemaMetric", 5)?;
        state.serialize_field("schemaId", &self.schema_id)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("dimensions", &dimensions)?;
        state.serialize_field("measurements", &measurements)?;
        state.serialize_field("tags", &tags)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;

    use super::*;

    #[test]
    fn test_serialize_sanitized() {
        let metric = SchemaMetric {
            schema_id: "1111-2222".to_owned(),
            timestamp: UnixTimestamp::from_secs(1574693483),
            dimensions: BTreeMap::from([
                (" service.name ".to_owned(), "checkout api".to_owned()),
                ("region".to_owned(), "eu=west".to_owned()),
            ]),
            measurements: BTreeMap::from([
                ("requests.count".to_owned(), 12.0),
                ("latency".to_owned(), 0.25),
            ]),
            tags: BTreeMap::from([("team name".to_owned(), vec!["core.api".to_owned()])]),
        };

        assert_json_snapshot!(metric, @r###"
        {
          "schemaId": "1111-2222",
          "timestamp": 1574693483,
          "dimensions": {
            "region": "eu_west",
            "service_name": "checkout_api"
          },
          "measurements": {
            "latency": 0.25,
            "requests_count": 12
          },
          "tags": {
            "team_name": [
              "core_api"
            ]
          }
        }
        "###);
    }

    #[test]
    fn test_non_finite_measurement_fails() {
        let metric = SchemaMetric {
            schema_id: "1111-2222".to_owned(),
            measurements: BTreeMap::from([("latency".to_owned(), f64::NAN)]),
            ..Default::default()
        };

        let error = crate::to_wire_vec(&metric).unwrap_err();
        assert!(error.to_string().contains("not finite"), "{error}");
    }

    #[test]
    fn test_serialize_empty() {
        let metric = SchemaMetric::default();
        assert_eq!(
            serde_json::to_string(&metric).unwrap(),
            r#"{"schemaId":"","timestamp":0,"dimensions":{},"measurements":{},"tags":{}}"#
        );
    }
}
