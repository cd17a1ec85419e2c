//! The stream schema model of the Anodot REST API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a measurement is aggregated over time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// The aggregation function, such as `sum` or `average`.
    pub aggregation: String,
    /// The property to count by, such as `none`.
    pub count_by: String,
    /// Optional display units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// What to do with records that lack a dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionPolicy {
    /// Either `fill` or `ignore`.
    pub action: String,
    /// The value used with the `fill` action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

/// A stream schema, describing the dimensions and measurements of 3.0 records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSchema {
    /// Assigned by Anodot when the schema is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Unique name of the schema.
    pub name: String,
    /// Optional schema version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Names of the dimensions.
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// Measurements by name.
    #[serde(default)]
    pub measurements: BTreeMap<String, Measurement>,
    /// Handling of missing dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_dim_policy: Option<DimensionPolicy>,
}

/// Response body of schema creation.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedSchema {
    pub schema: StreamSchema,
}

/// An entry in the response of the schema listing.
#[derive(Debug, Deserialize)]
pub(crate) struct SchemaListEntry {
    #[serde(rename = "streamSchemaWrapper")]
    wrapper: SchemaWrapper,
}

#[derive(Debug, Deserialize)]
struct SchemaWrapper {
    schema: StreamSchema,
}

impl SchemaListEntry {
    pub fn into_schema(self) -> StreamSchema {
        self.wrapper.schema
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;

    use super::*;

    #[test]
    fn test_serialize_new_schema() {
        let schema = StreamSchema {
            name: "checkout".to_owned(),
            dimensions: vec!["service".to_owned(), "region".to_owned()],
            measurements: BTreeMap::from([(
                "requests".to_owned(),
                Measurement {
                    aggregation: "sum".to_owned(),
                    count_by: "none".to_owned(),
                    units: None,
                },
            )]),
            missing_dim_policy: Some(DimensionPolicy {
                action: "fill".to_owned(),
                fill: Some("unknown".to_owned()),
            }),
            ..Default::default()
        };

        assert_json_snapshot!(schema, @r###"
        {
          "name": "checkout",
          "dimensions": [
            "service",
            "region"
          ],
          "measurements": {
            "requests": {
              "aggregation": "sum",
              "countBy": "none"
            }
          },
          "missingDimPolicy": {
            "action": "fill",
            "fill": "unknown"
          }
        }
        "###);
    }

    #[test]
    fn test_deserialize_list_entry() {
        let json = r#"{"streamSchemaWrapper":{"schema":{
            "id":"abc-1","name":"checkout","version":"1",
            "dimensions":["service"],
            "measurements":{"latency":{"aggregation":"average","countBy":"none","units":"ms"}}
        }}}"#;

        let schema = serde_json::from_str::<SchemaListEntry>(json)
            .unwrap()
            .into_schema();

        assert_eq!(schema.id.as_deref(), Some("abc-1"));
        assert_eq!(schema.version.as_deref(), Some("1"));
        assert_eq!(schema.measurements["latency"].units.as_deref(), Some("ms"));
        assert_eq!(schema.missing_dim_policy, None);
    }
}
