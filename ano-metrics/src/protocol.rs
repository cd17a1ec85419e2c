use std::collections::BTreeMap;

use ano_common::UnixTimestamp;
use ano_filter::Filterable;
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};

use crate::sanitize;

/// A sample as handed over by a monitoring system.
///
/// Samples are immutable once constructed. Label keys are unique, and the value may be NaN or
/// infinite. Such samples never make it to the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSample {
    name: String,
    labels: BTreeMap<String, String>,
    timestamp: UnixTimestamp,
    value: f64,
}

impl RawSample {
    /// Creates a sample without labels.
    pub fn new(name: impl Into<String>, timestamp: UnixTimestamp, value: f64) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            timestamp,
            value,
        }
    }

    /// Adds a label and returns the sample. A label with the same key is replaced.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds all labels from an iterator and returns the sample.
    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// The name of the sampled metric.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The labels of the sample, ordered by key.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// The time at which the sample was taken.
    pub fn timestamp(&self) -> UnixTimestamp {
        self.timestamp
    }

    /// The raw sample value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Filterable for RawSample {
    fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    fn value(&self) -> f64 {
        self.value
    }
}

/// The property holding the metric name.
pub const WHAT_PROPERTY: &str = "what";

/// Raised if a [`CanonicalMetric`] cannot be constructed.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum InvalidMetric {
    /// The value is NaN or infinite.
    #[error("metric value {0} is not finite")]
    NonFiniteValue(f64),
    /// The record has no `what` property.
    #[error("metric record has no `what` property")]
    MissingWhat,
}

/// A metric record of the Anodot 2.0 protocol.
///
/// All property keys and values, tag keys and tag values are sanitized on insertion. The
/// `properties` always contain [`WHAT_PROPERTY`] and the value is always finite. Empty tags
/// serialize as `{}`.
///
/// Deserialization goes through the same checks as [`CanonicalMetric::new`], so records read
/// from JSON are sanitized as well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetricRecord")]
pub struct CanonicalMetric {
    properties: BTreeMap<String, String>,
    timestamp: UnixTimestamp,
    #[serde(serialize_with = "serialize_value")]
    value: f64,
    #[serde(default)]
    tags: BTreeMap<String, Vec<String>>,
}

impl CanonicalMetric {
    /// Creates a record for the metric `what` without further properties or tags.
    ///
    /// Fails if the value is NaN or infinite.
    pub fn new(what: &str, timestamp: UnixTimestamp, value: f64) -> Result<Self, InvalidMetric> {
        if !value.is_finite() {
            return Err(InvalidMetric::NonFiniteValue(value));
        }

        Ok(Self {
            properties: BTreeMap::from([(WHAT_PROPERTY.to_owned(), sanitize(what))]),
            timestamp,
            value,
            tags: BTreeMap::new(),
        })
    }

    /// Sets a property. The `what` property cannot be replaced.
    pub fn insert_property(&mut self, key: &str, value: &str) {
        let key = sanitize(key);
        if key != WHAT_PROPERTY {
            self.properties.insert(key, sanitize(value));
        }
    }

    /// Sets a property and returns the record.
    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.insert_property(key, value);
        self
    }

    /// Appends values to the tag `key`.
    pub fn extend_tag<'a, I>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.tags
            .entry(sanitize(key))
            .or_default()
            .extend(values.into_iter().map(sanitize));
    }

    /// Appends a single value to the tag `key` and returns the record.
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.extend_tag(key, [value]);
        self
    }

    /// The sanitized metric name.
    pub fn what(&self) -> &str {
        self.properties
            .get(WHAT_PROPERTY)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// All properties, including `what`.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Tags by key, each with an ordered list of values.
    pub fn tags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.tags
    }

    /// The timestamp in seconds.
    pub fn timestamp(&self) -> UnixTimestamp {
        self.timestamp
    }

    /// The finite metric value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// The unchecked shape of a [`CanonicalMetric`] in JSON.
#[derive(Deserialize)]
struct MetricRecord {
    properties: BTreeMap<String, String>,
    timestamp: UnixTimestamp,
    value: f64,
    #[serde(default)]
    tags: BTreeMap<String, Vec<String>>,
}

impl TryFrom<MetricRecord> for CanonicalMetric {
    type Error = InvalidMetric;

    fn try_from(mut record: MetricRecord) -> Result<Self, Self::Error> {
        let what = record
            .properties
            .remove(WHAT_PROPERTY)
            .ok_or(InvalidMetric::MissingWhat)?;

        let mut metric = Self::new(&what, record.timestamp, record.value)?;
        for (key, value) in &record.properties {
            metric.insert_property(key, value);
        }
        for (key, values) in &record.tags {
            metric.extend_tag(key, values.iter().map(String::as_str));
        }

        Ok(metric)
    }
}

/// Writes integral values without a fractional part, the way the Anodot API reads them.
///
/// Non-finite values cannot be represented in JSON and fail serialization.
pub(crate) fn serialize_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    if !value.is_finite() {
        Err(S::Error::custom(format_args!("metric value {value} is not finite")))
    } else if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}
