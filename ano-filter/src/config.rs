//! Config structs for label filters.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Determines whether a [`FilterRule`] selects or rejects matching samples.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterDirection {
    /// Only samples matching the rule pass.
    Include,
    /// Samples matching the rule are dropped.
    Exclude,
}

impl fmt::Display for FilterDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Include => f.write_str("include"),
            Self::Exclude => f.write_str("exclude"),
        }
    }
}

/// An error returned when parsing a filter rule expression fails.
#[derive(Debug, thiserror::Error)]
#[error("invalid {direction} filter expression")]
pub struct FilterRuleError {
    direction: FilterDirection,
    #[source]
    source: serde_json::Error,
}

impl FilterRuleError {
    /// The direction of the rule that failed to parse.
    pub fn direction(&self) -> FilterDirection {
        self.direction
    }
}

/// Label equality constraints with a direction.
///
/// Pairs keep the order in which they were configured. Keys are unique.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterRule {
    direction: FilterDirection,
    pairs: IndexMap<String, String>,
}

impl FilterRule {
    /// Creates a rule from label key and value pairs.
    ///
    /// A later pair with the same key replaces the earlier value.
    pub fn new<I, K, V>(direction: FilterDirection, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            direction,
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parses a rule from a JSON object of string values, such as `{"env":"prod"}`.
    pub fn parse(direction: FilterDirection, expression: &str) -> Result<Self, FilterRuleError> {
        let pairs = serde_json::from_str::<IndexMap<String, String>>(expression)
            .map_err(|source| FilterRuleError { direction, source })?;

        Ok(Self { direction, pairs })
    }

    /// Returns whether matching samples are included or excluded.
    pub fn direction(&self) -> FilterDirection {
        self.direction
    }

    /// Returns `true` if the rule has no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the number of pairs in the rule.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterates the label pairs in configuration order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The active include and exclude rules.
///
/// At most one rule per direction is active. Serializes as
/// `{"include": {..}, "exclude": {..}}` with both keys optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LabelFiltersConfig", into = "LabelFiltersConfig")]
pub struct LabelFilters {
    include: Option<FilterRule>,
    exclude: Option<FilterRule>,
}

impl LabelFilters {
    /// Creates filters with no active rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates a rule, replacing any rule with the same direction.
    pub fn set_rule(&mut self, rule: FilterRule) {
        match rule.direction {
            FilterDirection::Include => self.include = Some(rule),
            FilterDirection::Exclude => self.exclude = Some(rule),
        }
    }

    /// Activates a rule and returns the filters.
    pub fn with_rule(mut self, rule: FilterRule) -> Self {
        self.set_rule(rule);
        self
    }

    /// The active include rule.
    pub fn include(&self) -> Option<&FilterRule> {
        self.include.as_ref()
    }

    /// The active exclude rule.
    pub fn exclude(&self) -> Option<&FilterRule> {
        self.exclude.as_ref()
    }

    /// Returns `true` if no rule is active.
    pub fn is_empty(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct LabelFiltersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    include: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude: Option<IndexMap<String, String>>,
}

impl From<LabelFiltersConfig> for LabelFilters {
    fn from(config: LabelFiltersConfig) -> Self {
        let rule = |direction, pairs| FilterRule { direction, pairs };
        Self {
            include: config.include.map(|p| rule(FilterDirection::Include, p)),
            exclude: config.exclude.map(|p| rule(FilterDirection::Exclude, p)),
        }
    }
}

impl From<LabelFilters> for LabelFiltersConfig {
    fn from(filters: LabelFilters) -> Self {
        Self {
            include: filters.include.map(|rule| rule.pairs),
            exclude: filters.exclude.map(|rule| rule.pairs),
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;

    use super::*;

    #[test]
    fn test_parse_keeps_order() {
        let rule = FilterRule::parse(FilterDirection::Include, r#"{"b":"2","a":"1"}"#).unwrap();
        assert_eq!(rule.pairs().collect::<Vec<_>>(), [("b", "2"), ("a", "1")]);
        assert_eq!(rule.direction(), FilterDirection::Include);
        assert_eq!(rule.len(), 2);
    }

    #[test]
    fn test_parse_empty_object() {
        let rule = FilterRule::parse(FilterDirection::Exclude, "{}").unwrap();
        assert!(rule.is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        for expression in ["", "not json", r#"["a","b"]"#, r#"{"a":1}"#, r#"{"a":"1""#] {
            let error = FilterRule::parse(FilterDirection::Exclude, expression).unwrap_err();
            assert_eq!(error.direction(), FilterDirection::Exclude);
            assert_eq!(error.to_string(), "invalid exclude filter expression");
        }
    }

    #[test]
    fn test_set_rule_replaces_same_direction() {
        let mut filters = LabelFilters::new();
        filters.set_rule(FilterRule::new(FilterDirection::Include, [("a", "1")]));
        filters.set_rule(FilterRule::new(FilterDirection::Include, [("b", "2")]));

        let include = filters.include().unwrap();
        assert_eq!(include.pairs().collect::<Vec<_>>(), [("b", "2")]);
        assert!(filters.exclude().is_none());
    }

    #[test]
    fn test_serialize_filters() {
        let filters = LabelFilters::new()
            .with_rule(FilterRule::new(
                FilterDirection::Include,
                [("test_label", "value2"), ("tst_label", "value1")],
            ));

        assert_json_snapshot!(filters, @r###"
        {
          "include": {
            "test_label": "value2",
            "tst_label": "value1"
          }
        }
        "###);
    }

    #[test]
    fn test_deserialize_filters() {
        let filters: LabelFilters =
            serde_json::from_str(r#"{"exclude":{"host":"canary"}}"#).unwrap();

        assert!(filters.include().is_none());
        let exclude = filters.exclude().unwrap();
        assert_eq!(exclude.direction(), FilterDirection::Exclude);
        assert_eq!(exclude.pairs().collect::<Vec<_>>(), [("host", "canary")]);
    }

    #[test]
    fn test_deserialize_empty() {
        let filters: LabelFilters = serde_json::from_str("{}").unwrap();
        assert!(filters.is_empty());
    }
}
