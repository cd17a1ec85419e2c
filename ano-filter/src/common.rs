use std::fmt;

use serde::Serialize;

/// Identifies which filter dropped a sample for which reason.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FilterStatKey {
    /// Filtered because the value is NaN or infinite.
    NonFinite,

    /// Filtered because the sample does not match the include rule.
    NotIncluded,

    /// Filtered because the sample matches the exclude rule.
    Excluded,
}

impl FilterStatKey {
    /// Returns the string identifier of the filter stat key.
    pub fn name(self) -> &'static str {
        match self {
            FilterStatKey::NonFinite => "non-finite",
            FilterStatKey::NotIncluded => "not-included",
            FilterStatKey::Excluded => "excluded",
        }
    }
}

impl fmt::Display for FilterStatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl<'a> TryFrom<&'a str> for FilterStatKey {
    type Error = &'a str;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        Ok(match value {
            "non-finite" => FilterStatKey::NonFinite,
            "not-included" => FilterStatKey::NotIncluded,
            "excluded" => FilterStatKey::Excluded,
            other => return Err(other),
        })
    }
}
