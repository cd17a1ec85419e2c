//! Implements include and exclude rules over sample labels.
//!
//! A pair of a rule applies to a sample if the sample carries the pair's label key. A rule
//! matches a sample when at least one of its pairs applies and every applicable pair has an
//! equal label value. A sample carrying none of the rule's keys never matches.

use crate::{FilterRule, FilterStatKey, Filterable, LabelFilters};

/// Returns `true` if the item matches all applicable pairs of the rule.
///
/// Empty rules match nothing.
pub fn matches_rule<F: Filterable>(item: &F, rule: &FilterRule) -> bool {
    let mut applicable = rule
        .pairs()
        .filter_map(|(key, value)| item.label(key).map(|actual| actual == value))
        .peekable();

    applicable.peek().is_some() && applicable.all(|matched| matched)
}

/// Filters samples by the include and exclude rules.
///
/// An empty include rule accepts everything, an empty exclude rule rejects nothing.
pub fn should_filter<F: Filterable>(item: &F, filters: &LabelFilters) -> Result<(), FilterStatKey> {
    if let Some(include) = filters.include() {
        if !include.is_empty() && !matches_rule(item, include) {
            return Err(FilterStatKey::NotIncluded);
        }
    }

    if let Some(exclude) = filters.exclude() {
        if !exclude.is_empty() && matches_rule(item, exclude) {
            return Err(FilterStatKey::Excluded);
        }
    }

    Ok(())
}
