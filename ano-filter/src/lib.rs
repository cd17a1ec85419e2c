//! Implements sample filtering.
//!
//! Samples may be filtered based on the following criteria, applied in this order:
//!
//! * non-finite values (always dropped, not configurable)
//! * include rule (samples must match the rule's label pairs)
//! * exclude rule (samples matching the rule's label pairs are dropped)
#![warn(missing_docs)]

pub mod labels;
pub mod values;

mod common;
mod config;
mod interface;

#[cfg(test)]
mod testutils;

pub use crate::common::*;
pub use crate::config::*;
pub use crate::interface::Filterable;
pub use crate::labels::matches_rule;
pub use crate::values::is_finite_value;

/// Checks whether a sample should be filtered for a particular configuration.
///
/// If the sample should be filtered, the `Err` returned contains a filter reason.
/// The reason is the one returned by the first filter that didn't pass.
pub fn should_filter<F: Filterable>(item: &F, filters: &LabelFilters) -> Result<(), FilterStatKey> {
    values::should_filter(item)?;
    labels::should_filter(item, filters)?;

    Ok(())
}

/// Returns `true` if the sample passes all filters.
pub fn accept<F: Filterable>(item: &F, filters: &LabelFilters) -> bool {
    should_filter(item, filters).is_ok()
}
