//! Drops samples whose value cannot be represented on the wire.

use crate::{FilterStatKey, Filterable};

/// Returns `true` if the item's value is neither NaN nor infinite.
pub fn is_finite_value<F: Filterable>(item: &F) -> bool {
    item.value().is_finite()
}

/// Filters samples with NaN or infinite values.
pub fn should_filter<F: Filterable>(item: &F) -> Result<(), FilterStatKey> {
    if is_finite_value(item) {
        Ok(())
    } else {
        Err(FilterStatKey::NonFinite)
    }
}
