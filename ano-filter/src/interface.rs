//! This module contains the trait for items that can be filtered by label filters.

/// A data item to which filters can be applied.
pub trait Filterable {
    /// The value of the label with the given key, if the item carries it.
    fn label(&self, key: &str) -> Option<&str>;

    /// The numeric value of the item.
    fn value(&self) -> f64;
}

impl<T: Filterable + ?Sized> Filterable for &T {
    fn label(&self, key: &str) -> Option<&str> {
        (**self).label(key)
    }

    fn value(&self) -> f64 {
        (**self).value()
    }
}
