//! Common functionality for the Anodot client crates.
#![warn(missing_docs)]

mod time;

pub use crate::time::*;
