//! Metric protocols and translation for the Anodot API.
//!
//! Monitoring systems hand over [`RawSample`]s: a name, a set of labels, a timestamp and a value.
//! The [`Translator`] filters them with the configured [`LabelFilters`](ano_filter::LabelFilters)
//! and maps accepted samples to [`CanonicalMetric`]s, the records of the Anodot 2.0 protocol:
//!
//! ```json
//! {
//!   "properties": {"what": "http_requests", "host": "web1"},
//!   "timestamp": 1574693483,
//!   "value": 333,
//!   "tags": {}
//! }
//! ```
//!
//! Records for schema based streams (protocol 3.0) are represented by [`SchemaMetric`].
//!
//! All identifiers are passed through [`sanitize`] before they reach the wire, and payloads are
//! serialized with [`to_wire_vec`], which escapes HTML-sensitive characters.
#![warn(missing_docs)]

mod json;
mod protocol;
mod sanitize;
mod schema;
mod translator;

pub use ano_common::UnixTimestamp;

pub use self::json::*;
pub use self::protocol::*;
pub use self::sanitize::*;
pub use self::schema::*;
pub use self::translator::*;
