//! HTTP client for the Anodot API.
//!
//! The [`AnodotClient`] submits metric records and manages stream schemas. It sends all
//! requests through a [`Transport`], which can be replaced in tests, and reports every response
//! as an [`ApiResponse`]: either the typed payload or the list of errors reported by Anodot,
//! along with the raw status and body.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ano_auth::{Token, TokenKind};
//! use ano_client::{AnodotClient, ReqwestTransport};
//! use ano_metrics::{CanonicalMetric, UnixTimestamp};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ReqwestTransport::new(std::time::Duration::from_secs(30), false)?;
//! let client = AnodotClient::new(
//!     "https://app.anodot.com/".parse()?,
//!     Token::new("my-api-token", TokenKind::Api)?,
//!     Arc::new(transport),
//! );
//!
//! let metric = CanonicalMetric::new("requests", UnixTimestamp::now(), 12.0)?;
//! let response = client.submit_metrics(&[metric]).await?;
//! if let Some(message) = response.error_message() {
//!     eprintln!("rejected: {message}");
//! }
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

mod api;
mod client;
mod error;
mod http;
mod refresh;
mod schema;
mod statsd;

use ano_config::Config;
use ano_metrics::Translator;

pub use self::api::{ApiResponse, ErrorEntry, Outcome, VendorError};
pub use self::client::{AnodotClient, ClientBuilder};
pub use self::error::ApiError;
pub use self::http::{
    HttpError, HttpRequest, HttpResponse, Method, ReqwestTransport, StatusCode, Transport,
};
pub use self::refresh::BearerRefresher;
pub use self::schema::{DimensionPolicy, Measurement, StreamSchema};
pub use self::statsd::ClientCounters;

/// Creates a translator with the label filters and static tags from the configuration.
pub fn translator(config: &Config) -> Translator {
    Translator::new(config.label_filters().clone()).with_static_tags(config.static_tags().clone())
}
