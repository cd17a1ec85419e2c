//! Configuration for the Anodot client.
//!
//! The configuration is loaded from a `config.yml` file in a configuration directory. All
//! sections and keys are optional:
//!
//! ```yaml
//! anodot:
//!   url: https://app.anodot.com/
//!   token: my-api-token
//!   token_kind: api
//! filters:
//!   include:
//!     env: prod
//!   exclude:
//!     host: canary
//! tags:
//!   source: prometheus
//! http:
//!   timeout: 30
//!   debug: false
//! logging:
//!   level: info
//! metrics:
//!   statsd: 127.0.0.1:8125
//!   prefix: anodot
//! ```
//!
//! Selected values can be overridden after loading with an [`OverridableConfig`], usually
//! populated from environment variables.
#![warn(missing_docs)]

mod config;

pub use crate::config::*;
