use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt as layer_fmt};

/// All crates of this workspace, which log at the configured level.
const CRATE_NAMES: &[&str] = &[
    "ano_auth",
    "ano_client",
    "ano_common",
    "ano_config",
    "ano_filter",
    "ano_log",
    "ano_metrics",
    "ano_statsd",
];

/// Controls the log format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///   INFO  ano_client::client > submitted 12 metrics
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2024-12-04T12:10:32.012Z  INFO ano_client::client: submitted 12 metrics
    /// ```
    Simplified,

    /// Dump out JSON lines.
    ///
    /// ```text
    /// {"timestamp":"2024-12-04T12:11:08.729716Z","level":"INFO","fields":{"message":"submitted 12 metrics"},"target":"ano_client::client"}
    /// ```
    Json,
}

/// The minimum level of log messages that are emitted.
///
/// Serializes as the lowercase level name, for example `"info"` or `"off"`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LogLevel(pub LevelFilter);

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_string().to_lowercase())
    }
}

impl FromStr for LogLevel {
    type Err = tracing::level_filters::ParseLevelFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}

/// Controls the logging system.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The log level for the Anodot client crates.
    pub level: LogLevel,

    /// Controls the log output format.
    ///
    /// Defaults to [`LogFormat::Auto`], which detects the best format based on the TTY.
    pub format: LogFormat,

    /// When set to `true`, backtraces are forced on.
    ///
    /// Otherwise, backtraces can be enabled by setting the `RUST_BACKTRACE` variable to `full`.
    pub enable_backtraces: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel(LevelFilter::INFO),
            format: LogFormat::Auto,
            enable_backtraces: false,
        }
    }
}

/// Builds the default filter directives.
///
/// Third-party crates log at `INFO`, the workspace crates log at the configured level.
fn default_filter(level: LevelFilter) -> EnvFilter {
    let mut directives = String::from("info,hyper=warn,reqwest=warn");
    for name in CRATE_NAMES {
        directives.push_str(&format!(",{name}={level}"));
    }

    EnvFilter::new(directives)
}

/// Initialize the logging system.
///
/// If the `RUST_LOG` environment variable is set, it takes precedence over the configured level.
/// Calling this function more than once has no effect.
///
/// # Example
///
/// ```
/// let log_config = ano_log::LogConfig {
///     enable_backtraces: true,
///     ..Default::default()
/// };
///
/// ano_log::init(&log_config);
/// ```
pub fn init(config: &LogConfig) {
    if config.enable_backtraces {
        // SAFETY: logging is initialized during startup before any other threads are spawned.
        unsafe { env::set_var("RUST_BACKTRACE", "full") };
    }

    let filter = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => default_filter(config.level.0),
    };

    let format = match (config.format, console::user_attended()) {
        (LogFormat::Auto, true) | (LogFormat::Pretty, _) => layer_fmt::layer()
            .pretty()
            .with_target(true)
            .boxed(),
        (LogFormat::Auto, false) | (LogFormat::Simplified, _) => layer_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .boxed(),
        (LogFormat::Json, _) => layer_fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(format.with_filter(filter))
        .try_init()
        .ok();
}
