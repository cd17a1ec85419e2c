use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ano_auth::{Token, TokenKind};
use ano_filter::{FilterDirection, FilterRule, LabelFilters};
use ano_log::{LogConfig, LogLevel};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_ANODOT_URL: &str = "https://app.anodot.com/";
const DEFAULT_HTTP_TIMEOUT: u64 = 30;

/// Defines the source of a config error
#[derive(Debug, Default)]
enum ConfigErrorSource {
    /// An error occurring independently.
    #[default]
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating in a field override (an env var, or a CLI parameter).
    FieldOverride(String),
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    source: ConfigErrorSource,
    kind: ConfigErrorKind,
    inner: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ConfigError {
    #[inline]
    fn wrap<E>(inner: E, kind: ConfigErrorKind) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            source: ConfigErrorSource::None,
            kind,
            inner: Some(Box::new(inner)),
        }
    }

    #[inline]
    fn for_field<E>(inner: E, field: &'static str) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::wrap(inner, ConfigErrorKind::InvalidValue).field(field)
    }

    #[inline]
    fn file<P: AsRef<Path>>(mut self, p: P) -> Self {
        self.source = ConfigErrorSource::File(p.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.source = ConfigErrorSource::FieldOverride(name.to_owned());
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ConfigErrorSource::None => self.kind.fmt(f),
            ConfigErrorSource::File(file_name) => {
                write!(f, "{} (file {})", self.kind, file_name.display())
            }
            ConfigErrorSource::FieldOverride(name) => write!(f, "{} (field {})", self.kind, name),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Parsing JSON failed.
    #[error("could not parse json config")]
    BadJson,
    /// Invalid config value
    #[error("invalid config value")]
    InvalidValue,
}

/// Raised when a boolean override is neither `true` nor `false`.
#[derive(Debug, thiserror::Error)]
#[error("expected a boolean, got {0:?}")]
struct InvalidBool(String);

fn parse_bool(value: &str) -> Result<bool, InvalidBool> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        _ => Err(InvalidBool(value.to_owned())),
    }
}

/// Structure used to hold information about configuration overrides via
/// CLI parameters or environment variables
#[derive(Debug, Default)]
pub struct OverridableConfig {
    /// The base URL of the Anodot instance.
    pub url: Option<String>,
    /// The access token.
    pub token: Option<String>,
    /// The kind of the access token, `api` or `data`.
    pub token_kind: Option<String>,
    /// The include rule as a JSON object of label pairs.
    pub include_filter: Option<String>,
    /// The exclude rule as a JSON object of label pairs.
    pub exclude_filter: Option<String>,
    /// The HTTP timeout in seconds.
    pub http_timeout: Option<String>,
    /// "true" if requests and responses are logged, "false" otherwise.
    pub http_debug: Option<String>,
    /// The log level.
    pub log_level: Option<String>,
    /// The StatsD host for internal metrics.
    pub statsd_host: Option<String>,
}

impl OverridableConfig {
    /// Reads overrides from environment variables.
    ///
    /// | Variable                    | Override         |
    /// |-----------------------------|------------------|
    /// | `ANODOT_URL`                | `url`            |
    /// | `ANODOT_API_TOKEN`          | `token`          |
    /// | `ANODOT_TOKEN_KIND`         | `token_kind`     |
    /// | `ANODOT_INCLUDE_FILTER`     | `include_filter` |
    /// | `ANODOT_EXCLUDE_FILTER`     | `exclude_filter` |
    /// | `ANODOT_HTTP_TIMEOUT`       | `http_timeout`   |
    /// | `ANODOT_HTTP_DEBUG_ENABLED` | `http_debug`     |
    /// | `ANODOT_LOG_LEVEL`          | `log_level`      |
    /// | `ANODOT_STATSD_HOST`        | `statsd_host`    |
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Reads overrides through a variable lookup function.
    pub fn from_vars<F>(mut var: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        Self {
            url: var("ANODOT_URL"),
            token: var("ANODOT_API_TOKEN"),
            token_kind: var("ANODOT_TOKEN_KIND"),
            include_filter: var("ANODOT_INCLUDE_FILTER"),
            exclude_filter: var("ANODOT_EXCLUDE_FILTER"),
            http_timeout: var("ANODOT_HTTP_TIMEOUT"),
            http_debug: var("ANODOT_HTTP_DEBUG_ENABLED"),
            log_level: var("ANODOT_LOG_LEVEL"),
            statsd_host: var("ANODOT_STATSD_HOST"),
        }
    }
}

/// Connection to the Anodot API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Anodot {
    /// The base URL of the Anodot instance.
    pub url: String,
    /// The access token.
    pub token: Option<String>,
    /// The kind of the access token.
    pub token_kind: TokenKind,
}

impl Default for Anodot {
    fn default() -> Self {
        Self {
            url: DEFAULT_ANODOT_URL.to_owned(),
            token: None,
            token_kind: TokenKind::Api,
        }
    }
}

/// Controls the HTTP transport.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Http {
    /// Timeout for a full request in seconds.
    pub timeout: u64,
    /// Logs requests and responses including bodies at trace level.
    pub debug: bool,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            debug: false,
        }
    }
}

/// Controls internal metrics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    /// Host and port of a StatsD server. Metrics are not reported if unset.
    pub statsd: Option<String>,
    /// Prefix of all metric names.
    pub prefix: String,
    /// Tags added to all metrics.
    pub default_tags: BTreeMap<String, String>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            statsd: None,
            prefix: "anodot".to_owned(),
            default_tags: BTreeMap::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagValues {
    One(String),
    Many(Vec<String>),
}

/// Accepts both a single string and a list of strings per tag.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = BTreeMap::<String, TagValues>::deserialize(deserializer)?;
    Ok(tags
        .into_iter()
        .map(|(key, values)| match values {
            TagValues::One(value) => (key, vec![value]),
            TagValues::Many(values) => (key, values),
        })
        .collect())
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigValues {
    anodot: Anodot,
    filters: LabelFilters,
    #[serde(deserialize_with = "deserialize_tags")]
    tags: BTreeMap<String, Vec<String>>,
    http: Http,
    logging: LogConfig,
    metrics: Metrics,
}

impl ConfigValues {
    const FILE_NAME: &'static str = "config.yml";

    fn path(base: &Path) -> PathBuf {
        base.join(Self::FILE_NAME)
    }

    /// Loads the config file from a file within the given directory location.
    fn load(base: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(base);

        let f = fs::File::open(&path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(&path))?;

        load_yaml(io::BufReader::new(f)).map_err(|e| e.file(&path))
    }
}

fn load_yaml<T: DeserializeOwned, R: io::Read>(reader: R) -> Result<T, ConfigError> {
    serde_yaml::from_reader(reader).map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml))
}

/// Config struct.
#[derive(Clone, Debug)]
pub struct Config {
    values: ConfigValues,
    path: PathBuf,
    url: Url,
    token: Option<Token>,
}

impl Config {
    /// Loads a config from a given config folder.
    ///
    /// If the folder does not contain a `config.yml`, the defaults are used.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = env_path(path.as_ref());

        let values = if fs::metadata(ConfigValues::path(&path)).is_ok() {
            ConfigValues::load(&path)?
        } else {
            ano_log::debug!("no config file in {}, using defaults", path.display());
            ConfigValues::default()
        };

        Self::from_values(values, path.clone()).map_err(|e| e.file(ConfigValues::path(&path)))
    }

    /// Creates a config from a JSON value.
    ///
    /// This is mostly useful for tests.
    pub fn from_json_value(value: serde_json::Value) -> Result<Config, ConfigError> {
        let values = serde_json::from_value(value)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadJson))?;

        Self::from_values(values, PathBuf::new())
    }

    fn from_values(values: ConfigValues, path: PathBuf) -> Result<Self, ConfigError> {
        let mut config = Config {
            values,
            path,
            url: Url::parse(DEFAULT_ANODOT_URL)
                .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::InvalidValue))?,
            token: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses the typed values that cannot be deserialized directly.
    fn validate(&mut self) -> Result<(), ConfigError> {
        let anodot = &self.values.anodot;

        self.url = Url::parse(&anodot.url).map_err(|e| ConfigError::for_field(e, "url"))?;

        self.token = match anodot.token {
            Some(ref value) => Some(
                Token::new(value.as_str(), anodot.token_kind)
                    .map_err(|e| ConfigError::for_field(e, "token"))?,
            ),
            None => None,
        };

        Ok(())
    }

    /// Override configuration with values coming from other sources (e.g. env variables or
    /// command line parameters)
    pub fn apply_override(
        &mut self,
        overrides: OverridableConfig,
    ) -> Result<&mut Self, ConfigError> {
        let anodot = &mut self.values.anodot;

        if let Some(url) = overrides.url {
            anodot.url = url;
        }

        if let Some(token) = overrides.token {
            anodot.token = Some(token);
        }

        if let Some(kind) = overrides.token_kind {
            anodot.token_kind = kind
                .parse()
                .map_err(|err| ConfigError::for_field(err, "token_kind"))?;
        }

        let filters = &mut self.values.filters;
        if let Some(expression) = overrides.include_filter {
            let rule = FilterRule::parse(FilterDirection::Include, &expression)
                .map_err(|err| ConfigError::for_field(err, "include_filter"))?;
            filters.set_rule(rule);
        }

        if let Some(expression) = overrides.exclude_filter {
            let rule = FilterRule::parse(FilterDirection::Exclude, &expression)
                .map_err(|err| ConfigError::for_field(err, "exclude_filter"))?;
            filters.set_rule(rule);
        }

        let http = &mut self.values.http;
        if let Some(timeout) = overrides.http_timeout {
            http.timeout = timeout
                .trim()
                .parse()
                .map_err(|err| ConfigError::for_field(err, "http_timeout"))?;
        }

        if let Some(debug) = overrides.http_debug {
            http.debug = parse_bool(&debug).map_err(|err| ConfigError::for_field(err, "http_debug"))?;
        }

        if let Some(level) = overrides.log_level {
            self.values.logging.level = level
                .parse::<LogLevel>()
                .map_err(|err| ConfigError::for_field(err, "log_level"))?;
        }

        if let Some(host) = overrides.statsd_host {
            self.values.metrics.statsd = Some(host).filter(|h| !h.is_empty());
        }

        self.validate()?;
        Ok(self)
    }

    /// Returns the filename of the config file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dumps out a YAML string of the values.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&self.values)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::InvalidValue))
    }

    /// Returns the base URL of the Anodot instance.
    pub fn anodot_url(&self) -> &Url {
        &self.url
    }

    /// Returns the configured access token.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Returns the include and exclude rules for samples.
    pub fn label_filters(&self) -> &LabelFilters {
        &self.values.filters
    }

    /// Returns the tags added to every translated metric.
    pub fn static_tags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.values.tags
    }

    /// Returns the timeout for HTTP requests.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.values.http.timeout)
    }

    /// Returns `true` if requests and responses are logged.
    pub fn http_debug(&self) -> bool {
        self.values.http.debug
    }

    /// Returns the logging configuration.
    pub fn logging(&self) -> &LogConfig {
        &self.values.logging
    }

    /// Returns the StatsD host, if metrics are enabled.
    pub fn statsd_host(&self) -> Option<&str> {
        self.values.metrics.statsd.as_deref()
    }

    /// Returns the prefix of internal metric names.
    pub fn statsd_prefix(&self) -> &str {
        &self.values.metrics.prefix
    }

    /// Returns the tags added to all internal metrics.
    pub fn statsd_default_tags(&self) -> &BTreeMap<String, String> {
        &self.values.metrics.default_tags
    }
}

/// Expands a leading `~` to the home directory.
fn env_path(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => Path::new(&home).join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn write_config(yaml: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yml"), yaml).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_path(dir.path()).unwrap();

        assert_eq!(config.anodot_url().as_str(), "https://app.anodot.com/");
        assert!(config.token().is_none());
        assert!(config.label_filters().is_empty());
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert!(!config.http_debug());
        assert_eq!(config.statsd_host(), None);
        assert_eq!(config.statsd_prefix(), "anodot");
    }

    #[test]
    fn test_load_yaml() {
        let dir = write_config(
            r#"
anodot:
  url: https://eu.anodot.com/
  token: secret
  token_kind: data
filters:
  include:
    env: prod
    region: eu
  exclude:
    host: canary
tags:
  source: prometheus
  teams: [core, infra]
http:
  timeout: 5
  debug: true
logging:
  level: debug
metrics:
  statsd: 127.0.0.1:8125
  default_tags:
    service: collector
"#,
        );

        let config = Config::from_path(dir.path()).unwrap();

        assert_eq!(config.anodot_url().as_str(), "https://eu.anodot.com/");
        let token = config.token().unwrap();
        assert_eq!(token.value(), "secret");
        assert_eq!(token.kind(), TokenKind::Data);

        let include = config.label_filters().include().unwrap();
        assert_eq!(
            include.pairs().collect::<Vec<_>>(),
            [("env", "prod"), ("region", "eu")]
        );
        let exclude = config.label_filters().exclude().unwrap();
        assert_eq!(exclude.pairs().collect::<Vec<_>>(), [("host", "canary")]);

        assert_eq!(config.static_tags()["source"], ["prometheus"]);
        assert_eq!(config.static_tags()["teams"], ["core", "infra"]);
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert!(config.http_debug());
        assert_eq!(config.logging().level.to_string(), "debug");
        assert_eq!(config.statsd_host(), Some("127.0.0.1:8125"));
        assert_eq!(config.statsd_default_tags()["service"], "collector");
    }

    #[test]
    fn test_bad_yaml() {
        let dir = write_config("anodot: [unclosed");
        let error = Config::from_path(dir.path()).unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::BadYaml);
        assert!(error.to_string().starts_with("could not parse yaml config file (file "));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_blank_token_in_file() {
        let dir = write_config("anodot:\n  token: '  '\n");
        let error = Config::from_path(dir.path()).unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert_eq!(error.source().unwrap().to_string(), "token value must not be blank");
    }

    #[test]
    fn test_from_json_value() {
        let config = Config::from_json_value(serde_json::json!({
            "anodot": {"url": "http://localhost:8080/", "token": "abc"},
            "filters": {"exclude": {"env": "dev"}},
        }))
        .unwrap();

        assert_eq!(config.anodot_url().as_str(), "http://localhost:8080/");
        assert_eq!(config.token().unwrap().kind(), TokenKind::Api);
        assert!(config.label_filters().include().is_none());
    }

    #[test]
    fn test_invalid_url() {
        let error = Config::from_json_value(serde_json::json!({"anodot": {"url": "not a url"}}))
            .unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert_snapshot!(error.to_string(), @"invalid config value (field url)");
    }

    #[test]
    fn test_apply_override() {
        let mut config = Config::from_json_value(serde_json::json!({})).unwrap();
        let vars = BTreeMap::from([
            ("ANODOT_URL", "https://us.anodot.com/"),
            ("ANODOT_API_TOKEN", "from-env"),
            ("ANODOT_TOKEN_KIND", "api"),
            ("ANODOT_INCLUDE_FILTER", r#"{"test_label":"value2","tst_label":"value1"}"#),
            ("ANODOT_HTTP_TIMEOUT", "10"),
            ("ANODOT_HTTP_DEBUG_ENABLED", "TRUE"),
            ("ANODOT_LOG_LEVEL", "trace"),
        ]);
        let overrides = OverridableConfig::from_vars(|name| vars.get(name).map(|v| (*v).to_owned()));

        config.apply_override(overrides).unwrap();

        assert_eq!(config.anodot_url().as_str(), "https://us.anodot.com/");
        assert_eq!(config.token().unwrap().value(), "from-env");
        assert_eq!(config.label_filters().include().unwrap().len(), 2);
        assert!(config.label_filters().exclude().is_none());
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert!(config.http_debug());
        assert_eq!(config.logging().level.to_string(), "trace");
    }

    #[test]
    fn test_override_malformed_filter() {
        let mut config = Config::from_json_value(serde_json::json!({})).unwrap();
        let error = config
            .apply_override(OverridableConfig {
                exclude_filter: Some("{not json".to_owned()),
                ..Default::default()
            })
            .unwrap_err();

        assert_snapshot!(error.to_string(), @"invalid config value (field exclude_filter)");
    }

    #[test]
    fn test_override_invalid_values() {
        let cases = [
            (
                OverridableConfig {
                    token_kind: Some("bearer".to_owned()),
                    ..Default::default()
                },
                "token_kind",
            ),
            (
                OverridableConfig {
                    http_debug: Some("maybe".to_owned()),
                    ..Default::default()
                },
                "http_debug",
            ),
            (
                OverridableConfig {
                    http_timeout: Some("-1".to_owned()),
                    ..Default::default()
                },
                "http_timeout",
            ),
            (
                OverridableConfig {
                    token: Some("".to_owned()),
                    ..Default::default()
                },
                "token",
            ),
        ];

        for (overrides, field) in cases {
            let mut config = Config::from_json_value(serde_json::json!({})).unwrap();
            let error = config.apply_override(overrides).unwrap_err();
            assert_eq!(error.to_string(), format!("invalid config value (field {field})"));
        }
    }

    #[test]
    fn test_empty_statsd_override_disables() {
        let mut config =
            Config::from_json_value(serde_json::json!({"metrics": {"statsd": "localhost:8125"}}))
                .unwrap();
        config
            .apply_override(OverridableConfig {
                statsd_host: Some(String::new()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.statsd_host(), None);
    }

    #[test]
    fn test_yaml_dump_reloads() {
        let config = Config::from_json_value(serde_json::json!({
            "anodot": {"token": "abc", "token_kind": "data"},
            "filters": {"include": {"env": "prod"}},
            "tags": {"source": "prometheus"},
        }))
        .unwrap();

        let yaml = config.to_yaml_string().unwrap();
        assert!(!yaml.contains("exclude"));

        let dir = write_config(&yaml);
        let reloaded = Config::from_path(dir.path()).unwrap();

        assert_eq!(reloaded.token().unwrap().kind(), TokenKind::Data);
        assert_eq!(reloaded.label_filters(), config.label_filters());
        assert_eq!(reloaded.static_tags(), config.static_tags());
        assert_eq!(reloaded.anodot_url(), config.anodot_url());
    }
}
