use std::sync::Arc;

use ano_auth::{Clock, SessionManager, Token, TokenKind};
use ano_config::Config;
use ano_metrics::{CanonicalMetric, RawSample, SchemaMetric, Translator};
use ano_statsd::{MetricsClientConfig, MetricsRecorder, NoopRecorder, StatsdRecorder, metric};
use url::Url;

use crate::api::{ApiResponse, parse_submit_response, parse_vendor_response};
use crate::error::ApiError;
use crate::http::{HttpError, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::refresh::BearerRefresher;
use crate::schema::{CreatedSchema, SchemaListEntry, StreamSchema};
use crate::statsd::ClientCounters;

const METRICS_PATH: &str = "api/v1/metrics";
const SCHEMAS_PATH: &str = "api/v2/stream-schemas";
const SCHEMA_LIST_PATH: &str = "api/v2/stream-schemas/schemas";

/// The wire protocol of submitted metric records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Protocol {
    Anodot20,
    Anodot30,
}

impl Protocol {
    fn as_str(self) -> &'static str {
        match self {
            Self::Anodot20 => "anodot20",
            Self::Anodot30 => "anodot30",
        }
    }
}

/// Counts every response that passes through the inner transport.
struct InstrumentedTransport {
    inner: Arc<dyn Transport>,
    recorder: Arc<dyn MetricsRecorder>,
}

#[async_trait::async_trait]
impl Transport for InstrumentedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let response = self.inner.send(request).await?;
        metric!(
            self.recorder,
            counter(ClientCounters::HttpResponses) += 1,
            response_code = response.status.as_str(),
        );
        Ok(response)
    }
}

/// Builds an [`AnodotClient`] with optional collaborators.
pub struct ClientBuilder {
    base_url: Url,
    token: Token,
    transport: Arc<dyn Transport>,
    recorder: Arc<dyn MetricsRecorder>,
    clock: Option<Arc<dyn Clock>>,
}

impl ClientBuilder {
    /// Sets the recorder for internal measurements. Defaults to the [`NoopRecorder`].
    pub fn recorder(mut self, recorder: Arc<dyn MetricsRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Sets the clock used to expire bearer credentials. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Creates the client.
    pub fn build(self) -> AnodotClient {
        let transport: Arc<dyn Transport> = Arc::new(InstrumentedTransport {
            inner: self.transport,
            recorder: self.recorder.clone(),
        });

        let refresher = BearerRefresher::new(self.base_url.clone(), transport.clone());
        let mut session = SessionManager::new(self.token.clone(), Arc::new(refresher));
        if let Some(clock) = self.clock {
            session = session.with_clock(clock);
        }

        AnodotClient {
            base_url: self.base_url,
            token: self.token,
            transport,
            recorder: self.recorder,
            session,
        }
    }
}

/// Client for metric submission and stream schemas.
///
/// Metric submission authenticates with the API token in the query string. Schema operations
/// require a bearer credential, which is obtained from the API token and cached for 24 hours.
/// Every HTTP response received from Anodot is counted with the configured recorder.
pub struct AnodotClient {
    base_url: Url,
    token: Token,
    transport: Arc<dyn Transport>,
    recorder: Arc<dyn MetricsRecorder>,
    session: SessionManager,
}

impl AnodotClient {
    /// Creates a client for the Anodot instance at `base_url` with default collaborators.
    pub fn new(base_url: Url, token: Token, transport: Arc<dyn Transport>) -> Self {
        Self::builder(base_url, token, transport).build()
    }

    /// Returns a builder for a client of the Anodot instance at `base_url`.
    pub fn builder(base_url: Url, token: Token, transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder {
            base_url,
            token,
            transport,
            recorder: Arc::new(NoopRecorder),
            clock: None,
        }
    }

    /// Creates a client from the configuration, using a `reqwest` transport.
    ///
    /// If a StatsD host is configured, HTTP responses are reported there.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let token = config
            .token()
            .cloned()
            .ok_or_else(|| ApiError::Configuration("no anodot token configured".to_owned()))?;

        let transport = ReqwestTransport::new(config.http_timeout(), config.http_debug())?;
        let mut builder = Self::builder(config.anodot_url().clone(), token, Arc::new(transport));

        if let Some(host) = config.statsd_host() {
            let recorder = StatsdRecorder::new(MetricsClientConfig {
                prefix: config.statsd_prefix(),
                host,
                default_tags: config.statsd_default_tags().clone(),
            })
            .map_err(|error| {
                ApiError::Configuration(format!("invalid statsd host {host}: {error}"))
            })?;
            builder = builder.recorder(Arc::new(recorder));
        }

        Ok(builder.build())
    }

    /// The base URL of the Anodot instance.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session holding the bearer credential.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Returns a valid bearer value, refreshing it if needed.
    pub async fn bearer(&self) -> Result<String, ApiError> {
        Ok(self.session.bearer().await?)
    }

    /// Submits records of the 2.0 protocol.
    pub async fn submit_metrics(
        &self,
        metrics: &[CanonicalMetric],
    ) -> Result<ApiResponse<()>, ApiError> {
        self.submit(Protocol::Anodot20, metrics, metrics.len()).await
    }

    /// Submits records of the 3.0 protocol.
    pub async fn submit_schema_metrics(
        &self,
        metrics: &[SchemaMetric],
    ) -> Result<ApiResponse<()>, ApiError> {
        self.submit(Protocol::Anodot30, metrics, metrics.len()).await
    }

    /// Translates samples and submits the accepted ones.
    ///
    /// If all samples are dropped, nothing is sent and `None` is returned.
    pub async fn submit_samples<'a, I>(
        &self,
        translator: &Translator,
        samples: I,
    ) -> Result<Option<ApiResponse<()>>, ApiError>
    where
        I: IntoIterator<Item = &'a RawSample>,
    {
        let metrics = translator.translate_all(samples);
        if metrics.is_empty() {
            ano_log::debug!("no metrics left to submit after translation");
            return Ok(None);
        }

        self.submit_metrics(&metrics).await.map(Some)
    }

    /// Creates a stream schema and returns the assigned id.
    pub async fn create_schema(
        &self,
        schema: &StreamSchema,
    ) -> Result<ApiResponse<String>, ApiError> {
        let bearer = self.bearer().await?;

        let mut url = self.base_url.clone();
        url.set_path(SCHEMAS_PATH);

        let body = serde_json::to_vec(schema).map_err(ApiError::Serialize)?;
        let request = HttpRequest::post(url)
            .header("Authorization", format!("Bearer {bearer}"))
            .json_body(body);

        let raw = self.transport.send(request).await?;
        parse_vendor_response(raw, |body: CreatedSchema| body.schema.id)
    }

    /// Lists all stream schemas of the account.
    pub async fn list_schemas(&self) -> Result<ApiResponse<Vec<StreamSchema>>, ApiError> {
        let bearer = self.bearer().await?;

        let mut url = self.base_url.clone();
        url.set_path(SCHEMA_LIST_PATH);

        let request = HttpRequest::get(url).header("Authorization", format!("Bearer {bearer}"));

        let raw = self.transport.send(request).await?;
        parse_vendor_response(raw, |entries: Vec<SchemaListEntry>| {
            Some(entries.into_iter().map(SchemaListEntry::into_schema).collect())
        })
    }

    async fn submit<T>(
        &self,
        protocol: Protocol,
        metrics: &T,
        count: usize,
    ) -> Result<ApiResponse<()>, ApiError>
    where
        T: serde::Serialize + ?Sized,
    {
        if self.token.kind() != TokenKind::Api {
            return Err(ApiError::Configuration(format!(
                "metric submission requires an api token, got a {} token",
                self.token.kind()
            )));
        }

        let mut url = self.base_url.clone();
        url.set_path(METRICS_PATH);
        url.query_pairs_mut()
            .append_pair("token", self.token.value())
            .append_pair("protocol", protocol.as_str());

        let body = ano_metrics::to_wire_vec(metrics).map_err(ApiError::Serialize)?;
        let raw = self.transport.send(HttpRequest::post(url).json_body(body)).await?;

        metric!(
            self.recorder,
            counter(ClientCounters::MetricsSubmitted) += count,
            protocol = protocol.as_str(),
        );

        let response = parse_submit_response(raw)?;
        if let Some(message) = response.error_message() {
            ano_log::warn!(protocol = protocol.as_str(), "anodot reported errors: {message}");
        }

        Ok(response)
    }
}
