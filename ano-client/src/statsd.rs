use ano_statsd::CounterMetric;

/// Counter metrics used by the Anodot client.
pub enum ClientCounters {
    /// Number of HTTP responses received from Anodot.
    ///
    /// This metric is tagged with:
    ///  - `response_code`: The HTTP status code of the response.
    HttpResponses,
    /// Number of metric records sent in submission requests.
    ///
    /// This metric is tagged with:
    ///  - `protocol`: Either `anodot20` or `anodot30`.
    MetricsSubmitted,
}

impl CounterMetric for ClientCounters {
    fn name(&self) -> &'static str {
        match self {
            Self::HttpResponses => "anodot_server_http_responses_total",
            Self::MetricsSubmitted => "anodot_submitted_metrics_total",
        }
    }
}
