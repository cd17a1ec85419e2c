//! Abstractions over the HTTP client.
//!
//! All requests go through a [`Transport`], which takes a fully built [`HttpRequest`] and returns
//! the raw status and body. Interpreting the response is left to the caller. The production
//! transport is [`ReqwestTransport`]; tests substitute an in-memory implementation.

use std::borrow::Cow;
use std::io;
use std::time::Duration;

#[doc(inline)]
pub use reqwest::{Method, StatusCode};
use url::Url;

/// Raised if a request could not be exchanged with the server.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The HTTP client failed to connect, send or receive.
    #[error("could not send request")]
    Reqwest(#[from] reqwest::Error),
    /// Reading or writing the payload failed.
    #[error("failed to transfer payload")]
    Io(#[from] io::Error),
}

impl HttpError {
    /// Returns `true` if the error indicates a network downtime.
    pub fn is_network_error(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Reqwest(error) => error.is_timeout() || error.is_connect(),
        }
    }
}

/// An outbound request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    /// The request method.
    pub method: Method,
    /// The full URL including the query string.
    pub url: Url,
    /// Header names and values in insertion order.
    pub headers: Vec<(String, String)>,
    /// The request body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a `GET` request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a `POST` request.
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a new header, not replacing existing ones.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Sets a JSON body and the matching content type.
    pub fn json_body(self, body: Vec<u8>) -> Self {
        let mut request = self.header("Content-Type", "application/json");
        request.body = Some(body);
        request
    }

    /// Returns the first header with the given name, compared case-insensitively.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// The raw status and body of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// The response status.
    pub status: StatusCode,
    /// The full response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response from a status and body.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Returns `true` if the body is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }
}

/// Sends requests and returns raw responses.
///
/// Implementations must not interpret the status code. Only failures to exchange the request are
/// reported as errors.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and waits for the full response body.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// A [`Transport`] backed by a pooled `reqwest` client.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    debug: bool,
}

impl ReqwestTransport {
    /// Creates a transport with an overall timeout per request.
    ///
    /// With `debug` enabled, every request and response is logged at trace level, including
    /// bodies.
    pub fn new(timeout: Duration, debug: bool) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, debug })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        if self.debug {
            ano_log::trace!(
                %method,
                path = url.path(),
                body = %String::from_utf8_lossy(body.as_deref().unwrap_or_default()),
                "sending request",
            );
        }

        let mut builder = self.client.request(method, url);
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let response = HttpResponse::new(status, response.bytes().await?.to_vec());

        if self.debug {
            ano_log::trace!(
                status = status.as_u16(),
                body = %response.text(),
                "received response",
            );
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let url = Url::parse("https://app.anodot.com/api/v1/metrics").unwrap();
        let request = HttpRequest::post(url).json_body(b"[]".to_vec());

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.get_header("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(&b"[]"[..]));
    }

    #[test]
    fn test_response_blank() {
        assert!(HttpResponse::new(StatusCode::OK, "").is_blank());
        assert!(HttpResponse::new(StatusCode::OK, " \n").is_blank());
        assert!(!HttpResponse::new(StatusCode::OK, "{}").is_blank());
    }

    #[test]
    fn test_response_text_lossy() {
        let response = HttpResponse::new(StatusCode::BAD_GATEWAY, b"bad \xff gateway".to_vec());
        assert_eq!(response.text(), "bad \u{fffd} gateway");
    }

    #[test]
    fn test_io_is_network_error() {
        let error = HttpError::from(io::Error::other("reset"));
        assert!(error.is_network_error());
    }
}
