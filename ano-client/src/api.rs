//! The response envelope shared by all operations.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::{HttpResponse, StatusCode};

/// A single error reported by Anodot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Human readable description.
    #[serde(default)]
    pub description: String,
    /// The vendor error code.
    #[serde(default)]
    pub error: i64,
    /// The position of the offending item in the request, if reported.
    #[serde(default)]
    pub index: Option<String>,
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.description, self.error)?;
        if let Some(ref index) = self.index {
            write!(f, " at {index}")?;
        }
        Ok(())
    }
}

/// Joins error entries into a single message.
pub(crate) fn format_errors(errors: &[ErrorEntry]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The body of a metric submission response.
///
/// A missing `errors` key, `null` and an empty list all mean that there were no errors.
#[derive(Debug, Default, Deserialize)]
struct SubmitEnvelope {
    #[serde(default)]
    errors: Option<Vec<ErrorEntry>>,
}

/// The error body of the REST endpoints, such as schemas and access tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VendorError {
    /// The HTTP status as reported in the body.
    pub status: u16,
    /// Short error name.
    pub name: String,
    /// Detailed message, if any.
    pub message: Option<String>,
    /// The vendor error code.
    pub andt_error_code: i64,
    /// The requested path.
    pub path: Option<String>,
}

impl From<VendorError> for ErrorEntry {
    fn from(error: VendorError) -> Self {
        let description = match error.message {
            Some(message) if !message.is_empty() => message,
            _ => error.name,
        };

        Self {
            description,
            error: error.andt_error_code,
            index: error.path,
        }
    }
}

/// Either the payload of a successful call or the errors reported by Anodot.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    /// The call succeeded.
    Success(T),
    /// Anodot reported errors, in the order they were listed.
    Rejected(Vec<ErrorEntry>),
}

/// The result of a call, along with the raw response for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse<T> {
    outcome: Outcome<T>,
    raw: HttpResponse,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response.
    pub fn success(payload: T, raw: HttpResponse) -> Self {
        Self {
            outcome: Outcome::Success(payload),
            raw,
        }
    }

    /// Creates a response carrying vendor errors.
    pub fn rejected(errors: Vec<ErrorEntry>, raw: HttpResponse) -> Self {
        Self {
            outcome: Outcome::Rejected(errors),
            raw,
        }
    }

    /// The outcome of the call.
    pub fn outcome(&self) -> &Outcome<T> {
        &self.outcome
    }

    /// Returns `true` if Anodot reported errors.
    pub fn has_errors(&self) -> bool {
        matches!(self.outcome, Outcome::Rejected(_))
    }

    /// The reported errors, empty on success.
    pub fn errors(&self) -> &[ErrorEntry] {
        match self.outcome {
            Outcome::Success(_) => &[],
            Outcome::Rejected(ref errors) => errors,
        }
    }

    /// All errors formatted into one message, or `None` on success.
    pub fn error_message(&self) -> Option<String> {
        match self.outcome {
            Outcome::Success(_) => None,
            Outcome::Rejected(ref errors) => Some(format_errors(errors)),
        }
    }

    /// The payload, or `None` if errors were reported.
    pub fn payload(&self) -> Option<&T> {
        match self.outcome {
            Outcome::Success(ref payload) => Some(payload),
            Outcome::Rejected(_) => None,
        }
    }

    /// The raw status and body of the response.
    pub fn raw(&self) -> &HttpResponse {
        &self.raw
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.raw.status
    }

    /// Converts into the payload, or an [`ApiError::Rejected`] with the reported errors.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self.outcome {
            Outcome::Success(payload) => Ok(payload),
            Outcome::Rejected(errors) => Err(ApiError::Rejected {
                status: self.raw.status,
                errors,
            }),
        }
    }
}

/// Interprets the response of a metric submission.
///
/// Errors listed in the body are reported regardless of the status. A successful status with a
/// blank body means there were no errors.
pub(crate) fn parse_submit_response(raw: HttpResponse) -> Result<ApiResponse<()>, ApiError> {
    let errors = if raw.is_blank() {
        Vec::new()
    } else {
        match serde_json::from_slice::<SubmitEnvelope>(&raw.body) {
            Ok(envelope) => envelope.errors.unwrap_or_default(),
            Err(error) => return Err(ApiError::protocol(raw.status, &raw.body, Some(error))),
        }
    };

    if !errors.is_empty() {
        Ok(ApiResponse::rejected(errors, raw))
    } else if raw.status.is_success() {
        Ok(ApiResponse::success((), raw))
    } else {
        Err(ApiError::protocol(raw.status, &raw.body, None))
    }
}

/// Interprets the response of a REST endpoint.
///
/// Successful responses are decoded into `B` and mapped with `f`. If `f` returns `None`, the
/// response is treated as malformed. Other responses must carry a [`VendorError`].
pub(crate) fn parse_vendor_response<B, T, F>(
    raw: HttpResponse,
    f: F,
) -> Result<ApiResponse<T>, ApiError>
where
    B: DeserializeOwned,
    F: FnOnce(B) -> Option<T>,
{
    if raw.status.is_success() {
        let body = serde_json::from_slice::<B>(&raw.body)
            .map_err(|error| ApiError::protocol(raw.status, &raw.body, Some(error)))?;

        return match f(body) {
            Some(payload) => Ok(ApiResponse::success(payload, raw)),
            None => Err(ApiError::protocol(raw.status, &raw.body, None)),
        };
    }

    match serde_json::from_slice::<VendorError>(&raw.body) {
        Ok(error) => Ok(ApiResponse::rejected(vec![error.into()], raw)),
        Err(error) => Err(ApiError::protocol(raw.status, &raw.body, Some(error))),
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    use super::*;

    fn http_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(StatusCode::from_u16(status).unwrap(), body)
    }

    #[test]
    fn test_submit_without_errors() {
        for body in ["", "{}", r#"{"errors":null}"#, r#"{"errors":[]}"#] {
            let response = parse_submit_response(http_response(200, body)).unwrap();
            assert!(!response.has_errors(), "{body}");
            assert_eq!(response.error_message(), None);
            assert_eq!(response.payload(), Some(&()));
        }
    }

    #[test]
    fn test_submit_with_errors() {
        let body = r#"{"errors":[
            {"description":"invalid what","error":1001,"index":"0"},
            {"description":"missing timestamp","error":1002,"index":null}
        ]}"#;
        let response = parse_submit_response(http_response(200, body)).unwrap();

        assert!(response.has_errors());
        assert_eq!(response.errors().len(), 2);
        assert_eq!(
            response.error_message().unwrap(),
            "invalid what (code 1001) at 0; missing timestamp (code 1002)"
        );
        assert_eq!(response.raw().body, body.as_bytes());
    }

    #[test]
    fn test_submit_errors_on_bad_status() {
        let body = r#"{"errors":[{"description":"bad token","error":401}]}"#;
        let response = parse_submit_response(http_response(401, body)).unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.errors()[0].description, "bad token");
    }

    #[test]
    fn test_submit_bad_status_without_errors() {
        let error = parse_submit_response(http_response(500, "")).unwrap_err();
        assert!(matches!(
            error,
            ApiError::Protocol { status: StatusCode::INTERNAL_SERVER_ERROR, source: None, .. }
        ));
    }

    #[test]
    fn test_submit_unparseable_body() {
        let error = parse_submit_response(http_response(200, "<html>ok</html>")).unwrap_err();
        let ApiError::Protocol { status, body, source } = error else {
            panic!("expected protocol error");
        };
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>ok</html>");
        assert!(source.is_some());
    }

    #[test]
    fn test_vendor_error_mapping() {
        let body = r#"{"status":400,"name":"BadRequest","message":"schema name exists","andtErrorCode":1500,"path":"/api/v2/stream-schemas"}"#;
        let response =
            parse_vendor_response::<serde_json::Value, (), _>(http_response(400, body), |_| Some(()))
                .unwrap();

        assert_debug_snapshot!(response.errors(), @r###"
        [
            ErrorEntry {
                description: "schema name exists",
                error: 1500,
                index: Some(
                    "/api/v2/stream-schemas",
                ),
            },
        ]
        "###);
    }

    #[test]
    fn test_vendor_error_without_message() {
        let entry = ErrorEntry::from(VendorError {
            status: 401,
            name: "Unauthorized".to_owned(),
            andt_error_code: 7,
            ..Default::default()
        });
        assert_eq!(entry.to_string(), "Unauthorized (code 7)");
    }

    #[test]
    fn test_vendor_success_mapping() {
        let response = parse_vendor_response::<serde_json::Value, String, _>(
            http_response(200, r#"{"token":"abc"}"#),
            |body| body["token"].as_str().map(str::to_owned),
        )
        .unwrap();
        assert_eq!(response.payload().map(String::as_str), Some("abc"));

        let error = parse_vendor_response::<serde_json::Value, String, _>(
            http_response(200, r#"{"other":1}"#),
            |body| body["token"].as_str().map(str::to_owned),
        )
        .unwrap_err();
        assert!(matches!(error, ApiError::Protocol { source: None, .. }));
    }

    #[test]
    fn test_into_result() {
        let raw = http_response(422, "");
        let rejected = ApiResponse::<()>::rejected(vec![ErrorEntry::default()], raw.clone());
        assert!(matches!(
            rejected.into_result(),
            Err(ApiError::Rejected { status: StatusCode::UNPROCESSABLE_ENTITY, .. })
        ));
        assert_eq!(ApiResponse::success(5, raw).into_result().unwrap(), 5);
    }
}
