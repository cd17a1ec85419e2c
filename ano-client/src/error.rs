use ano_auth::AuthError;

use crate::api::{ErrorEntry, format_errors};
use crate::http::{HttpError, StatusCode};

/// Raised by all operations of the [`AnodotClient`](crate::AnodotClient).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The client is not set up for the operation, for example due to the wrong token kind.
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// The request could not be exchanged. It is not retried.
    #[error("could not send request to anodot")]
    Transport(#[from] HttpError),

    /// The response status or body was not understood.
    #[error("unexpected response from anodot with status {status}")]
    Protocol {
        /// The response status.
        status: StatusCode,
        /// The raw response body.
        body: String,
        /// The parse error, if the body could not be decoded.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Anodot rejected the request with structured errors.
    #[error("request rejected by anodot with status {status}: {}", format_errors(.errors))]
    Rejected {
        /// The response status.
        status: StatusCode,
        /// The errors reported in the response.
        errors: Vec<ErrorEntry>,
    },

    /// No bearer credential could be obtained for a privileged operation.
    #[error("could not authenticate with anodot")]
    Auth(#[source] AuthError),

    /// The request payload could not be serialized.
    #[error("could not serialize request payload")]
    Serialize(#[source] serde_json::Error),
}

impl ApiError {
    pub(crate) fn protocol(
        status: StatusCode,
        body: &[u8],
        source: Option<serde_json::Error>,
    ) -> Self {
        Self::Protocol {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
            source,
        }
    }

    /// Returns `true` if the error indicates a network downtime.
    pub fn is_network_error(&self) -> bool {
        match self {
            Self::Transport(error) => error.is_network_error(),
            Self::Protocol { status, .. } => matches!(status.as_u16(), 502..=504),
            _ => false,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::WrongTokenKind(_) => Self::Configuration(error.to_string()),
            error => Self::Auth(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use ano_auth::TokenKind;

    use super::*;

    #[test]
    fn test_wrong_token_kind_is_configuration() {
        let error = ApiError::from(AuthError::WrongTokenKind(TokenKind::Data));
        assert_eq!(
            error.to_string(),
            "invalid client configuration: bearer credentials require an api token, got a data token"
        );
    }

    #[test]
    fn test_rejected_message() {
        let error = ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            errors: vec![ErrorEntry {
                description: "invalid schema".to_owned(),
                error: 1002,
                index: None,
            }],
        };

        assert_eq!(
            error.to_string(),
            "request rejected by anodot with status 400 Bad Request: invalid schema (code 1002)"
        );
    }

    #[test]
    fn test_gateway_errors_are_network_errors() {
        let error = ApiError::protocol(StatusCode::BAD_GATEWAY, b"<html>", None);
        assert!(error.is_network_error());
        assert!(!ApiError::protocol(StatusCode::BAD_REQUEST, b"", None).is_network_error());
    }
}
