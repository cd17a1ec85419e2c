//! Tokens and bearer sessions for the Anodot API.
//!
//! Anodot accounts own two kinds of [`Token`]s. Data tokens authorize metric submission, API
//! tokens authorize everything else. Most REST resources do not accept the API token directly,
//! but a short-lived bearer credential obtained by exchanging the API token.
//!
//! The [`SessionManager`] caches that bearer credential for [`BEARER_TTL`] and exchanges the
//! token again through a [`TokenRefresher`] once it has expired:
//!
//! ```
//! use std::sync::Arc;
//!
//! use ano_auth::{RefreshError, SessionManager, Token, TokenKind, TokenRefresher};
//!
//! struct StaticRefresher;
//!
//! #[async_trait::async_trait]
//! impl TokenRefresher for StaticRefresher {
//!     async fn refresh(&self, _token: &Token) -> Result<String, RefreshError> {
//!         Ok("bearer".to_owned())
//!     }
//! }
//!
//! # async fn run() -> Result<(), ano_auth::AuthError> {
//! let token = Token::new("my-api-token", TokenKind::Api).unwrap();
//! let session = SessionManager::new(token, Arc::new(StaticRefresher));
//! let bearer = session.bearer().await?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod clock;
mod session;

pub use self::clock::*;
pub use self::session::*;

/// Raised if a token cannot be constructed.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TokenError {
    /// The token value is empty or only contains whitespace.
    #[error("token value must not be blank")]
    Blank,

    /// The token kind is neither `api` nor `data`.
    #[error("unknown token kind {0:?}, expected \"api\" or \"data\"")]
    UnknownKind(String),
}

/// The kind of an Anodot [`Token`].
///
/// Serializes as the lowercase kind name, `"api"` or `"data"`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// An API token, used to obtain bearer credentials.
    #[default]
    Api,
    /// A data collection token, used to submit metrics.
    Data,
}

impl TokenKind {
    /// Returns the string representation of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(Self::Api),
            "data" => Ok(Self::Data),
            other => Err(TokenError::UnknownKind(other.to_owned())),
        }
    }
}

/// An access token of an Anodot account.
///
/// The value is never blank. Its `Debug` output does not reveal the value.
#[derive(Clone, Eq, PartialEq)]
pub struct Token {
    value: String,
    kind: TokenKind,
}

impl Token {
    /// Creates a token of the given kind.
    pub fn new(value: impl Into<String>, kind: TokenKind) -> Result<Self, TokenError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(TokenError::Blank);
        }

        Ok(Self { value, kind })
    }

    /// Creates a token from a value and a kind string, either `"api"` or `"data"`.
    pub fn parse(value: impl Into<String>, kind: &str) -> Result<Self, TokenError> {
        Self::new(value, kind.parse()?)
    }

    /// The secret token value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The kind of the token.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("kind", &self.kind)
            .field("value", &"********")
            .finish()
    }
}
