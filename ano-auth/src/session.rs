use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use crate::{Clock, SystemClock, Token, TokenKind};

/// The lifetime of a bearer credential.
pub const BEARER_TTL: TimeDelta = TimeDelta::hours(24);

/// Any error raised by a [`TokenRefresher`].
pub type RefreshError = Box<dyn std::error::Error + Send + Sync>;

/// Exchanges an API token for a bearer credential.
#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Requests a new bearer value for the given API token.
    async fn refresh(&self, token: &Token) -> Result<String, RefreshError>;
}

/// Raised if no valid bearer credential could be obtained.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The session token cannot be exchanged for a bearer credential.
    #[error("bearer credentials require an api token, got a {0} token")]
    WrongTokenKind(TokenKind),

    /// The refresher failed. The error is returned as raised.
    #[error("could not refresh bearer token")]
    Refresh(#[source] RefreshError),

    /// The refresher returned an empty bearer value.
    #[error("refreshed bearer token is blank")]
    BlankBearer,
}

/// A bearer credential and the time it was issued.
#[derive(Clone, Eq, PartialEq)]
pub struct Credential {
    value: String,
    issued_at: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential issued at the given time.
    pub fn new(value: String, issued_at: DateTime<Utc>) -> Self {
        Self { value, issued_at }
    }

    /// The bearer value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The time the credential was obtained.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Returns `true` if [`BEARER_TTL`] has elapsed since the credential was issued.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at >= BEARER_TTL
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"********")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// The state of the bearer credential cache.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// No credential has been obtained yet.
    Uninitialized,
    /// A credential is cached and has not expired.
    Valid,
    /// The cached credential has expired and will be refreshed on next access.
    Expired,
}

/// Caches the bearer credential of an API token.
///
/// The credential is checked lazily on every access and refreshed once it is older than
/// [`BEARER_TTL`]. Concurrent callers that find an expired credential wait for a single refresh.
/// A failed refresh leaves the cache untouched, so the next access tries again.
pub struct SessionManager {
    token: Token,
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
    credential: RwLock<Option<Credential>>,
}

impl SessionManager {
    /// Creates a session for the token using the system clock.
    pub fn new(token: Token, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            token,
            refresher,
            clock: Arc::new(SystemClock),
            credential: RwLock::new(None),
        }
    }

    /// Replaces the clock used to check expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The token that is exchanged for bearer credentials.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Returns the current state of the credential cache.
    pub async fn state(&self) -> SessionState {
        match self.credential.read().await.as_ref() {
            None => SessionState::Uninitialized,
            Some(credential) if credential.is_expired(self.clock.now()) => SessionState::Expired,
            Some(_) => SessionState::Valid,
        }
    }

    /// Returns a valid bearer value, refreshing it if needed.
    pub async fn bearer(&self) -> Result<String, AuthError> {
        if let Some(value) = self.cached(self.credential.read().await.as_ref()) {
            return Ok(value);
        }

        let mut credential = self.credential.write().await;

        // Another caller may have refreshed while this one waited for the lock.
        if let Some(value) = self.cached(credential.as_ref()) {
            return Ok(value);
        }

        if self.token.kind() != TokenKind::Api {
            return Err(AuthError::WrongTokenKind(self.token.kind()));
        }

        ano_log::debug!("refreshing bearer token");
        let value = self
            .refresher
            .refresh(&self.token)
            .await
            .map_err(AuthError::Refresh)?;

        if value.trim().is_empty() {
            return Err(AuthError::BlankBearer);
        }

        *credential = Some(Credential::new(value.clone(), self.clock.now()));
        Ok(value)
    }

    fn cached(&self, credential: Option<&Credential>) -> Option<String> {
        credential
            .filter(|c| !c.is_expired(self.clock.now()))
            .map(|c| c.value.clone())
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
