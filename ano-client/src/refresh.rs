use std::sync::Arc;

use ano_auth::{RefreshError, Token, TokenRefresher};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::parse_vendor_response;
use crate::error::ApiError;
use crate::http::{HttpRequest, Transport};

const ACCESS_TOKEN_PATH: &str = "api/v2/access-token";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    token: String,
}

/// Exchanges the API token for a bearer at the access token endpoint.
///
/// Failures are reported as boxed [`ApiError`]s.
pub struct BearerRefresher {
    base_url: Url,
    transport: Arc<dyn Transport>,
}

impl BearerRefresher {
    /// Creates a refresher for the Anodot instance at `base_url`.
    pub fn new(base_url: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url,
            transport,
        }
    }

    async fn request_bearer(&self, token: &Token) -> Result<String, ApiError> {
        let mut url = self.base_url.clone();
        url.set_path(ACCESS_TOKEN_PATH);
        url.query_pairs_mut().append_pair("responseformat", "JSON");

        let body = serde_json::to_vec(&RefreshRequest {
            refresh_token: token.value(),
        })
        .map_err(ApiError::Serialize)?;

        let raw = self
            .transport
            .send(HttpRequest::post(url).json_body(body))
            .await?;

        parse_vendor_response(raw, |body: RefreshResponse| Some(body.token))?.into_result()
    }
}

#[async_trait::async_trait]
impl TokenRefresher for BearerRefresher {
    async fn refresh(&self, token: &Token) -> Result<String, RefreshError> {
        self.request_bearer(token).await.map_err(|error| {
            ano_log::error!(
                error = &error as &dyn std::error::Error,
                "failed to refresh bearer token"
            );
            Box::new(error) as RefreshError
        })
    }
}
