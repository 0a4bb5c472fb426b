//! Access tokens and expiry arithmetic.

use serde::Deserialize;

/// Refresh when the cached token expires within this window.
pub const TOKEN_REFRESH_BUFFER_MS: i64 = 300_000;

/// OAuth scope requested for Vertex AI.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// A bearer token with its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Bearer token value.
    pub token: String,
    /// Expiry as Unix milliseconds.
    pub expires_at: i64,
}

impl AccessToken {
    /// A token that never needs refreshing.
    pub fn non_expiring(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: i64::MAX,
        }
    }

    /// A token valid for `expires_in_seconds` from now.
    pub fn expiring_in(token: impl Into<String>, expires_in_seconds: i64) -> Self {
        Self {
            token: token.into(),
            expires_at: now_ms().saturating_add(expires_in_seconds.saturating_mul(1000)),
        }
    }

    /// Whether the token expires within `buffer_ms`.
    pub fn should_refresh(&self, buffer_ms: i64) -> bool {
        now_ms().saturating_add(buffer_ms) >= self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Standard OAuth token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

impl From<TokenResponse> for AccessToken {
    fn from(resp: TokenResponse) -> Self {
        Self::expiring_in(resp.access_token, resp.expires_in)
    }
}

/// Current time in Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Read a token endpoint response, mapping non-200 statuses to an error.
pub(crate) async fn read_token_response(resp: reqwest::Response) -> crate::Result<AccessToken> {
    let status = resp.status().as_u16();
    if status != 200 {
        let text = resp.text().await.unwrap_or_default();
        return Err(crate::AuthError::TokenEndpoint {
            status,
            message: text,
        });
    }
    let data: TokenResponse = resp.json().await?;
    Ok(data.into())
}
