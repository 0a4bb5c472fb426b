use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::default_token_uri;
use crate::errors::Result;
use crate::provider::TokenSource;
use crate::token::{AccessToken, read_token_response};

/// User credentials from `gcloud auth application-default login`.
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri", alias = "token_url")]
    pub token_uri: String,
    #[serde(skip)]
    client: reqwest::Client,
}

impl AuthorizedUser {
    /// Build from explicit parts.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_uri: default_token_uri(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri = uri.into();
        self
    }
}

#[async_trait]
impl TokenSource for AuthorizedUser {
    #[instrument(skip_all, fields(source = "authorized_user"))]
    async fn fetch_token(&self) -> Result<AccessToken> {
        let body = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
        ];
        let resp = self.client.post(&self.token_uri).form(&body).send().await?;
        read_token_response(resp).await
    }

    fn kind(&self) -> &'static str {
        "authorized_user"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AuthError;

    #[tokio::test]
    async fn refresh_grant_success() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/token"))
            .and(wiremock::matchers::body_string_contains("grant_type=refresh_token"))
            .and(wiremock::matchers::body_string_contains("refresh_token=rt-1"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "ya29.user",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = AuthorizedUser::new("cid", "csec", "rt-1")
            .with_token_uri(format!("{}/token", server.uri()));
        let token = source.fetch_token().await.unwrap();

        assert_eq!(token.token, "ya29.user");
        assert!(token.expires_at > crate::token::now_ms());
    }

    #[tokio::test]
    async fn refresh_grant_rejected() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let source = AuthorizedUser::new("cid", "csec", "rt-1")
            .with_token_uri(format!("{}/token", server.uri()));
        let err = source.fetch_token().await.unwrap_err();

        assert!(matches!(err, AuthError::TokenEndpoint { status: 400, .. }));
    }

    #[test]
    fn deserializes_gcloud_file_shape() {
        let source: AuthorizedUser = serde_json::from_str(
            r#"{"client_id": "c", "client_secret": "s", "refresh_token": "r", "type": "authorized_user"}"#,
        )
        .unwrap();
        assert_eq!(source.token_uri, "https://oauth2.googleapis.com/token");
    }
}
