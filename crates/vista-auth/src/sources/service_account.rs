use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::default_token_uri;
use crate::errors::Result;
use crate::provider::TokenSource;
use crate::token::{AccessToken, CLOUD_PLATFORM_SCOPE, read_token_response};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Service-account key file credentials (JWT-bearer grant).
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    /// Service account email, used as the assertion issuer.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// Key id placed in the JWT header.
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Token endpoint, also the assertion audience.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(skip)]
    client: reqwest::Client,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceAccount {
    /// Build from explicit parts.
    pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.into(),
            private_key_id: None,
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

    /// Sign the RS256 assertion exchanged for an access token.
    pub fn signed_assertion(&self) -> Result<String> {
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.private_key_id);
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(&header, &claims, &key)?)
    }
}

#[async_trait]
impl TokenSource for ServiceAccount {
    #[instrument(skip_all, fields(source = "service_account", email = %self.client_email))]
    async fn fetch_token(&self) -> Result<AccessToken> {
        let assertion = self.signed_assertion()?;
        let body = [
            ("grant_type", JWT_BEARER_GRANT),
            ("assertion", assertion.as_str()),
        ];
        let resp = self.client.post(&self.token_uri).form(&body).send().await?;
        read_token_response(resp).await
    }

    fn kind(&self) -> &'static str {
        "service_account"
    }
}
