use async_trait::async_trait;
use tracing::instrument;

use crate::errors::Result;
use crate::provider::TokenSource;
use crate::token::{AccessToken, read_token_response};

/// Default GCE metadata server host.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens for the attached service account of a GCE / Cloud Run workload.
pub struct MetadataServer {
    base_url: String,
    client: reqwest::Client,
}

impl MetadataServer {
    /// Use `GCE_METADATA_HOST` if set, else the default host.
    pub fn from_env() -> Self {
        let host = std::env::var("GCE_METADATA_HOST")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
        Self::with_base_url(format!("http://{host}"))
    }

    /// Use an explicit base URL (scheme + host).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TokenSource for MetadataServer {
    #[instrument(skip_all, fields(source = "metadata"))]
    async fn fetch_token(&self) -> Result<AccessToken> {
        let resp = self
            .client
            .get(format!("{}{TOKEN_PATH}", self.base_url))
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        read_token_response(resp).await
    }

    fn kind(&self) -> &'static str {
        "metadata"
    }
}
