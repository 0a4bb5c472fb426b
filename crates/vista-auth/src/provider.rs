//! Token sources and the cached credential provider.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::Result;
use crate::token::{AccessToken, TOKEN_REFRESH_BUFFER_MS};

/// Something that can mint a fresh access token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetch a new token from the underlying grant.
    async fn fetch_token(&self) -> Result<AccessToken>;

    /// Short label for logs.
    fn kind(&self) -> &'static str;
}

#[async_trait]
impl TokenSource for Box<dyn TokenSource> {
    async fn fetch_token(&self) -> Result<AccessToken> {
        (**self).fetch_token().await
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }
}

/// Hands out bearer tokens to transports.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A bearer token valid for at least the refresh buffer.
    async fn access_token(&self) -> Result<String>;
}

#[async_trait]
impl<T: CredentialProvider + ?Sized> CredentialProvider for Arc<T> {
    async fn access_token(&self) -> Result<String> {
        (**self).access_token().await
    }
}

/// Caches the last token from `S`, refreshing lazily near expiry.
///
/// The cache lock is held across the refresh so concurrent callers wait for
/// one fetch instead of racing the token endpoint.
pub struct CachedCredentials<S = Box<dyn TokenSource>> {
    source: S,
    cached: Mutex<Option<AccessToken>>,
    buffer_ms: i64,
}

impl<S: TokenSource> CachedCredentials<S> {
    /// Wrap a source with the default five-minute refresh buffer.
    pub fn new(source: S) -> Self {
        Self::with_buffer(source, TOKEN_REFRESH_BUFFER_MS)
    }

    /// Wrap a source with a custom refresh buffer.
    pub fn with_buffer(source: S, buffer_ms: i64) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
            buffer_ms,
        }
    }

    /// Drop the cached token so the next call refetches.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[async_trait]
impl<S: TokenSource> CredentialProvider for CachedCredentials<S> {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached
            .as_ref()
            .filter(|t| !t.should_refresh(self.buffer_ms))
        {
            return Ok(token.token.clone());
        }

        debug!(source = self.source.kind(), "refreshing access token");
        let fresh = self.source.fetch_token().await?;
        let value = fresh.token.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
