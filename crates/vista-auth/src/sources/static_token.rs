use async_trait::async_trait;

use crate::errors::Result;
use crate::provider::TokenSource;
use crate::token::AccessToken;

/// A pre-minted token supplied out of band (e.g. `VISTA_ACCESS_TOKEN`).
///
/// Never refreshed; rotating it means restarting with a new value.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Wrap a bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn fetch_token(&self) -> Result<AccessToken> {
        Ok(AccessToken::non_expiring(self.token.clone()))
    }

    fn kind(&self) -> &'static str {
        "static"
    }
}
