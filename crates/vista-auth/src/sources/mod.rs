//! Concrete [`TokenSource`](crate::TokenSource) implementations.

mod authorized_user;
mod metadata;
mod service_account;
mod static_token;

pub use authorized_user::AuthorizedUser;
pub use metadata::{DEFAULT_METADATA_HOST, MetadataServer};
pub use service_account::ServiceAccount;
pub use static_token::StaticToken;

/// Google's OAuth token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}
