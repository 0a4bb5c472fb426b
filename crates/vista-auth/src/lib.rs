//! # vista-auth
//!
//! Google credentials for the live bridge, owned explicitly by whoever
//! connects rather than cached in process globals.
//!
//! - [`CredentialProvider`]: what transports call for a bearer token
//! - [`CachedCredentials`]: lazily refreshing cache over a [`TokenSource`]
//! - [`sources`]: static token, authorized user, service account, metadata server
//! - [`discover_token_source`]: ambient lookup order

#![deny(unsafe_code)]

pub mod discover;
pub mod errors;
pub mod provider;
pub mod sources;
pub mod token;

pub use discover::{discover_token_source, load_credentials_file};
pub use errors::{AuthError, Result};
pub use provider::{CachedCredentials, CredentialProvider, TokenSource};
pub use token::{AccessToken, TOKEN_REFRESH_BUFFER_MS};
