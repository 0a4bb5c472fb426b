//! Ambient credential discovery.
//!
//! Lookup order:
//! 1. `VISTA_ACCESS_TOKEN` (static bearer token)
//! 2. `GOOGLE_APPLICATION_CREDENTIALS` (authorized-user or service-account file)
//! 3. gcloud's well-known ADC file
//! 4. the GCE metadata server

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::errors::{AuthError, Result};
use crate::provider::TokenSource;
use crate::sources::{AuthorizedUser, MetadataServer, ServiceAccount, StaticToken};

/// Env var carrying a pre-minted bearer token.
pub const ACCESS_TOKEN_ENV: &str = "VISTA_ACCESS_TOKEN";

/// Env var pointing at a credential file.
pub const CREDENTIALS_FILE_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Discover a token source from the process environment.
pub fn discover_token_source() -> Result<Box<dyn TokenSource>> {
    discover_with(|name| std::env::var(name).ok())
}

/// Discover a token source reading variables through `lookup`.
pub fn discover_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Box<dyn TokenSource>> {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty(ACCESS_TOKEN_ENV) {
        info!(source = "static", "using access token from environment");
        return Ok(Box::new(StaticToken::new(token.trim())));
    }

    if let Some(path) = non_empty(CREDENTIALS_FILE_ENV) {
        info!(source = "file", path = %path, "using credentials file");
        return load_credentials_file(Path::new(&path));
    }

    if let Some(path) = well_known_adc_path(&non_empty).filter(|p| p.exists()) {
        info!(source = "adc", path = %path.display(), "using gcloud application default credentials");
        return load_credentials_file(&path);
    }

    info!(source = "metadata", "falling back to metadata server credentials");
    Ok(Box::new(metadata_from(&non_empty)))
}

/// Load an authorized-user or service-account JSON file.
pub fn load_credentials_file(path: &Path) -> Result<Box<dyn TokenSource>> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();

    match kind {
        "authorized_user" => Ok(Box::new(serde_json::from_value::<AuthorizedUser>(value)?)),
        "service_account" => Ok(Box::new(serde_json::from_value::<ServiceAccount>(value)?)),
        other => Err(AuthError::CredentialFile {
            path: path.display().to_string(),
            reason: format!("unknown type {other:?}"),
        }),
    }
}

fn well_known_adc_path(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let config_dir = match lookup("CLOUDSDK_CONFIG") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(lookup("HOME")?).join(".config").join("gcloud"),
    };
    Some(config_dir.join("application_default_credentials.json"))
}

fn metadata_from(lookup: &impl Fn(&str) -> Option<String>) -> MetadataServer {
    match lookup("GCE_METADATA_HOST") {
        Some(host) => MetadataServer::with_base_url(format!("http://{host}")),
        None => MetadataServer::from_env(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
