//! Auth error types.

/// Errors that can occur while obtaining an access token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token or metadata endpoint could not be reached.
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A credential file or token response was not the JSON we expected.
    #[error("malformed credential JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A credential file could not be read.
    #[error("credential file unreadable: {0}")]
    Io(#[from] std::io::Error),

    /// The token endpoint rejected the grant.
    #[error("token endpoint error ({status}): {message}")]
    TokenEndpoint {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// A credential file was readable JSON but not a usable credential.
    #[error("unsupported credential file {path}: {reason}")]
    CredentialFile {
        /// File that was read.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Signing the service-account assertion failed.
    #[error("JWT signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// No credential source could be located.
    #[error("no credentials found: {0}")]
    NotConfigured(String),
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_endpoint_display() {
        let err = AuthError::TokenEndpoint {
            status: 400,
            message: "invalid_grant".to_string(),
        };
        assert_eq!(err.to_string(), "token endpoint error (400): invalid_grant");
    }

    #[test]
    fn credential_file_display() {
        let err = AuthError::CredentialFile {
            path: "/tmp/adc.json".into(),
            reason: "unknown type \"external_account\"".into(),
        };
        assert!(err.to_string().contains("/tmp/adc.json"));
        assert!(err.to_string().contains("external_account"));
    }

    #[test]
    fn unreadable_file_converts_from_io() {
        let err: AuthError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, AuthError::Io(_)));
        assert_eq!(err.to_string(), "credential file unreadable: denied");
    }
}
