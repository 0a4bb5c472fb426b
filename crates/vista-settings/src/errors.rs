//! Settings error types.

use std::path::PathBuf;

/// Errors loading the settings file.
///
/// Environment overrides never fail: invalid values are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Settings file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not JSON.
    #[error("{} is not valid JSON: {source}", path.display())]
    Parse {
        /// Settings file.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The merged document does not fit [`crate::VistaSettings`].
    #[error("settings do not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_file() {
        let source = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err = SettingsError::Parse {
            path: PathBuf::from("/home/u/.vista/settings.json"),
            source,
        };
        assert!(err.to_string().starts_with("/home/u/.vista/settings.json is not valid JSON"));
    }

    #[test]
    fn read_error_keeps_source() {
        let err = SettingsError::Read {
            path: PathBuf::from("settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
