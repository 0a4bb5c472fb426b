//! # vista-settings
//!
//! Layered configuration for the Vista live-session bridge.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`VistaSettings::default()`]
//! 2. **User file**: `~/.vista/settings.json` or an explicit path (deep-merged over defaults)
//! 3. **Environment variables**: `VISTA_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod constitution;
pub mod errors;
pub mod loader;
pub mod types;

pub use constitution::DEFAULT_SYSTEM_INSTRUCTIONS;
pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
