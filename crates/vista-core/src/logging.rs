//! Process-wide `tracing` subscriber setup.
//!
//! Log context (session id, skill, region) travels on spans opened with
//! `#[tracing::instrument]`; this module only installs the subscriber.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Directive used when the configured one does not parse.
const FALLBACK_DIRECTIVE: &str = "info";

/// Output encoding for stderr logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// Newline-delimited JSON for log collectors.
    Json,
}

impl LogFormat {
    /// `Json` when `json` is set, else `Compact`.
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Compact }
    }
}

/// Filter from `RUST_LOG` if set, else `directive`, else [`FALLBACK_DIRECTIVE`].
fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE))
}

/// Install the global subscriber writing to stderr.
///
/// Call once at startup; later calls are no-ops.
pub fn init_subscriber(directive: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(build_filter(directive));
    let fmt = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init fails only when a global subscriber already exists
    let _ = match format {
        LogFormat::Compact => registry.with(fmt.compact()).try_init(),
        LogFormat::Json => registry.with(fmt.json()).try_init(),
    };
}
