//! Candidate regions for the direct transport.

/// Regions known to serve the live model.
pub const SUPPORTED_REGIONS: &[&str] = &[
    "us-central1",
    "us-east1",
    "us-east4",
    "us-west1",
    "europe-west1",
    "europe-west4",
    "asia-northeast1",
];

/// Last-resort region when no fallback is configured.
pub const DEFAULT_REGION: &str = "us-central1";

const MAX_CANDIDATES: usize = 2;

/// Whether `region` is in [`SUPPORTED_REGIONS`].
pub fn is_supported(region: &str) -> bool {
    SUPPORTED_REGIONS.contains(&region)
}

/// Ordered, de-duplicated list of at most two regions to try.
///
/// The requested region leads when supported. The configured fallback (or
/// [`DEFAULT_REGION`]) follows.
pub fn candidate_regions(requested: &str, fallback: Option<&str>) -> Vec<String> {
    let requested = requested.trim();
    let fallback = fallback.map(str::trim).filter(|f| !f.is_empty());

    let mut out: Vec<String> = Vec::with_capacity(MAX_CANDIDATES);
    let ordered = [
        is_supported(requested).then_some(requested),
        fallback,
        Some(DEFAULT_REGION),
    ];
    for region in ordered.into_iter().flatten() {
        if out.len() == MAX_CANDIDATES {
            break;
        }
        if !out.iter().any(|r| r == region) {
            out.push(region.to_string());
        }
    }
    out
}
