//! Dotted-triplet version ordering used as the catalog staleness key.

/// Parse `major.minor.patch`. Missing or non-numeric components read as 0.
pub fn parse_version(version: &str) -> (u64, u64, u64) {
    let mut parts = version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .map(|part| part.trim().parse::<u64>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

/// Whether `a` is strictly newer than `b`.
pub fn compare_semver(a: &str, b: &str) -> bool {
    parse_version(a) > parse_version(b)
}

/// Whether a catalog cached at `cached` must be refreshed under `running`.
///
/// An absent cached version is older than any real version.
pub fn is_stale(cached: Option<&str>, running: &str) -> bool {
    cached.map_or(true, |cached| compare_semver(running, cached))
}

/// Whether `version` is a well-formed dotted triplet.
pub fn is_valid_version(version: &str) -> bool {
    let parts: Vec<&str> = version.trim().split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.parse::<u64>().is_ok())
}
