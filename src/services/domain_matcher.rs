//! Website filter matching.
//!
//! A pattern matches a hostname when the hostname equals the pattern or ends
//! with `"." + pattern`. There is no wildcard syntax: `*` is an ordinary
//! character and never matches anything on its own.

use crate::domain::models::{WebsiteFilterMode, WebsiteFilterPolicy};

/// Whether `hostname` is covered by `pattern` under suffix semantics.
pub fn matches_pattern(hostname: &str, pattern: &str) -> bool {
    let hostname = normalize(hostname);
    let pattern = normalize(pattern);
    if pattern.is_empty() {
        return false;
    }
    hostname == pattern
        || hostname
            .strip_suffix(pattern.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Whether the feature is active on `hostname` under `policy`.
pub fn matches(hostname: &str, policy: &WebsiteFilterPolicy) -> bool {
    let any = || policy.patterns.iter().any(|p| matches_pattern(hostname, p));
    match policy.mode {
        WebsiteFilterMode::All => true,
        WebsiteFilterMode::Blacklist => !any(),
        WebsiteFilterMode::Whitelist => any(),
    }
}

/// Gate activation for a page, logging the decision.
pub fn should_activate(hostname: &str, policy: &WebsiteFilterPolicy) -> bool {
    let active = matches(hostname, policy);
    tracing::debug!(
        hostname,
        mode = %policy.mode,
        patterns = policy.patterns.len(),
        active,
        "evaluated website filter"
    );
    active
}

fn normalize(value: &str) -> String {
    value.trim().trim_end_matches('.').to_ascii_lowercase()
}
