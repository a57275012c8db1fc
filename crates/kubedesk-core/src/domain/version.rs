//! Semantic-version precedence for the "what's new" check.
//!
//! Precedence compares major, minor, patch, then pre-release identifiers.
//! Build metadata (`+sha.abc`) never affects ordering, which is why this
//! module compares a precedence key instead of using `Version`'s `Ord`
//! directly.

use semver::{Prerelease, Version};

/// Parses a version string, tolerating a leading `v` and surrounding spaces.
///
/// Returns `None` for anything that is not a valid semantic version.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// Returns `true` iff `running` has strictly higher precedence than
/// `last_seen`.
///
/// An unparsable `last_seen` is treated as `0.0.0`.
pub fn is_newer(running: &Version, last_seen: &str) -> bool {
    let seen = parse_lenient(last_seen).unwrap_or_else(|| Version::new(0, 0, 0));
    precedence(running) > precedence(&seen)
}

fn precedence(v: &Version) -> (u64, u64, u64, &Prerelease) {
    (v.major, v.minor, v.patch, &v.pre)
}
