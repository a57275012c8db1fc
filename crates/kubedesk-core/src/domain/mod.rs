//! Domain entities for the preferences store.
//!
//! Nothing in this module touches the disk, the environment, or the clock.
//! The infrastructure layer in `kubedesk-prefs` resolves platform defaults
//! (home directory, data directory) and hands them in.

/// Event vocabulary published on preference transitions.
pub mod events;
/// Persisted store schema and hydration merge rules.
pub mod model;
/// Semantic-version precedence helpers.
pub mod version;
