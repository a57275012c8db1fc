//! Versioned migration pipeline for the store document.
//!
//! A store document written by an older build is brought up to date by
//! running every registered [`Migration`] whose version is greater than the
//! document's `schema_version`, strictly in ascending version order.  Each step
//! receives the output of the previous one.
//!
//! ```text
//!  on-disk doc (schema 1.0.0)
//!        │
//!        ▼  1.1.0          rename legacy keys
//!        ▼  2.0.0-alpha.3  nest legacy preferences
//!        │
//!  doc tagged schema_version = "2.0.0-alpha.3"
//! ```
//!
//! # Failure policy
//!
//! A step must not fail for input that conforms to its prior-version schema.
//! If one does fail, [`run_migrations`] returns [`MigrationError::StepFailed`]
//! and the caller must abort startup: adopting a half-migrated document could
//! corrupt the user's settings on the next write.
//!
//! The pipeline itself is pure.  Relocating a store file from its legacy name
//! is a file-system concern handled by the storage gateway before the document
//! is read.

use semver::Version;
use thiserror::Error;
use toml::{Table, Value};
use tracing::debug;

mod steps;

pub use steps::STORE_MIGRATIONS;

/// Top-level key recording which migrations a document has been through.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Signature of a single migration step.
///
/// Returns a human-readable reason on failure.
pub type MigrationFn = fn(&mut Table) -> Result<(), String>;

/// One versioned transform of the store document.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Semantic version at which this transform was introduced.
    pub version: &'static str,
    pub description: &'static str,
    pub run: MigrationFn,
}

/// Error type for the migration pipeline.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The document's `schema_version` is not a valid semantic version.
    ///
    /// This describes malformed content, not a failed upgrade.
    #[error("invalid schema_version {raw:?} in store document")]
    InvalidSchemaVersion { raw: String },

    /// A registered migration carries an unparsable version.
    #[error("migration registered with invalid version {0:?}")]
    InvalidMigrationVersion(&'static str),

    /// A migration step rejected its input.
    #[error("migration {version} ({description}) failed: {reason}")]
    StepFailed {
        version: Version,
        description: &'static str,
        reason: String,
    },
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    /// The migrated document, tagged with its new `schema_version`.
    pub document: Table,
    /// Versions of the steps that ran, in the order they ran.
    pub applied: Vec<Version>,
    pub schema_version: Version,
}

/// Reads the document's schema version; an absent key means `0.0.0`.
pub fn stored_version(doc: &Table) -> Result<Version, MigrationError> {
    match doc.get(SCHEMA_VERSION_KEY) {
        None => Ok(Version::new(0, 0, 0)),
        Some(Value::String(raw)) => {
            Version::parse(raw).map_err(|_| MigrationError::InvalidSchemaVersion { raw: raw.clone() })
        }
        Some(other) => Err(MigrationError::InvalidSchemaVersion {
            raw: other.to_string(),
        }),
    }
}

/// Highest version in `migrations`: the schema version new documents carry.
pub fn latest_version(migrations: &[Migration]) -> Result<Version, MigrationError> {
    let mut latest = Version::new(0, 0, 0);
    for m in migrations {
        let v = parse_step_version(m)?;
        if v > latest {
            latest = v;
        }
    }
    Ok(latest)
}

/// Applies every pending migration to `doc`.
///
/// # Errors
///
/// - [`MigrationError::InvalidSchemaVersion`] if the document's version tag is
///   malformed.
/// - [`MigrationError::StepFailed`] if a step rejects its input.
pub fn run_migrations(
    mut doc: Table,
    migrations: &[Migration],
) -> Result<MigrationOutcome, MigrationError> {
    let from = stored_version(&doc)?;

    let mut pending = Vec::new();
    for m in migrations {
        let v = parse_step_version(m)?;
        if v > from {
            pending.push((v, m));
        }
    }
    pending.sort_by(|a, b| a.0.cmp(&b.0));

    let mut applied = Vec::with_capacity(pending.len());
    for (version, m) in pending {
        debug!("applying store migration {version}: {}", m.description);
        (m.run)(&mut doc).map_err(|reason| MigrationError::StepFailed {
            version: version.clone(),
            description: m.description,
            reason,
        })?;
        applied.push(version);
    }

    let schema_version = latest_version(migrations)?.max(from);
    doc.insert(
        SCHEMA_VERSION_KEY.to_string(),
        Value::String(schema_version.to_string()),
    );

    Ok(MigrationOutcome {
        document: doc,
        applied,
        schema_version,
    })
}

fn parse_step_version(m: &Migration) -> Result<Version, MigrationError> {
    Version::parse(m.version).map_err(|_| MigrationError::InvalidMigrationVersion(m.version))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
