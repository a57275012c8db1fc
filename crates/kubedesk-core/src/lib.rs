//! # kubedesk-core
//!
//! Shared library for the Kubedesk preferences store containing the persisted
//! store schema, the versioned migration pipeline, kube-config context diffing,
//! Helm repository config parsing, and the side-effect event vocabulary.
//!
//! This crate has zero dependencies on OS APIs, async runtimes, or the file
//! system.  Everything here is a pure function of its inputs, which keeps the
//! hardest logic (migrations, set differences, version precedence) testable
//! without any setup.
//!
//! # Architecture overview
//!
//! - **`domain`** – The store schema (`StoreModel`, `PreferenceBag`), the
//!   partial "from disk" shape (`PersistedStore`), semantic-version helpers,
//!   and the events published when watched preferences change.
//!
//! - **`migration`** – Ordered, versioned transforms that bring a raw TOML
//!   document written by an older build up to the current schema.
//!
//! - **`kube`** – Parsers for the two external YAML inputs: the user's
//!   kube-config (named contexts) and Helm's `repositories.yaml`.

pub mod domain;
pub mod kube;
pub mod migration;

// Re-export the most-used types at the crate root so callers can write
// `kubedesk_core::StoreModel` instead of `kubedesk_core::domain::model::StoreModel`.
pub use domain::events::AppEvent;
pub use domain::model::{PersistedStore, PreferenceBag, PreferencePatch, StoreModel};
pub use domain::version::{is_newer, parse_lenient};
pub use kube::helm::{HelmRepo, HelmRepoConfig};
pub use kube::kubeconfig::{diff_new_contexts, parse_contexts, KubeConfigError, KubeContext};
pub use migration::{run_migrations, MigrationError, MigrationOutcome, STORE_MIGRATIONS};
