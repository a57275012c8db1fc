//! Application layer of the preferences store.
//!
//! Use cases in this layer orchestrate the pure domain types from
//! `kubedesk_core` and depend on infrastructure only through traits
//! (`HostCapabilities`, `KubeConfigSource`) so tests can inject doubles.
//!
//! # Sub-modules
//!
//! - **`dispatcher`**   – Process-wide publish/subscribe bus for side effects.
//! - **`preferences`**  – Synchronous state container: every mutation reports
//!   which watched fields actually changed.
//! - **`context_diff`** – Reads the kube-config and tracks read completion.
//! - **`options`**      – Construction-time settings for the store.
//! - **`user_store`**   – The composition: load barrier, write-through,
//!   reactions, and the public mutator API.

pub mod context_diff;
pub mod dispatcher;
pub mod options;
pub mod preferences;
pub mod user_store;
