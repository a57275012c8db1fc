//! Parsers for external YAML inputs.
//!
//! - **`kubeconfig`** – extracts named contexts from a kube-config and computes
//!   which of them the user has not acknowledged yet.
//! - **`helm`** – best-effort reader for Helm's `repositories.yaml`.
//!
//! Both operate on text; reading the files is the caller's job.

pub mod helm;
pub mod kubeconfig;
