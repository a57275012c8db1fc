//! Kube-config context extraction and the "new contexts" set difference.
//!
//! Only the `contexts` list of a kube-config matters here:
//!
//! ```yaml
//! contexts:
//!   - name: minikube
//!     context:
//!       cluster: minikube
//!       user: minikube
//!   - name: dangling        # no cluster reference → never offered as new
//!     context:
//!       user: someone
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

/// Error type for kube-config reads.
#[derive(Debug, Error)]
pub enum KubeConfigError {
    /// The file could not be read.
    #[error("failed to read kube-config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid YAML or does not match the kube-config shape.
    #[error("failed to parse kube-config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but its root is not a mapping.
    #[error("kube-config root must be a mapping, found {0}")]
    NotAMapping(&'static str),
}

/// A named context from a kube-config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeContext {
    pub name: String,
    pub cluster: Option<String>,
    pub user: Option<String>,
    pub namespace: Option<String>,
}

impl KubeContext {
    /// Contexts that do not point at a cluster cannot be opened.
    pub fn has_cluster(&self) -> bool {
        self.cluster.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Deserialize)]
struct RawKubeConfig {
    #[serde(default)]
    contexts: Option<Vec<RawNamedContext>>,
}

#[derive(Deserialize)]
struct RawNamedContext {
    name: String,
    #[serde(default)]
    context: Option<RawContext>,
}

#[derive(Deserialize)]
struct RawContext {
    #[serde(default)]
    cluster: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
}

/// Parses the named contexts out of kube-config text.
///
/// An empty document is a valid kube-config with no contexts.
///
/// # Errors
///
/// Returns [`KubeConfigError::Parse`] for invalid YAML or a malformed
/// `contexts` list, and [`KubeConfigError::NotAMapping`] when the root is a
/// scalar or sequence.
pub fn parse_contexts(text: &str) -> Result<Vec<KubeContext>, KubeConfigError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc: Value = serde_yaml::from_str(text)?;
    match &doc {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(_) => {}
        other => return Err(KubeConfigError::NotAMapping(kind(other))),
    }
    let raw: RawKubeConfig = serde_yaml::from_value(doc)?;

    Ok(raw
        .contexts
        .unwrap_or_default()
        .into_iter()
        .map(|named| {
            let ctx = named.context;
            KubeContext {
                name: named.name,
                cluster: ctx.as_ref().and_then(|c| c.cluster.clone()),
                user: ctx.as_ref().and_then(|c| c.user.clone()),
                namespace: ctx.and_then(|c| c.namespace),
            }
        })
        .collect())
}

/// Names of contexts that reference a cluster and are not in `seen`.
pub fn diff_new_contexts<'a, I>(contexts: I, seen: &BTreeSet<String>) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a KubeContext>,
{
    contexts
        .into_iter()
        .filter(|ctx| ctx.has_cluster() && !seen.contains(&ctx.name))
        .map(|ctx| ctx.name.clone())
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
