//! Context diff engine: reads a kube-config file and tracks which read
//! generation has settled.
//!
//! The engine does no bookkeeping of seen contexts itself; that lives in
//! [`PreferenceModel`](super::preferences::PreferenceModel).  It only turns a
//! path into a context list and broadcasts "generation N is done" so callers
//! can await the first sync.

use std::path::Path;
use std::sync::Arc;

use kubedesk_core::{parse_contexts, KubeConfigError, KubeContext};
use tokio::sync::watch;
use tracing::debug;

use crate::infrastructure::kubeconfig_source::KubeConfigSource;

/// Reads kube-config files and publishes settled read generations.
pub struct ContextDiffEngine {
    source: Arc<dyn KubeConfigSource>,
    settled: watch::Sender<u64>,
}

impl ContextDiffEngine {
    pub fn new(source: Arc<dyn KubeConfigSource>) -> Self {
        let (settled, _) = watch::channel(0);
        Self { source, settled }
    }

    /// Reads and parses the context list at `path`.
    pub async fn read_contexts(&self, path: &Path) -> Result<Vec<KubeContext>, KubeConfigError> {
        let text = self
            .source
            .read_file(path)
            .await
            .map_err(|source| KubeConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let contexts = parse_contexts(&text)?;
        debug!(path = %path.display(), count = contexts.len(), "read kube-config contexts");
        Ok(contexts)
    }

    /// Marks generation `ticket` as settled.  The published value never goes
    /// backwards.
    pub fn settle(&self, ticket: u64) {
        self.settled.send_if_modified(|current| {
            if ticket > *current {
                *current = ticket;
                true
            } else {
                false
            }
        });
    }

    /// Newest settled generation.
    pub fn settled(&self) -> u64 {
        *self.settled.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.settled.subscribe()
    }
}

impl std::fmt::Debug for ContextDiffEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextDiffEngine")
            .field("settled", &self.settled())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
