//! Helm repository config reader.
//!
//! Stateless and best-effort: any read or parse failure yields an empty
//! repository list.  Callers never see an error.

use std::path::Path;

use kubedesk_core::HelmRepoConfig;
use tracing::debug;

/// Reads Helm's `repositories.yaml` at `path`.
pub async fn read_helm_config(path: &Path) -> HelmRepoConfig {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => HelmRepoConfig::parse_or_empty(&text),
        Err(e) => {
            debug!("could not read helm repository config {}: {e}", path.display());
            HelmRepoConfig::default()
        }
    }
}
