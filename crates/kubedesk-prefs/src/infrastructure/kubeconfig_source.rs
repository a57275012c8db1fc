//! Kube-config file access.
//!
//! The [`KubeConfigSource`] trait lets tests substitute in-memory or gated
//! sources; production uses [`FsKubeConfigSource`], which reads through
//! `tokio::fs` so the runtime is never blocked on a slow network home
//! directory.

use std::path::Path;

use async_trait::async_trait;

/// Reads kube-config text from wherever it lives.
#[async_trait]
pub trait KubeConfigSource: Send + Sync {
    /// Returns the full text of the kube-config at `path`.
    async fn read_file(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads kube-configs from the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsKubeConfigSource;

#[async_trait]
impl KubeConfigSource for FsKubeConfigSource {
    async fn read_file(&self, path: &Path) -> std::io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}
