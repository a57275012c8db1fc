//! Construction options for [`UserStore`](super::user_store::UserStore).

use std::path::PathBuf;
use std::time::Duration;

use semver::Version;

use crate::infrastructure::platform;

/// Quiet period before coalesced mutations are written to disk.
pub const DEFAULT_WRITE_DEBOUNCE: Duration = Duration::from_millis(200);

/// Everything the store needs to know about its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Directory holding `user-store.toml`.
    pub data_dir: PathBuf,
    /// Path restored by `reset_kube_config_path` and used when none is stored.
    pub default_kube_config_path: PathBuf,
    /// Version of the running application build.
    pub app_version: Version,
    pub write_debounce: Duration,
}

impl StoreOptions {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        default_kube_config_path: impl Into<PathBuf>,
        app_version: Version,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            default_kube_config_path: default_kube_config_path.into(),
            app_version,
            write_debounce: DEFAULT_WRITE_DEBOUNCE,
        }
    }

    pub fn with_write_debounce(mut self, debounce: Duration) -> Self {
        self.write_debounce = debounce;
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        let data_dir = platform::data_dir().unwrap_or_else(|| PathBuf::from(".kubedesk"));
        let kube_config = platform::default_kube_config_path();
        let app_version =
            Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0));
        Self::new(data_dir, kube_config, app_version)
    }
}
