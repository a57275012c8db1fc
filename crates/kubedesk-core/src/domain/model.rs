//! Store schema: the shape written to `user-store.toml`.
//!
//! Two views of the same data live here:
//!
//! - [`StoreModel`] – the complete, always-valid live state.  Every field has
//!   a value; the preferences store never exposes a half-initialised model.
//! - [`PersistedStore`] – what was actually found on disk.  Every field is
//!   optional so that an older or hand-edited file can omit keys.  Hydration
//!   merges a `PersistedStore` *into* a `StoreModel` via [`StoreModel::merge`].
//!
//! # Example document
//!
//! ```toml
//! schema_version = "2.0.0-alpha.3"
//! kube_config_path = "/home/dev/.kube/config"
//! last_seen_app_version = "0.1.0"
//! seen_contexts = ["minikube", "prod-eu"]
//!
//! [preferences]
//! color_theme = "kubedesk-dark"
//! allow_telemetry = false
//!
//! [preferences.hidden_table_columns]
//! pods = ["node", "qos"]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Theme applied on first run and by `reset_theme`.
pub const DEFAULT_COLOR_THEME: &str = "kubedesk-dark";
/// `last_seen_app_version` before the user has acknowledged any release.
pub const DEFAULT_LAST_SEEN_VERSION: &str = "0.0.0";
/// Binary download mirror used unless the user picks another one.
pub const DEFAULT_DOWNLOAD_MIRROR: &str = "default";
/// Timezone used for timestamps until the user picks one.
pub const DEFAULT_LOCALE_TIMEZONE: &str = "UTC";
/// Download mirrors the UI offers.
pub const KNOWN_DOWNLOAD_MIRRORS: &[&str] = &["default", "china"];

// ── Live model ────────────────────────────────────────────────────────────────

/// Complete live state of the preferences store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreModel {
    /// Location of the user's kube-config.  Never empty.
    pub kube_config_path: PathBuf,
    /// Last application version whose "what's new" the user acknowledged.
    pub last_seen_app_version: String,
    /// Context names the user has already been shown.
    pub seen_contexts: BTreeSet<String>,
    pub preferences: PreferenceBag,
}

impl StoreModel {
    /// Creates the first-run model.  `kube_config_path` is the platform default
    /// resolved by the caller.
    pub fn new(kube_config_path: PathBuf) -> Self {
        Self {
            kube_config_path,
            last_seen_app_version: DEFAULT_LAST_SEEN_VERSION.to_string(),
            seen_contexts: BTreeSet::new(),
            preferences: PreferenceBag::default(),
        }
    }

    /// Merges a partial persisted object into this model.
    ///
    /// Fields absent from `partial` keep their current value.  `preferences` is
    /// merged key by key, so a preference bag written by an older build does
    /// not wipe keys it never knew about.  An empty `kube_config_path` is
    /// ignored so the path is never blank.
    pub fn merge(&mut self, partial: PersistedStore) {
        if let Some(path) = partial.kube_config_path {
            if !path.as_os_str().is_empty() {
                self.kube_config_path = path;
            }
        }
        if let Some(version) = partial.last_seen_app_version {
            self.last_seen_app_version = version;
        }
        if let Some(seen) = partial.seen_contexts {
            self.seen_contexts = seen;
        }
        if let Some(patch) = partial.preferences {
            self.preferences.apply(patch);
        }
    }

    /// Serialises the model into a TOML table tagged with `schema_version`.
    pub fn to_document(&self, schema_version: &str) -> Result<toml::Table, toml::ser::Error> {
        let mut doc = toml::Table::try_from(self)?;
        doc.insert(
            crate::migration::SCHEMA_VERSION_KEY.to_string(),
            toml::Value::String(schema_version.to_string()),
        );
        Ok(doc)
    }
}

/// User preferences.  Every field is independently defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceBag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    /// Shell override for terminals; see `resolved_shell` in the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    pub color_theme: String,
    pub locale_timezone: String,
    pub allow_untrusted_cas: bool,
    pub allow_telemetry: bool,
    pub download_mirror: String,
    pub download_kubectl_binaries: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_binaries_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl_binary_path: Option<String>,
    pub open_at_login: bool,
    /// Table id → ordered list of hidden column names.
    pub hidden_table_columns: BTreeMap<String, Vec<String>>,
}

impl Default for PreferenceBag {
    fn default() -> Self {
        Self {
            http_proxy: None,
            shell: None,
            color_theme: DEFAULT_COLOR_THEME.to_string(),
            locale_timezone: DEFAULT_LOCALE_TIMEZONE.to_string(),
            allow_untrusted_cas: false,
            allow_telemetry: true,
            download_mirror: DEFAULT_DOWNLOAD_MIRROR.to_string(),
            download_kubectl_binaries: true,
            download_binaries_path: None,
            kubectl_binary_path: None,
            open_at_login: false,
            hidden_table_columns: BTreeMap::new(),
        }
    }
}

impl PreferenceBag {
    /// Overwrites every key present in `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: PreferencePatch) {
        if let Some(v) = patch.http_proxy {
            self.http_proxy = Some(v);
        }
        if let Some(v) = patch.shell {
            self.shell = Some(v);
        }
        if let Some(v) = patch.color_theme {
            self.color_theme = v;
        }
        if let Some(v) = patch.locale_timezone {
            self.locale_timezone = v;
        }
        if let Some(v) = patch.allow_untrusted_cas {
            self.allow_untrusted_cas = v;
        }
        if let Some(v) = patch.allow_telemetry {
            self.allow_telemetry = v;
        }
        if let Some(v) = patch.download_mirror {
            self.download_mirror = v;
        }
        if let Some(v) = patch.download_kubectl_binaries {
            self.download_kubectl_binaries = v;
        }
        if let Some(v) = patch.download_binaries_path {
            self.download_binaries_path = Some(v);
        }
        if let Some(v) = patch.kubectl_binary_path {
            self.kubectl_binary_path = Some(v);
        }
        if let Some(v) = patch.open_at_login {
            self.open_at_login = v;
        }
        if let Some(v) = patch.hidden_table_columns {
            self.hidden_table_columns = v;
        }
    }

    /// Returns `true` when `column` is hidden in `table_id`.
    pub fn is_table_column_hidden(&self, table_id: &str, column: &str) -> bool {
        self.hidden_table_columns
            .get(table_id)
            .is_some_and(|cols| cols.iter().any(|c| c == column))
    }
}

// ── On-disk (partial) shape ───────────────────────────────────────────────────

/// The store document as read from disk, after migrations.
///
/// Deserialising into this type is the schema check: a document whose keys
/// have the wrong type is rejected as a whole.  Unknown keys (including
/// `schema_version`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PersistedStore {
    pub kube_config_path: Option<PathBuf>,
    pub last_seen_app_version: Option<String>,
    pub seen_contexts: Option<BTreeSet<String>>,
    pub preferences: Option<PreferencePatch>,
}

impl TryFrom<toml::Table> for PersistedStore {
    type Error = toml::de::Error;

    fn try_from(doc: toml::Table) -> Result<Self, Self::Error> {
        toml::Value::Table(doc).try_into()
    }
}

/// A sparse set of preference keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencePatch {
    pub http_proxy: Option<String>,
    pub shell: Option<String>,
    pub color_theme: Option<String>,
    pub locale_timezone: Option<String>,
    pub allow_untrusted_cas: Option<bool>,
    pub allow_telemetry: Option<bool>,
    pub download_mirror: Option<String>,
    pub download_kubectl_binaries: Option<bool>,
    pub download_binaries_path: Option<String>,
    pub kubectl_binary_path: Option<String>,
    pub open_at_login: Option<bool>,
    pub hidden_table_columns: Option<BTreeMap<String, Vec<String>>>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
