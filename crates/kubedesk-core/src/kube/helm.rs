//! Best-effort reader for Helm's `repositories.yaml`.
//!
//! Parsing is a two-stage contract: attempt a full parse, and on *any*
//! failure return the empty config.  A half-parsed repository list is never
//! returned.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

/// Contents of Helm's repository config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmRepoConfig {
    #[serde(default)]
    pub repositories: Vec<HelmRepo>,
}

/// One configured chart repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmRepo {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, rename = "caFile", skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<String>,
    #[serde(default, rename = "certFile", skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<String>,
    #[serde(default, rename = "keyFile", skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
    #[serde(default)]
    pub pass_credentials_all: bool,
}

impl HelmRepoConfig {
    /// Parses `text`, returning the empty config on any failure or when the
    /// document root is not a mapping.
    pub fn parse_or_empty(text: &str) -> Self {
        let doc: Value = match serde_yaml::from_str(text) {
            Ok(doc) => doc,
            Err(e) => {
                debug!("helm repository config is not valid YAML: {e}");
                return Self::default();
            }
        };
        if !doc.is_mapping() {
            debug!("helm repository config root is not a mapping");
            return Self::default();
        }
        serde_yaml::from_value(doc).unwrap_or_else(|e| {
            debug!("helm repository config has an unexpected shape: {e}");
            Self::default()
        })
    }
}
