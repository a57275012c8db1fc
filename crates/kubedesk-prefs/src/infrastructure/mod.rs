//! Infrastructure layer for the preferences store.
//!
//! Contains OS-facing adapters: the store file on disk, kube-config and Helm
//! config readers, platform path resolution, and the host capability used for
//! autostart registration.
//!
//! **Dependency rule**: this layer may depend on `kubedesk_core`, but MUST NOT
//! import the `application` layer.

pub mod helm_config;
pub mod host;
pub mod kubeconfig_source;
pub mod platform;
pub mod storage;
