//! Host capabilities the store needs from the surrounding application.
//!
//! The store never reaches for process-wide globals.  Everything OS-specific
//! it needs is behind [`HostCapabilities`] and injected at construction:
//!
//! - registering (or unregistering) the app to start at login, and
//! - locating the per-user data directory.
//!
//! # Testability
//!
//! Unit tests use the `mockall`-generated `MockHostCapabilities`; integration
//! tests use [`mock::RecordingHost`], which records every autostart call.

use std::path::PathBuf;

use thiserror::Error;

pub mod desktop;
pub mod mock;

/// Arguments the app is launched with when started at login.
pub const HIDDEN_LAUNCH_ARGS: &[&str] = &["--hidden"];

/// Error type for host capability calls.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("I/O error writing autostart entry at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("autostart is not supported on {0}")]
    Unsupported(&'static str),
}

/// OS integration points consumed by the store.
#[cfg_attr(test, mockall::automock)]
pub trait HostCapabilities: Send + Sync {
    /// Registers the app to start at login (`enabled`) or removes the
    /// registration.  `hidden_on_start` asks the host to start without a
    /// window; `launch_args` are passed to the process.
    ///
    /// May perform blocking file-system I/O; async callers should run it on
    /// the blocking pool.
    fn set_autostart(
        &self,
        enabled: bool,
        hidden_on_start: bool,
        launch_args: &[String],
    ) -> Result<(), HostError>;

    /// Per-user data directory, if the platform has one.
    fn user_data_dir(&self) -> Option<PathBuf>;
}
