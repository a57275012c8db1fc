//! Recording host for integration tests.
//!
//! Records every autostart registration without touching the OS.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use super::{HostCapabilities, HostError};

/// One recorded `set_autostart` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutostartCall {
    pub enabled: bool,
    pub hidden_on_start: bool,
    pub launch_args: Vec<String>,
}

/// A [`HostCapabilities`] implementation that records calls.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<AutostartCall>>,
    data_dir: Option<PathBuf>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host whose `user_data_dir` is `dir`.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            data_dir: Some(dir.into()),
        }
    }

    /// Every recorded autostart call, oldest first.
    pub fn autostart_calls(&self) -> Vec<AutostartCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl HostCapabilities for RecordingHost {
    fn set_autostart(
        &self,
        enabled: bool,
        hidden_on_start: bool,
        launch_args: &[String],
    ) -> Result<(), HostError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(AutostartCall {
            enabled,
            hidden_on_start,
            launch_args: launch_args.to_vec(),
        });
        Ok(())
    }

    fn user_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone()
    }
}
