//! Production host capability.
//!
//! On Linux, login autostart follows the XDG Autostart specification: a
//! `.desktop` entry in `$XDG_CONFIG_HOME/autostart/` is launched by the
//! session manager at login.  Disabling autostart removes the entry.
//!
//! ```ini
//! [Desktop Entry]
//! Type=Application
//! Name=Kubedesk
//! Exec=/usr/bin/kubedesk --hidden
//! X-GNOME-Autostart-enabled=true
//! ```
//!
//! Other platforms report [`HostError::Unsupported`]; the store logs it and
//! carries on.

use std::path::PathBuf;

use tracing::debug;

use super::{HostCapabilities, HostError};
use crate::infrastructure::platform;

/// File name of the autostart entry.
pub const AUTOSTART_ENTRY_NAME: &str = "kubedesk.desktop";

/// Host capability backed by the real desktop session.
#[derive(Debug, Clone)]
pub struct DesktopHost {
    executable: PathBuf,
    autostart_dir: Option<PathBuf>,
}

impl DesktopHost {
    /// Creates a host that launches `executable` at login.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            autostart_dir: platform::xdg_config_home().map(|base| base.join("autostart")),
        }
    }

    /// Overrides the directory autostart entries are written to.
    pub fn with_autostart_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.autostart_dir = Some(dir.into());
        self
    }

    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    fn desktop_entry(&self, hidden_on_start: bool, launch_args: &[String]) -> String {
        let mut exec = quote_exec_arg(&self.executable.to_string_lossy());
        for arg in launch_args {
            exec.push(' ');
            exec.push_str(&quote_exec_arg(arg));
        }
        format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Kubedesk\n\
             Exec={exec}\n\
             StartupNotify={notify}\n\
             X-GNOME-Autostart-enabled=true\n",
            notify = !hidden_on_start,
        )
    }

    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    fn write_autostart_entry(
        &self,
        enabled: bool,
        hidden_on_start: bool,
        launch_args: &[String],
    ) -> Result<(), HostError> {
        let dir = self
            .autostart_dir
            .clone()
            .ok_or(HostError::Unsupported("a session without a config directory"))?;
        let path = dir.join(AUTOSTART_ENTRY_NAME);

        if !enabled {
            return match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("removed autostart entry {}", path.display());
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(HostError::Io { path, source }),
            };
        }

        std::fs::create_dir_all(&dir).map_err(|source| HostError::Io {
            path: dir.clone(),
            source,
        })?;
        std::fs::write(&path, self.desktop_entry(hidden_on_start, launch_args))
            .map_err(|source| HostError::Io {
                path: path.clone(),
                source,
            })?;
        debug!("wrote autostart entry {}", path.display());
        Ok(())
    }
}

impl HostCapabilities for DesktopHost {
    #[cfg_attr(not(target_os = "linux"), allow(unused_variables))]
    fn set_autostart(
        &self,
        enabled: bool,
        hidden_on_start: bool,
        launch_args: &[String],
    ) -> Result<(), HostError> {
        #[cfg(target_os = "linux")]
        {
            self.write_autostart_entry(enabled, hidden_on_start, launch_args)
        }

        #[cfg(not(target_os = "linux"))]
        {
            Err(HostError::Unsupported(std::env::consts::OS))
        }
    }

    fn user_data_dir(&self) -> Option<PathBuf> {
        platform::data_dir()
    }
}

/// Quotes an `Exec=` argument when it contains characters the desktop-entry
/// spec reserves.
fn quote_exec_arg(arg: &str) -> String {
    let needs_quotes = arg
        .chars()
        .any(|c| c.is_whitespace() || "\"'\\><~|&;$*?#()`".contains(c));
    if !needs_quotes {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
