//! Platform-specific default locations.
//!
//! | What                  | Windows                              | Linux                                   | macOS                                         |
//! |-----------------------|--------------------------------------|-----------------------------------------|-----------------------------------------------|
//! | data directory        | `%APPDATA%\Kubedesk`                 | `$XDG_CONFIG_HOME/kubedesk`             | `~/Library/Application Support/Kubedesk`      |
//! | kube-config           | `%USERPROFILE%\.kube\config`         | `~/.kube/config`                        | `~/.kube/config`                              |
//! | Helm repositories     | `%APPDATA%\helm\repositories.yaml`   | `$XDG_CONFIG_HOME/helm/repositories.yaml` | `~/Library/Preferences/helm/repositories.yaml` |
//!
//! `KUBECONFIG` and `HELM_REPOSITORY_CONFIG` override the last two.

use std::path::PathBuf;

/// Resolves the user's home directory.
pub fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

/// Directory holding `user-store.toml`.
pub fn data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Kubedesk"))
    }

    #[cfg(target_os = "macos")]
    {
        home_dir().map(|h| h.join("Library").join("Application Support").join("Kubedesk"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        xdg_config_home().map(|base| base.join("kubedesk"))
    }
}

/// Default kube-config location.
///
/// The first entry of a multi-path `KUBECONFIG` wins.  Falls back to a
/// relative `.kube/config` so the path is never empty.
pub fn default_kube_config_path() -> PathBuf {
    if let Some(first) = std::env::var_os("KUBECONFIG")
        .as_ref()
        .and_then(|v| std::env::split_paths(v).find(|p| !p.as_os_str().is_empty()))
    {
        return first;
    }
    home_dir()
        .unwrap_or_default()
        .join(".kube")
        .join("config")
}

/// Default location of Helm's `repositories.yaml`.
pub fn default_helm_repo_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("HELM_REPOSITORY_CONFIG") {
        return Some(PathBuf::from(path));
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("helm").join("repositories.yaml"))
    }

    #[cfg(target_os = "macos")]
    {
        home_dir().map(|h| {
            h.join("Library")
                .join("Preferences")
                .join("helm")
                .join("repositories.yaml")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        xdg_config_home().map(|base| base.join("helm").join("repositories.yaml"))
    }
}

/// Shell used for terminals when the user has not picked one.
pub fn default_shell() -> String {
    #[cfg(target_os = "windows")]
    {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
}

/// `$XDG_CONFIG_HOME`, or `~/.config`.
pub fn xdg_config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir().map(|h| h.join(".config")))
}
