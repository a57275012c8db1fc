//! Kubedesk preferences service entry point.
//!
//! Loads the user's preference store, reports what it found, and keeps the
//! store alive (tracking kube-config changes and writing edits back) until
//! Ctrl+C, when it flushes to disk and exits.
//!
//! # Usage
//!
//! ```text
//! kubedesk-prefs [OPTIONS]
//!
//! Options:
//!   --data-dir <DIR>            Directory holding user-store.toml
//!   --kubeconfig <PATH>         Default kube-config path
//!   --write-debounce-ms <MS>    Quiet period before writes [default: 200]
//!   --acknowledge-contexts      Mark new contexts as seen, save, and exit
//!   --list-helm-repos           Print configured Helm repositories as JSON and exit
//!   --helm-config <PATH>        Helm repositories.yaml to read
//!   --hidden                    Started at login; accepted and ignored
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                      | Description                         |
//! |-------------------------------|-------------------------------------|
//! | `KUBEDESK_DATA_DIR`           | Directory holding `user-store.toml` |
//! | `KUBEDESK_KUBECONFIG`         | Default kube-config path            |
//! | `KUBEDESK_WRITE_DEBOUNCE_MS`  | Write debounce in milliseconds      |
//! | `KUBEDESK_HELM_CONFIG`        | Helm `repositories.yaml` path       |
//!
//! CLI args take precedence when both are present.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kubedesk_prefs::application::dispatcher::EventBus;
use kubedesk_prefs::application::options::StoreOptions;
use kubedesk_prefs::application::user_store::UserStore;
use kubedesk_prefs::infrastructure::helm_config::read_helm_config;
use kubedesk_prefs::infrastructure::host::desktop::DesktopHost;
use kubedesk_prefs::infrastructure::host::HostCapabilities;
use kubedesk_prefs::infrastructure::kubeconfig_source::FsKubeConfigSource;
use kubedesk_prefs::infrastructure::platform;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Kubedesk user-preferences store.
#[derive(Debug, Parser)]
#[command(
    name = "kubedesk-prefs",
    about = "Persistent, reactive user preferences for Kubedesk",
    version
)]
struct Cli {
    /// Directory holding `user-store.toml`.
    ///
    /// Defaults to the platform data directory.
    #[arg(long, env = "KUBEDESK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Kube-config path used when none is stored and restored on reset.
    #[arg(long, env = "KUBEDESK_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Quiet period in milliseconds before coalesced edits are written.
    #[arg(long, default_value_t = 200, env = "KUBEDESK_WRITE_DEBOUNCE_MS")]
    write_debounce_ms: u64,

    /// Mark every newly discovered context as seen, save, and exit.
    #[arg(long)]
    acknowledge_contexts: bool,

    /// Print the configured Helm repositories as JSON and exit.
    #[arg(long)]
    list_helm_repos: bool,

    /// Helm `repositories.yaml` to read with `--list-helm-repos`.
    #[arg(long, env = "KUBEDESK_HELM_CONFIG")]
    helm_config: Option<PathBuf>,

    /// Passed by the login autostart entry.
    #[arg(long)]
    hidden: bool,
}

impl Cli {
    /// Converts the parsed CLI arguments into [`StoreOptions`].
    fn store_options(&self, host: &dyn HostCapabilities) -> anyhow::Result<StoreOptions> {
        let defaults = StoreOptions::default();
        let data_dir = self
            .data_dir
            .clone()
            .or_else(|| host.user_data_dir())
            .context("no data directory: pass --data-dir or set KUBEDESK_DATA_DIR")?;
        let kube_config = self
            .kubeconfig
            .clone()
            .unwrap_or(defaults.default_kube_config_path);

        Ok(StoreOptions::new(data_dir, kube_config, defaults.app_version)
            .with_write_debounce(Duration::from_millis(self.write_debounce_ms)))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_helm_repos {
        return list_helm_repos(cli.helm_config.clone()).await;
    }

    let executable = std::env::current_exe().context("cannot resolve current executable")?;
    let host = Arc::new(DesktopHost::new(executable));
    let options = cli.store_options(host.as_ref())?;
    info!(
        "Kubedesk preferences v{} starting (data dir {}, hidden: {})",
        options.app_version,
        options.data_dir.display(),
        cli.hidden
    );

    let bus = Arc::new(EventBus::new());
    bus.subscribe(|event| info!(event = %event.name(), payload = %event.payload(), "app event"));

    // The only store instance in this process.
    let store = UserStore::new(options, host, Arc::new(FsKubeConfigSource), bus);
    store
        .load()
        .await
        .with_context(|| format!("failed to load {}", store.store_path().display()))?;
    store.when_contexts_synced().await;

    info!(
        "kube-config {}: {} new context(s), {} seen",
        store.kube_config_path().display(),
        store.new_contexts().len(),
        store.seen_contexts().len()
    );
    if store.is_new_version() {
        info!("running a version newer than the last one acknowledged");
    }

    if cli.acknowledge_contexts {
        let acknowledged = store.new_contexts();
        store.mark_acknowledged().await;
        store.flush().await.context("failed to save preferences")?;
        for name in acknowledged {
            println!("{name}");
        }
        return Ok(());
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Ctrl+C received, shutting down");

    store.flush().await.context("failed to save preferences")?;
    Ok(())
}

async fn list_helm_repos(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path
        .or_else(platform::default_helm_repo_config_path)
        .context("no Helm config location: pass --helm-config")?;
    let config = read_helm_config(&path).await;
    info!(
        "{} Helm repositories in {}",
        config.repositories.len(),
        path.display()
    );
    let json = serde_json::to_string_pretty(&config).context("failed to render Helm config")?;
    println!("{json}");
    Ok(())
}
