//! UserStore: the persistent, reactive preferences store.
//!
//! `UserStore` ties the pieces together:
//!
//! ```text
//!  load():  StoreFile ──► run_migrations ──► PersistedStore ──► PreferenceModel
//!                                                               │
//!  mutators ──► PreferenceModel::mutate ──► Change ─────────────┤
//!                                            │                  │
//!                     ┌──────────────────────┼─────────────┐    │
//!                     ▼                      ▼             ▼    ▼
//!                 EventBus           HostCapabilities   ContextDiffEngine
//!               (telemetry)           (autostart)      (kube-config read)
//!                                                               │
//!  writer task ◄── save signal ◄── persisted change ◄───────────┘
//! ```
//!
//! # Load barrier
//!
//! The store starts with hydration defaults.  [`UserStore::load`] reads the
//! backing file, migrates it, and resolves the barrier; every mutator awaits
//! [`UserStore::when_loaded`] first, so nothing written before hydration can be
//! clobbered by it.  Getters never wait: before the barrier they report the
//! defaults.
//!
//! # Write-through
//!
//! Every persisted change sends a signal to a background writer.  The writer
//! sleeps for the debounce window, drains any signals that piled up, and
//! writes the latest snapshot.  Bursts of edits become one write; the state
//! after the last edit is always written.
//!
//! # Locking
//!
//! State lives behind a `std::sync::Mutex` that is only held for synchronous
//! sections and never across an `.await`.  Writes are serialized by an async
//! `write_lock`; the snapshot is taken while holding it so a later write never
//! carries older state than an earlier one.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use kubedesk_core::migration::latest_version;
use kubedesk_core::{
    run_migrations, AppEvent, MigrationError, PersistedStore, PreferenceBag, StoreModel,
    STORE_MIGRATIONS,
};
use semver::Version;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::context_diff::ContextDiffEngine;
use super::dispatcher::EventBus;
use super::options::StoreOptions;
use super::preferences::{Change, PreferenceModel, Reaction};
use crate::infrastructure::host::{HostCapabilities, HIDDEN_LAUNCH_ARGS};
use crate::infrastructure::kubeconfig_source::KubeConfigSource;
use crate::infrastructure::platform;
use crate::infrastructure::storage::store_file::{StorageError, StoreFile};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The stored document could not be upgraded.  Fatal at startup.
    #[error("store migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("failed to serialise store: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The preferences store.  Construct once per process with [`UserStore::new`]
/// and share the returned `Arc`.
pub struct UserStore {
    options: StoreOptions,
    file: StoreFile,
    host: Arc<dyn HostCapabilities>,
    bus: Arc<EventBus>,
    contexts: ContextDiffEngine,
    state: Mutex<PreferenceModel>,
    schema_version: Mutex<Version>,
    loaded: watch::Sender<bool>,
    save_tx: mpsc::UnboundedSender<()>,
    save_rx: Mutex<Option<mpsc::UnboundedReceiver<()>>>,
    write_lock: tokio::sync::Mutex<()>,
    load_lock: tokio::sync::Mutex<()>,
    me: Weak<UserStore>,
}

impl UserStore {
    /// Creates an unloaded store.  Call [`UserStore::load`] next.
    pub fn new(
        options: StoreOptions,
        host: Arc<dyn HostCapabilities>,
        source: Arc<dyn KubeConfigSource>,
        bus: Arc<EventBus>,
    ) -> Arc<Self> {
        let (loaded, _) = watch::channel(false);
        let (save_tx, save_rx) = mpsc::unbounded_channel();
        let state = PreferenceModel::new(
            options.default_kube_config_path.clone(),
            options.app_version.clone(),
        );

        Arc::new_cyclic(|me| Self {
            file: StoreFile::new(options.data_dir.clone()),
            options,
            host,
            bus,
            contexts: ContextDiffEngine::new(source),
            state: Mutex::new(state),
            schema_version: Mutex::new(Version::new(0, 0, 0)),
            loaded,
            save_tx,
            save_rx: Mutex::new(Some(save_rx)),
            write_lock: tokio::sync::Mutex::new(()),
            load_lock: tokio::sync::Mutex::new(()),
            me: me.clone(),
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Hydrates the store from disk and resolves the load barrier.
    ///
    /// A missing, unreadable, or malformed file yields the defaults.  Calling
    /// `load` again after success is a no-op, including while a first call is
    /// still running: concurrent calls are serialized and only one hydrates.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if a migration step rejects the
    /// stored document.  The barrier then stays unresolved.
    pub async fn load(&self) -> Result<(), StoreError> {
        let _guard = self.load_lock.lock().await;
        if self.is_loaded() {
            return Ok(());
        }

        self.file.relocate_legacy().await;
        let latest = latest_version(STORE_MIGRATIONS)?;

        let (partial, migrated, schema_version) = match self.file.read_document().await {
            None => (None, false, latest),
            Some(doc) => match run_migrations(doc, STORE_MIGRATIONS) {
                Ok(outcome) => match PersistedStore::try_from(outcome.document) {
                    Ok(partial) => (
                        Some(partial),
                        !outcome.applied.is_empty(),
                        outcome.schema_version,
                    ),
                    Err(e) => {
                        warn!(
                            "store file {} failed validation: {e}; using defaults",
                            self.file.path().display()
                        );
                        (None, false, latest)
                    }
                },
                Err(MigrationError::InvalidSchemaVersion { raw }) => {
                    warn!("store file has invalid schema_version {raw:?}; using defaults");
                    (None, false, latest)
                }
                Err(e) => {
                    error!("store migration failed: {e}");
                    return Err(e.into());
                }
            },
        };

        if let Some(partial) = partial {
            self.lock_state().merge_from_store(partial);
        }
        *self
            .schema_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = schema_version;
        self.loaded.send_replace(true);
        info!("preferences loaded from {}", self.file.path().display());

        self.spawn_writer();
        if migrated {
            self.request_save();
        }

        let open_at_login = self.lock_state().model().preferences.open_at_login;
        self.apply_autostart(open_at_login).await;

        let (ticket, path) = self.lock_state().begin_context_read();
        self.spawn_context_read(ticket, path);
        Ok(())
    }

    /// Resolves once [`UserStore::load`] has succeeded.
    pub async fn when_loaded(&self) {
        let mut rx = self.loaded.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|loaded| *loaded).await;
    }

    pub fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    /// Resolves once the newest kube-config read issued so far has settled.
    pub async fn when_contexts_synced(&self) {
        self.when_loaded().await;
        let target = self.lock_state().read_generation();
        let mut rx = self.contexts.subscribe();
        let _ = rx.wait_for(|settled| *settled >= target).await;
    }

    /// Writes the current state now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialisation or the file write fails.
    pub async fn save(&self) -> Result<(), StoreError> {
        self.when_loaded().await;
        self.write_snapshot().await
    }

    /// Writes the current state immediately, ahead of any pending debounced
    /// write.  Used at shutdown.
    pub async fn flush(&self) -> Result<(), StoreError> {
        if !self.is_loaded() {
            debug!("flush skipped: store never loaded");
            return Ok(());
        }
        self.write_snapshot().await?;
        info!("preferences flushed to {}", self.file.path().display());
        Ok(())
    }

    // ── Getters ───────────────────────────────────────────────────────────────

    /// A copy of the full persisted model.
    pub fn snapshot(&self) -> StoreModel {
        self.lock_state().model().clone()
    }

    pub fn preferences(&self) -> PreferenceBag {
        self.lock_state().model().preferences.clone()
    }

    pub fn kube_config_path(&self) -> PathBuf {
        self.lock_state().model().kube_config_path.clone()
    }

    pub fn seen_contexts(&self) -> BTreeSet<String> {
        self.lock_state().model().seen_contexts.clone()
    }

    pub fn new_contexts(&self) -> BTreeSet<String> {
        self.lock_state().new_contexts().clone()
    }

    pub fn is_new_version(&self) -> bool {
        self.lock_state().is_new_version()
    }

    pub fn app_version(&self) -> &Version {
        &self.options.app_version
    }

    /// The shell preference, else the platform default shell.
    pub fn resolved_shell(&self) -> String {
        match self.lock_state().model().preferences.shell.as_deref() {
            Some(shell) if !shell.trim().is_empty() => shell.to_string(),
            _ => platform::default_shell(),
        }
    }

    pub fn is_table_column_hidden(&self, table_id: &str, column: &str) -> bool {
        self.lock_state()
            .model()
            .preferences
            .is_table_column_hidden(table_id, column)
    }

    /// Hidden columns of `table_id` in the order they were set.
    pub fn hidden_columns(&self, table_id: &str) -> Vec<String> {
        self.lock_state()
            .model()
            .preferences
            .hidden_table_columns
            .get(table_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Full path of the backing file.
    pub fn store_path(&self) -> PathBuf {
        self.file.path()
    }

    // ── Mutators ──────────────────────────────────────────────────────────────

    pub async fn set_hidden_columns(&self, table_id: &str, names: Vec<String>) {
        self.update(|m| m.set_hidden_columns(table_id, names)).await;
    }

    pub async fn toggle_table_column(&self, table_id: &str, column: &str) {
        self.update(|m| m.toggle_table_column(table_id, column)).await;
    }

    pub async fn set_kube_config_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.update(|m| m.set_kube_config_path(path)).await;
    }

    pub async fn reset_kube_config_path(&self) {
        self.update(PreferenceModel::reset_kube_config_path).await;
    }

    pub async fn reset_theme(&self) {
        self.update(PreferenceModel::reset_theme).await;
    }

    pub async fn set_color_theme(&self, theme_id: impl Into<String>) {
        let theme_id = theme_id.into();
        self.update(|m| m.mutate(|s| s.preferences.color_theme = theme_id))
            .await;
    }

    /// Unknown mirror names fall back to the default mirror.
    pub async fn set_download_mirror(&self, mirror: impl Into<String>) {
        let mirror = mirror.into();
        self.update(|m| m.set_download_mirror(&mirror)).await;
    }

    pub async fn set_locale_timezone(&self, tz: impl Into<String>) {
        let tz = tz.into();
        self.update(|m| m.mutate(|s| s.preferences.locale_timezone = tz))
            .await;
    }

    pub async fn set_allow_telemetry(&self, allowed: bool) {
        self.update(|m| m.mutate(|s| s.preferences.allow_telemetry = allowed))
            .await;
    }

    pub async fn set_open_at_login(&self, enabled: bool) {
        self.update(|m| m.mutate(|s| s.preferences.open_at_login = enabled))
            .await;
    }

    /// Edits any preference keys in one step.  Reactions fire for whichever
    /// watched keys actually changed.
    pub async fn update_preferences<F>(&self, edit: F)
    where
        F: FnOnce(&mut PreferenceBag) + Send,
    {
        self.update(|m| m.mutate(|s| edit(&mut s.preferences))).await;
    }

    /// Publishes `app:whats-new-seen` and records the running version as
    /// acknowledged.
    pub async fn save_last_seen_app_version(&self) {
        self.when_loaded().await;
        self.bus.publish(&AppEvent::WhatsNewSeen {
            version: self.options.app_version.to_string(),
        });
        self.update(PreferenceModel::save_last_seen_app_version)
            .await;
    }

    /// Moves every new context into the seen set.  Idempotent.
    pub async fn mark_acknowledged(&self) {
        self.update(PreferenceModel::mark_acknowledged).await;
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    async fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut PreferenceModel) -> Change + Send,
    {
        self.when_loaded().await;
        let change = edit(&mut self.lock_state());
        self.react(change).await;
    }

    async fn react(&self, change: Change) {
        for reaction in change.reactions {
            match reaction {
                Reaction::TelemetryChanged(enabled) => {
                    self.bus.publish(&AppEvent::telemetry(enabled));
                }
                Reaction::OpenAtLoginChanged(enabled) => self.apply_autostart(enabled).await,
                Reaction::RefreshContexts { ticket, path } => {
                    self.spawn_context_read(ticket, path);
                }
            }
        }
        if change.persisted {
            self.request_save();
        }
    }

    /// Host autostart calls touch the file system synchronously, so they run
    /// on the blocking pool.
    async fn apply_autostart(&self, enabled: bool) {
        let host = Arc::clone(&self.host);
        let args: Vec<String> = HIDDEN_LAUNCH_ARGS.iter().map(|a| a.to_string()).collect();
        let result =
            tokio::task::spawn_blocking(move || host.set_autostart(enabled, true, &args)).await;
        match result {
            Ok(Ok(())) => debug!(enabled, "autostart registration updated"),
            Ok(Err(e)) => warn!("could not update autostart registration: {e}"),
            Err(e) => warn!("autostart registration task failed: {e}"),
        }
    }

    fn spawn_context_read(&self, ticket: u64, path: PathBuf) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move { me.refresh_contexts(ticket, path).await });
    }

    /// Reads the kube-config for `ticket`.  A failed read resets the path to
    /// the default and reads again under the new ticket.
    async fn refresh_contexts(&self, mut ticket: u64, mut path: PathBuf) {
        loop {
            let result = self.contexts.read_contexts(&path).await;

            let change = {
                let mut state = self.lock_state();
                if !state.is_current_read(ticket) {
                    debug!(ticket, "discarding stale kube-config read of {}", path.display());
                    return;
                }
                match result {
                    Ok(contexts) => {
                        state.apply_contexts(&contexts);
                        None
                    }
                    Err(e) => {
                        warn!(
                            "could not load kube-config {}: {e}; resetting to default",
                            path.display()
                        );
                        state.clear_new_contexts();
                        Some(state.reset_kube_config_path())
                    }
                }
            };

            let Some(change) = change else {
                self.contexts.settle(ticket);
                return;
            };
            if change.persisted {
                self.request_save();
            }
            let next = change.reactions.into_iter().find_map(|r| match r {
                Reaction::RefreshContexts { ticket, path } => Some((ticket, path)),
                _ => None,
            });
            match next {
                Some((next_ticket, next_path)) => {
                    ticket = next_ticket;
                    path = next_path;
                }
                None => {
                    self.contexts.settle(ticket);
                    return;
                }
            }
        }
    }

    fn request_save(&self) {
        // The receiver lives as long as the writer task, which outlives `self`.
        let _ = self.save_tx.send(());
    }

    fn spawn_writer(&self) {
        let Some(rx) = self
            .save_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        tokio::spawn(run_writer(self.me.clone(), rx, self.options.write_debounce));
    }

    async fn write_snapshot(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let doc = {
            let schema_version = self
                .schema_version
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .to_string();
            self.lock_state().model().to_document(&schema_version)?
        };
        self.file.write_document(&doc).await?;
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, PreferenceModel> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("path", &self.file.path())
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

/// Coalescing writer: one write per quiet window.
async fn run_writer(
    store: Weak<UserStore>,
    mut rx: mpsc::UnboundedReceiver<()>,
    debounce: Duration,
) {
    while rx.recv().await.is_some() {
        tokio::time::sleep(debounce).await;
        while rx.try_recv().is_ok() {}

        let Some(store) = store.upgrade() else {
            break;
        };
        match store.write_snapshot().await {
            Ok(()) => debug!("preferences written to {}", store.file.path().display()),
            Err(e) => error!("failed to write preferences: {e}"),
        }
    }
    debug!("preference writer stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
