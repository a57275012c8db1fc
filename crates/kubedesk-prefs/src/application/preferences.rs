//! PreferenceModel: the synchronous, observable state container.
//!
//! The model owns the live [`StoreModel`] plus the derived `new_contexts` set.
//! It is plain data with no I/O and no locking; `UserStore` wraps it in a
//! mutex and performs the side effects.
//!
//! # Change detection
//!
//! Every mutation goes through [`PreferenceModel::mutate`], which snapshots
//! the watched fields before and after the edit and reports a [`Change`]:
//!
//! ```text
//! before ─┐                     ┌─► persisted?  (any StoreModel field differs)
//!         ├─ compare watched ───┼─► TelemetryChanged(bool)
//! after  ─┘                     ├─► OpenAtLoginChanged(bool)
//!                               └─► RefreshContexts { ticket, path }
//! ```
//!
//! Writing a field to its current value produces no reaction.
//!
//! # Kube-config read tickets
//!
//! Each path change bumps `read_generation` and hands out a ticket.  A read
//! result is only applied if its ticket is still the newest one, so a slow
//! read for an old path can never overwrite the result for the current path.

use std::collections::BTreeSet;
use std::path::PathBuf;

use kubedesk_core::domain::model::{
    DEFAULT_COLOR_THEME, DEFAULT_DOWNLOAD_MIRROR, KNOWN_DOWNLOAD_MIRRORS,
};
use kubedesk_core::{diff_new_contexts, is_newer, KubeContext, PersistedStore, StoreModel};
use semver::Version;

/// A side effect requested by a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// `preferences.allow_telemetry` flipped to the contained value.
    TelemetryChanged(bool),
    /// `preferences.open_at_login` flipped to the contained value.
    OpenAtLoginChanged(bool),
    /// `kube_config_path` changed; read it under `ticket`.
    RefreshContexts { ticket: u64, path: PathBuf },
}

/// Outcome of one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Change {
    /// `true` if the persisted model differs from before the mutation.
    pub persisted: bool,
    pub reactions: Vec<Reaction>,
}

#[derive(Clone, PartialEq, Eq)]
struct Watched {
    allow_telemetry: bool,
    open_at_login: bool,
    kube_config_path: PathBuf,
}

/// The live preference state.
#[derive(Debug, Clone)]
pub struct PreferenceModel {
    model: StoreModel,
    new_contexts: BTreeSet<String>,
    default_kube_config_path: PathBuf,
    app_version: Version,
    read_generation: u64,
}

impl PreferenceModel {
    /// Creates the model with hydration defaults.
    pub fn new(default_kube_config_path: PathBuf, app_version: Version) -> Self {
        Self {
            model: StoreModel::new(default_kube_config_path.clone()),
            new_contexts: BTreeSet::new(),
            default_kube_config_path,
            app_version,
            read_generation: 0,
        }
    }

    pub fn model(&self) -> &StoreModel {
        &self.model
    }

    /// Contexts with a cluster reference that the user has not seen yet.
    pub fn new_contexts(&self) -> &BTreeSet<String> {
        &self.new_contexts
    }

    pub fn app_version(&self) -> &Version {
        &self.app_version
    }

    /// `true` iff the running build is newer than the last acknowledged one.
    pub fn is_new_version(&self) -> bool {
        is_newer(&self.app_version, &self.model.last_seen_app_version)
    }

    /// Merges a persisted document into the model.  Hydration is not a user
    /// edit, so no reactions are reported.
    pub fn merge_from_store(&mut self, partial: PersistedStore) {
        self.model.merge(partial);
    }

    /// Applies `edit` and reports what changed.
    pub fn mutate(&mut self, edit: impl FnOnce(&mut StoreModel)) -> Change {
        let before_model = self.model.clone();
        let before = self.watched();

        edit(&mut self.model);
        if self.model.kube_config_path.as_os_str().is_empty() {
            self.model.kube_config_path = self.default_kube_config_path.clone();
        }

        let after = self.watched();
        let mut reactions = Vec::new();
        if before.allow_telemetry != after.allow_telemetry {
            reactions.push(Reaction::TelemetryChanged(after.allow_telemetry));
        }
        if before.open_at_login != after.open_at_login {
            reactions.push(Reaction::OpenAtLoginChanged(after.open_at_login));
        }
        if before.kube_config_path != after.kube_config_path {
            let ticket = self.next_read_ticket();
            reactions.push(Reaction::RefreshContexts {
                ticket,
                path: after.kube_config_path,
            });
        }

        Change {
            persisted: before_model != self.model,
            reactions,
        }
    }

    // ── Named mutations ───────────────────────────────────────────────────────

    /// Replaces the hidden column list for `table_id`, keeping caller order.
    /// An empty list removes the entry.
    pub fn set_hidden_columns(&mut self, table_id: &str, names: Vec<String>) -> Change {
        self.mutate(|m| {
            if names.is_empty() {
                m.preferences.hidden_table_columns.remove(table_id);
            } else {
                m.preferences
                    .hidden_table_columns
                    .insert(table_id.to_string(), names);
            }
        })
    }

    /// Hides `column` if visible, shows it if hidden.
    pub fn toggle_table_column(&mut self, table_id: &str, column: &str) -> Change {
        let mut names = self
            .model
            .preferences
            .hidden_table_columns
            .get(table_id)
            .cloned()
            .unwrap_or_default();
        match names.iter().position(|c| c == column) {
            Some(i) => {
                names.remove(i);
            }
            None => names.push(column.to_string()),
        }
        self.set_hidden_columns(table_id, names)
    }

    pub fn set_kube_config_path(&mut self, path: PathBuf) -> Change {
        self.mutate(|m| m.kube_config_path = path)
    }

    pub fn reset_kube_config_path(&mut self) -> Change {
        let path = self.default_kube_config_path.clone();
        self.set_kube_config_path(path)
    }

    /// Selects the binary download mirror.  Unknown names fall back to the
    /// default mirror.
    pub fn set_download_mirror(&mut self, mirror: &str) -> Change {
        let mirror = if KNOWN_DOWNLOAD_MIRRORS.contains(&mirror) {
            mirror
        } else {
            DEFAULT_DOWNLOAD_MIRROR
        };
        self.mutate(|m| m.preferences.download_mirror = mirror.to_string())
    }

    pub fn reset_theme(&mut self) -> Change {
        self.mutate(|m| m.preferences.color_theme = DEFAULT_COLOR_THEME.to_string())
    }

    /// Records the running build as acknowledged.
    pub fn save_last_seen_app_version(&mut self) -> Change {
        let version = self.app_version.to_string();
        self.mutate(|m| m.last_seen_app_version = version)
    }

    // ── Context diff ──────────────────────────────────────────────────────────

    /// Issues a read ticket for the current path, invalidating older ones.
    pub fn begin_context_read(&mut self) -> (u64, PathBuf) {
        let ticket = self.next_read_ticket();
        (ticket, self.model.kube_config_path.clone())
    }

    /// Newest ticket issued so far.
    pub fn read_generation(&self) -> u64 {
        self.read_generation
    }

    pub fn is_current_read(&self, ticket: u64) -> bool {
        ticket == self.read_generation
    }

    /// Recomputes `new_contexts` from a freshly read context list.
    pub fn apply_contexts(&mut self, contexts: &[KubeContext]) {
        self.new_contexts = diff_new_contexts(contexts, &self.model.seen_contexts);
    }

    pub fn clear_new_contexts(&mut self) {
        self.new_contexts.clear();
    }

    /// Moves every new context into `seen_contexts`.  Idempotent.
    pub fn mark_acknowledged(&mut self) -> Change {
        let newly_seen = std::mem::take(&mut self.new_contexts);
        self.mutate(|m| m.seen_contexts.extend(newly_seen))
    }

    fn next_read_ticket(&mut self) -> u64 {
        self.read_generation += 1;
        self.read_generation
    }

    fn watched(&self) -> Watched {
        Watched {
            allow_telemetry: self.model.preferences.allow_telemetry,
            open_at_login: self.model.preferences.open_at_login,
            kube_config_path: self.model.kube_config_path.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> PreferenceModel {
        PreferenceModel::new(PathBuf::from("/home/dev/.kube/config"), Version::new(1, 2, 0))
    }

    fn ctx(name: &str, cluster: Option<&str>) -> KubeContext {
        KubeContext {
            name: name.to_string(),
            cluster: cluster.map(str::to_string),
            user: None,
            namespace: None,
        }
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_from_store_merges_without_reactions() {
        // Arrange
        let mut m = model();
        let partial = PersistedStore {
            last_seen_app_version: Some("1.2.0".to_string()),
            ..PersistedStore::default()
        };

        // Act
        m.merge_from_store(partial);

        // Assert
        assert!(!m.is_new_version());
        assert_eq!(m.model().kube_config_path, PathBuf::from("/home/dev/.kube/config"));
        assert!(!m.is_current_read(1));
    }

    #[test]
    fn test_telemetry_transition_reports_one_reaction() {
        // Arrange
        let mut m = model();

        // Act
        let change = m.mutate(|s| s.preferences.allow_telemetry = false);

        // Assert
        assert!(change.persisted);
        assert_eq!(change.reactions, vec![Reaction::TelemetryChanged(false)]);
    }

    #[test]
    fn test_setting_current_value_reports_nothing() {
        let mut m = model();
        let change = m.mutate(|s| s.preferences.allow_telemetry = true);
        assert!(!change.persisted);
        assert!(change.reactions.is_empty());
    }

    #[test]
    fn test_open_at_login_transition_is_reported() {
        let mut m = model();
        let change = m.mutate(|s| s.preferences.open_at_login = true);
        assert_eq!(change.reactions, vec![Reaction::OpenAtLoginChanged(true)]);
    }

    #[test]
    fn test_unwatched_change_is_persisted_without_reactions() {
        let mut m = model();
        let change = m.mutate(|s| s.preferences.locale_timezone = "Europe/Berlin".to_string());
        assert!(change.persisted);
        assert!(change.reactions.is_empty());
    }

    #[test]
    fn test_path_change_issues_new_read_ticket() {
        // Arrange
        let mut m = model();
        let (first, _) = m.begin_context_read();

        // Act
        let change = m.set_kube_config_path(PathBuf::from("/tmp/other"));

        // Assert
        assert_eq!(
            change.reactions,
            vec![Reaction::RefreshContexts {
                ticket: first + 1,
                path: PathBuf::from("/tmp/other"),
            }]
        );
        assert!(!m.is_current_read(first));
        assert!(m.is_current_read(first + 1));
    }

    #[test]
    fn test_empty_path_falls_back_to_default() {
        let mut m = model();
        m.set_kube_config_path(PathBuf::from("/tmp/other"));
        m.set_kube_config_path(PathBuf::new());
        assert_eq!(m.model().kube_config_path, PathBuf::from("/home/dev/.kube/config"));
    }

    #[test]
    fn test_reset_to_default_when_already_default_is_noop() {
        let mut m = model();
        let change = m.reset_kube_config_path();
        assert!(change.reactions.is_empty());
        assert!(!change.persisted);
    }

    #[test]
    fn test_set_hidden_columns_preserves_order_and_empty_removes() {
        let mut m = model();
        m.set_hidden_columns("pods", vec!["qos".into(), "age".into(), "node".into()]);
        assert_eq!(
            m.model().preferences.hidden_table_columns["pods"],
            vec!["qos", "age", "node"]
        );

        m.set_hidden_columns("pods", Vec::new());
        assert!(!m.model().preferences.hidden_table_columns.contains_key("pods"));
    }

    #[test]
    fn test_toggle_table_column_flips_visibility() {
        let mut m = model();
        m.toggle_table_column("pods", "age");
        assert!(m.model().preferences.is_table_column_hidden("pods", "age"));
        m.toggle_table_column("pods", "age");
        assert!(!m.model().preferences.is_table_column_hidden("pods", "age"));
    }

    #[test]
    fn test_reset_theme_restores_default() {
        let mut m = model();
        m.mutate(|s| s.preferences.color_theme = "light".to_string());
        m.reset_theme();
        assert_eq!(m.model().preferences.color_theme, DEFAULT_COLOR_THEME);
    }

    #[test]
    fn test_set_download_mirror_accepts_known_mirror() {
        // Arrange
        let mut m = model();

        // Act
        let change = m.set_download_mirror("china");

        // Assert
        assert!(change.persisted);
        assert_eq!(m.model().preferences.download_mirror, "china");
    }

    #[test]
    fn test_set_download_mirror_falls_back_to_default_for_unknown_name() {
        // Arrange
        let mut m = model();
        m.set_download_mirror("china");

        // Act
        let change = m.set_download_mirror("mirror.example.invalid");

        // Assert
        assert!(change.persisted);
        assert_eq!(
            m.model().preferences.download_mirror,
            DEFAULT_DOWNLOAD_MIRROR
        );
    }

    #[test]
    fn test_is_new_version_until_saved() {
        let mut m = model();
        assert!(m.is_new_version());
        m.save_last_seen_app_version();
        assert_eq!(m.model().last_seen_app_version, "1.2.0");
        assert!(!m.is_new_version());
    }

    #[test]
    fn test_apply_contexts_excludes_seen_and_clusterless() {
        // Arrange
        let mut m = model();
        m.mutate(|s| {
            s.seen_contexts.insert("a".to_string());
        });

        // Act
        m.apply_contexts(&[ctx("a", Some("x")), ctx("b", None), ctx("c", Some("y"))]);

        // Assert
        assert_eq!(*m.new_contexts(), names(&["c"]));
        assert!(m.new_contexts().is_disjoint(&m.model().seen_contexts));
    }

    #[test]
    fn test_mark_acknowledged_moves_new_into_seen_and_is_idempotent() {
        // Arrange
        let mut m = model();
        m.apply_contexts(&[ctx("a", Some("x")), ctx("c", Some("y"))]);

        // Act
        let first = m.mark_acknowledged();
        let seen_after_first = m.model().seen_contexts.clone();
        let second = m.mark_acknowledged();

        // Assert
        assert!(first.persisted);
        assert_eq!(seen_after_first, names(&["a", "c"]));
        assert!(m.new_contexts().is_empty());
        assert!(!second.persisted);
        assert_eq!(m.model().seen_contexts, seen_after_first);
    }
}
