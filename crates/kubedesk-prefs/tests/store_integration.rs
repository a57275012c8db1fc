//! Integration tests for the preferences store.
//!
//! These tests exercise `UserStore` end-to-end against a real temp directory:
//! load, migrations, reactions, context diffing and write-through, with
//! recording doubles standing in for the host and the kube-config source.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use semver::Version;
use tokio::sync::Notify;
use uuid::Uuid;

use kubedesk_core::AppEvent;
use kubedesk_prefs::application::dispatcher::EventBus;
use kubedesk_prefs::application::options::StoreOptions;
use kubedesk_prefs::application::user_store::{StoreError, UserStore};
use kubedesk_prefs::infrastructure::host::mock::RecordingHost;
use kubedesk_prefs::infrastructure::kubeconfig_source::KubeConfigSource;

const DEFAULT_KUBECONFIG: &str = "/home/dev/.kube/config";

// ── Test doubles ──────────────────────────────────────────────────────────────

/// In-memory kube-config source.  Reads of a gated path block until
/// [`FakeSource::release`] is called.
#[derive(Default)]
struct FakeSource {
    files: Mutex<HashMap<PathBuf, String>>,
    gates: Mutex<HashMap<PathBuf, Arc<Notify>>>,
}

impl FakeSource {
    fn with_file(self, path: &str, text: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), text.to_string());
        self
    }

    fn gate(self, path: &str) -> Self {
        self.gates
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), Arc::new(Notify::new()));
        self
    }

    fn release(&self, path: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(Path::new(path)) {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl KubeConfigSource for FakeSource {
    async fn read_file(&self, path: &Path) -> std::io::Result<String> {
        let gate = self.gates.lock().unwrap().get(path).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"))
    }
}

struct Harness {
    dir: PathBuf,
    store: Arc<UserStore>,
    host: Arc<RecordingHost>,
    source: Arc<FakeSource>,
    events: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    fn new(source: FakeSource) -> Self {
        Self::in_dir(temp_dir(), source)
    }

    fn in_dir(dir: PathBuf, source: FakeSource) -> Self {
        let host = Arc::new(RecordingHost::new());
        let source = Arc::new(source);
        let bus = Arc::new(EventBus::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        bus.subscribe(move |event: &AppEvent| sink.lock().unwrap().push(event.name()));

        let options = StoreOptions::new(&dir, DEFAULT_KUBECONFIG, Version::new(2, 3, 0))
            .with_write_debounce(Duration::from_millis(20));
        let store = UserStore::new(options, host.clone(), source.clone(), bus);
        Self {
            dir,
            store,
            host,
            source,
            events,
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn read_store_file(&self) -> toml::Table {
        let text = std::fs::read_to_string(self.store.store_path()).expect("store file written");
        toml::from_str(&text).expect("store file is TOML")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("kubedesk_it_{}", Uuid::new_v4()))
}

fn write_store(dir: &Path, name: &str, text: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), text).unwrap();
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Lets spawned tasks on the current-thread runtime run to their next await.
async fn settle_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

const KUBECONFIG_AB: &str = "\
contexts:
  - name: a
    context:
      cluster: x
  - name: b
    context:
      user: someone
  - name: c
    context:
      cluster: y
";

// ── Load ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_install_yields_defaults() {
    // Arrange
    let h = Harness::new(FakeSource::default());

    // Act
    h.store.load().await.expect("load");

    // Assert
    let model = h.store.snapshot();
    assert_eq!(model.kube_config_path, PathBuf::from(DEFAULT_KUBECONFIG));
    assert!(model.preferences.allow_telemetry);
    assert!(model.seen_contexts.is_empty());
    assert!(h.store.is_new_version());
}

#[tokio::test]
async fn test_malformed_store_file_yields_defaults() {
    // Arrange
    let dir = temp_dir();
    write_store(&dir, "user-store.toml", "this is = = not toml [");
    let h = Harness::in_dir(dir, FakeSource::default());

    // Act
    let result = h.store.load().await;

    // Assert
    tokio_test::assert_ok!(result);
    assert!(h.store.preferences().allow_telemetry);
    assert_eq!(h.store.kube_config_path(), PathBuf::from(DEFAULT_KUBECONFIG));
}

#[tokio::test]
async fn test_wrongly_typed_store_file_is_not_partially_adopted() {
    // Arrange: the theme is valid but seen_contexts has the wrong type
    let dir = temp_dir();
    write_store(
        &dir,
        "user-store.toml",
        "schema_version = \"2.0.0-alpha.3\"\nseen_contexts = 5\n\n[preferences]\ncolor_theme = \"light\"\n",
    );
    let h = Harness::in_dir(dir, FakeSource::default());

    // Act
    h.store.load().await.expect("load");

    // Assert
    assert_eq!(h.store.preferences().color_theme, "kubedesk-dark");
}

#[tokio::test]
async fn test_legacy_file_is_relocated_and_migrated() {
    // Arrange
    let dir = temp_dir();
    write_store(
        &dir,
        "config.toml",
        r#"
kubeconfig = "/work/kubeconfig"
last_seen_app_version = "0.9.0"
allow_telemetry = false
seen_contexts = [{ name = "prod" }, "staging"]

[preferences]
hidden_table_columns = { pods = "age, node" }
"#,
    );
    let h = Harness::in_dir(
        dir.clone(),
        FakeSource::default().with_file("/work/kubeconfig", "contexts: []\n"),
    );

    // Act
    h.store.load().await.expect("load");
    h.store.flush().await.expect("flush");

    // Assert
    assert!(!dir.join("config.toml").exists());
    let model = h.store.snapshot();
    assert_eq!(model.kube_config_path, PathBuf::from("/work/kubeconfig"));
    assert_eq!(model.last_seen_app_version, "0.0.0");
    assert!(!model.preferences.allow_telemetry);
    assert_eq!(model.seen_contexts, set(&["prod", "staging"]));
    assert_eq!(h.store.hidden_columns("pods"), vec!["age", "node"]);

    let doc = h.read_store_file();
    assert_eq!(doc["schema_version"].as_str(), Some("2.0.0-alpha.3"));
    assert!(doc.get("kubeconfig").is_none());
}

#[tokio::test]
async fn test_failing_migration_is_fatal_and_barrier_stays_closed() {
    // Arrange: legacy `kubeconfig` has a type no migration can convert
    let dir = temp_dir();
    write_store(&dir, "user-store.toml", "kubeconfig = 42\n");
    let h = Harness::in_dir(dir, FakeSource::default());

    // Act
    let result = h.store.load().await;

    // Assert
    assert!(matches!(result, Err(StoreError::Migration(_))));
    assert!(!h.store.is_loaded());
    let waited = tokio::time::timeout(Duration::from_millis(50), h.store.when_loaded()).await;
    assert!(waited.is_err(), "barrier must not resolve after a failed migration");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_loads_hydrate_once() {
    // Arrange
    let h = Harness::new(FakeSource::default());
    let first = Arc::clone(&h.store);
    let second = Arc::clone(&h.store);

    // Act
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.load().await }),
        tokio::spawn(async move { second.load().await }),
    );

    // Assert
    assert!(a.expect("first load task").is_ok());
    assert!(b.expect("second load task").is_ok());
    assert_eq!(
        h.host.autostart_calls().len(),
        1,
        "startup side effects run once"
    );
}

#[tokio::test]
async fn test_mutation_waits_for_load_barrier() {
    // Arrange
    let dir = temp_dir();
    write_store(
        &dir,
        "user-store.toml",
        "schema_version = \"2.0.0-alpha.3\"\n\n[preferences]\ncolor_theme = \"light\"\n",
    );
    let h = Harness::in_dir(dir, FakeSource::default());
    let store = Arc::clone(&h.store);
    let pending = tokio::spawn(async move { store.set_locale_timezone("Europe/Paris").await });
    settle_tasks().await;
    assert!(!pending.is_finished());

    // Act
    h.store.load().await.expect("load");
    pending.await.unwrap();

    // Assert: hydrated values and the queued edit both survive
    let prefs = h.store.preferences();
    assert_eq!(prefs.color_theme, "light");
    assert_eq!(prefs.locale_timezone, "Europe/Paris");
}

// ── Reactions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_autostart_registered_at_startup_and_on_transition() {
    // Arrange
    let h = Harness::new(FakeSource::default());

    // Act
    h.store.load().await.expect("load");
    h.store.set_open_at_login(true).await;
    h.store.set_open_at_login(true).await;

    // Assert
    let calls = h.host.autostart_calls();
    assert_eq!(calls.len(), 2, "one call at startup, one per transition");
    assert!(!calls[0].enabled);
    assert!(calls[1].enabled);
    assert!(calls.iter().all(|c| c.hidden_on_start));
    assert_eq!(calls[1].launch_args, vec!["--hidden"]);
}

#[tokio::test]
async fn test_telemetry_event_published_once_per_transition() {
    // Arrange
    let h = Harness::new(FakeSource::default());
    h.store.load().await.expect("load");

    // Act
    h.store.set_allow_telemetry(true).await;
    h.store.set_allow_telemetry(false).await;
    h.store.set_allow_telemetry(false).await;
    h.store.update_preferences(|p| p.allow_telemetry = true).await;

    // Assert
    assert_eq!(h.events(), vec!["telemetry:disabled", "telemetry:enabled"]);
}

#[tokio::test]
async fn test_save_last_seen_app_version_publishes_and_clears_new_version() {
    let h = Harness::new(FakeSource::default());
    h.store.load().await.expect("load");
    assert!(h.store.is_new_version());

    h.store.save_last_seen_app_version().await;

    assert_eq!(h.events(), vec!["app:whats-new-seen"]);
    assert!(!h.store.is_new_version());
    assert_eq!(h.store.snapshot().last_seen_app_version, "2.3.0");
}

#[tokio::test]
async fn test_reset_theme_restores_default() {
    let h = Harness::new(FakeSource::default());
    h.store.load().await.expect("load");
    h.store.set_color_theme("light").await;

    h.store.reset_theme().await;

    assert_eq!(h.store.preferences().color_theme, "kubedesk-dark");
}

// ── Contexts ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_contexts_exclude_seen_and_clusterless() {
    // Arrange
    let dir = temp_dir();
    write_store(
        &dir,
        "user-store.toml",
        "schema_version = \"2.0.0-alpha.3\"\nseen_contexts = [\"a\"]\n",
    );
    let h = Harness::in_dir(dir, FakeSource::default().with_file(DEFAULT_KUBECONFIG, KUBECONFIG_AB));

    // Act
    h.store.load().await.expect("load");
    h.store.when_contexts_synced().await;

    // Assert
    assert_eq!(h.store.new_contexts(), set(&["c"]));
}

#[tokio::test]
async fn test_mark_acknowledged_is_idempotent() {
    // Arrange
    let h = Harness::new(FakeSource::default().with_file(DEFAULT_KUBECONFIG, KUBECONFIG_AB));
    h.store.load().await.expect("load");
    h.store.when_contexts_synced().await;
    assert_eq!(h.store.new_contexts(), set(&["a", "c"]));

    // Act
    h.store.mark_acknowledged().await;
    let after_first = h.store.snapshot();
    h.store.mark_acknowledged().await;

    // Assert
    assert_eq!(after_first.seen_contexts, set(&["a", "c"]));
    assert!(h.store.new_contexts().is_empty());
    assert_eq!(h.store.snapshot(), after_first);
}

#[tokio::test]
async fn test_unreadable_kubeconfig_resets_path_to_default() {
    // Arrange
    let h = Harness::new(FakeSource::default().with_file(DEFAULT_KUBECONFIG, KUBECONFIG_AB));
    h.store.load().await.expect("load");
    h.store.when_contexts_synced().await;

    // Act
    h.store.set_kube_config_path("/does/not/exist").await;
    h.store.when_contexts_synced().await;

    // Assert
    assert_eq!(h.store.kube_config_path(), PathBuf::from(DEFAULT_KUBECONFIG));
    assert_eq!(h.store.new_contexts(), set(&["a", "c"]));
}

#[tokio::test]
async fn test_invalid_kubeconfig_clears_new_contexts() {
    // Arrange: the default path itself is invalid, so there is nothing to fall back to
    let h = Harness::new(FakeSource::default().with_file(DEFAULT_KUBECONFIG, "contexts: [oops"));

    // Act
    h.store.load().await.expect("load");
    h.store.when_contexts_synced().await;

    // Assert
    assert!(h.store.new_contexts().is_empty());
    assert_eq!(h.store.kube_config_path(), PathBuf::from(DEFAULT_KUBECONFIG));
}

#[tokio::test]
async fn test_stale_kubeconfig_read_is_discarded() {
    // Arrange: the first path's read blocks until released
    let slow = "/slow/config";
    let fast = "/fast/config";
    let source = FakeSource::default()
        .with_file(DEFAULT_KUBECONFIG, "contexts: []\n")
        .with_file(
            slow,
            "contexts:\n  - name: from-slow\n    context:\n      cluster: s\n",
        )
        .with_file(
            fast,
            "contexts:\n  - name: from-fast\n    context:\n      cluster: f\n",
        )
        .gate(slow);
    let h = Harness::new(source);
    h.store.load().await.expect("load");
    h.store.when_contexts_synced().await;

    // Act: switch to the slow path, then to the fast one before it returns
    h.store.set_kube_config_path(slow).await;
    settle_tasks().await;
    h.store.set_kube_config_path(fast).await;
    h.store.when_contexts_synced().await;
    h.source.release(slow);
    settle_tasks().await;

    // Assert
    assert_eq!(h.store.kube_config_path(), PathBuf::from(fast));
    assert_eq!(h.store.new_contexts(), set(&["from-fast"]));
}

// ── Persistence ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_write_through_is_eventually_durable() {
    // Arrange
    let h = Harness::new(FakeSource::default());
    h.store.load().await.expect("load");

    // Act: a burst of edits inside one debounce window
    h.store.set_hidden_columns("pods", vec!["qos".into(), "age".into()]).await;
    h.store.toggle_table_column("pods", "node").await;
    h.store.set_locale_timezone("America/Chicago").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Assert
    let doc = h.read_store_file();
    assert_eq!(doc["preferences"]["locale_timezone"].as_str(), Some("America/Chicago"));
    let pods: Vec<&str> = doc["preferences"]["hidden_table_columns"]["pods"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(pods, vec!["qos", "age", "node"]);
}

#[tokio::test]
async fn test_saved_state_round_trips_through_a_new_store() {
    // Arrange
    let dir = temp_dir();
    let custom = "/custom/kubeconfig";
    let first = Harness::in_dir(
        dir.clone(),
        FakeSource::default().with_file(custom, "contexts: []\n"),
    );
    first.store.load().await.expect("load");
    first.store.set_kube_config_path(custom).await;
    first.store.set_allow_telemetry(false).await;
    first.store.toggle_table_column("pods", "age").await;
    first.store.when_contexts_synced().await;
    first.store.save().await.expect("save");

    // Act
    let second = Harness::in_dir(
        dir.clone(),
        FakeSource::default().with_file(custom, "contexts: []\n"),
    );
    second.store.load().await.expect("reload");

    // Assert
    assert_eq!(second.store.snapshot(), first.store.snapshot());
    assert_eq!(second.store.kube_config_path(), PathBuf::from(custom));
    assert!(!second.store.preferences().allow_telemetry);
    assert!(second.store.is_table_column_hidden("pods", "age"));
}
