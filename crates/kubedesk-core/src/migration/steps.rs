//! Registered store migrations.
//!
//! Append new steps at the end; never edit a released step.

use toml::{Table, Value};

use super::Migration;
use crate::domain::model::DEFAULT_LAST_SEEN_VERSION;

/// Every store migration, in ascending version order.
pub const STORE_MIGRATIONS: &[Migration] = &[
    Migration {
        version: "1.0.0-beta.4",
        description: "reset last seen app version",
        run: reset_last_seen_version,
    },
    Migration {
        version: "1.1.0",
        description: "rename legacy kube-config and seen-context keys",
        run: rename_legacy_keys,
    },
    Migration {
        version: "2.0.0-alpha.3",
        description: "nest legacy preferences and split hidden columns",
        run: nest_legacy_preferences,
    },
];

/// Early builds recorded the version on every launch instead of on
/// acknowledgement, so nobody saw the release notes.
fn reset_last_seen_version(doc: &mut Table) -> Result<(), String> {
    doc.insert(
        "last_seen_app_version".to_string(),
        Value::String(DEFAULT_LAST_SEEN_VERSION.to_string()),
    );
    Ok(())
}

/// `kubeconfig = "..."` → `kube_config_path = "..."` and
/// `seen_contexts = [{ name = "x" }]` → `seen_contexts = ["x"]`.
fn rename_legacy_keys(doc: &mut Table) -> Result<(), String> {
    if let Some(value) = doc.remove("kubeconfig") {
        let path = match value {
            Value::String(path) => path,
            other => {
                return Err(format!(
                    "legacy `kubeconfig` must be a string, found {}",
                    other.type_str()
                ))
            }
        };
        doc.entry("kube_config_path")
            .or_insert(Value::String(path));
    }

    if let Some(seen) = doc.get_mut("seen_contexts") {
        let items = match seen {
            Value::Array(items) => items,
            other => {
                return Err(format!(
                    "`seen_contexts` must be an array, found {}",
                    other.type_str()
                ))
            }
        };
        for item in items.iter_mut() {
            let name = match &*item {
                Value::String(_) => continue,
                Value::Table(entry) => match entry.get("name") {
                    Some(Value::String(name)) => name.clone(),
                    _ => return Err("legacy seen context entry has no `name`".to_string()),
                },
                other => {
                    return Err(format!(
                        "seen context entry must be a string or table, found {}",
                        other.type_str()
                    ))
                }
            };
            *item = Value::String(name);
        }
    }
    Ok(())
}

/// Moves top-level `allow_telemetry` / `color_theme` into `[preferences]`
/// (keys already present there win) and splits comma-joined hidden column
/// lists into arrays.
fn nest_legacy_preferences(doc: &mut Table) -> Result<(), String> {
    let legacy: Vec<(&str, Value)> = ["allow_telemetry", "color_theme"]
        .into_iter()
        .filter_map(|key| doc.remove(key).map(|value| (key, value)))
        .collect();

    let prefs = doc
        .entry("preferences")
        .or_insert_with(|| Value::Table(Table::new()));
    let prefs = match prefs {
        Value::Table(prefs) => prefs,
        other => {
            return Err(format!(
                "`preferences` must be a table, found {}",
                other.type_str()
            ))
        }
    };
    for (key, value) in legacy {
        prefs.entry(key).or_insert(value);
    }

    if let Some(columns) = prefs.get_mut("hidden_table_columns") {
        let columns = match columns {
            Value::Table(columns) => columns,
            other => {
                return Err(format!(
                    "`hidden_table_columns` must be a table, found {}",
                    other.type_str()
                ))
            }
        };
        for (_, value) in columns.iter_mut() {
            let names: Vec<Value> = match &*value {
                Value::String(joined) => joined
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(|name| Value::String(name.to_string()))
                    .collect(),
                _ => continue,
            };
            *value = Value::Array(names);
        }
    }
    Ok(())
}
