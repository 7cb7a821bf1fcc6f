//! Seeding a [`MemoryStore`] from YAML documents and the environment.
//!
//! Raw-value loading is the caller's concern; these helpers cover the
//! common layering: YAML file lowest, environment variables highest (apply
//! them last so they win). YAML mappings flatten into dotted keys; scalars
//! are stored as their textual rendering. Arrays have no dotted-key
//! representation and are skipped with a warning.

use crate::schema::{PATH_DELIMITER, Schema};
use crate::store::MemoryStore;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

/// Flatten a YAML document into the store.
pub fn load_yaml_str(store: &mut MemoryStore, text: &str) -> Result<()> {
    let value: Value = serde_yaml::from_str(text).context("invalid YAML source")?;
    match value {
        Value::Object(map) => {
            for (key, entry) in &map {
                flatten(store, key, entry);
            }
            Ok(())
        }
        Value::Null => Ok(()),
        _ => bail!("top-level configuration must be a mapping"),
    }
}

/// Read and flatten a YAML file into the store.
pub fn load_yaml_file(store: &mut MemoryStore, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    load_yaml_str(store, &text)
        .with_context(|| format!("failed to load {}", path.display()))
}

fn flatten(store: &mut MemoryStore, key: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (name, entry) in map {
                flatten(store, &format!("{}{}{}", key, PATH_DELIMITER, name), entry);
            }
        }
        Value::String(text) => store.insert(key, text.clone()),
        Value::Bool(flag) => store.insert(key, flag.to_string()),
        Value::Number(number) => store.insert(key, number.to_string()),
        Value::Null => {}
        Value::Array(_) => {
            warn!("skipping {}: array values have no dotted-key form", key);
        }
    }
}

/// Overlay environment variables onto the store, one candidate variable
/// per schema leaf: `prefix` plus the upper-cased path with `.` and `-`
/// replaced by `_` (`APP` + `server.listen-addr` -> `APP_SERVER_LISTEN_ADDR`).
pub fn apply_env(store: &mut MemoryStore, prefix: &str, schema: &Schema) {
    apply_env_with(store, prefix, schema, |name| std::env::var(name).ok());
}

/// Like [`apply_env`], with an explicit variable lookup. Lets tests and
/// embedders avoid process-global state.
pub fn apply_env_with(
    store: &mut MemoryStore,
    prefix: &str,
    schema: &Schema,
    lookup: impl Fn(&str) -> Option<String>,
) {
    for leaf in schema.leaves() {
        let name = env_var_name(prefix, &leaf.path);
        if let Some(value) = lookup(&name) {
            store.insert(leaf.path, value);
        }
    }
}

fn env_var_name(prefix: &str, path: &str) -> String {
    let suffix: String = path
        .chars()
        .map(|c| match c {
            PATH_DELIMITER | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect();
    if prefix.is_empty() {
        suffix
    } else {
        format!("{}_{}", prefix, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;
    use crate::store::RawStore;

    #[test]
    fn test_flatten_nested_mappings() {
        let mut store = MemoryStore::new();
        load_yaml_str(
            &mut store,
            r#"
server:
  listen: "0.0.0.0:8080"
  limits:
    max_conns: 128
debug: true
"#,
        )
        .unwrap();
        assert_eq!(store.get("server.listen").as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(store.get("server.limits.max_conns").as_deref(), Some("128"));
        assert_eq!(store.get("debug").as_deref(), Some("true"));
    }

    #[test]
    fn test_arrays_and_nulls_are_skipped() {
        let mut store = MemoryStore::new();
        load_yaml_str(
            &mut store,
            r#"
upstreams: [a, b]
comment: null
kept: true
"#,
        )
        .unwrap();
        assert!(!store.contains("upstreams"));
        assert!(!store.contains("comment"));
        assert_eq!(store.get("kept").as_deref(), Some("true"));
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        let mut store = MemoryStore::new();
        assert!(load_yaml_str(&mut store, "- a\n- b\n").is_err());
        assert!(load_yaml_str(&mut store, "").is_ok());
    }

    #[test]
    fn test_env_overlay_wins_over_file_values() {
        let schema = Schema::new(vec![
            FieldDescriptor::text("listen"),
            FieldDescriptor::nested("limits", vec![FieldDescriptor::text("max-conns")]),
        ]);
        let mut store = MemoryStore::new();
        load_yaml_str(&mut store, "listen: \"file\"\n").unwrap();
        apply_env_with(&mut store, "APP", &schema, |name| match name {
            "APP_LISTEN" => Some("env".to_string()),
            "APP_LIMITS_MAX_CONNS" => Some("64".to_string()),
            _ => None,
        });
        assert_eq!(store.get("listen").as_deref(), Some("env"));
        assert_eq!(store.get("limits.max-conns").as_deref(), Some("64"));
    }

    #[test]
    fn test_env_var_name_shape() {
        assert_eq!(env_var_name("APP", "server.listen-addr"), "APP_SERVER_LISTEN_ADDR");
        assert_eq!(env_var_name("", "debug"), "DEBUG");
    }
}
