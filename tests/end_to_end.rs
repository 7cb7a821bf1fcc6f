//! End-to-end: YAML file -> store -> bind -> typed structure.

use confbind::decode::ScalarTarget;
use confbind::patch::{FieldTarget, Section, hydrate, set_key};
use confbind::{BindError, Binder, FieldDescriptor, FieldKind, MemoryStore, Schema, source};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Default)]
struct TlsConfig {
    cert: String,
    key: String,
}

impl Section for TlsConfig {
    fn field_mut(&mut self, name: &str) -> Option<FieldTarget<'_>> {
        match name {
            "cert" => Some(FieldTarget::Value(ScalarTarget::Text(&mut self.cert))),
            "key" => Some(FieldTarget::Value(ScalarTarget::Text(&mut self.key))),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ProxyConfig {
    listen: String,
    port: u16,
    debug: bool,
    tls: TlsConfig,
}

impl Section for ProxyConfig {
    fn field_mut(&mut self, name: &str) -> Option<FieldTarget<'_>> {
        match name {
            "listen" => Some(FieldTarget::Value(ScalarTarget::Text(&mut self.listen))),
            "port" => Some(FieldTarget::Value(ScalarTarget::U16(&mut self.port))),
            "debug" => Some(FieldTarget::Value(ScalarTarget::Bool(&mut self.debug))),
            "tls" => Some(FieldTarget::Section(&mut self.tls)),
            _ => None,
        }
    }
}

fn proxy_schema() -> Schema {
    Schema::new(vec![
        FieldDescriptor::text("listen")
            .required()
            .with_description("address to accept connections on"),
        FieldDescriptor::scalar("port", FieldKind::U16)
            .with_default("{{ listen | split \":\" | last }}"),
        FieldDescriptor::scalar("debug", FieldKind::Bool).with_default("false"),
        FieldDescriptor::nested(
            "tls",
            vec![
                FieldDescriptor::text("cert").omit_empty(),
                FieldDescriptor::text("key")
                    .with_default("{{ if tls.cert }}{{ tls.cert | replace \".crt\" \".key\" }}{{ end }}"),
            ],
        ),
    ])
}

#[test]
fn yaml_file_binds_and_hydrates_typed_config() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("proxy.yaml");
    fs::write(
        &config_path,
        r#"
listen: "0.0.0.0:8443"
tls:
  cert: "/etc/proxy/server.crt"
"#,
    )
    .unwrap();

    let schema = proxy_schema();
    schema.validate().unwrap();

    let mut store = MemoryStore::new();
    source::load_yaml_file(&mut store, &config_path).unwrap();
    let tree = Binder::new(&mut store).bind(&schema).unwrap();

    let mut config = ProxyConfig::default();
    hydrate(&mut config, &schema, &tree).unwrap();

    assert_eq!(config.listen, "0.0.0.0:8443");
    assert_eq!(config.port, 8443);
    assert!(!config.debug);
    assert_eq!(config.tls.cert, "/etc/proxy/server.crt");
    assert_eq!(config.tls.key, "/etc/proxy/server.key");
}

#[test]
fn env_overlay_overrides_file_values() {
    let schema = proxy_schema();
    let mut store = MemoryStore::new();
    source::load_yaml_str(&mut store, "listen: \"0.0.0.0:8080\"\n").unwrap();
    source::apply_env_with(&mut store, "PROXY", &schema, |name| match name {
        "PROXY_LISTEN" => Some("127.0.0.1:9090".to_string()),
        "PROXY_DEBUG" => Some("true".to_string()),
        _ => None,
    });

    let tree = Binder::new(&mut store).bind(&schema).unwrap();
    assert_eq!(tree.scalar_at("listen"), Some("127.0.0.1:9090"));
    assert_eq!(tree.scalar_at("port"), Some("9090"));
    assert_eq!(tree.scalar_at("debug"), Some("true"));
    // cert is omit-empty and unset; its dependent default is guarded.
    assert!(tree.get("tls.cert").is_none());
    assert_eq!(tree.scalar_at("tls.key"), Some(""));
}

#[test]
fn runtime_patch_after_hydrate() {
    let schema = proxy_schema();
    let mut store = MemoryStore::from_pairs([("listen", "0.0.0.0:8080")]);
    let tree = Binder::new(&mut store).bind(&schema).unwrap();

    let mut config = ProxyConfig::default();
    hydrate(&mut config, &schema, &tree).unwrap();
    assert_eq!(config.port, 8080);

    set_key(&mut config, "port", "1234").unwrap();
    assert_eq!(config.port, 1234);

    let err = set_key(&mut config, "port", "not-a-port").unwrap_err();
    assert!(matches!(err, BindError::TypeMismatch { kind: FieldKind::U16, .. }));

    let err = set_key(&mut config, "metrics.enabled", "true").unwrap_err();
    assert!(matches!(err, BindError::UnexpectedKey { .. }));
}
