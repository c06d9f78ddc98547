//! Tests for configuration loading and validation

use relay::config::{Config, DEFAULT_PROXY_PORT, PROXY_PORT_MIN};

#[test]
fn test_config_defaults() {
    let cfg = Config::load(None).unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.proxy.port, DEFAULT_PROXY_PORT);
    assert_eq!(cfg.proxy.port, 5665);
    assert_eq!(cfg.proxy.connect_timeout_secs, 5);
    assert_eq!(cfg.proxy.request_timeout_secs, 30);
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
server:
  listen_addr: "0.0.0.0:9000"
proxy:
  port: 5700
  connect_timeout_secs: 2
  request_timeout_secs: 10
"#;
    let cfg = Config::from_yaml(yaml).unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:9000");
    assert_eq!(cfg.proxy.port, 5700);
    assert_eq!(cfg.proxy.connect_timeout_secs, 2);
    assert_eq!(cfg.proxy.request_timeout_secs, 10);
}

#[test]
fn test_config_partial_yaml_fills_defaults() {
    // Missing sections and fields fall back to defaults
    let yaml = r#"
proxy:
  port: 5800
"#;
    let cfg = Config::from_yaml(yaml).unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.proxy.port, 5800);
    assert_eq!(cfg.proxy.request_timeout_secs, 30);
}

#[test]
fn test_config_port_below_minimum_rejected() {
    let yaml = "proxy:\n  port: 5599\n";
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn test_config_port_at_minimum_accepted() {
    let yaml = "proxy:\n  port: 5600\n";
    let cfg = Config::from_yaml(yaml).unwrap();
    assert_eq!(cfg.proxy.port, PROXY_PORT_MIN);
}

#[test]
fn test_config_port_at_maximum_accepted() {
    let yaml = "proxy:\n  port: 65535\n";
    let cfg = Config::from_yaml(yaml).unwrap();
    assert_eq!(cfg.proxy.port, 65535);
}

#[test]
fn test_config_port_above_maximum_rejected() {
    // 65536 does not fit a u16, so parsing itself fails
    let yaml = "proxy:\n  port: 65536\n";
    assert!(Config::from_yaml(yaml).is_err());
}

#[test]
fn test_config_empty_listen_addr_rejected() {
    let yaml = "server:\n  listen_addr: \"\"\n";
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("listen_addr"));
}

#[test]
fn test_config_zero_timeout_rejected() {
    let yaml = "proxy:\n  request_timeout_secs: 0\n";
    assert!(Config::from_yaml(yaml).is_err());

    let yaml = "proxy:\n  connect_timeout_secs: 0\n";
    assert!(Config::from_yaml(yaml).is_err());
}

#[test]
fn test_config_default_base_uses_port() {
    let cfg = Config::load(None).unwrap();
    assert_eq!(cfg.proxy.default_base(), "http://127.0.0.1:5665");

    let yaml = "proxy:\n  port: 6000\n";
    let cfg = Config::from_yaml(yaml).unwrap();
    assert_eq!(cfg.proxy.default_base(), "http://127.0.0.1:6000");
}

#[test]
fn test_config_default_options_carry_timeouts() {
    let yaml = "proxy:\n  port: 5665\n  connect_timeout_secs: 3\n  request_timeout_secs: 7\n";
    let cfg = Config::from_yaml(yaml).unwrap();

    let options = cfg.proxy.default_options();
    assert_eq!(options.base, "http://127.0.0.1:5665");
    assert_eq!(options.request.connect_timeout.as_secs(), 3);
    assert_eq!(options.request.request_timeout.as_secs(), 7);
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.yaml");
    std::fs::write(&path, "proxy:\n  port: 6100\n").unwrap();

    let cfg = Config::load(Some(&path)).unwrap();
    assert_eq!(cfg.proxy.port, 6100);
}

#[test]
fn test_config_load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.yaml");

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn test_config_load_invalid_file_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.yaml");
    std::fs::write(&path, "proxy:\n  port: 100\n").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(format!("{:#}", err).contains("invalid config file"));
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::load(None).unwrap();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.listen_addr, cfg2.server.listen_addr);
    assert_eq!(cfg1.proxy.port, cfg2.proxy.port);
}
