//! Loading configuration documents from disk.

use b2bua_infra_common::{Error, load_toml_file};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EdgeConfig {
    user_agent: Option<String>,
    #[serde(default)]
    listeners: Vec<String>,
}

/// A file on disk is read and deserialized
#[test]
fn test_load_from_temp_file() {
    let path = std::env::temp_dir().join(format!("b2bua-config-{}.toml", std::process::id()));
    std::fs::write(&path, "user_agent = \"edge/1.0\"\nlisteners = [\"udp:0.0.0.0:5060\"]\n").unwrap();

    let config: EdgeConfig = load_toml_file(&path).unwrap();
    assert_eq!(config.user_agent.as_deref(), Some("edge/1.0"));
    assert_eq!(config.listeners, vec!["udp:0.0.0.0:5060".to_string()]);

    std::fs::remove_file(&path).unwrap();
}

/// Syntax errors surface as configuration errors with the file path attached
#[test]
fn test_bad_file_is_config_error() {
    let path = std::env::temp_dir().join(format!("b2bua-bad-{}.toml", std::process::id()));
    std::fs::write(&path, "user_agent = [unterminated").unwrap();

    let err = load_toml_file::<EdgeConfig>(&path).unwrap_err();
    match err {
        Error::Config(msg) => assert!(msg.contains(&path.display().to_string())),
        other => panic!("unexpected error: {other}"),
    }

    std::fs::remove_file(&path).unwrap();
}
