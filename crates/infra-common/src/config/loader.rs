use crate::errors::{Error, ErrorContext, ErrorExt, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

/// Parse a TOML document into `T`
pub fn load_toml_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).map_err(Error::from)
}

/// Read and parse a TOML file into `T`
pub fn load_toml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let ctx = || ErrorContext::new("config", "load_toml_file").with_details(path.display().to_string());

    let text = std::fs::read_to_string(path).map_err(|e| Error::from(e).context(ctx()))?;
    debug!("Loaded {} bytes of configuration from {}", text.len(), path.display());
    load_toml_str(&text).map_err(|e| e.context(ctx()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        port: u16,
    }

    #[test]
    fn test_load_toml_str() {
        let sample: Sample = load_toml_str("name = \"edge\"\nport = 5080\n").unwrap();
        assert_eq!(sample, Sample { name: "edge".into(), port: 5080 });
    }

    #[test]
    fn test_load_toml_str_reports_config_error() {
        let err = load_toml_str::<Sample>("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file_carries_context() {
        let err = load_toml_file::<Sample>("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("load_toml_file"));
    }
}
