//! Configuration for the dialog state manager
//!
//! [`B2buaConfig`] is passed explicitly to [`DialogStateManager`](crate::manager::DialogStateManager);
//! nothing in this crate reads global toggles. Every field has a default, so
//! a partial TOML document is a valid configuration:
//!
//! ```rust
//! use b2bua_dialog_core::config::{B2buaConfig, SessionCodec};
//!
//! let config = B2buaConfig::from_toml_str(r#"
//!     session_codec = "uri-params"
//!     user_agent = "edge-sbc"
//!
//!     [store]
//!     cache_lifetime_secs = 3600
//! "#).unwrap();
//!
//! assert_eq!(config.session_codec, SessionCodec::UriParams);
//! assert_eq!(config.store.sweep_interval_secs, 30);
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use b2bua_infra_common::{LoggingConfig, load_toml_file, load_toml_str};
use serde::{Deserialize, Serialize};

use crate::errors::DialogResult;

/// Where the session id and leg index travel between the legs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionCodec {
    /// `<session>-<leg>` as the user part of the generated Contact
    #[default]
    UserInfo,
    /// `sbc-session-id` / `sbc-call-index` Contact URI parameters
    UriParams,
    /// The same parameters on a self-addressed loose Record-Route
    RecordRouteParams,
}

/// Public address advertised for a local listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAddress {
    /// Listener address as bound locally
    pub local: SocketAddr,
    /// Host or IP advertised in Contact and Via
    pub external: String,
    /// Restrict the mapping to one transport (`udp`, `tcp`, ...)
    #[serde(default)]
    pub transport: Option<String>,
}

impl ExternalAddress {
    pub fn new(local: SocketAddr, external: impl Into<String>) -> Self {
        Self {
            local,
            external: external.into(),
            transport: None,
        }
    }

    pub fn with_transport(mut self, transport: impl Into<String>) -> Self {
        self.transport = Some(transport.into());
        self
    }

    fn matches(&self, transport: &str, local: &SocketAddr) -> bool {
        self.local == *local
            && self
                .transport
                .as_deref()
                .is_none_or(|t| t.eq_ignore_ascii_case(transport))
    }
}

/// Dialog store timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long an untouched Call-ID entry stays cached
    pub cache_lifetime_secs: u64,
    /// Period of the background sweep
    pub sweep_interval_secs: u64,
    /// Persisted records older than this are dropped at startup
    pub stale_bootstrap_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_lifetime_secs: 86_400,
            sweep_interval_secs: 30,
            stale_bootstrap_secs: 60,
        }
    }
}

impl StoreConfig {
    pub fn cache_lifetime(&self) -> Duration {
        Duration::from_secs(self.cache_lifetime_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn stale_bootstrap(&self) -> Duration {
        Duration::from_secs(self.stale_bootstrap_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LogSettings {
    /// Subscriber configuration for [`b2bua_infra_common::setup_logging`]
    pub fn to_logging_config(&self, app_name: &str) -> DialogResult<LoggingConfig> {
        Ok(LoggingConfig::from_settings(&self.level, self.json, app_name)?)
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct B2buaConfig {
    pub session_codec: SessionCodec,
    /// Encode REGISTER bindings as `;sbc-reg=` parameters instead of user-info
    pub register_state_in_params: bool,
    /// Stamped on forwarded ACKs
    pub user_agent: Option<String>,
    pub external_addresses: Vec<ExternalAddress>,
    pub store: StoreConfig,
    pub retransmit_cache_ttl_secs: u64,
    pub logging: LogSettings,
}

impl Default for B2buaConfig {
    fn default() -> Self {
        Self {
            session_codec: SessionCodec::default(),
            register_state_in_params: false,
            user_agent: None,
            external_addresses: Vec::new(),
            store: StoreConfig::default(),
            retransmit_cache_ttl_secs: 32,
            logging: LogSettings::default(),
        }
    }
}

impl B2buaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> DialogResult<Self> {
        Ok(load_toml_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> DialogResult<Self> {
        Ok(load_toml_file(path)?)
    }

    pub fn with_session_codec(mut self, codec: SessionCodec) -> Self {
        self.session_codec = codec;
        self
    }

    pub fn with_register_state_in_params(mut self, enabled: bool) -> Self {
        self.register_state_in_params = enabled;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_external_address(mut self, mapping: ExternalAddress) -> Self {
        self.external_addresses.push(mapping);
        self
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_retransmit_cache_ttl(mut self, secs: u64) -> Self {
        self.retransmit_cache_ttl_secs = secs;
        self
    }

    pub fn retransmit_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.retransmit_cache_ttl_secs)
    }

    /// Public address for a local listener, if one is mapped
    pub fn external_address(&self, transport: &str, local: &SocketAddr) -> Option<&str> {
        self.external_addresses
            .iter()
            .find(|mapping| mapping.matches(transport, local))
            .map(|mapping| mapping.external.as_str())
            .filter(|external| !external.is_empty())
    }

    /// Map an advertised `host:port` back to the listener it belongs to.
    ///
    /// Addresses without a mapping are returned parsed as-is.
    pub fn internal_address(&self, host_port: &str) -> Option<SocketAddr> {
        if let Some(mapping) = self.external_addresses.iter().find(|mapping| {
            format!("{}:{}", mapping.external, mapping.local.port()).eq_ignore_ascii_case(host_port)
        }) {
            return Some(mapping.local);
        }
        host_port.parse().ok()
    }
}
