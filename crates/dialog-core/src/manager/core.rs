//! Core Dialog State Manager Implementation
//!
//! This module contains the main DialogStateManager struct and its lifecycle
//! methods. The routing engines and leg-state hooks are implemented on it in
//! sibling modules.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::B2buaConfig;
use crate::errors::DialogResult;
use crate::store::{DialogPersistence, DialogStore, InMemoryPersistence, RetransmitCache, SweeperHandle, spawn_sweeper};
use crate::transport::{DnsResolver, SystemResolver};

pub struct DialogStateManager {
    /// Shared dialog and registration store
    pub(crate) store: Arc<DialogStore>,

    /// Engine configuration (session codec, external addresses, ...)
    pub(crate) config: Arc<B2buaConfig>,

    /// Host resolution for next-hop selection
    pub(crate) resolver: Arc<dyn DnsResolver>,

    /// 2xx responses kept for ACK correlation
    pub(crate) retransmit: Arc<RetransmitCache>,

    /// Background sweep task, while running
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl std::fmt::Debug for DialogStateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogStateManager")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("retransmit", &self.retransmit.len())
            .finish()
    }
}

impl DialogStateManager {
    /// Create a dialog state manager and load persisted state.
    ///
    /// # Arguments
    /// * `config` - Engine configuration
    /// * `persistence` - Storage backend for dialog and registration records
    /// * `resolver` - Host resolution used for next-hop selection
    pub fn new(
        config: B2buaConfig,
        persistence: Arc<dyn DialogPersistence>,
        resolver: Arc<dyn DnsResolver>,
    ) -> DialogResult<Self> {
        info!(
            "Creating DialogStateManager ({:?} session codec)",
            config.session_codec
        );
        let store = Arc::new(DialogStore::new(persistence, config.store.clone()));
        store.populate_from_store()?;
        let retransmit = Arc::new(RetransmitCache::new(config.retransmit_cache_ttl()));

        Ok(Self {
            store,
            config: Arc::new(config),
            resolver,
            retransmit,
            sweeper: Mutex::new(None),
        })
    }

    /// Manager with in-memory persistence and system DNS
    pub fn with_defaults(config: B2buaConfig) -> DialogResult<Self> {
        Self::new(
            config,
            Arc::new(InMemoryPersistence::new()),
            Arc::new(SystemResolver),
        )
    }

    /// Start the background sweep task. Must be called from within a
    /// tokio runtime; calling it again while running does nothing.
    pub fn start(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            debug!("Dialog sweeper already running");
            return;
        }
        *sweeper = Some(spawn_sweeper(
            self.store.clone(),
            Some(self.retransmit.clone()),
            self.config.store.sweep_interval(),
        ));
        info!("DialogStateManager started");
    }

    /// Stop the background sweep task
    pub async fn stop(&self) {
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
        info!("DialogStateManager stopped");
    }

    pub fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn store(&self) -> &Arc<DialogStore> {
        &self.store
    }

    pub fn config(&self) -> &B2buaConfig {
        &self.config
    }

    pub fn retransmit_cache(&self) -> &Arc<RetransmitCache> {
        &self.retransmit
    }
}
