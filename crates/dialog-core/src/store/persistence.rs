//! Persistence collaborator
//!
//! The store never assumes a storage engine. Backends implement
//! [`DialogPersistence`]; calls are synchronous and must not re-enter the
//! dialog store. [`InMemoryPersistence`] is the fallback when no backend is
//! injected and keeps records as JSON text.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::dialog::{DialogRecord, RegData};
use crate::errors::DialogResult;

/// Storage backend for dialog and registration records
pub trait DialogPersistence: Send + Sync {
    fn persist(&self, record: &DialogRecord) -> DialogResult<()>;

    fn get_all(&self) -> DialogResult<Vec<DialogRecord>>;

    fn remove_session(&self, session_id: &str) -> DialogResult<()>;

    /// Remove every record whose leg 1 Call-ID is `call_id`
    fn remove_all_dialogs(&self, call_id: &str) -> DialogResult<()>;

    fn persist_reg(&self, reg: &RegData) -> DialogResult<()>;

    /// Registrations whose key starts with `prefix`
    fn get_reg(&self, prefix: &str) -> DialogResult<Vec<RegData>>;

    fn get_one_reg(&self, key: &str) -> DialogResult<Option<RegData>>;

    fn remove_reg(&self, key: &str) -> DialogResult<()>;

    /// Remove every registration whose key starts with `prefix`
    fn remove_all_reg(&self, prefix: &str) -> DialogResult<()>;

    fn get_all_reg(&self) -> DialogResult<Vec<RegData>>;
}

#[derive(Debug, Default)]
struct Storage {
    /// session id -> record JSON
    dialogs: HashMap<String, String>,
    /// registration key -> record JSON
    registry: HashMap<String, String>,
}

/// Process-local persistence holding JSON text
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    storage: Mutex<Storage>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw JSON under a session id
    pub fn insert_raw(&self, session_id: &str, json: &str) {
        self.storage
            .lock()
            .dialogs
            .insert(session_id.to_string(), json.to_string());
    }

    pub fn dialog_count(&self) -> usize {
        self.storage.lock().dialogs.len()
    }

    pub fn registration_count(&self) -> usize {
        self.storage.lock().registry.len()
    }
}

impl DialogPersistence for InMemoryPersistence {
    fn persist(&self, record: &DialogRecord) -> DialogResult<()> {
        let json = record.to_json()?;
        self.storage
            .lock()
            .dialogs
            .insert(record.session_id.clone(), json);
        Ok(())
    }

    fn get_all(&self) -> DialogResult<Vec<DialogRecord>> {
        let storage = self.storage.lock();
        storage
            .dialogs
            .values()
            .map(|json| DialogRecord::from_json(json))
            .collect()
    }

    fn remove_session(&self, session_id: &str) -> DialogResult<()> {
        self.storage.lock().dialogs.remove(session_id);
        Ok(())
    }

    fn remove_all_dialogs(&self, call_id: &str) -> DialogResult<()> {
        let doomed: Vec<String> = self
            .get_all()?
            .into_iter()
            .filter(|record| record.leg_a.call_id == call_id)
            .map(|record| record.session_id)
            .collect();
        let mut storage = self.storage.lock();
        for session_id in doomed {
            storage.dialogs.remove(&session_id);
        }
        Ok(())
    }

    fn persist_reg(&self, reg: &RegData) -> DialogResult<()> {
        reg.validate()?;
        let json = reg.to_json()?;
        info!(
            "Persisting registration {} for AOR: {} Binding: {}",
            reg.key, reg.aor, reg.contact
        );
        self.storage.lock().registry.insert(reg.key.clone(), json);
        Ok(())
    }

    fn get_reg(&self, prefix: &str) -> DialogResult<Vec<RegData>> {
        let storage = self.storage.lock();
        storage
            .registry
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(_, json)| RegData::from_json(json))
            .collect()
    }

    fn get_one_reg(&self, key: &str) -> DialogResult<Option<RegData>> {
        let storage = self.storage.lock();
        match storage.registry.get(key) {
            Some(json) => Ok(Some(RegData::from_json(json)?)),
            None => {
                debug!("Unable to find registration for {}", key);
                Ok(None)
            }
        }
    }

    fn remove_reg(&self, key: &str) -> DialogResult<()> {
        self.storage.lock().registry.remove(key);
        Ok(())
    }

    fn remove_all_reg(&self, prefix: &str) -> DialogResult<()> {
        self.storage
            .lock()
            .registry
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }

    fn get_all_reg(&self) -> DialogResult<Vec<RegData>> {
        let storage = self.storage.lock();
        storage.registry.values().map(|json| RegData::from_json(json)).collect()
    }
}
