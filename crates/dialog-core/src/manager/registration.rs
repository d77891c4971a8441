//! Registration records relayed through the B2BUA
//!
//! Lookups hit the in-memory cache first and fall back to persistence;
//! prefix queries always go to persistence.

use tracing::{debug, info};

use super::DialogStateManager;
use crate::dialog::RegData;
use crate::errors::DialogResult;

impl DialogStateManager {
    /// Store a registration; records without key, AOR or contact are rejected
    pub fn add_registration(&self, reg: RegData) -> DialogResult<()> {
        reg.validate()?;
        self.store.persistence().persist_reg(&reg)?;
        debug!("Registration {} stored for {}", reg.key, reg.aor);
        self.store.cache_registration(reg);
        Ok(())
    }

    /// Registrations whose key starts with `prefix`
    pub fn find_registrations(&self, prefix: &str) -> DialogResult<Vec<RegData>> {
        self.store.persistence().get_reg(prefix)
    }

    pub fn find_one_registration(&self, key: &str) -> DialogResult<Option<RegData>> {
        if let Some(reg) = self.store.cached_registration(key) {
            return Ok(Some(reg));
        }
        let reg = self.store.persistence().get_one_reg(key)?;
        if let Some(reg) = &reg {
            self.store.cache_registration(reg.clone());
        }
        Ok(reg)
    }

    pub fn remove_registration(&self, key: &str) -> DialogResult<()> {
        self.store.forget_registration(key);
        self.store.persistence().remove_reg(key)
    }

    /// Remove every registration whose key starts with `prefix`
    pub fn remove_all_registrations(&self, prefix: &str) -> DialogResult<()> {
        let forgotten = self.store.forget_registrations(prefix);
        self.store.persistence().remove_all_reg(prefix)?;
        info!("Removed registrations under {} ({} cached)", prefix, forgotten);
        Ok(())
    }

    pub fn all_registrations(&self) -> DialogResult<Vec<RegData>> {
        self.store.persistence().get_all_reg()
    }
}
