//! Time-to-live cache backing the dialog store.
//!
//! Entries carry a typed payload ([`CacheEntry`]) so the kind of data under
//! a key is fixed when the entry is built. Reading an entry refreshes its
//! deadline; [`ExpiringCache::purge_expired`] drops what nobody touched.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::dialog::{DialogRecord, RegData};

/// Payload stored under one cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// Every session correlated to one Call-ID, oldest first
    Dialogs(Vec<DialogRecord>),
    Registration(RegData),
}

impl CacheEntry {
    pub fn as_dialogs(&self) -> Option<&Vec<DialogRecord>> {
        match self {
            Self::Dialogs(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dialogs_mut(&mut self) -> Option<&mut Vec<DialogRecord>> {
        match self {
            Self::Dialogs(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_registration(&self) -> Option<&RegData> {
        match self {
            Self::Registration(reg) => Some(reg),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    deadline: Instant,
}

/// Map whose entries expire `lifetime` after their last access
#[derive(Debug)]
pub struct ExpiringCache<V> {
    lifetime: Duration,
    slots: HashMap<String, Slot<V>>,
}

impl<V> ExpiringCache<V> {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            slots: HashMap::new(),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True if `key` holds a live entry
    pub fn has(&self, key: &str) -> bool {
        self.has_at(key, Instant::now())
    }

    fn has_at(&self, key: &str, now: Instant) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.deadline > now)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let deadline = Instant::now() + self.lifetime;
        self.slots.insert(key.into(), Slot { value, deadline });
    }

    /// Live entry for `key`, refreshing its deadline
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let now = Instant::now();
        let lifetime = self.lifetime;
        let slot = self.slots.get_mut(key).filter(|slot| slot.deadline > now)?;
        slot.deadline = now + lifetime;
        Some(&mut slot.value)
    }

    /// Live entry for `key` without refreshing it
    pub fn peek(&self, key: &str) -> Option<&V> {
        let now = Instant::now();
        self.slots
            .get(key)
            .filter(|slot| slot.deadline > now)
            .map(|slot| &slot.value)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.slots.remove(key).map(|slot| slot.value)
    }

    /// Drop expired entries and hand them back
    pub fn purge_expired(&mut self) -> Vec<(String, V)> {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&mut self, now: Instant) -> Vec<(String, V)> {
        let expired: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|key| self.slots.remove(&key).map(|slot| (key, slot.value)))
            .collect()
    }

    /// Live entries, for in-place updates that must not refresh deadlines
    pub fn values_mut(&mut self) -> impl Iterator<Item = (&String, &mut V)> {
        let now = Instant::now();
        self.slots
            .iter_mut()
            .filter(move |(_, slot)| slot.deadline > now)
            .map(|(key, slot)| (key, &mut slot.value))
    }
}
