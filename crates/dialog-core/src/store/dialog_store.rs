//! Call-ID indexed dialog store
//!
//! One mutex guards the whole map. Each Call-ID maps to the list of
//! sessions correlated to it (a leg that retries or forks can reuse the
//! Call-ID), oldest first. A record is indexed under the Call-ID of every
//! leg it knows, so a request from either side finds it without a scan.
//!
//! Lookups and hooks call persistence after the map lock is released.
//! A sweep writes through while holding it: a copy it persists is never
//! older than what a concurrent remove or update left behind.

use std::collections::HashSet;
use std::sync::Arc;

use b2bua_sip_core::SipMessage;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::cache::{CacheEntry, ExpiringCache};
use super::persistence::{DialogPersistence, InMemoryPersistence};
use crate::codec::SessionInfo;
use crate::config::StoreConfig;
use crate::dialog::record::now_millis;
use crate::dialog::{DialogLeg, DialogRecord, LegIndex, RegData};
use crate::errors::{DialogError, DialogResult};

const REG_KEY_PREFIX: &str = "reg:";

fn reg_cache_key(key: &str) -> String {
    format!("{}{}", REG_KEY_PREFIX, key)
}

/// A resolved dialog plus the leg a message came from and the leg it goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogMatch {
    pub record: DialogRecord,
    pub sender: LegIndex,
    pub target: LegIndex,
}

impl DialogMatch {
    fn new(record: DialogRecord, sender: LegIndex) -> Self {
        Self {
            record,
            sender,
            target: sender.other(),
        }
    }

    pub fn sender_leg(&self) -> &DialogLeg {
        self.record.leg(self.sender)
    }

    pub fn target_leg(&self) -> &DialogLeg {
        self.record.leg(self.target)
    }
}

/// Outcome of one [`DialogStore::sweep`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Live sessions whose age was refreshed
    pub refreshed: usize,
    /// Sessions dropped because every key they were indexed under expired
    pub expired: usize,
    /// Registrations dropped
    pub expired_registrations: usize,
}

/// Sender leg of a request judged by tags: the peer's From tag is what the
/// leg stored as its `to`
fn sender_by_tags(record: &DialogRecord, from_tag: Option<&str>) -> Option<LegIndex> {
    let from_tag = from_tag?;
    if record.leg_a.to_tag() == Some(from_tag) {
        Some(LegIndex::A)
    } else if record.leg_b.to_tag() == Some(from_tag) {
        Some(LegIndex::B)
    } else {
        None
    }
}

pub struct DialogStore {
    cache: Mutex<ExpiringCache<CacheEntry>>,
    persistence: Arc<dyn DialogPersistence>,
    config: StoreConfig,
}

impl std::fmt::Debug for DialogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogStore")
            .field("entries", &self.cache.lock().len())
            .field("config", &self.config)
            .finish()
    }
}

impl DialogStore {
    pub fn new(persistence: Arc<dyn DialogPersistence>, config: StoreConfig) -> Self {
        Self {
            cache: Mutex::new(ExpiringCache::new(config.cache_lifetime())),
            persistence,
            config,
        }
    }

    /// Store backed by [`InMemoryPersistence`]
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(Arc::new(InMemoryPersistence::new()), config)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn persistence(&self) -> &Arc<dyn DialogPersistence> {
        &self.persistence
    }

    /// Number of Call-ID and registration keys held
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn has(&self, call_id: &str) -> bool {
        let cache = self.cache.lock();
        cache
            .peek(call_id)
            .and_then(CacheEntry::as_dialogs)
            .is_some_and(|list| !list.is_empty())
    }

    /// Index `record` under `call_id` and under every leg Call-ID it carries.
    ///
    /// A record with the same session id already on a list is replaced.
    pub fn add(&self, call_id: &str, record: DialogRecord) {
        let mut cache = self.cache.lock();
        Self::index(&mut cache, call_id, &record);
        debug!("Added session {} under Call-ID {}", record.session_id, call_id);
    }

    fn index(cache: &mut ExpiringCache<CacheEntry>, call_id: &str, record: &DialogRecord) {
        let mut keys: Vec<&str> = Vec::with_capacity(3);
        if !call_id.is_empty() {
            keys.push(call_id);
        }
        for id in record.call_ids() {
            if !keys.contains(&id) {
                keys.push(id);
            }
        }

        for key in keys {
            match cache.get_mut(key).and_then(CacheEntry::as_dialogs_mut) {
                Some(list) => match list.iter_mut().find(|r| r.session_id == record.session_id) {
                    Some(existing) => *existing = record.clone(),
                    None => list.push(record.clone()),
                },
                None => cache.insert(key, CacheEntry::Dialogs(vec![record.clone()])),
            }
        }
    }

    /// Replace every indexed copy of `record`; returns false if none existed
    fn replace(cache: &mut ExpiringCache<CacheEntry>, record: &DialogRecord) -> bool {
        let mut replaced = false;
        for (_, entry) in cache.values_mut() {
            if let Some(list) = entry.as_dialogs_mut() {
                for existing in list.iter_mut().filter(|r| r.session_id == record.session_id) {
                    *existing = record.clone();
                    replaced = true;
                }
            }
        }
        replaced
    }

    /// Drop `session_id` from every list; empty lists are removed
    fn unindex(cache: &mut ExpiringCache<CacheEntry>, session_id: &str) -> Option<DialogRecord> {
        let mut removed = None;
        let mut emptied = Vec::new();
        for (key, entry) in cache.values_mut() {
            if let Some(list) = entry.as_dialogs_mut() {
                if let Some(pos) = list.iter().position(|r| r.session_id == session_id) {
                    removed = Some(list.remove(pos));
                    if list.is_empty() {
                        emptied.push(key.clone());
                    }
                }
            }
        }
        for key in emptied {
            cache.remove(&key);
        }
        removed
    }

    /// Remove one session, from memory and from persistence
    pub fn remove(&self, call_id: &str, session_id: &str) -> DialogResult<Option<DialogRecord>> {
        let removed = {
            let mut cache = self.cache.lock();
            Self::unindex(&mut cache, session_id)
        };
        match &removed {
            Some(_) => debug!("Removed session {} (Call-ID {})", session_id, call_id),
            None => trace!("Session {} not cached (Call-ID {})", session_id, call_id),
        }
        self.persistence.remove_session(session_id)?;
        Ok(removed)
    }

    /// Remove every session correlated to `call_id`
    pub fn remove_all(&self, call_id: &str) -> DialogResult<Vec<DialogRecord>> {
        let removed: Vec<DialogRecord> = {
            let mut cache = self.cache.lock();
            let sessions: Vec<String> = cache
                .peek(call_id)
                .and_then(CacheEntry::as_dialogs)
                .map(|list| list.iter().map(|r| r.session_id.clone()).collect())
                .unwrap_or_default();
            cache.remove(call_id);
            sessions
                .iter()
                .filter_map(|session_id| Self::unindex(&mut cache, session_id))
                .collect()
        };
        for record in &removed {
            self.persistence.remove_session(&record.session_id)?;
        }
        self.persistence.remove_all_dialogs(call_id)?;
        info!("Removed {} session(s) for Call-ID {}", removed.len(), call_id);
        Ok(removed)
    }

    /// Find the session a message belongs to.
    ///
    /// With a single session on the Call-ID that session is returned
    /// (checked against `session_id` when given). With several sessions,
    /// `session_id` selects one; without it the tag heuristic applies: the
    /// request To tag (response From tag) is compared with leg A's From tag
    /// of the first session, then leg B's From tag of the last one.
    pub fn find_by_message(&self, msg: &SipMessage, session_id: Option<&str>) -> Option<DialogRecord> {
        let call_id = msg.call_id();
        if call_id.is_empty() {
            return None;
        }
        let mut cache = self.cache.lock();
        let list = cache.get_mut(&call_id).and_then(CacheEntry::as_dialogs_mut)?;

        if list.len() == 1 {
            let record = &list[0];
            return match session_id {
                Some(id) if id != record.session_id => None,
                _ => Some(record.clone()),
            };
        }

        if let Some(id) = session_id {
            return list.iter().find(|r| r.session_id == id).cloned();
        }

        let tag = if msg.is_request() { msg.to_tag() } else { msg.from_tag() };
        let tag = tag?;
        let first = list.first()?;
        if first.leg_a.from_tag() == Some(tag.as_str()) {
            return Some(first.clone());
        }
        let last = list.last()?;
        if last.leg_b.from_tag() == Some(tag.as_str()) {
            return Some(last.clone());
        }
        trace!("{} No session matches tag {} among {} candidates", msg.context_id(), tag, list.len());
        None
    }

    /// Scan every Call-ID list for `session_id`
    pub fn find_by_session(&self, session_id: &str) -> Option<DialogRecord> {
        let mut cache = self.cache.lock();
        cache
            .values_mut()
            .filter_map(|(_, entry)| entry.as_dialogs())
            .flat_map(|list| list.iter())
            .find(|r| r.session_id == session_id)
            .cloned()
    }

    /// Find the session plus sender and target legs for an in-dialog request.
    ///
    /// An explicit leg index in `session` names the sender; otherwise the
    /// request's From tag is matched against the stored legs.
    pub fn find_with_legs(&self, msg: &SipMessage, session: Option<&SessionInfo>) -> Option<DialogMatch> {
        let from_tag = msg.from_tag();
        let record = self.find_by_message(msg, session.map(|s| s.session_id.as_str()))?;
        let sender = match session.and_then(|s| s.leg) {
            Some(leg) => leg,
            None => sender_by_tags(&record, from_tag.as_deref())?,
        };
        Some(DialogMatch::new(record, sender))
    }

    /// Replace one leg of a stored session and index it under the leg's Call-ID
    pub fn update_leg(&self, session_id: &str, leg: DialogLeg, index: LegIndex) -> DialogResult<DialogRecord> {
        let mut cache = self.cache.lock();
        let mut record = cache
            .values_mut()
            .filter_map(|(_, entry)| entry.as_dialogs())
            .flat_map(|list| list.iter())
            .find(|r| r.session_id == session_id)
            .cloned()
            .ok_or_else(|| DialogError::not_found(session_id))?;

        *record.leg_mut(index) = leg;
        Self::replace(&mut cache, &record);
        let call_id = record.leg(index).call_id.clone();
        Self::index(&mut cache, &call_id, &record);
        trace!("Updated {} of session {}", index, session_id);
        Ok(record)
    }

    /// Replace every cached copy of `record`
    pub fn update(&self, record: &DialogRecord) -> DialogResult<()> {
        let mut cache = self.cache.lock();
        if Self::replace(&mut cache, record) {
            Ok(())
        } else {
            Err(DialogError::not_found(&record.session_id))
        }
    }

    /// Write `record` through to persistence
    pub fn persist(&self, record: &DialogRecord) -> DialogResult<()> {
        self.persistence.persist(record)
    }

    /// Load persisted sessions and registrations at startup.
    ///
    /// Sessions not seen alive within the stale-bootstrap window are
    /// deleted from persistence instead. Returns the number of sessions
    /// loaded.
    pub fn populate_from_store(&self) -> DialogResult<usize> {
        let records = self.persistence.get_all()?;
        let registrations = self.persistence.get_all_reg()?;
        let now = now_millis();
        let stale = self.config.stale_bootstrap().as_millis() as i64;

        let mut loaded = 0;
        let mut stale_sessions = Vec::new();
        {
            let mut cache = self.cache.lock();
            for record in records {
                if record.age_millis(now) >= stale || record.call_ids().is_empty() {
                    stale_sessions.push(record.session_id);
                    continue;
                }
                let call_id = record.leg_a.call_id.clone();
                Self::index(&mut cache, &call_id, &record);
                loaded += 1;
            }
            for reg in registrations {
                cache.insert(reg_cache_key(&reg.key), CacheEntry::Registration(reg));
            }
        }

        for session_id in &stale_sessions {
            self.persistence.remove_session(session_id)?;
        }
        info!(
            "Loaded {} session(s) from persistence, discarded {} stale",
            loaded,
            stale_sessions.len()
        );
        Ok(loaded)
    }

    /// One maintenance pass: refresh the age of live sessions, write them
    /// through, and drop what expired from memory and persistence
    pub fn sweep(&self) -> DialogResult<SweepStats> {
        let mut cache = self.cache.lock();
        let expired = cache.purge_expired();

        let mut seen = HashSet::new();
        for (_, entry) in cache.values_mut() {
            if let Some(list) = entry.as_dialogs_mut() {
                for record in list.iter_mut() {
                    record.touch();
                    if seen.insert(record.session_id.clone()) {
                        if let Err(e) = self.persistence.persist(record) {
                            warn!("Unable to persist session {}: {}", record.session_id, e);
                        }
                    }
                }
            }
        }

        let mut expired_sessions = Vec::new();
        let mut expired_regs = Vec::new();
        for (key, entry) in expired {
            match entry {
                CacheEntry::Dialogs(list) => expired_sessions.extend(
                    list.into_iter()
                        .map(|r| r.session_id)
                        .filter(|id| !seen.contains(id)),
                ),
                CacheEntry::Registration(reg) => {
                    trace!("Registration cache entry {} expired", key);
                    expired_regs.push(reg.key);
                }
            }
        }
        expired_sessions.sort();
        expired_sessions.dedup();

        for session_id in &expired_sessions {
            self.persistence.remove_session(session_id)?;
        }
        for key in &expired_regs {
            self.persistence.remove_reg(key)?;
        }
        drop(cache);

        let stats = SweepStats {
            refreshed: seen.len(),
            expired: expired_sessions.len(),
            expired_registrations: expired_regs.len(),
        };
        debug!("Dialog sweep: {:?}", stats);
        Ok(stats)
    }

    pub fn cache_registration(&self, reg: RegData) {
        self.cache
            .lock()
            .insert(reg_cache_key(&reg.key), CacheEntry::Registration(reg));
    }

    pub fn cached_registration(&self, key: &str) -> Option<RegData> {
        self.cache
            .lock()
            .get_mut(&reg_cache_key(key))
            .and_then(|entry| entry.as_registration().cloned())
    }

    pub fn forget_registration(&self, key: &str) -> Option<RegData> {
        match self.cache.lock().remove(&reg_cache_key(key)) {
            Some(CacheEntry::Registration(reg)) => Some(reg),
            _ => None,
        }
    }

    /// Drop every cached registration whose key starts with `prefix`
    pub fn forget_registrations(&self, prefix: &str) -> usize {
        let mut cache = self.cache.lock();
        let keys: Vec<String> = cache
            .values_mut()
            .filter(|(key, entry)| {
                entry.as_registration().is_some() && key.starts_with(&reg_cache_key(prefix))
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            cache.remove(key);
        }
        keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(call_id: &str, from: &str, to: &str) -> DialogLeg {
        DialogLeg {
            call_id: call_id.into(),
            from: format!("<sip:x@h>;tag={}", from),
            to: format!("<sip:y@h>;tag={}", to),
            ..Default::default()
        }
    }

    fn record(session_id: &str, call_id: &str) -> DialogRecord {
        let mut record = DialogRecord::new(session_id);
        record.leg_a = leg(call_id, "b2b-a", "caller");
        record.leg_b = leg(call_id, "b2b-b", "callee");
        record
    }

    fn request(call_id: &str, from_tag: &str, to_tag: &str) -> SipMessage {
        SipMessage::parse(format!(
            "BYE sip:u@h SIP/2.0\r\nCall-ID: {}\r\nFrom: <sip:a@h>;tag={}\r\nTo: <sip:b@h>;tag={}\r\nCSeq: 2 BYE\r\n\r\n",
            call_id, from_tag, to_tag
        ))
        .unwrap()
    }

    #[test]
    fn test_single_record_lookup() {
        let store = DialogStore::in_memory(StoreConfig::default());
        store.add("c1", record("s1", "c1"));
        assert!(store.has("c1"));

        let msg = request("c1", "whatever", "whatever");
        assert_eq!(store.find_by_message(&msg, None).unwrap().session_id, "s1");
        assert!(store.find_by_message(&msg, Some("s2")).is_none());
        assert!(store.find_by_message(&request("c2", "a", "b"), None).is_none());
    }

    #[test]
    fn test_sender_by_tags() {
        let store = DialogStore::in_memory(StoreConfig::default());
        store.add("c1", record("s1", "c1"));

        let from_caller = store.find_with_legs(&request("c1", "caller", "b2b-a"), None).unwrap();
        assert_eq!((from_caller.sender, from_caller.target), (LegIndex::A, LegIndex::B));
        let from_callee = store.find_with_legs(&request("c1", "callee", "b2b-b"), None).unwrap();
        assert_eq!(from_callee.sender, LegIndex::B);
        assert!(store.find_with_legs(&request("c1", "stranger", "b2b-a"), None).is_none());
    }

    #[test]
    fn test_indexed_under_both_call_ids() {
        let store = DialogStore::in_memory(StoreConfig::default());
        let mut rec = record("s1", "ca");
        rec.leg_b.call_id = "cb".into();
        store.add("ca", rec);
        assert!(store.has("ca"));
        assert!(store.has("cb"));

        store.remove("ca", "s1").unwrap();
        assert!(!store.has("ca"));
        assert!(!store.has("cb"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_leg_reindexes() {
        let store = DialogStore::in_memory(StoreConfig::default());
        store.add("ca", record("s1", "ca"));
        let updated = store
            .update_leg("s1", leg("cb", "b2b-b", "callee"), LegIndex::B)
            .unwrap();
        assert_eq!(updated.leg_b.call_id, "cb");
        assert_eq!(store.find_by_session("s1").unwrap().leg_b.call_id, "cb");
        assert!(store.has("cb"));
        assert!(matches!(
            store.update_leg("nope", DialogLeg::default(), LegIndex::A),
            Err(DialogError::DialogNotFound { .. })
        ));
    }

    #[test]
    fn test_registration_cache() {
        let store = DialogStore::in_memory(StoreConfig::default());
        let reg = RegData {
            key: "sbc-reg-1001-1".into(),
            aor: "sip:1001@h".into(),
            contact: "<sip:1001@10.0.0.9>".into(),
            ..Default::default()
        };
        store.cache_registration(reg.clone());
        assert_eq!(store.cached_registration("sbc-reg-1001-1"), Some(reg));
        assert!(!store.has("reg:sbc-reg-1001-1"));
        assert_eq!(store.forget_registrations("sbc-reg-1001"), 1);
        assert!(store.cached_registration("sbc-reg-1001-1").is_none());
    }
}
