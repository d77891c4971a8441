//! 2xx responses kept for ACK correlation
//!
//! An ACK for a 2xx is a new transaction, so the ACK engine recovers the
//! Via branch of the INVITE the 2xx answered from here. Responses are
//! stored as they arrive from the downstream UAS, keyed by the dialog id
//! as the receiver of the 2xx sees it plus `"<n> <METHOD>"`, and live for
//! the INVITE retransmission window.

use std::time::{Duration, Instant};

use b2bua_sip_core::SipMessage;
use b2bua_sip_core::types::cseq;
use dashmap::DashMap;
use tracing::{debug, trace};

/// Default lifetime: 64 * T1
pub const DEFAULT_TTL: Duration = Duration::from_secs(32);

/// `<dialog-id><n> <METHOD>`
pub fn cache_key(dialog_id: &str, cseq_number: u32, method: &str) -> String {
    format!("{}{} {}", dialog_id, cseq_number, method.to_ascii_uppercase())
}

#[derive(Debug)]
pub struct RetransmitCache {
    ttl: Duration,
    entries: DashMap<String, (SipMessage, Instant)>,
}

impl Default for RetransmitCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl RetransmitCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remember a 2xx received from downstream. Returns the key it was stored
    /// under, or `None` for anything that is not a 2xx with tags and CSeq.
    pub fn insert_2xx(&self, response: &SipMessage) -> Option<String> {
        if !response.is_response_family(200) {
            return None;
        }
        let dialog_id = response.dialog_id(false)?;
        let cseq_value = response.hdr_get("CSeq").ok()?;
        let (number, method) = cseq::parse(&cseq_value)?;
        let key = cache_key(&dialog_id, number, method);
        trace!("{} Caching 2xx under {}", response.context_id(), key);
        self.entries
            .insert(key.clone(), (response.clone(), Instant::now() + self.ttl));
        Some(key)
    }

    /// Live cached 2xx for `key`
    pub fn get(&self, key: &str) -> Option<SipMessage> {
        let entry = self.entries.get(key)?;
        let (response, deadline) = entry.value();
        if *deadline <= Instant::now() {
            return None;
        }
        Some(response.clone())
    }

    pub fn remove(&self, key: &str) -> Option<SipMessage> {
        self.entries.remove(key).map(|(_, (response, _))| response)
    }

    /// Drop expired responses; returns how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, deadline)| *deadline > now);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!("Purged {} expired 2xx response(s)", purged);
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_response() -> SipMessage {
        SipMessage::parse(
            "SIP/2.0 200 OK\r\n\
             Via: SIP/2.0/UDP 10.0.0.1;branch=z9hG4bK-xyz\r\n\
             From: <sip:a@h>;tag=caller\r\n\
             To: <sip:b@h>;tag=callee\r\n\
             Call-ID: c1\r\n\
             CSeq: 1 invite\r\n\r\n",
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let cache = RetransmitCache::default();
        let key = cache.insert_2xx(&ok_response()).unwrap();
        assert_eq!(key, "callercallee1 INVITE");
        let cached = cache.get(&key).unwrap();
        assert_eq!(cached.top_via_branch().as_deref(), Some("z9hG4bK-xyz"));
        assert!(cache.get("other1 INVITE").is_none());
    }

    #[test]
    fn test_non_2xx_ignored() {
        let cache = RetransmitCache::default();
        let ringing = SipMessage::parse(
            "SIP/2.0 180 Ringing\r\nFrom: <sip:a@h>;tag=1\r\nTo: <sip:b@h>;tag=2\r\nCSeq: 1 INVITE\r\n\r\n",
        )
        .unwrap();
        assert!(cache.insert_2xx(&ringing).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expiry() {
        let cache = RetransmitCache::new(Duration::ZERO);
        let key = cache.insert_2xx(&ok_response()).unwrap();
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }
}
