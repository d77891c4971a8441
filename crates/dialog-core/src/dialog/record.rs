use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::leg::{DialogLeg, LegIndex};
use crate::errors::{DialogError, DialogResult};

/// Both legs of one B2BUA session.
///
/// Timestamps are milliseconds since the Unix epoch. `session_age` is the
/// last time the record was seen alive; bootstrap drops records whose age
/// is older than the stale threshold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DialogRecord {
    pub session_id: String,
    #[serde(rename = "leg1")]
    pub leg_a: DialogLeg,
    #[serde(rename = "leg2")]
    pub leg_b: DialogLeg,
    #[serde(rename = "timeStamp")]
    pub timestamp: i64,
    pub connect_time: i64,
    pub disconnect_time: i64,
    pub session_age: i64,
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl DialogRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            session_id: session_id.into(),
            timestamp: now,
            session_age: now,
            ..Default::default()
        }
    }

    pub fn leg(&self, index: LegIndex) -> &DialogLeg {
        match index {
            LegIndex::A => &self.leg_a,
            LegIndex::B => &self.leg_b,
        }
    }

    pub fn leg_mut(&mut self, index: LegIndex) -> &mut DialogLeg {
        match index {
            LegIndex::A => &mut self.leg_a,
            LegIndex::B => &mut self.leg_b,
        }
    }

    /// Distinct non-empty Call-IDs of both legs
    pub fn call_ids(&self) -> Vec<&str> {
        let mut ids = Vec::with_capacity(2);
        for id in [self.leg_a.call_id.as_str(), self.leg_b.call_id.as_str()] {
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Mark the record as alive now
    pub fn touch(&mut self) {
        self.session_age = now_millis();
    }

    /// Milliseconds since the record was last marked alive
    pub fn age_millis(&self, now: i64) -> i64 {
        now.saturating_sub(self.session_age)
    }

    pub fn to_json(&self) -> DialogResult<String> {
        serde_json::to_string(self).map_err(|e| DialogError::internal(e.to_string()))
    }

    pub fn from_json(text: &str) -> DialogResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip_keys() {
        let mut record = DialogRecord::new("s1");
        record.leg_a.call_id = "a".into();
        record.leg_b.call_id = "b".into();

        let json = record.to_json().unwrap();
        assert!(json.contains("\"sessionId\":\"s1\""));
        assert!(json.contains("\"leg1\""));
        assert!(json.contains("\"leg2\""));
        assert!(json.contains("\"timeStamp\""));
        assert!(json.contains("\"sessionAge\""));
        assert_eq!(DialogRecord::from_json(&json).unwrap(), record);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let record = DialogRecord::from_json(r#"{"sessionId":"s2","leg1":{"callId":"x"}}"#).unwrap();
        assert_eq!(record.session_id, "s2");
        assert_eq!(record.leg_a.call_id, "x");
        assert!(record.leg_b.call_id.is_empty());
    }

    #[test]
    fn test_corrupt_json() {
        assert!(matches!(
            DialogRecord::from_json("{\"sessionId\":"),
            Err(DialogError::CorruptedState { .. })
        ));
    }

    #[test]
    fn test_call_ids_deduplicated() {
        let mut record = DialogRecord::new("s");
        record.leg_a.call_id = "same".into();
        record.leg_b.call_id = "same".into();
        assert_eq!(record.call_ids(), vec!["same"]);
        record.leg_b.call_id = "other".into();
        assert_eq!(record.call_ids(), vec!["same", "other"]);
    }
}
