use serde::{Deserialize, Serialize};

use crate::errors::{DialogError, DialogResult};

/// A REGISTER binding relayed through the B2BUA
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegData {
    pub contact: String,
    pub packet_source: String,
    pub local_interface: String,
    pub transport_id: String,
    pub target_transport: String,
    pub aor: String,
    pub expires: u32,
    pub enc: String,
    pub key: String,
    pub call_id: String,
}

impl RegData {
    /// Key, AOR and contact are required
    pub fn validate(&self) -> DialogResult<()> {
        for (name, value) in [("key", &self.key), ("aor", &self.aor), ("contact", &self.contact)] {
            if value.is_empty() {
                return Err(DialogError::invalid_registration(format!("{} is empty", name)));
            }
        }
        Ok(())
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
    fn test_validate() {
        let mut reg = RegData {
            key: "sbc-reg-1001-42".into(),
            aor: "sip:1001@example.com".into(),
            contact: "<sip:1001@10.0.0.9:5060>".into(),
            ..Default::default()
        };
        assert!(reg.validate().is_ok());
        reg.aor.clear();
        assert!(matches!(
            reg.validate(),
            Err(DialogError::InvalidRegistration { .. })
        ));
    }

    #[test]
    fn test_json_keys() {
        let reg = RegData {
            packet_source: "10.0.0.9:5060".into(),
            call_id: "c".into(),
            ..Default::default()
        };
        let json = reg.to_json().unwrap();
        assert!(json.contains("\"packetSource\""));
        assert!(json.contains("\"callId\""));
        assert_eq!(RegData::from_json(&json).unwrap(), reg);
    }
}
