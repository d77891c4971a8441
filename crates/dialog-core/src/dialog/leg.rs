use std::fmt;

use b2bua_sip_core::types::name_addr;
use serde::{Deserialize, Serialize};

/// Which side of the B2BUA a leg faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegIndex {
    /// Leg 1, facing the caller (UAS side)
    A,
    /// Leg 2, facing the callee (UAC side)
    B,
}

impl LegIndex {
    /// Parse the wire form (`1` or `2`)
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            1 => Some(Self::A),
            2 => Some(Self::B),
            _ => None,
        }
    }

    pub fn as_index(self) -> u32 {
        match self {
            Self::A => 1,
            Self::B => 2,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for LegIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leg-{}", self.as_index())
    }
}

/// Dialog-forming header state of one call leg, as last observed.
///
/// `route_set` keeps the next hop as its *last* element: the UAS-facing leg
/// stores the Record-Route list reversed, the UAC-facing leg stores it in
/// wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DialogLeg {
    pub dialog_id: String,
    pub call_id: String,
    pub from: String,
    pub to: String,
    pub remote_contact: String,
    pub local_contact: String,
    pub local_record_route: String,
    /// `ip:port` the leg's last request came from
    pub remote_ip: String,
    pub transport_id: String,
    pub target_transport: String,
    pub local_sdp: String,
    pub remote_sdp: String,
    pub route_set: Vec<String>,
    #[serde(rename = "localCSeq")]
    pub local_cseq: u32,
    pub encryption: String,
    pub no_rtp_proxy: bool,
}

impl DialogLeg {
    pub fn from_tag(&self) -> Option<&str> {
        name_addr::tag(&self.from)
    }

    pub fn to_tag(&self) -> Option<&str> {
        name_addr::tag(&self.to)
    }

    pub fn is_xor(&self) -> bool {
        self.encryption == "xor"
    }

    /// Record-Route values from the message, stored so the next hop is last
    pub(crate) fn set_route_set(&mut self, record_routes: Vec<String>, reversed: bool) {
        if record_routes.is_empty() {
            return;
        }
        self.route_set = record_routes;
        if reversed {
            self.route_set.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg_index() {
        assert_eq!(LegIndex::from_index(1), Some(LegIndex::A));
        assert_eq!(LegIndex::from_index(2), Some(LegIndex::B));
        assert_eq!(LegIndex::from_index(3), None);
        assert_eq!(LegIndex::A.other(), LegIndex::B);
        assert_eq!(LegIndex::B.to_string(), "leg-2");
    }

    #[test]
    fn test_json_keys() {
        let leg = DialogLeg {
            call_id: "cid".into(),
            local_cseq: 7,
            no_rtp_proxy: true,
            route_set: vec!["<sip:p1;lr>".into()],
            ..Default::default()
        };
        let json = serde_json::to_value(&leg).unwrap();
        assert_eq!(json["callId"], "cid");
        assert_eq!(json["localCSeq"], 7);
        assert_eq!(json["noRtpProxy"], true);
        assert_eq!(json["routeSet"][0], "<sip:p1;lr>");
    }

    #[test]
    fn test_route_set_capture() {
        let mut leg = DialogLeg::default();
        leg.set_route_set(vec!["<sip:a;lr>".into(), "<sip:b;lr>".into()], true);
        assert_eq!(leg.route_set, vec!["<sip:b;lr>", "<sip:a;lr>"]);

        leg.set_route_set(Vec::new(), false);
        assert_eq!(leg.route_set.len(), 2);
    }
}
