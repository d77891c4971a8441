//! Session id / leg index correlation
//!
//! The B2BUA stamps the session id and the leg index on what it hands each
//! peer (Contact user-info, Contact URI parameters or a Record-Route), so
//! the peer's next in-dialog request carries them back. Decoding order on
//! an inbound request:
//!
//! 1. `sbc-session-id` / `sbc-call-index` on the Request-URI
//! 2. the same parameters on the top Route (the Route list is consumed)
//! 3. `<session>-<leg>` as the Request-URI user
//! 4. the `session-id` transaction property, leg unknown

use b2bua_sip_core::SipMessage;
use b2bua_sip_core::types::{route, uri};
use tracing::debug;

use crate::dialog::LegIndex;
use crate::errors::DialogResult;
use crate::transaction::{B2bTransaction, SESSION_ID};

pub const SESSION_ID_PARAM: &str = "sbc-session-id";
pub const CALL_INDEX_PARAM: &str = "sbc-call-index";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: String,
    /// `None` when the peer did not say which leg it is
    pub leg: Option<LegIndex>,
}

impl SessionInfo {
    pub fn new(session_id: impl Into<String>, leg: LegIndex) -> Self {
        Self {
            session_id: session_id.into(),
            leg: Some(leg),
        }
    }

    /// Wire form of the leg index; 0 when unknown
    pub fn call_index(&self) -> u32 {
        self.leg.map_or(0, LegIndex::as_index)
    }
}

/// `<session>-<leg>`
pub fn encode_user_info(info: &SessionInfo) -> String {
    format!("{}-{}", info.session_id, info.call_index())
}

/// Split a URI user on its last `-`; the trailing token must be one digit
pub fn decode_user_info(user: &str) -> Option<SessionInfo> {
    let (session_id, index) = user.rsplit_once('-')?;
    if session_id.is_empty() || index.len() != 1 {
        return None;
    }
    let index: u32 = index.parse().ok()?;
    Some(SessionInfo {
        session_id: session_id.to_string(),
        leg: LegIndex::from_index(index),
    })
}

/// `;sbc-session-id=...;sbc-call-index=...` on a bare URI
pub fn encode_params(target: &str, info: &SessionInfo) -> DialogResult<String> {
    let mut out = target.to_string();
    if !info.session_id.is_empty() {
        out = uri::set_param(&out, SESSION_ID_PARAM, &info.session_id)?;
    }
    if let Some(leg) = info.leg {
        out = uri::set_param(&out, CALL_INDEX_PARAM, &leg.as_index().to_string())?;
    }
    Ok(out)
}

/// Both parameters must be present on the URI
pub fn decode_params(target: &str) -> Option<SessionInfo> {
    let session_id = uri::param(target, SESSION_ID_PARAM).filter(|s| !s.is_empty())?;
    let index = uri::param(target, CALL_INDEX_PARAM)?;
    Some(SessionInfo {
        session_id: session_id.to_string(),
        leg: index.trim().parse().ok().and_then(LegIndex::from_index),
    })
}

/// Recover session information from an inbound in-dialog request.
///
/// `Ok(None)` means nothing identifies the session; callers fall back to
/// tag matching.
pub fn decode_session_info(
    msg: &SipMessage,
    tx: Option<&B2bTransaction>,
) -> DialogResult<Option<SessionInfo>> {
    let Some(request_uri) = msg.request_uri() else {
        return Ok(None);
    };

    if let Some(info) = decode_params(&request_uri) {
        debug!("{} Session-ID in Params - {}", msg.context_id(), encode_user_info(&info));
        return Ok(Some(info));
    }

    if let Some(top) = route::msg_get_top_route(msg)? {
        if let Some(info) = route::uri_at(&top, 0).and_then(decode_params) {
            msg.hdr_list_remove(route::ROUTE)?;
            debug!("{} Session-ID in Route Header - {}", msg.context_id(), encode_user_info(&info));
            return Ok(Some(info));
        }
    }

    if let Some(info) = uri::user(&request_uri).and_then(decode_user_info) {
        debug!("{} Session-ID in User Info - {}", msg.context_id(), encode_user_info(&info));
        return Ok(Some(info));
    }

    if let Some(session_id) = tx.and_then(|tx| tx.property(SESSION_ID)).filter(|s| !s.is_empty()) {
        debug!("{} Session-ID from transaction - {}", msg.context_id(), session_id);
        return Ok(Some(SessionInfo {
            session_id,
            leg: None,
        }));
    }

    debug!("{} Unable to parse Session-ID for request {}", msg.context_id(), request_uri);
    Ok(None)
}
