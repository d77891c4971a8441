//! Back-to-back transaction context
//!
//! A [`B2bTransaction`] pairs the request received on one leg (the server
//! side) with the request sent on the other (the client side), together
//! with the connections each travelled on. Stages of the B2BUA pipeline
//! pass decisions to later stages through its string properties
//! (`leg1-contact`, `leg2-rr`, `session-id`, `leg-index`, ...).

use std::collections::HashMap;
use std::sync::Arc;

use b2bua_sip_core::SipMessage;
use parking_lot::Mutex;

use crate::transport::TransportInfo;

pub const LEG_IDENTIFIER: &str = "leg-identifier";
pub const LEG_INDEX: &str = "leg-index";
pub const SESSION_ID: &str = "session-id";
pub const NO_RTP_PROXY: &str = "no-rtp-proxy";

/// Transaction property holding the Contact generated for leg `index`
pub fn contact_property(index: u32) -> String {
    format!("leg{}-contact", index)
}

/// Transaction property holding the Record-Route generated for leg `index`
pub fn record_route_property(index: u32) -> String {
    format!("leg{}-rr", index)
}

#[derive(Debug)]
pub struct B2bTransaction {
    server_request: Arc<SipMessage>,
    server_transport: TransportInfo,
    client_request: Option<Arc<SipMessage>>,
    client_transport: Option<TransportInfo>,
    server_xor: bool,
    client_xor: bool,
    log_id: String,
    properties: Mutex<HashMap<String, String>>,
}

impl B2bTransaction {
    pub fn new(server_request: Arc<SipMessage>, server_transport: TransportInfo) -> Self {
        let log_id = server_request.context_id();
        Self {
            server_request,
            server_transport,
            client_request: None,
            client_transport: None,
            server_xor: false,
            client_xor: false,
            log_id,
            properties: Mutex::new(HashMap::new()),
        }
    }

    /// Attach the request sent on the other leg
    pub fn with_client(mut self, client_request: Arc<SipMessage>, client_transport: TransportInfo) -> Self {
        self.client_request = Some(client_request);
        self.client_transport = Some(client_transport);
        self
    }

    pub fn with_server_xor(mut self, enabled: bool) -> Self {
        self.server_xor = enabled;
        self
    }

    pub fn with_client_xor(mut self, enabled: bool) -> Self {
        self.client_xor = enabled;
        self
    }

    pub fn server_request(&self) -> &SipMessage {
        &self.server_request
    }

    pub fn server_transport(&self) -> &TransportInfo {
        &self.server_transport
    }

    pub fn client_request(&self) -> Option<&SipMessage> {
        self.client_request.as_deref()
    }

    pub fn client_transport(&self) -> Option<&TransportInfo> {
        self.client_transport.as_ref()
    }

    pub fn is_server_xor(&self) -> bool {
        self.server_xor
    }

    pub fn is_client_xor(&self) -> bool {
        self.client_xor
    }

    /// `[CID=xxxxxxxx]` prefix for log lines about this transaction
    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    pub fn property(&self, name: &str) -> Option<String> {
        self.properties.lock().get(name).cloned()
    }

    pub fn set_property(&self, name: &str, value: &str) {
        self.properties
            .lock()
            .insert(name.to_string(), value.to_string());
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.lock().contains_key(name)
    }
}
