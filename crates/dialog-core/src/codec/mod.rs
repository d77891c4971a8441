//! Codecs stamping B2BUA state onto outbound messages
//!
//! - [`session`]: session id / leg index carried in Contact, Request-URI
//!   or Record-Route and recovered from the peer's next request
//! - [`contact`]: Contact and Via generation for the leg a message leaves on
//! - [`register`]: REGISTER binding rewrite (`sbc-reg`)

pub mod contact;
pub mod register;
pub mod session;

pub use contact::{advertised_host_port, construct_via, transform, transport_scheme_for};
pub use register::{REG_PREFIX, is_register_route, registration_key, transform_register};
pub use session::{
    CALL_INDEX_PARAM, SESSION_ID_PARAM, SessionInfo, decode_params, decode_session_info,
    decode_user_info, encode_params, encode_user_info,
};
