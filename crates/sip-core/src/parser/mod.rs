//! Wire-level parsing helpers.

pub mod split;
pub mod start_line;
pub mod utils;

pub use split::{ParsedHead, header_split, header_tokenize, message_split, parse_head, strip_leading_junk};
pub use start_line::{RequestLine, StatusLine, parse_request_line, parse_status_line};
pub use utils::{BRANCH_MAGIC_COOKIE, create_branch, create_tag, unescape, unquote};

/// Maximum size of a message head (start line plus headers)
pub const MAX_HEADER_SIZE: usize = 64 * 1024;
/// Maximum size of a SIP message body
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024; // 16 MB
