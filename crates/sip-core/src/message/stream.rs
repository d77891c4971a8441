//! Byte-at-a-time consumer for stream transports.
//!
//! The consumer is resumable: a message may arrive split at any byte and the
//! result is the same as consuming it in one call. Untrusted input never
//! panics; every syntax violation ends in [`ConsumeResult::Malformed`].

use tracing::trace;

use crate::error::{Error, Result};
use crate::headers::HeaderTokenStore;
use crate::parser::split::{ParsedHead, is_message_start_byte, parse_head};
use crate::parser::{MAX_BODY_SIZE, MAX_HEADER_SIZE};

/// Outcome of feeding bytes to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeResult<'a> {
    /// The message is complete; the slice holds the unread remainder of the input
    Complete(&'a [u8]),
    /// More bytes are needed
    Incomplete,
    /// The input can never form a valid message
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ConsumeState {
    #[default]
    Idle,
    StartLine,
    StartLineLf,
    HeaderLineStart,
    HeaderName,
    HeaderValue,
    HeaderLf,
    BlankLineLf,
    ExpectingBody,
    Done,
    Failed,
}

/// Accumulated state of an in-progress stream parse
#[derive(Debug, Clone, Default)]
pub(crate) struct StreamParser {
    pub(crate) state: ConsumeState,
    /// Bytes seen before the start line; never part of the message
    idle_buffer: Vec<u8>,
    head: Vec<u8>,
    body: Vec<u8>,
    content_length: usize,
    header_count: usize,
}

/// A message head and body produced by a finished stream parse
#[derive(Debug)]
pub(crate) struct StreamedMessage {
    pub(crate) head: ParsedHead,
    pub(crate) body: Vec<u8>,
}

fn is_ctl(b: u8) -> bool {
    b < 0x20 || b == 0x7f
}

impl StreamParser {
    /// Number of junk bytes dropped ahead of the start line so far
    pub(crate) fn idle_bytes(&self) -> usize {
        self.idle_buffer.len()
    }

    /// Feed `input`; on completion returns how many bytes were consumed
    pub(crate) fn feed(&mut self, input: &[u8]) -> Result<Option<usize>> {
        if self.state == ConsumeState::Failed {
            return Err(Error::Malformed("stream already failed".to_string()));
        }
        let mut i = 0usize;
        while i < input.len() {
            if self.state == ConsumeState::ExpectingBody {
                let wanted = self.content_length - self.body.len();
                let take = wanted.min(input.len() - i);
                self.body.extend_from_slice(&input[i..i + take]);
                i += take;
                if self.body.len() == self.content_length {
                    self.state = ConsumeState::Done;
                    return Ok(Some(i));
                }
                continue;
            }

            let b = input[i];
            i += 1;
            match self.step(b) {
                Ok(()) => {}
                Err(e) => {
                    self.state = ConsumeState::Failed;
                    return Err(e);
                }
            }
            if self.state == ConsumeState::Done {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    fn push_head(&mut self, b: u8) -> Result<()> {
        if self.head.len() >= MAX_HEADER_SIZE {
            return Err(Error::Malformed(format!(
                "message head exceeds {} bytes",
                MAX_HEADER_SIZE
            )));
        }
        self.head.push(b);
        Ok(())
    }

    fn step(&mut self, b: u8) -> Result<()> {
        use ConsumeState::*;

        match self.state {
            Idle => {
                if is_message_start_byte(b) {
                    self.push_head(b)?;
                    self.state = StartLine;
                } else {
                    self.idle_buffer.push(b);
                }
            }
            StartLine => match b {
                b'\r' => {
                    self.push_head(b)?;
                    self.state = StartLineLf;
                }
                b'\t' => self.push_head(b)?,
                _ if is_ctl(b) => return Err(malformed("control byte in start line", b)),
                _ => self.push_head(b)?,
            },
            StartLineLf => {
                if b != b'\n' {
                    return Err(malformed("start line CR not followed by LF", b));
                }
                self.push_head(b)?;
                self.state = HeaderLineStart;
            }
            HeaderLineStart => match b {
                b'\r' => {
                    self.push_head(b)?;
                    self.state = BlankLineLf;
                }
                b' ' | b'\t' if self.header_count > 0 => {
                    self.push_head(b)?;
                    self.state = HeaderValue;
                }
                _ if b.is_ascii_graphic() && b != b':' => {
                    self.push_head(b)?;
                    self.header_count += 1;
                    self.state = HeaderName;
                }
                _ => return Err(malformed("invalid header line start", b)),
            },
            HeaderName => match b {
                b':' => {
                    self.push_head(b)?;
                    self.state = HeaderValue;
                }
                b' ' | b'\t' => self.push_head(b)?,
                _ if is_ctl(b) || !b.is_ascii() => return Err(malformed("invalid byte in header name", b)),
                _ => self.push_head(b)?,
            },
            HeaderValue => match b {
                b'\r' => {
                    self.push_head(b)?;
                    self.state = HeaderLf;
                }
                b'\t' => self.push_head(b)?,
                _ if is_ctl(b) => return Err(malformed("control byte in header value", b)),
                _ => self.push_head(b)?,
            },
            HeaderLf => {
                if b != b'\n' {
                    return Err(malformed("header CR not followed by LF", b));
                }
                self.push_head(b)?;
                self.state = HeaderLineStart;
            }
            BlankLineLf => {
                if b != b'\n' {
                    return Err(malformed("blank line CR not followed by LF", b));
                }
                self.push_head(b)?;
                self.content_length = self.declared_length()?;
                self.state = if self.content_length > 0 { ExpectingBody } else { Done };
            }
            ExpectingBody | Done | Failed => {}
        }
        Ok(())
    }

    /// Content-Length of the buffered head; absent means zero
    fn declared_length(&self) -> Result<usize> {
        let head = parse_head(&self.head)?;
        let Some((_, value)) = head
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
        else {
            return Ok(0);
        };
        let length: usize = value
            .trim()
            .parse()
            .map_err(|_| Error::Malformed(format!("invalid Content-Length '{}'", value)))?;
        if length > MAX_BODY_SIZE {
            return Err(Error::Malformed(format!(
                "Content-Length {} exceeds {} bytes",
                length, MAX_BODY_SIZE
            )));
        }
        trace!("head complete, expecting {} body bytes", length);
        Ok(length)
    }

    /// Take the finished head and body, leaving the parser in `Done`
    pub(crate) fn take(&mut self) -> Result<StreamedMessage> {
        let head = parse_head(&self.head)?;
        let body = std::mem::take(&mut self.body);
        self.head.clear();
        self.idle_buffer.clear();
        Ok(StreamedMessage { head, body })
    }
}

fn malformed(what: &str, b: u8) -> Error {
    Error::Malformed(format!("{} (0x{:02x})", what, b))
}

/// Load a parsed head into a header store
pub(crate) fn load_headers(store: &mut HeaderTokenStore, head: &ParsedHead) {
    for (name, value) in &head.headers {
        store.push_parsed(name, value);
    }
}
