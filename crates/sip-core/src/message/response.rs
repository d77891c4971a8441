//! Building responses from a request.

use crate::error::{Error, Result};
use crate::types::{name_addr, status::reason_phrase};

use super::{CONTENT_LENGTH, SipMessage};

impl SipMessage {
    fn required(&self, name: &str) -> Result<String> {
        let value = self.hdr_get(name)?;
        if value.is_empty() {
            return Err(Error::InvalidHeader(format!("request has no {} header", name)));
        }
        Ok(value)
    }

    fn ensure_request(&self) -> Result<()> {
        if !self.is_request() {
            return Err(Error::InvalidState(
                "a response can only be created from a request".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy every Via and Record-Route of this request onto `target`
    fn copy_routing_headers(&self, target: &SipMessage) -> Result<()> {
        let vias = self.hdr_values("Via")?;
        if vias.is_empty() {
            return Err(Error::InvalidHeader("request has no Via header".to_string()));
        }
        for value in vias {
            target.hdr_list_append("Via", &value)?;
        }
        for value in self.hdr_values("Record-Route")? {
            target.hdr_list_append("Record-Route", &value)?;
        }
        Ok(())
    }

    /// Create a response to this request.
    ///
    /// From, To, Call-ID, CSeq, every Via and every Record-Route are copied.
    /// `to_tag` is added to To; it is an error if the request's To already
    /// carries a different tag. Content-Length is always 0.
    pub fn create_response(
        &self,
        status: u16,
        reason: Option<&str>,
        to_tag: Option<&str>,
        contact: Option<&str>,
    ) -> Result<SipMessage> {
        self.ensure_request()?;

        let to = self.required("To")?;
        let to_tag = to_tag.filter(|tag| !tag.is_empty());
        if let (Some(existing), Some(requested)) = (name_addr::tag(&to), to_tag) {
            if existing != requested {
                return Err(Error::InvalidState(format!(
                    "To tag '{}' already present, refusing '{}'",
                    existing, requested
                )));
            }
        }

        let phrase = reason
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| reason_phrase(status));
        let response = SipMessage::with_start_line(format!("SIP/2.0 {} {}", status, phrase));

        response.hdr_set("From", &self.required("From")?)?;
        let to = match to_tag {
            Some(tag) => name_addr::set_tag(&to, tag)?,
            None => to,
        };
        response.hdr_set("To", &to)?;
        response.hdr_set("Call-ID", &self.required("Call-ID")?)?;
        response.hdr_set("CSeq", &self.required("CSeq")?)?;
        if let Some(contact) = contact.filter(|c| !c.is_empty()) {
            response.hdr_list_append("Contact", contact)?;
        }
        self.copy_routing_headers(&response)?;
        response.hdr_set(CONTENT_LENGTH, "0")?;
        Ok(response)
    }

    /// Rewrite a response received on the other leg so it answers this
    /// request: From, To (keeping the response's To tag), Call-ID, CSeq,
    /// Via and Record-Route are taken from this request.
    pub fn reformat_response(&self, response: &SipMessage) -> Result<SipMessage> {
        self.ensure_request()?;

        let formatted = response.clone();
        let response_to_tag = response.to_tag();

        formatted.hdr_set("From", &self.required("From")?)?;
        let mut to = self.required("To")?;
        if let Some(tag) = response_to_tag {
            to = name_addr::set_tag(&to, &tag)?;
        }
        formatted.hdr_set("To", &to)?;
        formatted.hdr_set("Call-ID", &self.required("Call-ID")?)?;
        formatted.hdr_set("CSeq", &self.required("CSeq")?)?;

        formatted.hdr_list_remove("Via")?;
        formatted.hdr_list_remove("Record-Route")?;
        self.copy_routing_headers(&formatted)?;
        Ok(formatted)
    }
}
