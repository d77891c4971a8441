//! Name-addr / addr-spec values as carried by From, To, Contact and Route.
//!
//! ```text
//! [display-name] "<" uri ">" *( ";" header-param )
//! uri *( ";" header-param )
//! ```
//!
//! In the flat (unbracketed) form everything after the first `;` belongs to
//! the header, not the URI. Any write that leaves `;`, `,` or `?` inside the
//! URI therefore switches the value to the bracketed form.

use std::fmt;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::parser::utils::{find_unquoted, unquote};
use crate::types::{params, uri};

#[derive(Debug, Clone)]
struct Layout {
    display: Option<Range<usize>>,
    uri: Range<usize>,
    enclosed: bool,
    params: Range<usize>,
}

fn layout(value: &str) -> Option<Layout> {
    if value.trim().is_empty() {
        return None;
    }
    match find_unquoted(value, '<') {
        Some(open) => {
            let close = open + value[open..].find('>')?;
            let display = value[..open].trim();
            let display = if display.is_empty() {
                None
            } else {
                let start = value[..open].find(display).unwrap_or(0);
                Some(start..start + display.len())
            };
            let params_start = value[close + 1..]
                .find(';')
                .map(|i| close + 1 + i)
                .unwrap_or(value.len());
            Some(Layout {
                display,
                uri: open + 1..close,
                enclosed: true,
                params: params_start..value.trim_end().len().max(params_start),
            })
        }
        None => {
            let start = value.len() - value.trim_start().len();
            let end = value.trim_end().len();
            let uri_end = value[start..end].find(';').map(|i| start + i).unwrap_or(end);
            Some(Layout {
                display: None,
                uri: start..uri_end,
                enclosed: false,
                params: uri_end..end,
            })
        }
    }
}

fn require(value: &str) -> Result<Layout> {
    layout(value).ok_or_else(|| Error::InvalidHeader(format!("not a name-addr: '{}'", value)))
}

fn needs_brackets(uri: &str) -> bool {
    uri.contains([';', ',', '?'])
}

fn assemble(display: Option<&str>, uri: &str, header_params: &str, force_enclosed: bool) -> String {
    let mut out = String::with_capacity(uri.len() + header_params.len() + 16);
    let display = display.filter(|d| !d.is_empty());
    if let Some(display) = display {
        out.push_str(display);
        out.push(' ');
    }
    if force_enclosed || display.is_some() || needs_brackets(uri) {
        out.push('<');
        out.push_str(uri);
        out.push('>');
    } else {
        out.push_str(uri);
    }
    out.push_str(header_params);
    out
}

/// Display name exactly as written (quotes retained)
pub fn display_name(value: &str) -> Option<&str> {
    layout(value).and_then(|l| l.display).map(|r| &value[r])
}

/// Display name with surrounding quotes removed
pub fn display_name_unquoted(value: &str) -> Option<&str> {
    display_name(value).map(unquote)
}

/// Replace the display name; an empty name removes it
pub fn set_display_name(value: &str, display: &str) -> Result<String> {
    let l = require(value)?;
    Ok(assemble(
        Some(display),
        &value[l.uri.clone()],
        &value[l.params.clone()],
        l.enclosed,
    ))
}

pub fn get_uri(value: &str) -> Option<&str> {
    layout(value).map(|l| value[l.uri].trim())
}

/// Replace the URI, bracketing the value if the new URI requires it
pub fn set_uri(value: &str, new_uri: &str) -> Result<String> {
    let l = require(value)?;
    let display = l.display.clone().map(|r| &value[r]);
    Ok(assemble(display, new_uri, &value[l.params.clone()], l.enclosed))
}

/// Header parameter section including its leading `;`
pub fn header_params(value: &str) -> &str {
    layout(value).map(|l| &value[l.params]).unwrap_or("")
}

/// Replace the whole header parameter section. `params` may omit the leading `;`.
pub fn set_header_params(value: &str, new_params: &str) -> Result<String> {
    let l = require(value)?;
    let normalized = if new_params.is_empty() || new_params.starts_with(';') {
        new_params.to_string()
    } else {
        format!(";{}", new_params)
    };
    let display = l.display.clone().map(|r| &value[r]);
    Ok(assemble(display, &value[l.uri.clone()], &normalized, l.enclosed))
}

pub fn header_param<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    params::get_param(header_params(value), name)
}

pub fn set_header_param(value: &str, name: &str, param_value: &str) -> Result<String> {
    let updated = params::set_param(header_params(value), name, param_value);
    set_header_params(value, &updated)
}

pub fn remove_header_param(value: &str, name: &str) -> Result<String> {
    let updated = params::remove_param(header_params(value), name);
    set_header_params(value, &updated)
}

pub fn tag(value: &str) -> Option<&str> {
    header_param(value, "tag").filter(|t| !t.is_empty())
}

pub fn set_tag(value: &str, tag: &str) -> Result<String> {
    if tag.is_empty() {
        return remove_header_param(value, "tag");
    }
    set_header_param(value, "tag", tag)
}

/// Parameter of the enclosed URI (not the header)
pub fn uri_param<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    uri::param(get_uri(value)?, name)
}

pub fn set_uri_param(value: &str, name: &str, param_value: &str) -> Result<String> {
    let current = get_uri(value).ok_or_else(|| Error::InvalidUri(value.to_string()))?;
    let updated = uri::set_param(current, name, param_value)?;
    set_uri(value, &updated)
}

pub fn remove_uri_param(value: &str, name: &str) -> Result<String> {
    let current = get_uri(value).ok_or_else(|| Error::InvalidUri(value.to_string()))?;
    let updated = uri::remove_param(current, name)?;
    set_uri(value, &updated)
}

pub fn user(value: &str) -> Option<&str> {
    uri::user(get_uri(value)?)
}

pub fn set_user(value: &str, user: &str) -> Result<String> {
    let current = get_uri(value).ok_or_else(|| Error::InvalidUri(value.to_string()))?;
    set_uri(value, &uri::set_user(current, user)?)
}

pub fn host_port(value: &str) -> Option<&str> {
    uri::host_port(get_uri(value)?)
}

pub fn set_host_port(value: &str, host_port: &str) -> Result<String> {
    let current = get_uri(value).ok_or_else(|| Error::InvalidUri(value.to_string()))?;
    set_uri(value, &uri::set_host_port(current, host_port)?)
}

pub fn host(value: &str) -> Option<&str> {
    uri::host(get_uri(value)?)
}

pub fn port(value: &str) -> Option<u16> {
    uri::port(get_uri(value)?)
}

/// Address of record: `[scheme:]user@host[:port]`
pub fn aor(value: &str, include_scheme: bool) -> Option<String> {
    uri::identity(get_uri(value)?, include_scheme)
}

/// Owned name-addr wrapper used for From and To
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameAddr {
    data: String,
}

pub type From = NameAddr;
pub type To = NameAddr;

impl NameAddr {
    pub fn new(data: impl Into<String>) -> Self {
        NameAddr { data: data.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn display_name(&self) -> Option<&str> {
        display_name_unquoted(&self.data)
    }

    pub fn uri(&self) -> Option<&str> {
        get_uri(&self.data)
    }

    pub fn user(&self) -> Option<&str> {
        user(&self.data)
    }

    pub fn host_port(&self) -> Option<&str> {
        host_port(&self.data)
    }

    pub fn tag(&self) -> Option<&str> {
        tag(&self.data)
    }

    pub fn header_param(&self, name: &str) -> Option<&str> {
        header_param(&self.data, name)
    }

    pub fn aor(&self, include_scheme: bool) -> Option<String> {
        aor(&self.data, include_scheme)
    }

    pub fn set_tag(&mut self, value: &str) -> Result<()> {
        self.data = set_tag(&self.data, value)?;
        Ok(())
    }

    pub fn set_uri(&mut self, value: &str) -> Result<()> {
        self.data = set_uri(&self.data, value)?;
        Ok(())
    }

    pub fn set_user(&mut self, value: &str) -> Result<()> {
        self.data = set_user(&self.data, value)?;
        Ok(())
    }

    pub fn set_host_port(&mut self, value: &str) -> Result<()> {
        self.data = set_host_port(&self.data, value)?;
        Ok(())
    }

    pub fn set_header_param(&mut self, name: &str, value: &str) -> Result<()> {
        self.data = set_header_param(&self.data, name, value)?;
        Ok(())
    }

    pub fn set_uri_param(&mut self, name: &str, value: &str) -> Result<()> {
        self.data = set_uri_param(&self.data, name, value)?;
        Ok(())
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

impl AsRef<str> for NameAddr {
    fn as_ref(&self) -> &str {
        &self.data
    }
}
