//! SIP URI field parser.
//!
//! `scheme ":" [ user [ ":" password ] "@" ] host [ ":" port ] *( ";" param ) [ "?" headers ]`
//!
//! The free functions operate on raw URI text and return borrowed slices or
//! rebuilt strings; [`Uri`] is a thin owned wrapper over the same functions.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::params;

/// Byte ranges of the URI components inside the raw text
#[derive(Debug, Clone)]
struct UriLayout {
    scheme: Range<usize>,
    user_info: Option<Range<usize>>,
    host_port: Range<usize>,
    params: Range<usize>,
    headers: Option<Range<usize>>,
}

fn layout(uri: &str) -> Option<UriLayout> {
    let uri_trimmed = uri.trim_end();
    let colon = uri_trimmed.find(':')?;
    let scheme = &uri_trimmed[..colon];
    if scheme.is_empty()
        || !scheme
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
    {
        return None;
    }

    let rest_start = colon + 1;
    let rest = &uri_trimmed[rest_start..];

    let (user_info, host_start) = match rest.find('@') {
        Some(at) => (Some(rest_start..rest_start + at), rest_start + at + 1),
        None => (None, rest_start),
    };

    let after_user = &uri_trimmed[host_start..];
    // Skip over a bracketed IPv6 literal before looking for delimiters
    let scan_from = if after_user.starts_with('[') {
        after_user.find(']').map(|i| i + 1).unwrap_or(after_user.len())
    } else {
        0
    };
    let host_end = after_user[scan_from..]
        .find(|c| c == ';' || c == '?')
        .map(|i| host_start + scan_from + i)
        .unwrap_or(uri_trimmed.len());

    let headers_at = uri_trimmed[host_end..].find('?').map(|i| host_end + i);
    let params_end = headers_at.unwrap_or(uri_trimmed.len());

    Some(UriLayout {
        scheme: 0..colon,
        user_info,
        host_port: host_start..host_end,
        params: host_end..params_end,
        headers: headers_at.map(|q| q + 1..uri_trimmed.len()),
    })
}

fn require(uri: &str) -> Result<UriLayout> {
    layout(uri).ok_or_else(|| Error::InvalidUri(uri.to_string()))
}

fn splice(uri: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(uri.len() + replacement.len());
    out.push_str(&uri[..range.start]);
    out.push_str(replacement);
    out.push_str(&uri[range.end..]);
    out
}

pub fn scheme(uri: &str) -> Option<&str> {
    layout(uri).map(|l| &uri[l.scheme])
}

pub fn set_scheme(uri: &str, scheme: &str) -> Result<String> {
    let l = require(uri)?;
    Ok(splice(uri, l.scheme, scheme))
}

/// `user[:password]`, if the URI has a user part
pub fn user_info(uri: &str) -> Option<&str> {
    layout(uri).and_then(|l| l.user_info).map(|r| &uri[r])
}

pub fn user(uri: &str) -> Option<&str> {
    user_info(uri).map(|info| info.split(':').next().unwrap_or(info))
}

pub fn password(uri: &str) -> Option<&str> {
    user_info(uri).and_then(|info| info.split_once(':').map(|(_, password)| password))
}

/// Replace `user[:password]`; an empty value removes the user part entirely
pub fn set_user_info(uri: &str, user_info: &str) -> Result<String> {
    let l = require(uri)?;
    let out = match (l.user_info, user_info.is_empty()) {
        (Some(range), false) => splice(uri, range, user_info),
        // drop "user@" including the '@'
        (Some(range), true) => splice(uri, range.start..range.end + 1, ""),
        (None, false) => splice(uri, l.host_port.start..l.host_port.start, &format!("{}@", user_info)),
        (None, true) => uri.to_string(),
    };
    Ok(out)
}

/// Replace the user, keeping any password
pub fn set_user(uri: &str, user: &str) -> Result<String> {
    let info = match password(uri) {
        Some(password) if !user.is_empty() => format!("{}:{}", user, password),
        _ => user.to_string(),
    };
    set_user_info(uri, &info)
}

pub fn set_password(uri: &str, password: &str) -> Result<String> {
    let current_user = user(uri).unwrap_or("").to_string();
    if password.is_empty() {
        return set_user_info(uri, &current_user);
    }
    set_user_info(uri, &format!("{}:{}", current_user, password))
}

/// `host[:port]`
pub fn host_port(uri: &str) -> Option<&str> {
    layout(uri).map(|l| &uri[l.host_port])
}

fn split_host_port(host_port: &str) -> (&str, Option<&str>) {
    if host_port.starts_with('[') {
        if let Some(close) = host_port.find(']') {
            let host = &host_port[..=close];
            let port = host_port[close + 1..].strip_prefix(':');
            return (host, port);
        }
        return (host_port, None);
    }
    match host_port.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (host_port, None),
    }
}

pub fn host(uri: &str) -> Option<&str> {
    host_port(uri).map(|hp| split_host_port(hp).0)
}

/// Explicit port, if one is present and numeric
pub fn port(uri: &str) -> Option<u16> {
    host_port(uri)
        .and_then(|hp| split_host_port(hp).1)
        .and_then(|p| p.trim().parse().ok())
}

pub fn set_host_port(uri: &str, host_port: &str) -> Result<String> {
    let l = require(uri)?;
    Ok(splice(uri, l.host_port, host_port))
}

/// Replace the host, keeping an explicit port
pub fn set_host(uri: &str, host: &str) -> Result<String> {
    let l = require(uri)?;
    let current = &uri[l.host_port.clone()];
    let replacement = match split_host_port(current).1 {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    Ok(splice(uri, l.host_port, &replacement))
}

/// Replace the port; `None` or `Some(0)` removes it
pub fn set_port(uri: &str, port: Option<u16>) -> Result<String> {
    let l = require(uri)?;
    let current = &uri[l.host_port.clone()];
    let host = split_host_port(current).0;
    let replacement = match port {
        Some(p) if p != 0 => format!("{}:{}", host, p),
        _ => host.to_string(),
    };
    Ok(splice(uri, l.host_port, &replacement))
}

/// Parameter section including the leading `;`, or empty
pub fn params(uri: &str) -> &str {
    layout(uri).map(|l| &uri[l.params]).unwrap_or("")
}

pub fn param<'a>(uri: &'a str, name: &str) -> Option<&'a str> {
    params::get_param(params(uri), name)
}

pub fn has_param(uri: &str, name: &str) -> bool {
    param(uri, name).is_some()
}

/// Set or append a URI parameter; an empty value writes a flag (`;lr`)
pub fn set_param(uri: &str, name: &str, value: &str) -> Result<String> {
    let l = require(uri)?;
    let updated = params::set_param(&uri[l.params.clone()], name, value);
    Ok(splice(uri, l.params, &updated))
}

pub fn remove_param(uri: &str, name: &str) -> Result<String> {
    let l = require(uri)?;
    let updated = params::remove_param(&uri[l.params.clone()], name);
    Ok(splice(uri, l.params, &updated))
}

/// The URI without its parameters and headers
pub fn without_params(uri: &str) -> Result<String> {
    let l = require(uri)?;
    Ok(uri[..l.params.start].to_string())
}

/// Header section after `?`
pub fn headers(uri: &str) -> Option<&str> {
    layout(uri).and_then(|l| l.headers).map(|r| &uri[r])
}

pub fn header<'a>(uri: &'a str, name: &str) -> Option<&'a str> {
    headers(uri)?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        key.eq_ignore_ascii_case(name).then_some(value)
    })
}

/// `[scheme:]user@host[:port]`, without params or headers
pub fn identity(uri: &str, include_scheme: bool) -> Option<String> {
    let l = layout(uri)?;
    let mut out = String::new();
    if include_scheme {
        out.push_str(&uri[l.scheme.clone()]);
        out.push(':');
    }
    if let Some(user) = user(uri) {
        out.push_str(user);
        out.push('@');
    }
    out.push_str(&uri[l.host_port]);
    Some(out)
}

/// Structural validity: a scheme, a non-empty host and a numeric port if present
pub fn verify(uri: &str) -> bool {
    let Some(l) = layout(uri) else {
        return false;
    };
    let (host, port) = split_host_port(&uri[l.host_port]);
    if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == '<' || c == '>') {
        return false;
    }
    match port {
        Some(p) => p.parse::<u16>().is_ok(),
        None => true,
    }
}

/// Owned wrapper over a raw URI string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Uri {
    data: String,
}

impl Uri {
    pub fn new(data: impl Into<String>) -> Self {
        Uri { data: data.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn into_string(self) -> String {
        self.data
    }

    pub fn scheme(&self) -> Option<&str> {
        scheme(&self.data)
    }

    pub fn user(&self) -> Option<&str> {
        user(&self.data)
    }

    pub fn password(&self) -> Option<&str> {
        password(&self.data)
    }

    pub fn host(&self) -> Option<&str> {
        host(&self.data)
    }

    pub fn host_port(&self) -> Option<&str> {
        host_port(&self.data)
    }

    pub fn port(&self) -> Option<u16> {
        port(&self.data)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        param(&self.data, name)
    }

    pub fn has_param(&self, name: &str) -> bool {
        has_param(&self.data, name)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header(&self.data, name)
    }

    pub fn identity(&self, include_scheme: bool) -> Option<String> {
        identity(&self.data, include_scheme)
    }

    pub fn set_user(&mut self, value: &str) -> Result<()> {
        self.data = set_user(&self.data, value)?;
        Ok(())
    }

    pub fn set_host(&mut self, value: &str) -> Result<()> {
        self.data = set_host(&self.data, value)?;
        Ok(())
    }

    pub fn set_port(&mut self, value: Option<u16>) -> Result<()> {
        self.data = set_port(&self.data, value)?;
        Ok(())
    }

    pub fn set_param(&mut self, name: &str, value: &str) -> Result<()> {
        self.data = set_param(&self.data, name, value)?;
        Ok(())
    }

    pub fn remove_param(&mut self, name: &str) -> Result<()> {
        self.data = remove_param(&self.data, name)?;
        Ok(())
    }

    pub fn verify(&self) -> bool {
        verify(&self.data)
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if !verify(trimmed) {
            return Err(Error::InvalidUri(s.to_string()));
        }
        Ok(Uri::new(trimmed))
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.data
    }
}
