//! Request-Line and Status-Line recognizers.
//!
//! ```text
//! Request-Line = Method SP Request-URI SP SIP-Version
//! Status-Line  = SIP-Version SP Status-Code SP Reason-Phrase
//! ```

use nom::{
    IResult,
    bytes::complete::{tag_no_case, take_while1, take_while_m_n},
    character::complete::{char, digit1, space1},
    combinator::{all_consuming, map_res, recognize, rest},
    sequence::{preceded, separated_pair, terminated, tuple},
};

/// Fields of a request line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub uri: &'a str,
    pub version: &'a str,
}

/// Fields of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine<'a> {
    pub version: &'a str,
    pub code: u16,
    pub reason: &'a str,
}

fn method_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c))(input)
}

fn sip_version(input: &str) -> IResult<&str, &str> {
    recognize(preceded(
        tag_no_case("SIP/"),
        separated_pair(digit1, char('.'), digit1),
    ))(input)
}

fn request_uri(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_ascii_whitespace())(input)
}

fn status_code(input: &str) -> IResult<&str, u16> {
    map_res(take_while_m_n(3, 3, |c: char| c.is_ascii_digit()), str::parse::<u16>)(input)
}

fn request_line_parser(input: &str) -> IResult<&str, RequestLine<'_>> {
    let (remaining, (method, _, uri, _, version)) = all_consuming(tuple((
        method_token,
        space1,
        request_uri,
        space1,
        terminated(sip_version, nom::character::complete::space0),
    )))(input)?;
    Ok((remaining, RequestLine { method, uri, version }))
}

fn status_line_parser(input: &str) -> IResult<&str, StatusLine<'_>> {
    let (remaining, (version, _, code, reason)) = tuple((
        sip_version,
        space1,
        status_code,
        rest,
    ))(input)?;
    Ok((
        remaining,
        StatusLine {
            version,
            code,
            reason: reason.trim(),
        },
    ))
}

pub fn parse_request_line(line: &str) -> Option<RequestLine<'_>> {
    request_line_parser(line.trim()).ok().map(|(_, parsed)| parsed)
}

pub fn parse_status_line(line: &str) -> Option<StatusLine<'_>> {
    let parsed = status_line_parser(line.trim()).ok().map(|(_, parsed)| parsed)?;
    // a reason phrase must be separated from the code
    let after_code = line.trim().get(parsed.version.len()..)?.trim_start().get(3..)?;
    if !after_code.is_empty() && !after_code.starts_with([' ', '\t']) {
        return None;
    }
    Some(parsed)
}

pub fn is_request_line(line: &str) -> bool {
    parse_request_line(line).is_some()
}

pub fn is_status_line(line: &str) -> bool {
    parse_status_line(line).is_some()
}
