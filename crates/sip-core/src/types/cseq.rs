//! CSeq header: `1*DIGIT LWS Method`

use std::fmt;
use std::str::FromStr;

use nom::{
    IResult,
    bytes::complete::take_while1,
    character::complete::{digit1, space0, space1},
    combinator::{all_consuming, map_res},
    sequence::{delimited, separated_pair},
};

use crate::error::{Error, Result};

fn method_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c))(input)
}

fn cseq_value(input: &str) -> IResult<&str, (u32, &str)> {
    all_consuming(delimited(
        space0,
        separated_pair(map_res(digit1, str::parse::<u32>), space1, method_token),
        space0,
    ))(input)
}

/// Sequence number and method of a CSeq value
pub fn parse(value: &str) -> Option<(u32, &str)> {
    cseq_value(value).ok().map(|(_, parsed)| parsed)
}

pub fn number(value: &str) -> Option<u32> {
    parse(value).map(|(n, _)| n)
}

pub fn method(value: &str) -> Option<&str> {
    parse(value).map(|(_, m)| m)
}

/// Rewrite the sequence number, keeping the method
pub fn set_number(value: &str, number: u32) -> Result<String> {
    let (_, method) = parse(value).ok_or_else(|| Error::InvalidHeader(format!("bad CSeq '{}'", value)))?;
    Ok(format!("{} {}", number, method))
}

pub fn set_method(value: &str, method: &str) -> Result<String> {
    let (number, _) = parse(value).ok_or_else(|| Error::InvalidHeader(format!("bad CSeq '{}'", value)))?;
    Ok(format!("{} {}", number, method))
}

/// Parsed CSeq
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSeq {
    pub seq: u32,
    pub method: String,
}

impl CSeq {
    pub fn new(seq: u32, method: impl Into<String>) -> Self {
        CSeq {
            seq,
            method: method.into(),
        }
    }
}

impl FromStr for CSeq {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (seq, method) = parse(s).ok_or_else(|| Error::InvalidHeader(format!("bad CSeq '{}'", s)))?;
        Ok(CSeq::new(seq, method))
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}
