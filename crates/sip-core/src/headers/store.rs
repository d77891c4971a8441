//! Ordered, case-insensitive multimap of raw header values.

use std::collections::{HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::headers::header_name::{canonical_key, expand_compact, is_compact};

/// All values of one header name, in wire order
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderTokens {
    /// Name as emitted on serialization
    raw_name: String,
    /// Position of the header's first insertion
    offset: usize,
    values: VecDeque<String>,
}

/// Header name to list of raw values.
///
/// Every distinct header receives a monotonically increasing offset when it
/// is first inserted; serialization walks headers by that offset so the
/// original relative order survives any number of value edits. A header that
/// is removed entirely and set again is treated as new and moves to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTokenStore {
    entries: HashMap<String, HeaderTokens>,
    next_offset: usize,
}

impl HeaderTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct headers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_offset = 0;
    }

    /// Number of values stored under `name`
    pub fn present(&self, name: &str) -> usize {
        self.entries
            .get(&canonical_key(name))
            .map(|tokens| tokens.values.len())
            .unwrap_or(0)
    }

    /// Value at `index`.
    ///
    /// An absent header yields an empty string; an index past the end of a
    /// present header is an error.
    pub fn get(&self, name: &str, index: usize) -> Result<&str> {
        let Some(tokens) = self.entries.get(&canonical_key(name)) else {
            return Ok("");
        };
        if tokens.values.is_empty() {
            return Ok("");
        }
        tokens
            .values
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| Error::InvalidIndex {
                name: name.to_string(),
                index,
                count: tokens.values.len(),
            })
    }

    /// First value, or an empty string when absent
    pub fn first(&self, name: &str) -> &str {
        self.entries
            .get(&canonical_key(name))
            .and_then(|tokens| tokens.values.front())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// All values of `name` in order
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.entries
            .get(&canonical_key(name))
            .map(|tokens| tokens.values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Replace the first value of `name`, inserting the header if absent
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        check_value(name, value)?;
        let key = canonical_key(name);
        match self.entries.get_mut(&key) {
            Some(tokens) if !tokens.values.is_empty() => {
                tokens.values[0] = value.to_string();
            }
            _ => self.insert_new(key, name, value),
        }
        Ok(())
    }

    /// Replace the value at `index`, inserting the header if absent
    pub fn set_at(&mut self, name: &str, value: &str, index: usize) -> Result<()> {
        check_value(name, value)?;
        let key = canonical_key(name);
        let Some(tokens) = self.entries.get_mut(&key) else {
            self.insert_new(key, name, value);
            return Ok(());
        };
        let count = tokens.values.len();
        match tokens.values.get_mut(index) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(Error::InvalidIndex {
                name: name.to_string(),
                index,
                count,
            }),
        }
    }

    /// Remove a single-valued header.
    ///
    /// Fails with `InvalidState` when the header holds more than one value;
    /// use [`list_remove`](Self::list_remove) for multi-valued headers.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let key = canonical_key(name);
        match self.entries.get(&key) {
            None => Ok(false),
            Some(tokens) if tokens.values.len() > 1 => Err(Error::InvalidState(format!(
                "refusing to remove header '{}' holding {} values",
                name,
                tokens.values.len()
            ))),
            Some(_) => {
                self.entries.remove(&key);
                Ok(true)
            }
        }
    }

    pub fn list_append(&mut self, name: &str, value: &str) -> Result<()> {
        check_value(name, value)?;
        let key = canonical_key(name);
        match self.entries.get_mut(&key) {
            Some(tokens) => tokens.values.push_back(value.to_string()),
            None => self.insert_new(key, name, value),
        }
        Ok(())
    }

    pub fn list_prepend(&mut self, name: &str, value: &str) -> Result<()> {
        check_value(name, value)?;
        let key = canonical_key(name);
        match self.entries.get_mut(&key) {
            Some(tokens) => tokens.values.push_front(value.to_string()),
            None => self.insert_new(key, name, value),
        }
        Ok(())
    }

    /// Remove and return the first value; the header disappears with its last value
    pub fn list_pop_front(&mut self, name: &str) -> Option<String> {
        let key = canonical_key(name);
        let tokens = self.entries.get_mut(&key)?;
        let front = tokens.values.pop_front();
        if tokens.values.is_empty() {
            self.entries.remove(&key);
        }
        front
    }

    /// Remove every value of `name`
    pub fn list_remove(&mut self, name: &str) -> bool {
        self.entries.remove(&canonical_key(name)).is_some()
    }

    /// Append a value read off the wire. Empty values are kept so the
    /// header count matches the input; they are skipped on serialization.
    pub(crate) fn push_parsed(&mut self, name: &str, value: &str) {
        let key = canonical_key(name);
        match self.entries.get_mut(&key) {
            Some(tokens) => tokens.values.push_back(value.to_string()),
            None => self.insert_new(key, name, value),
        }
    }

    /// `(name, value)` pairs in serialization order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ordered().into_iter().flat_map(|tokens| {
            tokens
                .values
                .iter()
                .map(move |value| (tokens.raw_name.as_str(), value.as_str()))
        })
    }

    /// Header names with their values, in serialization order
    pub fn entries(&self) -> Vec<(&str, Vec<&str>)> {
        self.ordered()
            .into_iter()
            .map(|tokens| {
                (
                    tokens.raw_name.as_str(),
                    tokens.values.iter().map(String::as_str).collect(),
                )
            })
            .collect()
    }

    /// Emit `Name: value\r\n` for every non-empty value
    pub fn write_to(&self, out: &mut String) {
        for (name, value) in self.iter() {
            if value.is_empty() {
                continue;
            }
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
    }

    fn ordered(&self) -> Vec<&HeaderTokens> {
        let mut sorted: Vec<&HeaderTokens> = self.entries.values().collect();
        sorted.sort_by_key(|tokens| tokens.offset);
        sorted
    }

    fn insert_new(&mut self, key: String, name: &str, value: &str) {
        let raw_name = if is_compact(name) {
            expand_compact(name).to_string()
        } else {
            name.trim().to_string()
        };
        let mut values = VecDeque::with_capacity(1);
        values.push_back(value.to_string());
        self.entries.insert(
            key,
            HeaderTokens {
                raw_name,
                offset: self.next_offset,
                values,
            },
        );
        self.next_offset += 1;
    }
}

fn check_value(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidHeader(format!("empty value for header '{}'", name)));
    }
    Ok(())
}
