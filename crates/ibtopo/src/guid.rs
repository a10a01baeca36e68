//! Port GUIDs and the canonical form shared with the topology description
//!
//! `ibstat` prints port GUIDs as 16 hex digits (`0x0002c90300a1b2c3`) while
//! `sharp_cmd` drops the leading zero byte and prints 14 (`0x02c90300a1b2c3`).
//! The topology description is the reference, so discovered GUIDs are rewritten
//! into that shape before anything compares them.

use std::fmt;

use serde::{Deserialize, Serialize};

const PREFIX: &str = "0x";
const REDUNDANT_BYTE: &str = "00";
const CANONICAL_DIGITS: usize = 14;
const DISCOVERED_DIGITS: usize = 16;

/// A port GUID in canonical (topology description) form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    /// Wrap an identifier taken verbatim from the topology description
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Build a GUID from a value collected on a host with `ibstat`
    pub fn from_discovered(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x` followed by exactly 14 lowercase hex digits
    pub fn is_canonical(&self) -> bool {
        self.0
            .strip_prefix(PREFIX)
            .is_some_and(|digits| digits.len() == CANONICAL_DIGITS && is_lower_hex(digits))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Guid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Strip the single redundant zero byte `ibstat` puts after `0x`.
///
/// Only a 16-digit value starting with `0x00` is rewritten, so the result of a
/// rewrite (14 digits) is never rewritten again and canonical input passes through.
pub fn normalize(raw: &str) -> String {
    let raw = raw.trim();
    match raw.strip_prefix(PREFIX) {
        Some(digits) if digits.len() == DISCOVERED_DIGITS && is_hex(digits) => {
            match digits.strip_prefix(REDUNDANT_BYTE) {
                Some(rest) => format!("{PREFIX}{rest}"),
                None => raw.to_string(),
            }
        }
        _ => raw.to_string(),
    }
}

fn is_hex(digits: &str) -> bool {
    digits.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_lower_hex(digits: &str) -> bool {
    digits
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
