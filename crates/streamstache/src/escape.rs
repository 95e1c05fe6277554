/*
 * escape.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Byte substitution escaping for variable output.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ConfigError;

/// The default HTML table. `{` and `}` are included so that rendered values
/// can never form the default delimiters.
const HTML: [(u8, &str); 7] = [
    (b'&', "&amp;"),
    (b'\'', "&#39;"),
    (b'<', "&lt;"),
    (b'>', "&gt;"),
    (b'"', "&#34;"),
    (b'{', "&#123;"),
    (b'}', "&#125;"),
];

/// A fixed byte → byte-sequence substitution table.
///
/// Deserializes from a map of single ASCII characters to replacement
/// strings; an empty map disables escaping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<char, String>")]
pub struct Escaper {
    table: Box<[Option<Box<[u8]>>]>,
}

impl Escaper {
    /// Build a table from `(byte, replacement)` pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u8, S)>,
        S: AsRef<[u8]>,
    {
        let mut table = vec![None; 256];
        for (byte, replacement) in entries {
            table[usize::from(byte)] = Some(replacement.as_ref().into());
        }
        Self {
            table: table.into_boxed_slice(),
        }
    }

    /// The HTML table.
    pub fn html() -> Self {
        Self::new(HTML)
    }

    /// A table that leaves every byte unchanged.
    pub fn none() -> Self {
        Self::new(std::iter::empty::<(u8, &[u8])>())
    }

    fn replacement(&self, byte: u8) -> Option<&[u8]> {
        self.table[usize::from(byte)].as_deref()
    }

    /// Escape `input`, borrowing it unchanged when nothing needs escaping.
    pub fn escape<'a>(&self, input: &'a [u8]) -> Cow<'a, [u8]> {
        match input.iter().position(|&b| self.replacement(b).is_some()) {
            None => Cow::Borrowed(input),
            Some(first) => {
                let mut out = Vec::with_capacity(input.len() + input.len() / 2);
                out.extend_from_slice(&input[..first]);
                self.escape_into(&input[first..], &mut out);
                Cow::Owned(out)
            }
        }
    }

    /// Append the escaped form of `input` to `out`.
    pub fn escape_into(&self, input: &[u8], out: &mut Vec<u8>) {
        let mut start = 0;
        for (i, &byte) in input.iter().enumerate() {
            if let Some(replacement) = self.replacement(byte) {
                out.extend_from_slice(&input[start..i]);
                out.extend_from_slice(replacement);
                start = i + 1;
            }
        }
        out.extend_from_slice(&input[start..]);
    }
}

impl Default for Escaper {
    fn default() -> Self {
        Self::html()
    }
}

impl TryFrom<BTreeMap<char, String>> for Escaper {
    type Error = ConfigError;

    fn try_from(entries: BTreeMap<char, String>) -> Result<Self, Self::Error> {
        let mut bytes = Vec::with_capacity(entries.len());
        for (key, replacement) in entries {
            let byte = u8::try_from(key)
                .ok()
                .filter(u8::is_ascii)
                .ok_or(ConfigError::NonAsciiEscape(key))?;
            bytes.push((byte, replacement));
        }
        Ok(Self::new(bytes))
    }
}
