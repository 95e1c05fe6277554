/*
 * delim.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Delimiter matching over partially read input.
//!
//! A delimiter may straddle two reads from the template source, so besides
//! "found" and "not found" the matcher reports when the buffer ends with a
//! prefix of the delimiter and more bytes are needed before deciding.

use memchr::memmem;

use crate::error::ConfigError;

/// Outcome of matching a buffer against a [`Delimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// The buffer contains no delimiter and does not end with a prefix of one.
    None,

    /// The buffer ends with a proper prefix of the delimiter of this length.
    Partial(usize),

    /// The buffer contains the delimiter; the value is the offset just past
    /// its first occurrence.
    Exact(usize),
}

/// A non-empty delimiter token such as `{{` or `}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiter {
    token: Box<[u8]>,
}

impl Delimiter {
    /// Create a delimiter, rejecting empty tokens.
    pub fn new(token: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
        let token = token.as_ref();
        if token.is_empty() {
            return Err(ConfigError::EmptyDelimiter);
        }
        Ok(Self {
            token: token.into(),
        })
    }

    /// Built-in delimiters, known to be non-empty.
    pub(crate) fn from_static(token: &'static str) -> Self {
        debug_assert!(!token.is_empty());
        Self {
            token: token.as_bytes().into(),
        }
    }

    /// The delimiter bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.token
    }

    pub fn len(&self) -> usize {
        self.token.len()
    }

    /// Always false; empty delimiters cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }

    /// Classify `buf` against this delimiter.
    ///
    /// A full occurrence anywhere wins over a trailing prefix. Longer
    /// prefixes are tried before shorter ones.
    pub fn find(&self, buf: &[u8]) -> Match {
        if let Some(i) = memmem::find(buf, &self.token) {
            return Match::Exact(i + self.token.len());
        }

        (1..self.token.len())
            .rev()
            .find(|&z| buf.ends_with(&self.token[..z]))
            .map_or(Match::None, Match::Partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(cases: &[(&str, &str, Match)]) {
        for (given, delim, expected) in cases {
            let delim = Delimiter::new(delim).unwrap();
            assert_eq!(
                delim.find(given.as_bytes()),
                *expected,
                "matching {given:?} against {:?}",
                String::from_utf8_lossy(delim.as_bytes())
            );
        }
    }

    #[test]
    fn test_open_delimiter() {
        check(&[
            ("hello {{c}}", "{{", Match::Exact(8)),
            ("hello {{{c}}}", "{{", Match::Exact(8)),
            ("hello {", "{{", Match::Partial(1)),
            ("hello {", "{{{", Match::Partial(1)),
            ("hello {{", "{{{", Match::Partial(2)),
            ("hello {c}", "{{", Match::None),
            ("hello {c}", "{{{", Match::None),
            ("hello {{c}}", "{{{", Match::None),
        ]);
    }

    #[test]
    fn test_close_delimiter() {
        check(&[
            ("c}}</h1>", "}}", Match::Exact(3)),
            ("c}}}</h1>", "}}", Match::Exact(3)),
            ("c}", "}}", Match::Partial(1)),
            ("c}", "}}}", Match::Partial(1)),
            ("c}}", "}}}", Match::Partial(2)),
            ("c}</h1>", "}}", Match::None),
            ("c}</h1>", "}}}", Match::None),
            ("c}}</h1>", "}}}", Match::None),
        ]);
    }

    #[test]
    fn test_prefix_must_end_the_buffer() {
        // An earlier lone `{` must not hide the trailing one.
        check(&[
            ("a{b{", "{{", Match::Partial(1)),
            ("<%a<", "<%", Match::Exact(2)),
            ("a<b<", "<%", Match::Partial(1)),
        ]);
    }

    #[test]
    fn test_empty_buffer() {
        check(&[("", "{{", Match::None)]);
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        assert_eq!(Delimiter::new(""), Err(ConfigError::EmptyDelimiter));
    }
}
