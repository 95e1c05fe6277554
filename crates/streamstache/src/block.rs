/*
 * block.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Open sections and their iteration state.

use crate::data::{Data, PATH_DELIMITER, SELF_PATH, Shape};
use crate::error::{RenderError, RenderResult};

/// Prefix of a section tag.
pub const SECTION: char = '#';

/// Prefix of an inverted section tag.
pub const INVERTED: char = '^';

/// Keyword introducing section aliases: `#items as item`.
const ALIAS_KEYWORD: &str = "as";

/// Local names bound by a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Aliases {
    None,

    /// `as item`: the current element.
    Element(String),

    /// `as key, value`: key (or index) and value of the current entry.
    Pair(String, String),
}

/// A parsed section tag body, without its prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SectionTag {
    pub name: String,
    pub aliases: Aliases,
}

impl SectionTag {
    /// Parse `name`, `name as a` or `name as a, b`.
    ///
    /// `tag` is the full tag text, used for error reporting.
    pub fn parse(body: &str, tag: &str) -> RenderResult<Self> {
        let body = body.trim();
        let mut words = body.splitn(2, char::is_whitespace);
        let name = words.next().unwrap_or_default();
        if name.is_empty() {
            return Err(RenderError::EmptyTag);
        }

        let Some(rest) = words.next().map(str::trim_start) else {
            return Ok(Self {
                name: name.to_string(),
                aliases: Aliases::None,
            });
        };

        let invalid = || RenderError::InvalidAliases {
            tag: tag.to_string(),
        };
        let list = rest
            .strip_prefix(ALIAS_KEYWORD)
            .filter(|list| list.starts_with(char::is_whitespace))
            .ok_or_else(invalid)?;
        let names: Vec<&str> = list.split(',').map(str::trim).collect();
        if names.iter().any(|n| n.is_empty() || n.contains(char::is_whitespace)) {
            return Err(invalid());
        }

        let aliases = match names.as_slice() {
            [element] => Aliases::Element(element.to_string()),
            [key, value] => Aliases::Pair(key.to_string(), value.to_string()),
            _ => return Err(invalid()),
        };

        Ok(Self {
            name: name.to_string(),
            aliases,
        })
    }
}

/// One open section on a renderer's stack.
#[derive(Debug)]
pub(crate) struct Block<'d> {
    /// Full tag text including its prefix, e.g. `#words as word`.
    tag: String,
    name: String,
    /// Source offset just past the opening tag; the body restarts here.
    cursor: u64,
    inverted: bool,
    aliases: Aliases,
    data: Data<'d>,
    /// Key/value pairs, materialized once for `as key, value` sections.
    entries: Vec<(Data<'d>, Data<'d>)>,
    iterations: usize,
    index: usize,
}

impl<'d> Block<'d> {
    /// Open a block over `data`. A `skipped` block renders no iterations
    /// regardless of its data; it is used below blocks that are skipped.
    pub fn new(tag: &str, section: SectionTag, cursor: u64, data: Data<'d>, skipped: bool) -> Self {
        let inverted = tag.starts_with(INVERTED);
        let entries = match (&section.aliases, data.shape()) {
            (Aliases::Pair(..), Shape::Mapping(_) | Shape::Record(_) | Shape::Sequence(_))
                if !inverted =>
            {
                data.entries()
            }
            _ => Vec::new(),
        };

        let iterations = if skipped {
            0
        } else if inverted {
            usize::from(data.is_empty())
        } else if data.is_empty() {
            0
        } else {
            match data.shape() {
                Shape::Sequence(items) => items.len(),
                Shape::Mapping(_) | Shape::Record(_) if !entries.is_empty() => entries.len(),
                _ => 1,
            }
        };

        Self {
            tag: tag.to_string(),
            name: section.name,
            cursor,
            inverted,
            aliases: section.aliases,
            data,
            entries,
            iterations,
            index: 0,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Advance past one pass through the body.
    pub fn increment(&mut self) -> usize {
        self.index += 1;
        self.index
    }

    /// True once every iteration has been rendered. A block that renders
    /// nothing is finished from the start, which is what skips its body.
    pub fn is_finished(&self) -> bool {
        self.index >= self.iterations
    }

    /// The element bound for the current iteration. Inverted blocks never
    /// bind anything.
    pub fn current(&self) -> Data<'d> {
        if self.inverted {
            return Data::absent();
        }
        if let Some((_, value)) = self.entries.get(self.index) {
            return *value;
        }
        match self.data.shape() {
            Shape::Sequence(_) => self.data.index(self.index).unwrap_or_else(Data::absent),
            _ => self.data,
        }
    }

    /// The key (or index) bound for the current iteration.
    fn current_key(&self) -> Data<'d> {
        match self.entries.get(self.index) {
            Some((key, _)) => *key,
            None => self
                .data
                .entries()
                .into_iter()
                .nth(self.index)
                .map_or_else(Data::absent, |(key, _)| key),
        }
    }

    /// Resolve `path` against this block's aliases only.
    ///
    /// Returns `Some` whenever an alias of this block binds the first path
    /// segment, with an absent view if the bound value or the rest of the
    /// path is missing.
    pub fn lookup_alias(&self, path: &str) -> Option<Data<'d>> {
        if self.inverted {
            return None;
        }
        let (head, rest) = match path.split_once(PATH_DELIMITER) {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let bound = match &self.aliases {
            Aliases::None => return None,
            Aliases::Element(element) if element == head => self.current(),
            Aliases::Pair(key, _) if key == head => self.current_key(),
            Aliases::Pair(_, value) if value == head => self.current(),
            _ => return None,
        };

        Some(match rest {
            Some(rest) => bound.get(rest).unwrap_or_else(Data::absent),
            None => bound,
        })
    }

    /// Resolve `path` against the current element.
    ///
    /// `.` is always bound by a normal block, so it yields `Some` even when
    /// the current element is absent.
    pub fn lookup(&self, path: &str) -> Option<Data<'d>> {
        if self.inverted {
            return None;
        }
        let current = self.current();
        if path == SELF_PATH {
            return Some(current);
        }
        current.get(path)
    }
}
