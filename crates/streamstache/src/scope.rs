/*
 * scope.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Variable resolution across nested sections and partials.
//!
//! A renderer's scope is its block stack plus the data root. A partial's
//! scope links to the scope of the renderer that included it; the link is a
//! borrow that only lives for the duration of one read, so the chain never
//! outlives the renderers it points into.

use crate::block::Block;
use crate::data::{Data, SELF_PATH};

pub(crate) struct Scope<'a, 'd> {
    blocks: &'a [Block<'d>],
    root: Data<'d>,
    parent: Option<&'a Scope<'a, 'd>>,
}

impl<'a, 'd> Scope<'a, 'd> {
    pub fn new(blocks: &'a [Block<'d>], root: Data<'d>, parent: Option<&'a Scope<'a, 'd>>) -> Self {
        Self {
            blocks,
            root,
            parent,
        }
    }

    /// This scope followed by each enclosing one.
    fn chain(&self) -> impl Iterator<Item = &Scope<'a, 'd>> {
        std::iter::successors(Some(self), |scope| scope.parent)
    }

    /// Blocks from innermost to outermost, crossing partial boundaries.
    fn blocks(&self) -> impl Iterator<Item = &Block<'d>> {
        self.chain().flat_map(|scope| scope.blocks.iter().rev())
    }

    /// Resolve `path`, closest binding first.
    ///
    /// Aliases anywhere in the chain win over element data; element data of
    /// inner sections wins over outer sections; the root of the outermost
    /// renderer is consulted last. `.` never resolves against the root.
    ///
    /// The first block that binds the path ends the search, even when the
    /// bound value is absent.
    pub fn resolve(&self, path: &str) -> Option<Data<'d>> {
        if let Some(found) = self.blocks().find_map(|block| block.lookup_alias(path)) {
            return found.present();
        }
        if let Some(found) = self.blocks().find_map(|block| block.lookup(path)) {
            return found.present();
        }
        if path == SELF_PATH {
            return None;
        }
        self.chain().last().and_then(|outermost| outermost.root.get(path))
    }
}
