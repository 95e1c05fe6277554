/*
 * layout.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rendering a page inside a layout template.

use std::cell::RefCell;

use crate::error::{RenderError, RenderResult};
use crate::renderer::Renderer;
use crate::resolver::{Partial, PartialResolver};
use crate::source::Source;
use crate::value::Value;

/// Partial name the layout uses to include the page.
pub const YIELD: &str = "yield";

/// Answers `yield` with the page renderer, exactly once.
struct YieldResolver<'d> {
    page: RefCell<Option<Renderer<'d>>>,
}

impl<'d> PartialResolver<'d> for YieldResolver<'d> {
    fn resolve(&self, name: &str) -> RenderResult<Partial<'d>> {
        let invalid = || RenderError::InvalidYieldTag {
            name: name.to_string(),
        };
        if name != YIELD {
            return Err(invalid());
        }
        let page = self.page.borrow_mut().take().ok_or_else(invalid)?;
        Ok(Partial::renderer(page))
    }
}

/// Render `page` at the `{{>yield}}` tag of `layout`.
///
/// Partials inside the page go through `resolver`. The layout itself may
/// only include `yield`; any other partial name is a
/// [`RenderError::InvalidYieldTag`]. The page is a single stream that is
/// consumed by its one inclusion, so a second `yield` (including one reached
/// again by iterating a section) is the same error rather than an empty
/// render. The page source is closed once it has been fully rendered.
///
/// Both renderers use the default configuration. For anything else, build
/// the page renderer directly and return it from a resolver as
/// [`Partial::Renderer`].
pub fn render_in_layout<'d>(
    layout: impl Source + 'd,
    page: impl Source + 'd,
    data: &'d Value,
    resolver: impl PartialResolver<'d> + 'd,
) -> Renderer<'d> {
    let page = Renderer::new(page, data).with_resolver(resolver);
    Renderer::new(layout, data).with_resolver(YieldResolver {
        page: RefCell::new(Some(page)),
    })
}
