/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Incremental, pull-based mustache template renderer.
//!
//! Templates are rendered on demand: the caller pulls output in chunks of
//! any size and the renderer reads just enough of the template source to
//! fill them. Output is identical regardless of how it is chunked.
//!
//! Supported syntax:
//!
//! - Variables: `{{name}}` (escaped) and `{{&name}}` (raw)
//! - Nested field access: `{{employee.salary}}`, current element `{{.}}`
//! - Sections: `{{#items}}...{{/items}}`, inverted `{{^items}}...{{/items}}`
//! - Aliases: `{{#items as item}}`, `{{#items as key, value}}`
//! - Partials: `{{>header}}`, and layouts through `{{>yield}}`
//!
//! # Architecture
//!
//! The renderer never builds a syntax tree. Sections are rendered by seeking
//! the template [`Source`] back to the start of their body, so sources must be
//! seekable. Data is a borrowed [`Value`] tree viewed through [`Data`].
//!
//! # Example
//!
//! ```
//! use std::io::{Cursor, Read};
//! use streamstache::{MemoryResolver, Value, render};
//!
//! let data = Value::from(serde_json::json!({"name": "World", "items": [1, 2]}));
//! let resolver = MemoryResolver::with_partials([("greet", "Hello, {{name}}!")]);
//!
//! let mut out = String::new();
//! render(Cursor::new("{{>greet}} {{#items}}[{{.}}]{{/items}}"), &data, resolver)
//!     .read_to_string(&mut out)?;
//! assert_eq!(out, "Hello, World! [1][2]");
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod block;
pub mod config;
pub mod data;
pub mod delim;
pub mod error;
pub mod escape;
pub mod layout;
pub mod renderer;
pub mod resolver;
mod scope;
pub mod source;
pub mod value;

// Re-export main types at crate root
pub use config::RenderConfig;
pub use data::{Data, Scalar, Shape};
pub use delim::{Delimiter, Match};
pub use error::{ConfigError, RenderError, RenderResult};
pub use escape::Escaper;
pub use layout::render_in_layout;
pub use renderer::{Chunk, Renderer};
pub use resolver::{FileSystemResolver, MemoryResolver, Partial, PartialResolver};
pub use source::Source;
pub use value::{Record, Value};

/// Render `source` against `data`, resolving partials with `resolver`.
pub fn render<'d>(
    source: impl Source + 'd,
    data: &'d Value,
    resolver: impl PartialResolver<'d> + 'd,
) -> Renderer<'d> {
    Renderer::new(source, data).with_resolver(resolver)
}
