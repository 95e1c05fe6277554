/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for configuration and rendering.
//!
//! Data-resolution failures are deliberately absent here: an unknown path or
//! a value of the wrong shape renders as empty text.

use thiserror::Error;

/// Errors that terminate a render stream.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A tag contained no text (`{{}}`, `{{ }}`, `{{#}}`).
    #[error("empty tag")]
    EmptyTag,

    /// A section close named a different section than the one open.
    #[error("section close `{found}` does not match open section `{expected}`")]
    SectionMismatch { expected: String, found: String },

    /// A section close was found with no section open.
    #[error("section close `{name}` has no open section")]
    UnopenedSection { name: String },

    /// The template ended while sections were still open.
    #[error("unclosed sections: {}", .names.join(", "))]
    UnclosedSections { names: Vec<String> },

    /// The template ended between an open and a close delimiter.
    #[error("unterminated tag at end of template")]
    UnterminatedTag,

    /// A section declared more than two aliases, or an empty alias.
    #[error("invalid section aliases in `{tag}`")]
    InvalidAliases { tag: String },

    /// A partial tag was found but the renderer has no resolver.
    #[error("no partial resolver for partial `{name}`")]
    MissingResolver { name: String },

    /// The resolver does not know the partial.
    #[error("Partial not found: {name}")]
    PartialNotFound { name: String },

    /// Partials nested deeper than the configured limit.
    #[error("Recursive partial inclusion detected (depth > {max_depth}): {name}")]
    RecursivePartial { name: String, max_depth: usize },

    /// A layout referenced a partial other than `yield`, or yielded twice.
    #[error("invalid yield tag `{name}`")]
    InvalidYieldTag { name: String },

    /// I/O error from a template source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RenderError> for std::io::Error {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Io(err) => err,
            other => std::io::Error::other(other),
        }
    }
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors raised while building a [`RenderConfig`](crate::RenderConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("delimiters must not be empty")]
    EmptyDelimiter,

    #[error("`{0}` cannot be used as raw marker, it already starts another tag kind")]
    ReservedRawMarker(char),

    #[error("escape table key `{0}` is not a single ASCII character")]
    NonAsciiEscape(char),
}
