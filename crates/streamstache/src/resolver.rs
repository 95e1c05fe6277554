/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Partial template resolution.
//!
//! A renderer asks its resolver for the template behind each `{{>name}}`
//! tag. The answer is either a raw [`Source`], which the renderer wraps with
//! its own data and configuration, or a ready-made [`Renderer`] that is
//! included as-is.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Cursor};
use std::path::{Component, Path, PathBuf};

use crate::error::{RenderError, RenderResult};
use crate::renderer::Renderer;
use crate::source::Source;

/// What a resolver hands back for a partial name.
pub enum Partial<'d> {
    /// Template bytes to render with the including renderer's data.
    Source(Box<dyn Source + 'd>),
    /// A configured renderer, included unchanged.
    Renderer(Box<Renderer<'d>>),
}

impl<'d> Partial<'d> {
    pub fn source(source: impl Source + 'd) -> Self {
        Partial::Source(Box::new(source))
    }

    pub fn renderer(renderer: Renderer<'d>) -> Self {
        Partial::Renderer(Box::new(renderer))
    }
}

impl std::fmt::Debug for Partial<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partial::Source(_) => f.write_str("Partial::Source(..)"),
            Partial::Renderer(renderer) => f.debug_tuple("Partial::Renderer").field(renderer).finish(),
        }
    }
}

/// Trait for loading partial templates by name.
pub trait PartialResolver<'d> {
    /// Load the partial called `name`.
    ///
    /// Returning an error aborts the render; use
    /// [`RenderError::PartialNotFound`] for unknown names.
    fn resolve(&self, name: &str) -> RenderResult<Partial<'d>>;
}

impl<'d, F> PartialResolver<'d> for F
where
    F: Fn(&str) -> RenderResult<Partial<'d>>,
{
    fn resolve(&self, name: &str) -> RenderResult<Partial<'d>> {
        self(name)
    }
}

/// Resolver that serves partials from an in-memory map.
///
/// Useful for testing and for templates bundled into the application.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    partials: HashMap<String, Vec<u8>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a partial. The name should match what the template uses, e.g.
    /// `header` for `{{>header}}`.
    pub fn add(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> &mut Self {
        self.partials.insert(name.into(), content.into());
        self
    }

    pub fn with_partials(
        partials: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>,
    ) -> Self {
        let mut resolver = Self::new();
        for (name, content) in partials {
            resolver.add(name, content);
        }
        resolver
    }
}

impl<'d> PartialResolver<'d> for MemoryResolver {
    fn resolve(&self, name: &str) -> RenderResult<Partial<'d>> {
        match self.partials.get(name) {
            Some(content) => Ok(Partial::source(Cursor::new(content.clone()))),
            None => Err(RenderError::PartialNotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// Resolver that loads partials from files below a root directory.
///
/// Path resolution rules:
/// - names are relative to the root directory and may contain `/`
/// - a name without an extension gets the resolver's default extension
/// - a name with an extension is used as-is
/// - absolute names and names containing `..` are never resolved
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    root: PathBuf,
    extension: Option<String>,
}

impl FileSystemResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: None,
        }
    }

    /// Append `extension` (without the leading dot) to names that have none.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a partial name maps to, or `None` for names outside the
    /// root directory.
    pub fn partial_path(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || !contained {
            return None;
        }

        let path = self.root.join(relative);
        match &self.extension {
            Some(ext) if relative.extension().is_none() && !ext.is_empty() => {
                Some(path.with_extension(ext))
            }
            _ => Some(path),
        }
    }
}

impl<'d> PartialResolver<'d> for FileSystemResolver {
    fn resolve(&self, name: &str) -> RenderResult<Partial<'d>> {
        let not_found = || RenderError::PartialNotFound {
            name: name.to_string(),
        };
        let path = self.partial_path(name).ok_or_else(not_found)?;
        match File::open(&path) {
            Ok(file) => {
                tracing::debug!(partial = name, path = %path.display(), "loaded partial");
                Ok(Partial::source(BufReader::new(file)))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(not_found()),
            Err(err) => Err(err.into()),
        }
    }
}
