/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template byte sources.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};

/// A seekable template source.
///
/// Sections are rendered by seeking back to the start of their body, so
/// every source must support [`Seek`]. Sources opened for partials are
/// closed by the renderer that included them, exactly once, when the partial
/// has been fully rendered.
pub trait Source: Read + Seek {
    /// Release the underlying resource. Defaults to a no-op; dropping the
    /// source releases it as well.
    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<T: AsRef<[u8]>> Source for Cursor<T> {}

impl Source for File {}

impl<R: Read + Seek> Source for BufReader<R> {}

impl<S: Source + ?Sized> Source for &mut S {
    fn close(&mut self) -> std::io::Result<()> {
        (**self).close()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn close(&mut self) -> std::io::Result<()> {
        (**self).close()
    }
}
