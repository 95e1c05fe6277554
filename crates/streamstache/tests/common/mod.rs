/*
 * common/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Helpers shared by the integration tests.
 */

#![allow(dead_code)]

use std::cell::Cell;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use streamstache::{RenderError, Renderer, Source};

/// Chunk sizes every template is rendered with.
pub const CHUNK_SIZES: [usize; 6] = [1, 2, 3, 7, 64, 4096];

/// Output and terminating error of one complete render.
#[derive(Debug)]
pub struct Rendered {
    pub output: String,
    pub error: Option<RenderError>,
}

/// Pull everything out of `renderer` with `size`-byte reads.
pub fn drain(mut renderer: Renderer<'_>, size: usize) -> Rendered {
    let mut output = Vec::new();
    let mut buf = vec![0; size];
    let error = loop {
        match renderer.read_chunk(&mut buf) {
            Ok(chunk) => {
                assert!(chunk.written <= size, "chunk larger than the buffer");
                output.extend_from_slice(&buf[..chunk.written]);
                if chunk.finished {
                    break None;
                }
            }
            Err(err) => break Some(err),
        }
    };
    Rendered {
        output: String::from_utf8(output).unwrap(),
        error,
    }
}

/// Render with every size in [`CHUNK_SIZES`], assert the outputs agree and
/// return the result of the last one.
pub fn render_chunked<'d>(make: impl Fn() -> Renderer<'d>) -> Rendered {
    let mut results = CHUNK_SIZES.iter().map(|&size| (size, drain(make(), size)));
    let (_, first) = results.next().unwrap();
    let mut last = first;
    for (size, result) in results {
        pretty_assertions::assert_eq!(
            last.output,
            result.output,
            "output differs with {size}-byte chunks"
        );
        assert_eq!(
            last.error.as_ref().map(ToString::to_string),
            result.error.as_ref().map(ToString::to_string),
            "error differs with {size}-byte chunks"
        );
        last = result;
    }
    last
}

/// Render and expect success.
pub fn render_ok<'d>(make: impl Fn() -> Renderer<'d>) -> String {
    let rendered = render_chunked(make);
    if let Some(err) = rendered.error {
        panic!("render failed after {:?}: {err}", rendered.output);
    }
    rendered.output
}

/// A source that counts how often it is closed.
pub struct CountingSource {
    inner: Cursor<Vec<u8>>,
    closes: Rc<Cell<usize>>,
}

impl CountingSource {
    pub fn new(text: &str, closes: &Rc<Cell<usize>>) -> Self {
        Self {
            inner: Cursor::new(text.as_bytes().to_vec()),
            closes: Rc::clone(closes),
        }
    }
}

impl Read for CountingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for CountingSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Source for CountingSource {
    fn close(&mut self) -> io::Result<()> {
        self.closes.set(self.closes.get() + 1);
        Ok(())
    }
}

pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}
