/*
 * renderer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The incremental rendering state machine.
//!
//! A [`Renderer`] produces its output on demand: each call to
//! [`Renderer::read_chunk`] fills at most the caller's buffer and keeps
//! everything needed to resume (source cursor, pending and carry buffers,
//! delimiter phase, open sections, active partial) in the renderer itself.
//!
//! # Protocol
//!
//! The renderer alternates between scanning for the open delimiter and
//! scanning for the close delimiter. Text before an open delimiter is
//! literal output; text before a close delimiter is a tag. Bytes that do not
//! fit into the caller's buffer are queued in the carry buffer and delivered
//! first on the next call, so the concatenated output never depends on how
//! the caller sizes its reads.

use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom};
use std::rc::Rc;

use crate::block::{Block, INVERTED, SECTION, SectionTag};
use crate::config::{CLOSE, PARTIAL, RenderConfig};
use crate::data::Data;
use crate::delim::{Delimiter, Match};
use crate::error::{RenderError, RenderResult};
use crate::resolver::{Partial, PartialResolver};
use crate::scope::Scope;
use crate::source::Source;
use crate::value::Value;

/// Which delimiter the renderer is currently looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Scanning literal text for the open delimiter.
    Open,
    /// Scanning tag text for the close delimiter.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Finished,
    Failed,
}

/// Result of one [`Renderer::read_chunk`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Bytes written to the front of the caller's buffer.
    pub written: usize,
    /// True once the stream has ended; no further bytes will be produced.
    pub finished: bool,
}

impl Chunk {
    fn more(written: usize) -> Self {
        Self {
            written,
            finished: false,
        }
    }

    fn end(written: usize) -> Self {
        Self {
            written,
            finished: true,
        }
    }
}

/// A pull-based renderer over one template source.
pub struct Renderer<'d> {
    source: Box<dyn Source + 'd>,
    root: Data<'d>,
    config: Rc<RenderConfig>,
    resolver: Option<Rc<dyn PartialResolver<'d> + 'd>>,

    /// Nesting level; the root renderer is 0.
    depth: usize,
    phase: Phase,
    state: State,

    /// Source bytes read but not yet classified.
    pending: Vec<u8>,
    /// The pending bytes end with an undecided delimiter prefix or an
    /// unterminated tag; read more before classifying again.
    starved: bool,
    /// Output produced but not yet delivered.
    carry: VecDeque<u8>,
    /// Read buffer reused across calls.
    scratch: Vec<u8>,
    /// Source offset of `pending[0]`.
    cursor: u64,
    source_eof: bool,
    /// An error found after bytes were already written; returned next call.
    deferred: Option<RenderError>,

    blocks: Vec<Block<'d>>,
    partial: Option<Box<Renderer<'d>>>,
}

impl<'d> Renderer<'d> {
    /// Create a renderer with the default configuration and no partial
    /// resolver.
    pub fn new(source: impl Source + 'd, data: &'d Value) -> Self {
        Self::from_parts(Box::new(source), Data::new(data), Rc::default(), None, 0)
    }

    fn from_parts(
        source: Box<dyn Source + 'd>,
        root: Data<'d>,
        config: Rc<RenderConfig>,
        resolver: Option<Rc<dyn PartialResolver<'d> + 'd>>,
        depth: usize,
    ) -> Self {
        Self {
            source,
            root,
            config,
            resolver,
            depth,
            phase: Phase::Open,
            state: State::Running,
            pending: Vec::new(),
            starved: false,
            carry: VecDeque::new(),
            scratch: Vec::new(),
            cursor: 0,
            source_eof: false,
            deferred: None,
            blocks: Vec::new(),
            partial: None,
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = Rc::new(config);
        self
    }

    pub fn with_resolver(mut self, resolver: impl PartialResolver<'d> + 'd) -> Self {
        self.resolver = Some(Rc::new(resolver));
        self
    }

    /// True once end-of-stream has been reported.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Write the next chunk of output into `out`.
    ///
    /// Never writes more than `out.len()` bytes. A chunk may be empty while
    /// the renderer waits for more source bytes; keep calling until
    /// [`Chunk::finished`] is set. Any error terminates the stream; bytes
    /// written before an error in the same call are returned first and the
    /// error is reported by the following call.
    pub fn read_chunk(&mut self, out: &mut [u8]) -> RenderResult<Chunk> {
        self.step(out, None)
    }

    fn step(&mut self, out: &mut [u8], parent: Option<&Scope<'_, 'd>>) -> RenderResult<Chunk> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        if self.state != State::Running {
            return Ok(Chunk::end(0));
        }

        let mut written = 0;
        match self.advance(out, parent, &mut written) {
            Ok(true) => {
                self.state = State::Finished;
                tracing::debug!(depth = self.depth, "template finished");
                Ok(Chunk::end(written))
            }
            Ok(false) => Ok(Chunk::more(written)),
            Err(err) => {
                self.state = State::Failed;
                tracing::debug!(depth = self.depth, error = %err, "template failed");
                if written > 0 {
                    self.deferred = Some(err);
                    Ok(Chunk::more(written))
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Make progress, returning true at end-of-stream.
    fn advance(
        &mut self,
        out: &mut [u8],
        parent: Option<&Scope<'_, 'd>>,
        written: &mut usize,
    ) -> RenderResult<bool> {
        if out.is_empty() {
            return Ok(false);
        }

        self.flush_carry(out, written);
        if *written == out.len() {
            return Ok(false);
        }

        if let Some(child) = self.partial.as_deref_mut() {
            let scope = Scope::new(&self.blocks, self.root, parent);
            let chunk = match child.step(&mut out[*written..], Some(&scope)) {
                Ok(chunk) => chunk,
                Err(err) => {
                    if let Err(close_err) = self.close_partial() {
                        tracing::warn!(error = %close_err, "failed to close partial source");
                    }
                    return Err(err);
                }
            };
            *written += chunk.written;
            if !chunk.finished {
                return Ok(false);
            }
            self.close_partial()?;
            if *written == out.len() {
                return Ok(false);
            }
        }

        if self.is_drained() {
            return self.end_of_stream();
        }

        if !self.source_eof && (self.pending.is_empty() || self.starved) {
            self.fill(out.len() - *written)?;
        }

        self.classify(out, parent, written)?;

        if self.is_drained() && self.partial.is_none() {
            return self.end_of_stream();
        }
        Ok(false)
    }

    /// Nothing is left to read, classify or deliver.
    fn is_drained(&self) -> bool {
        self.source_eof && self.pending.is_empty() && self.carry.is_empty()
    }

    fn end_of_stream(&self) -> RenderResult<bool> {
        if self.phase == Phase::Close {
            return Err(RenderError::UnterminatedTag);
        }
        if !self.blocks.is_empty() {
            return Err(RenderError::UnclosedSections {
                names: self.blocks.iter().map(|b| b.name().to_string()).collect(),
            });
        }
        Ok(true)
    }

    /// Read up to `want` bytes from the source into the pending buffer.
    fn fill(&mut self, want: usize) -> RenderResult<()> {
        self.scratch.resize(want.max(1), 0);
        let n = loop {
            match self.source.read(&mut self.scratch) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        if n == 0 {
            self.source_eof = true;
        } else {
            self.pending.extend_from_slice(&self.scratch[..n]);
        }
        self.starved = false;
        Ok(())
    }

    fn delimiter(&self) -> &Delimiter {
        match self.phase {
            Phase::Open => self.config.open(),
            Phase::Close => self.config.close(),
        }
    }

    /// Classify the pending bytes against the current delimiter and act on
    /// the result.
    fn classify(
        &mut self,
        out: &mut [u8],
        parent: Option<&Scope<'_, 'd>>,
        written: &mut usize,
    ) -> RenderResult<()> {
        let found = self.delimiter().find(&self.pending);
        let delim_len = self.delimiter().len();

        match (found, self.phase) {
            (Match::Exact(end), Phase::Open) => {
                let text = self.consume(end);
                self.phase = Phase::Close;
                if !self.skipping() {
                    self.emit(&text[..end - delim_len], out, written);
                }
            }
            (Match::Exact(end), Phase::Close) => {
                let tag = self.consume(end);
                // Flip before dispatch: a section close may rewind the source
                // and the body must restart in the open phase.
                self.phase = Phase::Open;
                self.dispatch(&tag[..end - delim_len], out, parent, written)?;
            }
            (Match::Partial(keep), Phase::Open) if !self.source_eof => {
                let text = self.consume(self.pending.len() - keep);
                if !self.skipping() {
                    self.emit(&text, out, written);
                }
                self.starved = true;
            }
            (Match::Partial(_) | Match::None, Phase::Open) => {
                let text = self.consume(self.pending.len());
                if !self.skipping() {
                    self.emit(&text, out, written);
                }
            }
            (Match::Partial(_) | Match::None, Phase::Close) => {
                if self.source_eof {
                    return Err(RenderError::UnterminatedTag);
                }
                self.starved = true;
            }
        }
        Ok(())
    }

    /// Remove `n` bytes from the front of the pending buffer.
    fn consume(&mut self, n: usize) -> Vec<u8> {
        self.cursor += n as u64;
        self.pending.drain(..n).collect()
    }

    /// Write as much of `bytes` as fits and carry the rest.
    fn emit(&mut self, bytes: &[u8], out: &mut [u8], written: &mut usize) {
        if !self.carry.is_empty() {
            self.carry.extend(bytes);
            return;
        }
        let n = bytes.len().min(out.len() - *written);
        out[*written..*written + n].copy_from_slice(&bytes[..n]);
        *written += n;
        self.carry.extend(&bytes[n..]);
    }

    fn flush_carry(&mut self, out: &mut [u8], written: &mut usize) {
        let n = self.carry.len().min(out.len() - *written);
        for (slot, byte) in out[*written..*written + n].iter_mut().zip(self.carry.drain(..n)) {
            *slot = byte;
        }
        *written += n;
    }

    /// The innermost section renders nothing.
    fn skipping(&self) -> bool {
        self.blocks.last().is_some_and(Block::is_finished)
    }

    fn dispatch(
        &mut self,
        raw: &[u8],
        out: &mut [u8],
        parent: Option<&Scope<'_, 'd>>,
        written: &mut usize,
    ) -> RenderResult<()> {
        let text = String::from_utf8_lossy(raw);
        let tag = text.trim();
        let Some(marker) = tag.chars().next() else {
            return Err(RenderError::EmptyTag);
        };
        let body = tag[marker.len_utf8()..].trim();

        match marker {
            SECTION | INVERTED => self.open_section(tag, body, parent),
            CLOSE => self.close_section(body),
            _ if self.skipping() => Ok(()),
            PARTIAL => self.open_partial(body),
            m if self.config.is_raw_marker(m) => {
                self.emit_variable(body, false, out, parent, written)
            }
            _ => self.emit_variable(tag, true, out, parent, written),
        }
    }

    fn emit_variable(
        &mut self,
        path: &str,
        escape: bool,
        out: &mut [u8],
        parent: Option<&Scope<'_, 'd>>,
        written: &mut usize,
    ) -> RenderResult<()> {
        if path.is_empty() {
            return Err(RenderError::EmptyTag);
        }
        let Some(data) = Scope::new(&self.blocks, self.root, parent).resolve(path) else {
            return Ok(());
        };
        let bytes = data.to_bytes();
        if escape {
            let config = Rc::clone(&self.config);
            self.emit(&config.escaper().escape(&bytes), out, written);
        } else {
            self.emit(&bytes, out, written);
        }
        Ok(())
    }

    fn open_section(
        &mut self,
        tag: &str,
        body: &str,
        parent: Option<&Scope<'_, 'd>>,
    ) -> RenderResult<()> {
        let section = SectionTag::parse(body, tag)?;
        let cursor = self.cursor;
        let skipped = self.skipping();
        let data = if skipped {
            Data::absent()
        } else {
            Scope::new(&self.blocks, self.root, parent)
                .resolve(&section.name)
                .unwrap_or_else(Data::absent)
        };
        let block = Block::new(tag, section, cursor, data, skipped);
        tracing::trace!(
            section = block.name(),
            tag = block.tag(),
            cursor,
            iterations = block.iterations(),
            "open section"
        );
        self.blocks.push(block);
        Ok(())
    }

    fn close_section(&mut self, name: &str) -> RenderResult<()> {
        let Some(block) = self.blocks.last_mut() else {
            return Err(RenderError::UnopenedSection {
                name: name.to_string(),
            });
        };
        if block.name() != name {
            return Err(RenderError::SectionMismatch {
                expected: block.name().to_string(),
                found: name.to_string(),
            });
        }

        block.increment();
        if block.is_finished() {
            tracing::trace!(section = name, "close section");
            self.blocks.pop();
            return Ok(());
        }

        let cursor = block.cursor();
        tracing::trace!(section = name, cursor, "repeat section");
        self.rewind(cursor)
    }

    /// Restart reading the source at `cursor`.
    fn rewind(&mut self, cursor: u64) -> RenderResult<()> {
        self.source.seek(SeekFrom::Start(cursor))?;
        self.pending.clear();
        self.cursor = cursor;
        self.source_eof = false;
        self.starved = false;
        Ok(())
    }

    fn open_partial(&mut self, name: &str) -> RenderResult<()> {
        if name.is_empty() {
            return Err(RenderError::EmptyTag);
        }
        let Some(resolver) = self.resolver.clone() else {
            return Err(RenderError::MissingResolver {
                name: name.to_string(),
            });
        };
        let depth = self.depth + 1;
        if depth > self.config.max_partial_depth() {
            return Err(RenderError::RecursivePartial {
                name: name.to_string(),
                max_depth: self.config.max_partial_depth(),
            });
        }

        let child = match resolver.resolve(name)? {
            Partial::Source(source) => Box::new(Renderer::from_parts(
                source,
                self.root,
                Rc::clone(&self.config),
                Some(resolver),
                depth,
            )),
            Partial::Renderer(mut renderer) => {
                renderer.depth = depth;
                if renderer.resolver.is_none() {
                    renderer.resolver = Some(resolver);
                }
                renderer
            }
        };

        tracing::debug!(partial = name, depth, "open partial");
        self.partial = Some(child);
        Ok(())
    }

    /// Close the active partial's source and drop it.
    fn close_partial(&mut self) -> RenderResult<()> {
        if let Some(mut child) = self.partial.take() {
            tracing::debug!(depth = child.depth, "close partial");
            child.source.close()?;
        }
        Ok(())
    }
}

impl Read for Renderer<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let chunk = self.read_chunk(buf)?;
            if chunk.written > 0 || chunk.finished {
                return Ok(chunk.written);
            }
        }
    }
}

impl Drop for Renderer<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.close_partial() {
            tracing::warn!(error = %err, "failed to close partial source");
        }
    }
}

impl std::fmt::Debug for Renderer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("depth", &self.depth)
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("pending", &self.pending.len())
            .field("carry", &self.carry.len())
            .field("blocks", &self.blocks.len())
            .field("partial", &self.partial.is_some())
            .finish_non_exhaustive()
    }
}
