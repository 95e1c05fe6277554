/*
 * data.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Read-only views onto the data graph.
//!
//! A [`Data`] narrows a borrowed [`Value`] to one node. Its [`Shape`] is
//! classified once, when the view is created; lookups, counting and
//! serialization all dispatch on that shape.

use std::collections::BTreeMap;
use std::io::Write;

use crate::value::{Record, Value};

/// Separates the segments of a lookup path such as `a.b.c`.
pub const PATH_DELIMITER: char = '.';

/// Path that refers to the current element itself.
pub const SELF_PATH: &str = ".";

/// A scalar node, or a synthesized key/index produced by iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'d> {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'d str),
    Bytes(&'d [u8]),
    Index(usize),
}

/// The closed set of shapes a view can take.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'d> {
    Absent,
    Scalar(Scalar<'d>),
    Sequence(&'d [Value]),
    Mapping(&'d BTreeMap<String, Value>),
    Record(&'d Record),
}

/// A borrowed view onto one node of the data graph.
#[derive(Debug, Clone, Copy)]
pub struct Data<'d> {
    shape: Shape<'d>,
}

impl<'d> Data<'d> {
    /// Classify `value`.
    pub fn new(value: &'d Value) -> Self {
        let shape = match value {
            Value::Null => Shape::Absent,
            Value::Bool(b) => Shape::Scalar(Scalar::Bool(*b)),
            Value::Int(i) => Shape::Scalar(Scalar::Int(*i)),
            Value::Float(f) => Shape::Scalar(Scalar::Float(*f)),
            Value::String(s) => Shape::Scalar(Scalar::Str(s)),
            Value::Bytes(b) => Shape::Scalar(Scalar::Bytes(b)),
            Value::List(items) => Shape::Sequence(items),
            Value::Map(map) => Shape::Mapping(map),
            Value::Record(record) => Shape::Record(record),
        };
        Self { shape }
    }

    pub fn absent() -> Self {
        Self {
            shape: Shape::Absent,
        }
    }

    pub(crate) fn scalar(scalar: Scalar<'d>) -> Self {
        Self {
            shape: Shape::Scalar(scalar),
        }
    }

    pub fn shape(&self) -> Shape<'d> {
        self.shape
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.shape, Shape::Absent)
    }

    /// Present-only view: `None` when absent.
    pub(crate) fn present(self) -> Option<Self> {
        (!self.is_absent()).then_some(self)
    }

    /// Resolve a dotted path below this node.
    ///
    /// `.` resolves to the node itself. Unknown keys, out-of-range indices,
    /// empty segments and paths through scalars resolve to `None`.
    pub fn get(&self, path: &str) -> Option<Data<'d>> {
        if path == SELF_PATH {
            return self.present();
        }

        path.split(PATH_DELIMITER)
            .try_fold(*self, |node, segment| node.child(segment))
    }

    /// Resolve a single path segment.
    fn child(&self, segment: &str) -> Option<Data<'d>> {
        if segment.is_empty() {
            return None;
        }
        let value = match self.shape {
            Shape::Mapping(map) => map.get(segment),
            Shape::Record(record) => record.get(segment),
            Shape::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Shape::Absent | Shape::Scalar(_) => None,
        }?;
        Data::new(value).present()
    }

    /// Number of elements: sequence length, mapping/record entry count, 1
    /// for a non-empty scalar, 0 for anything empty.
    pub fn len(&self) -> usize {
        match self.shape {
            Shape::Sequence(items) => items.len(),
            Shape::Mapping(map) => map.len(),
            Shape::Record(record) => record.len(),
            _ if self.is_empty() => 0,
            _ => 1,
        }
    }

    /// Whether the node counts as empty for section rendering.
    ///
    /// Absent values, `false`, empty strings/bytes and empty collections are
    /// empty. Numbers never are.
    pub fn is_empty(&self) -> bool {
        match self.shape {
            Shape::Absent => true,
            Shape::Scalar(Scalar::Bool(b)) => !b,
            Shape::Scalar(Scalar::Str(s)) => s.is_empty(),
            Shape::Scalar(Scalar::Bytes(b)) => b.is_empty(),
            Shape::Scalar(Scalar::Int(_) | Scalar::Float(_) | Scalar::Index(_)) => false,
            Shape::Sequence(items) => items.is_empty(),
            Shape::Mapping(map) => map.is_empty(),
            Shape::Record(record) => record.is_empty(),
        }
    }

    /// The `i`th element of a sequence.
    pub fn index(&self, i: usize) -> Option<Data<'d>> {
        match self.shape {
            Shape::Sequence(items) => items.get(i).map(Data::new),
            _ => None,
        }
    }

    /// Key/value pairs: sorted keys for mappings, declaration order for
    /// records, `(index, element)` for sequences, and a single `(0, self)`
    /// pair for any other non-empty node.
    pub fn entries(&self) -> Vec<(Data<'d>, Data<'d>)> {
        match self.shape {
            Shape::Mapping(map) => map
                .iter()
                .map(|(k, v)| (Data::scalar(Scalar::Str(k)), Data::new(v)))
                .collect(),
            Shape::Record(record) => record
                .iter()
                .map(|(k, v)| (Data::scalar(Scalar::Str(k)), Data::new(v)))
                .collect(),
            Shape::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Data::scalar(Scalar::Index(i)), Data::new(v)))
                .collect(),
            _ if self.is_empty() => Vec::new(),
            _ => vec![(Data::scalar(Scalar::Index(0)), *self)],
        }
    }

    /// Append the canonical byte form of this node to `out`.
    ///
    /// Scalars are written as text; composite nodes as compact JSON.
    pub fn write_bytes(&self, out: &mut Vec<u8>) {
        let written = match self.shape {
            Shape::Absent => Ok(()),
            Shape::Scalar(Scalar::Str(s)) => {
                out.extend_from_slice(s.as_bytes());
                Ok(())
            }
            Shape::Scalar(Scalar::Bytes(b)) => {
                out.extend_from_slice(b);
                Ok(())
            }
            Shape::Scalar(Scalar::Bool(b)) => write!(out, "{b}"),
            Shape::Scalar(Scalar::Int(i)) => write!(out, "{i}"),
            Shape::Scalar(Scalar::Float(f)) => write!(out, "{f}"),
            Shape::Scalar(Scalar::Index(i)) => write!(out, "{i}"),
            Shape::Sequence(items) => serde_json::to_writer(&mut *out, items).map_err(Into::into),
            Shape::Mapping(map) => serde_json::to_writer(&mut *out, map).map_err(Into::into),
            Shape::Record(record) => serde_json::to_writer(&mut *out, record).map_err(Into::into),
        };
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to serialize template value");
        }
    }

    /// The canonical byte form of this node.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_bytes(&mut out);
        out
    }
}

impl<'d> From<&'d Value> for Data<'d> {
    fn from(value: &'d Value) -> Self {
        Data::new(value)
    }
}
