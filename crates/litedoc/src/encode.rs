//! Re-encoder.
//!
//! Walks the materialized part of the tree depth first. Whatever was never
//! touched is copied from the source buffer as a byte range; everything else
//! is written from its native value.

use std::ops::Range;

use litedoc_pack::{decode, read_blob_ref, read_scalar, Encoder, Scalar, Tag};
use tracing::trace;

use crate::error::EncodeError;
use crate::node::{Arena, Body, NodeId};
use crate::slot::Slot;
use crate::value::Native;

/// What an encode pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeReport {
    /// Byte ranges copied from the source buffer.
    pub verbatim_ranges: usize,
    pub verbatim_bytes: usize,
    /// Values written from their native form.
    pub encoded_values: usize,
}

pub(crate) struct ReEncoder<'a> {
    source: &'a [u8],
    arena: &'a Arena,
    reuse: bool,
    pub out: Encoder,
    pub report: EncodeReport,
}

impl<'a> ReEncoder<'a> {
    pub fn new(source: &'a [u8], arena: &'a Arena, reuse: bool, alloc_size: usize) -> Self {
        Self {
            source,
            arena,
            reuse,
            out: Encoder::with_alloc_size(alloc_size),
            report: EncodeReport::default(),
        }
    }

    fn verbatim(&mut self, range: Range<usize>) -> Result<(), EncodeError> {
        let raw = self
            .source
            .get(range.clone())
            .ok_or(EncodeError::SourceRange {
                start: range.start,
                end: range.end,
            })?;
        self.out.write_raw(raw);
        self.report.verbatim_ranges += 1;
        self.report.verbatim_bytes += raw.len();
        Ok(())
    }

    pub fn slot(&mut self, slot: &Slot) -> Result<(), EncodeError> {
        match slot {
            Slot::Unloaded(range) if self.reuse => self.verbatim(range.clone()),
            Slot::Unloaded(range) => self.transcode(range.start),
            Slot::Loaded {
                value: Native::Array(id) | Native::Dictionary(id),
                ..
            } => self.node(*id),
            Slot::Loaded {
                dirty: false,
                origin: Some(range),
                ..
            } if self.reuse => self.verbatim(range.clone()),
            // Values decoded from the source are re-emitted as they were,
            // non-finite floats included.
            Slot::Loaded {
                value,
                dirty: false,
                origin: Some(_),
            } => self.native(value, false),
            Slot::Loaded { value, .. } => self.native(value, true),
        }
    }

    pub fn node(&mut self, id: NodeId) -> Result<(), EncodeError> {
        let arena = self.arena;
        let node = arena.get(id).map_err(|_| EncodeError::StaleNode)?;
        if self.reuse && node.is_pristine() {
            if let Some(range) = node.source.clone() {
                trace!(?id, bytes = range.len(), "copying untouched node");
                return self.verbatim(range);
            }
        }
        trace!(?id, structural = node.structurally_dirty, "re-encoding node");
        self.report.encoded_values += 1;
        match &node.body {
            Body::Array(slots) => {
                self.out.write_arr_hdr(slots.len());
                for slot in slots {
                    self.slot(slot)?;
                }
            }
            Body::Dict(map) => {
                self.out.write_obj_hdr(map.len());
                for (key, slot) in map {
                    self.out.write_str(key);
                    self.slot(slot)?;
                }
            }
        }
        Ok(())
    }

    fn native(&mut self, value: &Native, strict: bool) -> Result<(), EncodeError> {
        match value {
            Native::Array(id) | Native::Dictionary(id) => return self.node(*id),
            Native::Null => self.out.write_null(),
            Native::Bool(b) => self.out.write_boolean(*b),
            Native::Int(i) => self.out.write_integer(*i),
            Native::UInt(u) => self.out.write_u_integer(*u),
            Native::Float(f) if strict && !f.is_finite() => {
                return Err(EncodeError::NonFiniteFloat(*f))
            }
            Native::Float(f) => self.out.write_float(*f),
            Native::String(s) => self.out.write_str(s),
            Native::Bytes(b) => self.out.write_bin(b),
            Native::Blob(blob) => self.out.write_blob_ref(blob.reference()),
        }
        self.report.encoded_values += 1;
        Ok(())
    }

    /// Decodes the item at `offset` and writes it back in canonical form.
    fn transcode(&mut self, offset: usize) -> Result<(), EncodeError> {
        let item = decode(self.source, offset)?;
        match item.tag {
            Tag::Array => {
                self.out.write_arr_hdr(item.count());
                for child in &item.children {
                    self.transcode(child.start)?;
                }
            }
            Tag::Map => {
                self.out.write_obj_hdr(item.count());
                for child in &item.children {
                    self.transcode(child.start)?;
                }
            }
            Tag::Blob => {
                let blob = read_blob_ref(self.source, &item)?;
                self.out.write_blob_ref(&blob);
            }
            _ => {
                let scalar: Scalar<'_> = read_scalar(self.source, &item)?;
                self.out.write_scalar(&scalar);
            }
        }
        self.report.encoded_values += 1;
        Ok(())
    }
}
