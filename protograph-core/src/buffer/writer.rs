// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use super::SubItemToken;
use crate::error::Error;
use crate::types::{WireType, MAX_TAG};
use crate::varint::{
    encode_varint, encode_varint_array, write_fixed32, write_fixed64, zigzag32, zigzag64,
};
use std::io::Write;

const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug)]
enum OpenItem {
    /// Length-prefixed region; one placeholder byte precedes `content_start`.
    Length { content_start: usize, serial: u32 },
    /// Packed scalars share the length-prefixed layout.
    Packed {
        content_start: usize,
        element: WireType,
        serial: u32,
    },
    /// Group region closed by an end-group header carrying `tag`.
    Group { tag: u32, serial: u32 },
}

impl OpenItem {
    fn serial(&self) -> u32 {
        match self {
            OpenItem::Length { serial, .. }
            | OpenItem::Packed { serial, .. }
            | OpenItem::Group { serial, .. } => *serial,
        }
    }
}

/// Output cursor for the protobuf wire format.
///
/// A value write consumes the wire type announced by the preceding
/// [`write_field_header`](Self::write_field_header), so the same `write_i32`
/// produces a plain varint, a zigzag varint or a fixed32 depending on the header.
///
/// Length-prefixed sub-items are written with a one byte placeholder that is
/// backpatched when the region closes; longer prefixes shift the region in
/// place. The emitted prefix therefore always equals the content length.
///
/// Nothing is handed to a downstream sink until [`finish`](Self::finish) or
/// [`flush_to`](Self::flush_to) succeeds. After [`abandon`](Self::abandon) the
/// buffered bytes are discarded and every further call fails.
pub struct ProtoWriter {
    bf: Vec<u8>,
    field_number: u32,
    wire_type: Option<WireType>,
    stack: Vec<OpenItem>,
    next_serial: u32,
    max_depth: usize,
    abandoned: bool,
}

impl Default for ProtoWriter {
    fn default() -> Self {
        ProtoWriter::with_max_depth(DEFAULT_MAX_DEPTH)
    }
}

impl ProtoWriter {
    pub fn new() -> ProtoWriter {
        ProtoWriter::default()
    }

    pub fn with_max_depth(max_depth: usize) -> ProtoWriter {
        ProtoWriter {
            bf: Vec::new(),
            field_number: 0,
            wire_type: None,
            stack: Vec::new(),
            next_serial: 0,
            max_depth,
            abandoned: false,
        }
    }

    pub fn len(&self) -> usize {
        self.bf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bf.is_empty()
    }

    /// Number of currently open sub-items.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub fn dump(&self) -> Vec<u8> {
        self.bf.clone()
    }

    #[inline(always)]
    fn check_active(&self) -> Result<(), Error> {
        if self.abandoned {
            return Err(Error::invalid_state("writer has been abandoned"));
        }
        Ok(())
    }

    /// Writes `varint(tag << 3 | wire_type)` and arms the next value write.
    pub fn write_field_header(&mut self, tag: u32, wire_type: WireType) -> Result<(), Error> {
        self.check_active()?;
        if tag == 0 || tag > MAX_TAG {
            return Err(Error::not_allowed(format!(
                "field number {} is outside 1..={}",
                tag, MAX_TAG
            )));
        }
        if wire_type == WireType::EndGroup {
            return Err(Error::invalid_state(
                "end-group headers are written by end_sub_item",
            ));
        }
        if let Some(pending) = self.wire_type {
            return Err(Error::invalid_state(format!(
                "field {} ({}) was announced but never written",
                self.field_number, pending
            )));
        }
        if matches!(self.stack.last(), Some(OpenItem::Packed { .. })) {
            return Err(Error::invalid_state(
                "field headers cannot be written inside a packed payload",
            ));
        }
        encode_varint(((tag << 3) | wire_type.physical()) as u64, &mut self.bf);
        self.field_number = tag;
        self.wire_type = Some(wire_type);
        Ok(())
    }

    /// Field number of the most recent header.
    pub fn field_number(&self) -> u32 {
        self.field_number
    }

    #[inline(always)]
    fn take_wire_type(&mut self) -> Result<WireType, Error> {
        self.check_active()?;
        if let Some(wire_type) = self.wire_type.take() {
            return Ok(wire_type);
        }
        match self.stack.last() {
            Some(OpenItem::Packed { element, .. }) => Ok(*element),
            _ => Err(Error::invalid_state(
                "no field header pending for value write",
            )),
        }
    }

    #[cold]
    fn wire_mismatch(&self, what: &str, wire_type: WireType) -> Error {
        Error::schema_mismatch(format!(
            "cannot write {} as {} (field {})",
            what, wire_type, self.field_number
        ))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), Error> {
        match self.take_wire_type()? {
            // negative values are sign-extended to ten bytes like every other implementation
            WireType::Varint => encode_varint(value as i64 as u64, &mut self.bf),
            WireType::SignedVarint => encode_varint(zigzag32(value) as u64, &mut self.bf),
            WireType::Fixed32 => {
                write_fixed32(value as u32, &mut self.bf);
                4
            }
            WireType::Fixed64 => {
                write_fixed64(value as i64 as u64, &mut self.bf);
                8
            }
            other => return Err(self.wire_mismatch("int32", other)),
        };
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), Error> {
        match self.take_wire_type()? {
            WireType::Varint => {
                encode_varint(value as u64, &mut self.bf);
            }
            WireType::SignedVarint => {
                encode_varint(zigzag64(value), &mut self.bf);
            }
            WireType::Fixed64 => write_fixed64(value as u64, &mut self.bf),
            WireType::Fixed32 => {
                let narrow = i32::try_from(value).map_err(|_| {
                    Error::schema_mismatch(format!("{} does not fit a fixed32 field", value))
                })?;
                write_fixed32(narrow as u32, &mut self.bf);
            }
            other => return Err(self.wire_mismatch("int64", other)),
        }
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), Error> {
        match self.take_wire_type()? {
            WireType::Varint => {
                encode_varint(value as u64, &mut self.bf);
            }
            WireType::Fixed32 => write_fixed32(value, &mut self.bf),
            WireType::Fixed64 => write_fixed64(value as u64, &mut self.bf),
            other => return Err(self.wire_mismatch("uint32", other)),
        }
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), Error> {
        match self.take_wire_type()? {
            WireType::Varint => {
                encode_varint(value, &mut self.bf);
            }
            WireType::Fixed64 => write_fixed64(value, &mut self.bf),
            WireType::Fixed32 => {
                let narrow = u32::try_from(value).map_err(|_| {
                    Error::schema_mismatch(format!("{} does not fit a fixed32 field", value))
                })?;
                write_fixed32(narrow, &mut self.bf);
            }
            other => return Err(self.wire_mismatch("uint64", other)),
        }
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), Error> {
        match self.take_wire_type()? {
            WireType::Fixed32 => write_fixed32(value.to_bits(), &mut self.bf),
            WireType::Fixed64 => write_fixed64((value as f64).to_bits(), &mut self.bf),
            other => return Err(self.wire_mismatch("float", other)),
        }
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), Error> {
        match self.take_wire_type()? {
            WireType::Fixed64 => write_fixed64(value.to_bits(), &mut self.bf),
            WireType::Fixed32 => {
                let narrow = value as f32;
                if value.is_finite() && narrow.is_infinite() {
                    return Err(Error::schema_mismatch(format!(
                        "{} does not fit a float field",
                        value
                    )));
                }
                write_fixed32(narrow.to_bits(), &mut self.bf);
            }
            other => return Err(self.wire_mismatch("double", other)),
        }
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), Error> {
        match self.take_wire_type()? {
            WireType::Varint => self.bf.push(value as u8),
            other => return Err(self.wire_mismatch("bool", other)),
        }
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), Error> {
        self.write_bytes(value.as_bytes())
    }

    pub fn write_bytes(&mut self, value: &[u8]) -> Result<(), Error> {
        match self.take_wire_type()? {
            WireType::LengthDelimited => {
                encode_varint(value.len() as u64, &mut self.bf);
                self.bf.extend_from_slice(value);
            }
            other => return Err(self.wire_mismatch("bytes", other)),
        }
        Ok(())
    }

    fn push_item(&mut self, item: impl FnOnce(u32) -> OpenItem) -> Result<SubItemToken, Error> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::depth_exceed(format!(
                "sub-item nesting exceeds the maximum depth of {}; cyclic object graphs are not supported",
                self.max_depth
            )));
        }
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        self.stack.push(item(serial));
        Ok(SubItemToken {
            depth: self.stack.len(),
            serial,
        })
    }

    /// Opens a nested region for the field announced by the last header.
    ///
    /// `LengthDelimited` headers open a length-prefixed region, `StartGroup`
    /// headers a group that [`end_sub_item`](Self::end_sub_item) terminates with
    /// the matching end-group header.
    pub fn start_sub_item(&mut self) -> Result<SubItemToken, Error> {
        match self.take_wire_type()? {
            WireType::LengthDelimited => {
                self.bf.push(0);
                let content_start = self.bf.len();
                self.push_item(|serial| OpenItem::Length {
                    content_start,
                    serial,
                })
            }
            WireType::StartGroup => {
                let tag = self.field_number;
                self.push_item(|serial| OpenItem::Group { tag, serial })
            }
            other => Err(self.wire_mismatch("a sub-item", other)),
        }
    }

    /// Opens a packed payload whose values are written back to back with
    /// `element` encoding and no per-value headers.
    pub fn start_packed(&mut self, element: WireType) -> Result<SubItemToken, Error> {
        if !element.is_packable() {
            return Err(Error::not_allowed(format!(
                "{} values cannot be packed",
                element
            )));
        }
        match self.take_wire_type()? {
            WireType::LengthDelimited => {
                self.bf.push(0);
                let content_start = self.bf.len();
                self.push_item(|serial| OpenItem::Packed {
                    content_start,
                    element,
                    serial,
                })
            }
            other => Err(self.wire_mismatch("a packed payload", other)),
        }
    }

    /// Closes the innermost open region. Closing any other region is a bounds error.
    pub fn end_sub_item(&mut self, token: SubItemToken) -> Result<(), Error> {
        self.check_active()?;
        let in_order = token.depth == self.stack.len()
            && self.stack.last().map(OpenItem::serial) == Some(token.serial);
        if !in_order {
            return Err(Error::bounds_msg(format!(
                "sub-item at depth {} closed while depth {} is open",
                token.depth,
                self.stack.len()
            )));
        }
        if let Some(pending) = self.wire_type {
            return Err(Error::invalid_state(format!(
                "field {} ({}) was announced but never written",
                self.field_number, pending
            )));
        }
        match self.stack.pop() {
            Some(OpenItem::Length { content_start, .. })
            | Some(OpenItem::Packed { content_start, .. }) => {
                self.backpatch(content_start);
                Ok(())
            }
            Some(OpenItem::Group { tag, .. }) => {
                encode_varint(
                    ((tag << 3) | WireType::EndGroup.physical()) as u64,
                    &mut self.bf,
                );
                Ok(())
            }
            None => Err(Error::bounds_msg("no sub-item is open")),
        }
    }

    fn backpatch(&mut self, content_start: usize) {
        let length = self.bf.len() - content_start;
        let (prefix, used) = encode_varint_array(length as u64);
        if used == 1 {
            self.bf[content_start - 1] = prefix[0];
        } else {
            self.bf
                .splice(content_start - 1..content_start, prefix[..used].iter().copied());
        }
    }

    /// Marks the writer unusable and drops everything buffered so far.
    pub fn abandon(&mut self) {
        self.abandoned = true;
        self.bf.clear();
        self.stack.clear();
        self.wire_type = None;
    }

    /// Returns the complete output. Fails if a sub-item is still open or the
    /// writer was abandoned.
    pub fn finish(self) -> Result<Vec<u8>, Error> {
        self.check_active()?;
        if !self.stack.is_empty() {
            return Err(Error::bounds_msg(format!(
                "{} sub-item(s) still open",
                self.stack.len()
            )));
        }
        if let Some(pending) = self.wire_type {
            return Err(Error::invalid_state(format!(
                "field {} ({}) was announced but never written",
                self.field_number, pending
            )));
        }
        Ok(self.bf)
    }

    /// Delivers the complete output to `sink`.
    pub fn flush_to<W: Write + ?Sized>(self, sink: &mut W) -> Result<(), Error> {
        let bytes = self.finish()?;
        sink.write_all(&bytes)?;
        Ok(())
    }
}
