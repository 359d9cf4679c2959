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
use crate::types::{FieldHeader, WireType};
use crate::varint::{
    decode_varint, decode_varint32, read_fixed32, read_fixed64, unzigzag32, unzigzag64,
};

const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug)]
enum Scope {
    Length { prev_end: usize, serial: u32 },
    Group { tag: u32, ended: bool, serial: u32 },
}

impl Scope {
    fn serial(&self) -> u32 {
        match self {
            Scope::Length { serial, .. } | Scope::Group { serial, .. } => *serial,
        }
    }
}

/// Input cursor for the protobuf wire format.
///
/// The reader keeps a stack of read limits, one per open sub-item. A read that
/// would cross the innermost limit fails with a bounds error; running out of
/// input at the outermost level is a format error.
pub struct ProtoReader<'bf> {
    bf: &'bf [u8],
    cursor: usize,
    end: usize,
    field_number: u32,
    wire_type: Option<WireType>,
    stack: Vec<Scope>,
    next_serial: u32,
    max_depth: usize,
}

impl<'bf> ProtoReader<'bf> {
    pub fn new(bf: &'bf [u8]) -> ProtoReader<'bf> {
        ProtoReader::with_max_depth(bf, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(bf: &'bf [u8], max_depth: usize) -> ProtoReader<'bf> {
        ProtoReader {
            bf,
            cursor: 0,
            end: bf.len(),
            field_number: 0,
            wire_type: None,
            stack: Vec::new(),
            next_serial: 0,
            max_depth,
        }
    }

    #[inline(always)]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes left before the innermost limit.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.end - self.cursor
    }

    /// Whether the innermost length-delimited region still has payload.
    #[inline(always)]
    pub fn has_more(&self) -> bool {
        self.cursor < self.end
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn field_number(&self) -> u32 {
        self.field_number
    }

    /// Wire type of the current field, if its payload has not been consumed yet.
    pub fn wire_type(&self) -> Option<WireType> {
        self.wire_type
    }

    /// Re-arms the cursor for the next element of a packed payload.
    pub fn set_wire_type(&mut self, wire_type: WireType) {
        self.wire_type = Some(wire_type);
    }

    /// Declares that the pending varint is zigzag encoded.
    ///
    /// The wire cannot distinguish `int32` from `sint32`, so the caller states the
    /// intended interpretation before reading. Hints for any other wire type are
    /// ignored.
    pub fn hint(&mut self, wire_type: WireType) {
        if wire_type == WireType::SignedVarint && self.wire_type == Some(WireType::Varint) {
            self.wire_type = Some(WireType::SignedVarint);
        }
    }

    /// Reads the next field header.
    ///
    /// Returns `None` at the end of the current region: the length boundary, the
    /// end of the input, or the end-group marker of the innermost open group.
    pub fn read_field_header(&mut self) -> Result<Option<FieldHeader>, Error> {
        if let Some(Scope::Group { ended: true, .. }) = self.stack.last() {
            return Ok(None);
        }
        if self.cursor >= self.end {
            if let Some(Scope::Group { tag, .. }) = self.stack.last() {
                return Err(Error::format(format!(
                    "data ended inside group {} before its end marker",
                    tag
                )));
            }
            self.wire_type = None;
            return Ok(None);
        }
        let header = self.read_raw_varint()?;
        let header = u32::try_from(header)
            .map_err(|_| Error::format(format!("field header {} overflows 32 bits", header)))?;
        let tag = header >> 3;
        if tag == 0 {
            return Err(Error::format("field number 0 is invalid"));
        }
        let wire_type = WireType::from_header_bits(header & 7).ok_or_else(|| {
            Error::format(format!("invalid wire type {} for field {}", header & 7, tag))
        })?;
        if wire_type == WireType::EndGroup {
            return match self.stack.last_mut() {
                Some(Scope::Group { tag: open, ended, .. }) if *open == tag => {
                    *ended = true;
                    self.field_number = tag;
                    self.wire_type = None;
                    Ok(None)
                }
                _ => Err(Error::format(format!(
                    "unexpected end-group marker for field {}",
                    tag
                ))),
            };
        }
        self.field_number = tag;
        self.wire_type = Some(wire_type);
        Ok(Some(FieldHeader { tag, wire_type }))
    }

    /// Returns the next field header without consuming it.
    pub fn peek_field_header(&self) -> Result<Option<FieldHeader>, Error> {
        if self.cursor >= self.end {
            return Ok(None);
        }
        let (header, _) = decode_varint(&self.bf[self.cursor..self.end])?;
        let wire_type = match WireType::from_header_bits((header & 7) as u32) {
            Some(WireType::EndGroup) | None => return Ok(None),
            Some(wire_type) => wire_type,
        };
        Ok(Some(FieldHeader {
            tag: (header >> 3) as u32,
            wire_type,
        }))
    }

    #[inline(always)]
    fn take_wire_type(&mut self) -> Result<WireType, Error> {
        self.wire_type
            .take()
            .ok_or_else(|| Error::invalid_state("no field header pending for value read"))
    }

    #[cold]
    fn wire_mismatch(&self, what: &str, wire_type: WireType) -> Error {
        Error::schema_mismatch(format!(
            "field {} has wire type {} which cannot be read as {}",
            self.field_number, wire_type, what
        ))
    }

    /// A short read inside a length-delimited sub-item crosses that sub-item's
    /// limit, whether or not the input itself also runs out.
    #[cold]
    fn truncated(&self, wanted: usize, cause: Error) -> Error {
        let limited = self
            .stack
            .iter()
            .any(|scope| matches!(scope, Scope::Length { .. }));
        if limited {
            Error::bounds(self.cursor, wanted, self.end)
        } else {
            cause
        }
    }

    /// Whether the input ends in the middle of a varint starting at the cursor.
    fn varint_cut_short(&self) -> bool {
        let rest = &self.bf[self.cursor..];
        rest.len() < 10 && rest.iter().all(|b| b & 0x80 != 0)
    }

    fn read_raw_varint(&mut self) -> Result<u64, Error> {
        match decode_varint(&self.bf[self.cursor..self.end]) {
            Ok((value, used)) => {
                self.cursor += used;
                Ok(value)
            }
            Err(e) => Err(match decode_varint(&self.bf[self.cursor..]) {
                Ok((_, used)) => self.truncated(used, e),
                Err(_) if self.varint_cut_short() => {
                    self.truncated(self.bf.len() - self.cursor + 1, e)
                }
                Err(_) => e,
            }),
        }
    }

    fn read_raw_varint32(&mut self, allow_sign_extension: bool) -> Result<u32, Error> {
        match decode_varint32(&self.bf[self.cursor..self.end], allow_sign_extension) {
            Ok((value, used)) => {
                self.cursor += used;
                Ok(value)
            }
            Err(e) => Err(
                match decode_varint32(&self.bf[self.cursor..], allow_sign_extension) {
                    Ok((_, used)) => self.truncated(used, e),
                    Err(_) if self.varint_cut_short() => {
                        self.truncated(self.bf.len() - self.cursor + 1, e)
                    }
                    Err(_) => e,
                },
            ),
        }
    }

    fn take_slice(&mut self, len: usize) -> Result<&'bf [u8], Error> {
        let stop = self
            .cursor
            .checked_add(len)
            .filter(|stop| *stop <= self.end)
            .ok_or_else(|| {
                self.truncated(
                    len,
                    Error::format(format!(
                        "truncated input: {} bytes wanted at offset {}, {} available",
                        len,
                        self.cursor,
                        self.end - self.cursor
                    )),
                )
            })?;
        let slice = &self.bf[self.cursor..stop];
        self.cursor = stop;
        Ok(slice)
    }

    fn read_length(&mut self) -> Result<usize, Error> {
        let len = self.read_raw_varint()?;
        usize::try_from(len).map_err(|_| Error::format(format!("length {} is too large", len)))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        match self.take_wire_type()? {
            WireType::Varint => Ok(self.read_raw_varint32(true)? as i32),
            WireType::SignedVarint => Ok(unzigzag32(self.read_raw_varint32(false)?)),
            WireType::Fixed32 => Ok(read_fixed32(self.take_slice(4)?)? as i32),
            WireType::Fixed64 => {
                let value = read_fixed64(self.take_slice(8)?)? as i64;
                i32::try_from(value)
                    .map_err(|_| Error::format(format!("{} overflows int32", value)))
            }
            other => Err(self.wire_mismatch("int32", other)),
        }
    }

    pub fn read_i64(&mut self) -> Result<i64, Error> {
        match self.take_wire_type()? {
            WireType::Varint => Ok(self.read_raw_varint()? as i64),
            WireType::SignedVarint => Ok(unzigzag64(self.read_raw_varint()?)),
            WireType::Fixed64 => Ok(read_fixed64(self.take_slice(8)?)? as i64),
            WireType::Fixed32 => Ok(read_fixed32(self.take_slice(4)?)? as i32 as i64),
            other => Err(self.wire_mismatch("int64", other)),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        match self.take_wire_type()? {
            WireType::Varint => self.read_raw_varint32(false),
            WireType::Fixed32 => read_fixed32(self.take_slice(4)?),
            WireType::Fixed64 => {
                let value = read_fixed64(self.take_slice(8)?)?;
                u32::try_from(value)
                    .map_err(|_| Error::format(format!("{} overflows uint32", value)))
            }
            other => Err(self.wire_mismatch("uint32", other)),
        }
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        match self.take_wire_type()? {
            WireType::Varint => self.read_raw_varint(),
            WireType::Fixed64 => read_fixed64(self.take_slice(8)?),
            WireType::Fixed32 => Ok(read_fixed32(self.take_slice(4)?)? as u64),
            other => Err(self.wire_mismatch("uint64", other)),
        }
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        match self.take_wire_type()? {
            WireType::Fixed32 => Ok(f32::from_bits(read_fixed32(self.take_slice(4)?)?)),
            WireType::Fixed64 => {
                let value = f64::from_bits(read_fixed64(self.take_slice(8)?)?);
                let narrow = value as f32;
                if value.is_finite() && narrow.is_infinite() {
                    return Err(Error::format(format!("{} overflows float", value)));
                }
                Ok(narrow)
            }
            other => Err(self.wire_mismatch("float", other)),
        }
    }

    pub fn read_f64(&mut self) -> Result<f64, Error> {
        match self.take_wire_type()? {
            WireType::Fixed64 => Ok(f64::from_bits(read_fixed64(self.take_slice(8)?)?)),
            WireType::Fixed32 => Ok(f32::from_bits(read_fixed32(self.take_slice(4)?)?) as f64),
            other => Err(self.wire_mismatch("double", other)),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        match self.take_wire_type()? {
            WireType::Varint => Ok(self.read_raw_varint()? != 0),
            other => Err(self.wire_mismatch("bool", other)),
        }
    }

    pub fn read_bytes(&mut self) -> Result<&'bf [u8], Error> {
        match self.take_wire_type()? {
            WireType::LengthDelimited => {
                let len = self.read_length()?;
                self.take_slice(len)
            }
            other => Err(self.wire_mismatch("bytes", other)),
        }
    }

    pub fn read_string(&mut self) -> Result<String, Error> {
        let bytes = self.read_bytes()?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_owned()),
            Err(e) => Err(Error::format(format!(
                "field {} is not valid UTF-8: {}",
                self.field_number, e
            ))),
        }
    }

    fn push_scope(&mut self, scope: impl FnOnce(u32) -> Scope) -> Result<SubItemToken, Error> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::depth_exceed(format!(
                "sub-item nesting exceeds the maximum depth of {}",
                self.max_depth
            )));
        }
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        self.stack.push(scope(serial));
        Ok(SubItemToken {
            depth: self.stack.len(),
            serial,
        })
    }

    /// Enters the payload of the current length-delimited or group field.
    pub fn start_sub_item(&mut self) -> Result<SubItemToken, Error> {
        match self.take_wire_type()? {
            WireType::LengthDelimited => {
                let len = self.read_length()?;
                let new_end = self
                    .cursor
                    .checked_add(len)
                    .filter(|stop| *stop <= self.end)
                    .ok_or_else(|| {
                        self.truncated(
                            len,
                            Error::format(format!(
                                "sub-item of {} bytes at offset {} exceeds the input",
                                len, self.cursor
                            )),
                        )
                    })?;
                let prev_end = self.end;
                let token = self.push_scope(|serial| Scope::Length { prev_end, serial })?;
                self.end = new_end;
                Ok(token)
            }
            WireType::StartGroup => {
                let tag = self.field_number;
                self.push_scope(|serial| Scope::Group {
                    tag,
                    ended: false,
                    serial,
                })
            }
            other => Err(self.wire_mismatch("a sub-item", other)),
        }
    }

    /// Leaves the innermost sub-item, discarding whatever payload is left in it.
    pub fn end_sub_item(&mut self, token: SubItemToken) -> Result<(), Error> {
        let in_order = token.depth == self.stack.len()
            && self.stack.last().map(Scope::serial) == Some(token.serial);
        if !in_order {
            return Err(Error::bounds_msg(format!(
                "sub-item at depth {} closed while depth {} is open",
                token.depth,
                self.stack.len()
            )));
        }
        if let Some(Scope::Group { ended: false, .. }) = self.stack.last() {
            while self.read_field_header()?.is_some() {
                self.skip_field()?;
            }
        }
        match self.stack.pop() {
            Some(Scope::Length { prev_end, .. }) => {
                self.cursor = self.end;
                self.end = prev_end;
            }
            Some(Scope::Group { .. }) => {}
            None => return Err(Error::bounds_msg("no sub-item is open")),
        }
        self.wire_type = None;
        Ok(())
    }

    /// Discards the payload of the current field.
    pub fn skip_field(&mut self) -> Result<(), Error> {
        match self.take_wire_type()? {
            WireType::Varint | WireType::SignedVarint => {
                self.read_raw_varint()?;
            }
            WireType::Fixed32 => {
                self.take_slice(4)?;
            }
            WireType::Fixed64 => {
                self.take_slice(8)?;
            }
            WireType::LengthDelimited => {
                let len = self.read_length()?;
                self.take_slice(len)?;
            }
            WireType::StartGroup => {
                self.wire_type = Some(WireType::StartGroup);
                let token = self.start_sub_item()?;
                self.end_sub_item(token)?;
            }
            WireType::EndGroup => {
                return Err(Error::format("end-group marker cannot be skipped"));
            }
        }
        Ok(())
    }
}
