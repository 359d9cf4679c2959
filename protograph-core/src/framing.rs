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

//! Length-prefixed framing for sending several messages over one stream.
//!
//! Each message is preceded by its length, either as a varint (optionally
//! behind a length-delimited field header, which makes the stream itself a
//! valid message with a repeated field) or as four bytes in either byte order.
//!
//! ```rust
//! use protograph_core::model::TypeModel;
//! use protograph_core::types::PrefixStyle;
//!
//! let model = TypeModel::default();
//! let mut stream = Vec::new();
//! for n in [1i32, 2, 3] {
//!     model
//!         .serialize_with_length_prefix(&n, &mut stream, PrefixStyle::Base128, 1)
//!         .unwrap();
//! }
//! let items: Vec<i32> = model
//!     .deserialize_items(stream.as_slice(), PrefixStyle::Base128, 1)
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(items, vec![1, 2, 3]);
//! ```

use crate::error::Error;
use crate::model::TypeModel;
use crate::serializer::ProtoField;
use crate::types::{PrefixStyle, WireType, MAX_TAG, MAX_VARINT64_LEN};
use crate::varint::{decode_varint, encode_varint};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use std::marker::PhantomData;

fn read_byte<R: Read + ?Sized>(source: &mut R) -> Result<Option<u8>, Error> {
    match source.read_u8() {
        Ok(byte) => Ok(Some(byte)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Reads one varint. `None` means the stream ended before its first byte.
fn read_varint<R: Read + ?Sized>(source: &mut R) -> Result<Option<u64>, Error> {
    let mut bytes = [0u8; MAX_VARINT64_LEN];
    for i in 0..MAX_VARINT64_LEN {
        let Some(byte) = read_byte(source)? else {
            if i == 0 {
                return Ok(None);
            }
            return Err(Error::format("stream ended inside a varint length prefix"));
        };
        bytes[i] = byte;
        if byte & 0x80 == 0 {
            return decode_varint(&bytes[..=i]).map(|(value, _)| Some(value));
        }
    }
    Err(Error::format("length prefix varint is longer than 10 bytes"))
}

fn read_fixed32<B: ByteOrder, R: Read + ?Sized>(source: &mut R) -> Result<Option<u32>, Error> {
    let mut bytes = [0u8; 4];
    for (i, slot) in bytes.iter_mut().enumerate() {
        match read_byte(source)? {
            Some(byte) => *slot = byte,
            None if i == 0 => return Ok(None),
            None => return Err(Error::format("stream ended inside a fixed32 length prefix")),
        }
    }
    Ok(Some(B::read_u32(&bytes)))
}

/// Reads the length prefix of the next message.
///
/// Returns `None` if the stream ends cleanly before the prefix. With
/// [`PrefixStyle::Base128`] and a non-zero `field_number`, the prefix must be
/// preceded by a length-delimited header for that field.
pub fn try_read_length_prefix<R: Read + ?Sized>(
    source: &mut R,
    style: PrefixStyle,
    field_number: u32,
) -> Result<Option<usize>, Error> {
    let length = match style {
        PrefixStyle::Base128 => {
            if field_number > 0 {
                let Some(header) = read_varint(source)? else {
                    return Ok(None);
                };
                let wire_type = header & 7;
                if wire_type != WireType::LengthDelimited.physical() as u64 {
                    return Err(Error::format(format!(
                        "framed item has wire type {} instead of a length-delimited header",
                        wire_type
                    )));
                }
                if header >> 3 != field_number as u64 {
                    return Err(Error::schema_mismatch(format!(
                        "expected framed field {} but found {}",
                        field_number,
                        header >> 3
                    )));
                }
                match read_varint(source)? {
                    Some(length) => length,
                    None => {
                        return Err(Error::format("stream ended between a header and its length"))
                    }
                }
            } else {
                match read_varint(source)? {
                    Some(length) => length,
                    None => return Ok(None),
                }
            }
        }
        PrefixStyle::Fixed32 => match read_fixed32::<LittleEndian, R>(source)? {
            Some(length) => length as u64,
            None => return Ok(None),
        },
        PrefixStyle::Fixed32BigEndian => match read_fixed32::<BigEndian, R>(source)? {
            Some(length) => length as u64,
            None => return Ok(None),
        },
    };
    usize::try_from(length)
        .map(Some)
        .map_err(|_| Error::format(format!("framed length {} is too large", length)))
}

impl TypeModel {
    /// Writes `value` preceded by its length in `style`.
    ///
    /// For [`PrefixStyle::Base128`] a `field_number` above zero also writes a
    /// length-delimited field header; it is ignored by the fixed styles.
    pub fn serialize_with_length_prefix<T: ProtoField, W: Write + ?Sized>(
        &self,
        value: &T,
        sink: &mut W,
        style: PrefixStyle,
        field_number: u32,
    ) -> Result<(), Error> {
        let payload = self.serialize(value)?;
        let mut prefix = Vec::with_capacity(2 * MAX_VARINT64_LEN);
        match style {
            PrefixStyle::Base128 => {
                if field_number > MAX_TAG {
                    return Err(Error::not_allowed(format!(
                        "field number {} is outside 1..={}",
                        field_number, MAX_TAG
                    )));
                }
                if field_number > 0 {
                    let header = (field_number << 3) | WireType::LengthDelimited.physical();
                    encode_varint(header as u64, &mut prefix);
                }
                encode_varint(payload.len() as u64, &mut prefix);
            }
            PrefixStyle::Fixed32 | PrefixStyle::Fixed32BigEndian => {
                let length = u32::try_from(payload.len()).map_err(|_| {
                    Error::not_allowed(format!(
                        "a {} byte message does not fit a fixed32 length prefix",
                        payload.len()
                    ))
                })?;
                if style == PrefixStyle::Fixed32 {
                    prefix.write_u32::<LittleEndian>(length)?;
                } else {
                    prefix.write_u32::<BigEndian>(length)?;
                }
            }
        }
        sink.write_all(&prefix)?;
        sink.write_all(&payload)?;
        Ok(())
    }

    /// Reads the next framed message, or `None` at a clean end of stream.
    pub fn deserialize_with_length_prefix<T: ProtoField, R: Read + ?Sized>(
        &self,
        source: &mut R,
        style: PrefixStyle,
        field_number: u32,
    ) -> Result<Option<T>, Error> {
        let Some(length) = try_read_length_prefix(source, style, field_number)? else {
            return Ok(None);
        };
        let mut payload = Vec::with_capacity(length.min(64 * 1024));
        Read::take(&mut *source, length as u64).read_to_end(&mut payload)?;
        if payload.len() < length {
            return Err(Error::format(format!(
                "framed message declares {} bytes but the stream holds {}",
                length,
                payload.len()
            )));
        }
        self.deserialize(&payload).map(Some)
    }

    /// Iterates over consecutive framed messages until the stream ends. The
    /// iterator stops after yielding the first error.
    pub fn deserialize_items<T: ProtoField, R: Read>(
        &self,
        source: R,
        style: PrefixStyle,
        field_number: u32,
    ) -> DeserializeItems<'_, T, R> {
        DeserializeItems {
            model: self,
            source,
            style,
            field_number,
            done: false,
            _item: PhantomData,
        }
    }
}

/// Iterator returned by [`TypeModel::deserialize_items`].
pub struct DeserializeItems<'m, T, R> {
    model: &'m TypeModel,
    source: R,
    style: PrefixStyle,
    field_number: u32,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: ProtoField, R: Read> Iterator for DeserializeItems<'_, T, R> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.model.deserialize_with_length_prefix(
            &mut self.source,
            self.style,
            self.field_number,
        );
        match next {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
