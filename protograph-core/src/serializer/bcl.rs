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

//! `bcl.Guid` and `bcl.Decimal`: small nested messages that other protobuf
//! stacks use for these types.
//!
//! ```text
//! message Guid    { fixed64 lo = 1; fixed64 hi = 2; }
//! message Decimal { uint64 lo = 1; uint32 hi = 2; uint32 signScale = 3; }
//! ```

use crate::buffer::{ProtoReader, ProtoWriter};
use crate::error::Error;
use crate::meta::{BclKind, DefaultValue, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::struct_::message_wire_type;
use crate::serializer::ProtoItem;
use crate::types::{DataFormat, WireType};
use rust_decimal::Decimal;
use uuid::Uuid;

const DECIMAL_SIGN_BIT: u32 = 0x0001;
const DECIMAL_SCALE_MASK: u32 = 0x01FE;
const DECIMAL_MAX_SCALE: u32 = 28;

/// Writes the fields of a surrogate message as the sub-item of the header
/// just written.
pub(super) fn write_surrogate(
    context: &mut WriteContext,
    fields: impl FnOnce(&mut ProtoWriter) -> Result<(), Error>,
) -> Result<(), Error> {
    let token = context.writer.start_sub_item()?;
    fields(&mut context.writer)?;
    context.writer.end_sub_item(token)
}

/// Reads a surrogate message, offering each field to `field`. Fields it
/// declines by returning `false` are skipped.
pub(super) fn read_surrogate(
    context: &mut ReadContext,
    mut field: impl FnMut(&mut ProtoReader, u32) -> Result<bool, Error>,
) -> Result<(), Error> {
    let token = context.reader.start_sub_item()?;
    while let Some(header) = context.reader.read_field_header()? {
        if !field(&mut context.reader, header.tag)? {
            context.reader.skip_field()?;
        }
    }
    context.reader.end_sub_item(token)
}

/// Surrogate messages omit zero-valued parts.
pub(super) fn write_u64_part(
    writer: &mut ProtoWriter,
    tag: u32,
    wire_type: WireType,
    value: u64,
) -> Result<(), Error> {
    if value == 0 {
        return Ok(());
    }
    writer.write_field_header(tag, wire_type)?;
    writer.write_u64(value)
}

pub(super) fn surrogate_wire_type(format: DataFormat) -> WireType {
    message_wire_type(format)
}

impl ProtoItem for Uuid {
    fn shape() -> ValueShape {
        ValueShape::Surrogate(BclKind::Guid)
    }

    fn wire_type(format: DataFormat) -> WireType {
        match format {
            DataFormat::FixedSize => WireType::LengthDelimited,
            other => surrogate_wire_type(other),
        }
    }

    fn accepts_format(format: DataFormat) -> bool {
        matches!(
            format,
            DataFormat::Default | DataFormat::Group | DataFormat::FixedSize
        )
    }

    fn write_item(&self, format: DataFormat, context: &mut WriteContext) -> Result<(), Error> {
        if format == DataFormat::FixedSize {
            return context.writer.write_bytes(self.as_bytes());
        }
        let bytes = self.to_bytes_le();
        let mut lo = [0u8; 8];
        let mut hi = [0u8; 8];
        lo.copy_from_slice(&bytes[..8]);
        hi.copy_from_slice(&bytes[8..]);
        write_surrogate(context, |writer| {
            write_u64_part(writer, 1, WireType::Fixed64, u64::from_le_bytes(lo))?;
            write_u64_part(writer, 2, WireType::Fixed64, u64::from_le_bytes(hi))
        })
    }

    fn read_item(format: DataFormat, context: &mut ReadContext) -> Result<Self, Error> {
        if format == DataFormat::FixedSize {
            let bytes = context.reader.read_bytes()?;
            return Uuid::from_slice(bytes).map_err(|_| {
                Error::format(format!("a raw guid needs 16 bytes, got {}", bytes.len()))
            });
        }
        let (mut lo, mut hi) = (0u64, 0u64);
        read_surrogate(context, |reader, tag| match tag {
            1 => {
                lo = reader.read_u64()?;
                Ok(true)
            }
            2 => {
                hi = reader.read_u64()?;
                Ok(true)
            }
            _ => Ok(false),
        })?;
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&lo.to_le_bytes());
        bytes[8..].copy_from_slice(&hi.to_le_bytes());
        Ok(Uuid::from_bytes_le(bytes))
    }

    fn fresh(_context: &ReadContext) -> Result<Self, Error> {
        Ok(Uuid::nil())
    }

    fn is_default(&self, default: Option<&DefaultValue>) -> bool {
        match default {
            Some(default) => Self::from_default(default) == Some(*self),
            None => self.is_nil(),
        }
    }

    fn from_default(default: &DefaultValue) -> Option<Self> {
        match default {
            DefaultValue::Str(s) => Uuid::parse_str(s).ok(),
            _ => None,
        }
    }
}

impl ProtoItem for Decimal {
    fn shape() -> ValueShape {
        ValueShape::Surrogate(BclKind::Decimal)
    }

    fn wire_type(format: DataFormat) -> WireType {
        surrogate_wire_type(format)
    }

    fn accepts_format(format: DataFormat) -> bool {
        matches!(format, DataFormat::Default | DataFormat::Group)
    }

    fn write_item(&self, _format: DataFormat, context: &mut WriteContext) -> Result<(), Error> {
        let mantissa = self.mantissa().unsigned_abs();
        let lo = mantissa as u64;
        let hi = (mantissa >> 64) as u32;
        let sign_scale = (self.scale() << 1) | u32::from(self.is_sign_negative());
        write_surrogate(context, |writer| {
            write_u64_part(writer, 1, WireType::Varint, lo)?;
            write_u64_part(writer, 2, WireType::Varint, hi as u64)?;
            write_u64_part(writer, 3, WireType::Varint, sign_scale as u64)
        })
    }

    fn read_item(_format: DataFormat, context: &mut ReadContext) -> Result<Self, Error> {
        let (mut lo, mut hi, mut sign_scale) = (0u64, 0u32, 0u32);
        read_surrogate(context, |reader, tag| match tag {
            1 => {
                lo = reader.read_u64()?;
                Ok(true)
            }
            2 => {
                hi = reader.read_u32()?;
                Ok(true)
            }
            3 => {
                sign_scale = reader.read_u32()?;
                Ok(true)
            }
            _ => Ok(false),
        })?;
        let scale = (sign_scale & DECIMAL_SCALE_MASK) >> 1;
        if scale > DECIMAL_MAX_SCALE {
            return Err(Error::format(format!(
                "decimal scale {} exceeds {}",
                scale, DECIMAL_MAX_SCALE
            )));
        }
        Ok(Decimal::from_parts(
            lo as u32,
            (lo >> 32) as u32,
            hi,
            sign_scale & DECIMAL_SIGN_BIT != 0,
            scale,
        ))
    }

    fn fresh(_context: &ReadContext) -> Result<Self, Error> {
        Ok(Decimal::ZERO)
    }

    fn is_default(&self, default: Option<&DefaultValue>) -> bool {
        match default {
            Some(default) => Self::from_default(default) == Some(*self),
            None => self.is_zero(),
        }
    }

    fn from_default(default: &DefaultValue) -> Option<Self> {
        match default {
            DefaultValue::Int(v) => Some(Decimal::from(*v)),
            DefaultValue::UInt(v) => Some(Decimal::from(*v)),
            DefaultValue::Str(s) => s.parse().ok(),
            _ => None,
        }
    }
}
