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

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Largest field number protobuf allows (`2^29 - 1`).
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// Field numbers protobuf reserves for implementation use.
pub const RESERVED_TAGS: std::ops::RangeInclusive<u32> = 19000..=19999;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT64_LEN: usize = 10;

/// Maximum encoded length of a 32-bit varint.
pub const MAX_VARINT32_LEN: usize = 5;

/// Field number used when a non-message value is serialized at the root.
pub const ROOT_VALUE_TAG: u32 = 1;

/// Field numbers of the synthetic key/value pair message used for maps.
pub const MAP_KEY_TAG: u32 = 1;
pub const MAP_VALUE_TAG: u32 = 2;

/// The physical encoding of a field payload, as carried in the low three bits
/// of every field header.
///
/// `SignedVarint` never appears on the wire: it is a varint the caller has
/// declared to be zigzag encoded (see [`ProtoReader::hint`](crate::buffer::ProtoReader::hint)).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
    SignedVarint = 8,
}

impl WireType {
    /// The three-bit code written into a field header.
    #[inline(always)]
    pub fn physical(self) -> u32 {
        match self {
            WireType::SignedVarint => WireType::Varint as u32,
            other => other as u32,
        }
    }

    /// Decodes the low three bits of a field header.
    #[inline(always)]
    pub fn from_header_bits(bits: u32) -> Option<WireType> {
        match bits {
            0..=5 => WireType::try_from(bits as u8).ok(),
            _ => None,
        }
    }

    /// Whether values of this wire type may be concatenated into a packed payload.
    #[inline(always)]
    pub fn is_packable(self) -> bool {
        matches!(
            self,
            WireType::Varint | WireType::SignedVarint | WireType::Fixed32 | WireType::Fixed64
        )
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Varint => "Varint",
            WireType::Fixed64 => "Fixed64",
            WireType::LengthDelimited => "LengthDelimited",
            WireType::StartGroup => "StartGroup",
            WireType::EndGroup => "EndGroup",
            WireType::Fixed32 => "Fixed32",
            WireType::SignedVarint => "SignedVarint",
        };
        f.write_str(name)
    }
}

/// Per-member hint choosing between the physical encodings a value type supports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// The natural encoding: plain varints for integers, nested messages for
    /// sub-objects and the `bcl.*` layouts for Guid/DateTime/TimeSpan/Decimal.
    #[default]
    Default,
    /// Zigzag varints for signed integers (`sint32`/`sint64`).
    ZigZag,
    /// Fixed-width integers; raw fixed64 ticks for DateTime/TimeSpan; 16 raw
    /// bytes for Guid.
    FixedSize,
    /// Group-delimited (start/end marker) instead of length-prefixed sub-items.
    Group,
    /// `google.protobuf.Timestamp` / `google.protobuf.Duration` layouts.
    WellKnown,
}

/// A decoded field header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldHeader {
    pub tag: u32,
    pub wire_type: WireType,
}

/// Framing used by the length-prefixed stream helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixStyle {
    /// A varint length, optionally preceded by a field header when a field
    /// number is supplied.
    Base128,
    /// A 4-byte little-endian length.
    Fixed32,
    /// A 4-byte big-endian length.
    Fixed32BigEndian,
}
