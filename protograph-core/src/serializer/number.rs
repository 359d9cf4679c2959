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

use crate::error::Error;
use crate::meta::{DefaultValue, ScalarKind, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::ProtoItem;
use crate::types::{DataFormat, WireType};
use paste::paste;

// Narrow integers travel as their `$via` wire type and are range checked on read.
macro_rules! impl_proto_integer {
    ($ty:ident, $via:ident, $kind:ident, $fixed:ident, zigzag: $zigzag:literal) => {
        impl ProtoItem for $ty {
            fn shape() -> ValueShape {
                ValueShape::Scalar(ScalarKind::$kind)
            }

            #[inline(always)]
            fn wire_type(format: DataFormat) -> WireType {
                match format {
                    DataFormat::ZigZag if $zigzag => WireType::SignedVarint,
                    DataFormat::FixedSize => WireType::$fixed,
                    _ => WireType::Varint,
                }
            }

            fn accepts_format(format: DataFormat) -> bool {
                match format {
                    DataFormat::Default | DataFormat::FixedSize => true,
                    DataFormat::ZigZag => $zigzag,
                    _ => false,
                }
            }

            #[inline(always)]
            fn write_item(&self, _format: DataFormat, context: &mut WriteContext) -> Result<(), Error> {
                paste! { context.writer.[<write_ $via>]($via::from(*self)) }
            }

            #[inline(always)]
            fn read_item(format: DataFormat, context: &mut ReadContext) -> Result<Self, Error> {
                context.reader.hint(Self::wire_type(format));
                let value = paste! { context.reader.[<read_ $via>]()? };
                $ty::try_from(value).map_err(|_| {
                    Error::format(format!("{} overflows {}", value, stringify!($ty)))
                })
            }

            fn fresh(_context: &ReadContext) -> Result<Self, Error> {
                Ok(0)
            }

            fn is_default(&self, default: Option<&DefaultValue>) -> bool {
                match default {
                    Some(default) => Self::from_default(default) == Some(*self),
                    None => *self == 0,
                }
            }

            fn from_default(default: &DefaultValue) -> Option<Self> {
                match default {
                    DefaultValue::Int(v) => $ty::try_from(*v).ok(),
                    DefaultValue::UInt(v) => $ty::try_from(*v).ok(),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! impl_proto_float {
    ($ty:ident, $kind:ident, $fixed:ident) => {
        impl ProtoItem for $ty {
            fn shape() -> ValueShape {
                ValueShape::Scalar(ScalarKind::$kind)
            }

            #[inline(always)]
            fn wire_type(_format: DataFormat) -> WireType {
                WireType::$fixed
            }

            fn accepts_format(format: DataFormat) -> bool {
                matches!(format, DataFormat::Default | DataFormat::FixedSize)
            }

            #[inline(always)]
            fn write_item(&self, _format: DataFormat, context: &mut WriteContext) -> Result<(), Error> {
                paste! { context.writer.[<write_ $ty>](*self) }
            }

            #[inline(always)]
            fn read_item(_format: DataFormat, context: &mut ReadContext) -> Result<Self, Error> {
                paste! { context.reader.[<read_ $ty>]() }
            }

            fn fresh(_context: &ReadContext) -> Result<Self, Error> {
                Ok(0.0)
            }

            // bitwise, so -0.0 is written and NaN defaults match themselves
            fn is_default(&self, default: Option<&DefaultValue>) -> bool {
                match default {
                    Some(default) => {
                        Self::from_default(default).is_some_and(|d| d.to_bits() == self.to_bits())
                    }
                    None => self.to_bits() == 0,
                }
            }

            fn from_default(default: &DefaultValue) -> Option<Self> {
                match default {
                    DefaultValue::Float(v) => Some(*v as $ty),
                    DefaultValue::Int(v) => Some(*v as $ty),
                    DefaultValue::UInt(v) => Some(*v as $ty),
                    _ => None,
                }
            }
        }
    };
}

impl_proto_integer!(i8, i32, Int8, Fixed32, zigzag: true);
impl_proto_integer!(i16, i32, Int16, Fixed32, zigzag: true);
impl_proto_integer!(i32, i32, Int32, Fixed32, zigzag: true);
impl_proto_integer!(i64, i64, Int64, Fixed64, zigzag: true);
impl_proto_integer!(u16, u32, UInt16, Fixed32, zigzag: false);
impl_proto_integer!(u32, u32, UInt32, Fixed32, zigzag: false);
impl_proto_integer!(u64, u64, UInt64, Fixed64, zigzag: false);
impl_proto_float!(f32, Float32, Fixed32);
impl_proto_float!(f64, Float64, Fixed64);
