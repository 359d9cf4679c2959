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

//! Enums travel as varints holding the wire value registered for each member
//! with [`TypeModel::add_enum`](crate::model::TypeModel::add_enum). The
//! [`proto_enum!`](crate::proto_enum) macro wires a Rust enum to these helpers.

use crate::error::Error;
use crate::resolver::context::{ReadContext, WriteContext};
use std::fmt::Debug;
use std::hash::Hash;

#[inline(always)]
pub fn write_enum<E>(value: E, context: &mut WriteContext) -> Result<(), Error>
where
    E: Copy + Eq + Hash + Debug + Send + Sync + 'static,
{
    let wire = context.enum_map::<E>()?.wire_value(value).ok_or_else(|| {
        Error::schema_mismatch(format!(
            "{:?} has no wire value in the registered map of {}",
            value,
            std::any::type_name::<E>()
        ))
    })?;
    context.writer.write_i32(wire)
}

/// Unknown wire values are rejected rather than mapped to a default member.
#[inline(always)]
pub fn read_enum<E>(context: &mut ReadContext) -> Result<E, Error>
where
    E: Copy + Eq + Hash + Debug + Send + Sync + 'static,
{
    let wire = context.reader.read_i32()?;
    context.enum_map::<E>()?.member(wire).ok_or_else(|| {
        Error::schema_mismatch(format!(
            "no member of {} has wire value {}",
            std::any::type_name::<E>(),
            wire
        ))
    })
}

pub fn default_enum<E>(context: &ReadContext) -> Result<E, Error>
where
    E: Copy + Eq + Hash + Debug + Send + Sync + 'static,
{
    Ok(context.enum_map::<E>()?.default_member())
}

/// Implements [`ProtoItem`](crate::serializer::ProtoItem) for one or more
/// enums registered with `add_enum`.
///
/// ```rust
/// use protograph_core::model::TypeModel;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum Level {
///     Low,
///     High,
/// }
/// protograph_core::proto_enum!(Level);
///
/// let mut model = TypeModel::default();
/// model.add_enum(&[(Level::Low, 1), (Level::High, 9)]).unwrap();
/// let bytes = model.serialize(&Level::High).unwrap();
/// assert_eq!(bytes, vec![0x08, 0x09]);
/// ```
#[macro_export]
macro_rules! proto_enum {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::serializer::ProtoItem for $ty {
                fn shape() -> $crate::meta::ValueShape {
                    $crate::meta::ValueShape::Enum($crate::meta::TypeKey::of::<$ty>())
                }

                fn wire_type(_format: $crate::types::DataFormat) -> $crate::types::WireType {
                    $crate::types::WireType::Varint
                }

                fn write_item(
                    &self,
                    _format: $crate::types::DataFormat,
                    context: &mut $crate::resolver::context::WriteContext<'_>,
                ) -> ::std::result::Result<(), $crate::error::Error> {
                    $crate::serializer::enum_::write_enum(*self, context)
                }

                fn read_item(
                    _format: $crate::types::DataFormat,
                    context: &mut $crate::resolver::context::ReadContext<'_, '_>,
                ) -> ::std::result::Result<Self, $crate::error::Error> {
                    $crate::serializer::enum_::read_enum::<$ty>(context)
                }

                fn fresh(
                    context: &$crate::resolver::context::ReadContext<'_, '_>,
                ) -> ::std::result::Result<Self, $crate::error::Error> {
                    $crate::serializer::enum_::default_enum::<$ty>(context)
                }
            }
        )+
    };
}
