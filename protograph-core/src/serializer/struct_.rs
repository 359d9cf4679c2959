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

//! Message codec. A message is its plan's fields in declaration order; when
//! the type takes part in a hierarchy the fields of every level are written
//! from the root down, each derived level nested under its discriminator tag.
//!
//! User types opt in with [`proto_message!`](crate::proto_message), which
//! routes [`ProtoItem`](crate::serializer::ProtoItem) to the functions below.

use crate::error::Error;
use crate::meta::TypeKey;
use crate::model::TypeModel;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::subtype_resolver::{merge_chain, write_chain, Slot};
use crate::types::{DataFormat, WireType};
use std::any::TypeId;

#[inline(always)]
pub fn message_wire_type(format: DataFormat) -> WireType {
    match format {
        DataFormat::Group => WireType::StartGroup,
        _ => WireType::LengthDelimited,
    }
}

#[inline(always)]
pub fn supports_message_format(format: DataFormat) -> bool {
    matches!(format, DataFormat::Default | DataFormat::Group)
}

/// Creates a `T` with the registered construction strategy.
pub fn construct<T: Send + Sync + 'static>(model: &TypeModel) -> Result<T, Error> {
    let value = model.construct(TypeId::of::<T>())?;
    value.downcast::<T>().map(|value| *value).map_err(|_| {
        Error::construction(format!(
            "the constructor registered for {} returned another type",
            std::any::type_name::<T>()
        ))
    })
}

/// Writes the fields of `value` without any framing.
pub fn write_message<T: Send + Sync + 'static>(
    value: &T,
    context: &mut WriteContext,
) -> Result<(), Error> {
    let key = TypeKey::of::<T>();
    write_chain(context, value, &key, key.id)
}

/// Writes `value` as the sub-item of the field header just written.
pub fn write_nested<T: Send + Sync + 'static>(
    value: &T,
    context: &mut WriteContext,
) -> Result<(), Error> {
    let token = context.writer.start_sub_item()?;
    write_message(value, context)?;
    context.writer.end_sub_item(token)
}

/// Merges fields up to the end of the current region into `value`.
pub fn merge_message<T: Send + Sync + 'static>(
    value: &mut T,
    context: &mut ReadContext,
) -> Result<(), Error> {
    let runtime = TypeId::of::<T>();
    let mut slot = Slot::Fixed { value, runtime };
    merge_chain(context, &mut slot, runtime)
}

pub fn merge_nested<T: Send + Sync + 'static>(
    value: &mut T,
    context: &mut ReadContext,
) -> Result<(), Error> {
    let token = context.reader.start_sub_item()?;
    merge_message(value, context)?;
    context.reader.end_sub_item(token)
}

pub fn read_nested<T: Send + Sync + 'static>(context: &mut ReadContext) -> Result<T, Error> {
    let mut value = construct::<T>(context.model())?;
    merge_nested(&mut value, context)?;
    Ok(value)
}

/// Implements [`ProtoItem`](crate::serializer::ProtoItem) for one or more
/// message types.
///
/// The members themselves are declared at registration time with
/// [`TypeModel::add_type`](crate::model::TypeModel::add_type); the macro only
/// routes encoding through the model's plans. Messages are never omitted when
/// they are members: an instance with every field at its default is written as
/// an empty sub-message.
#[macro_export]
macro_rules! proto_message {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::serializer::ProtoItem for $ty {
                fn shape() -> $crate::meta::ValueShape {
                    $crate::meta::ValueShape::Message($crate::meta::TypeKey::of::<$ty>())
                }

                fn wire_type(format: $crate::types::DataFormat) -> $crate::types::WireType {
                    $crate::serializer::struct_::message_wire_type(format)
                }

                fn accepts_format(format: $crate::types::DataFormat) -> bool {
                    $crate::serializer::struct_::supports_message_format(format)
                }

                fn write_item(
                    &self,
                    _format: $crate::types::DataFormat,
                    context: &mut $crate::resolver::context::WriteContext<'_>,
                ) -> ::std::result::Result<(), $crate::error::Error> {
                    $crate::serializer::struct_::write_nested(self, context)
                }

                fn read_item(
                    _format: $crate::types::DataFormat,
                    context: &mut $crate::resolver::context::ReadContext<'_, '_>,
                ) -> ::std::result::Result<Self, $crate::error::Error> {
                    $crate::serializer::struct_::read_nested::<$ty>(context)
                }

                fn merge_item(
                    &mut self,
                    _format: $crate::types::DataFormat,
                    context: &mut $crate::resolver::context::ReadContext<'_, '_>,
                ) -> ::std::result::Result<(), $crate::error::Error> {
                    $crate::serializer::struct_::merge_nested(self, context)
                }

                fn fresh(
                    context: &$crate::resolver::context::ReadContext<'_, '_>,
                ) -> ::std::result::Result<Self, $crate::error::Error> {
                    $crate::serializer::struct_::construct::<$ty>(context.model())
                }

                fn write_as_root(
                    &self,
                    context: &mut $crate::resolver::context::WriteContext<'_>,
                ) -> ::std::result::Result<(), $crate::error::Error> {
                    $crate::serializer::struct_::write_message(self, context)
                }

                fn merge_as_root(
                    &mut self,
                    context: &mut $crate::resolver::context::ReadContext<'_, '_>,
                ) -> ::std::result::Result<(), $crate::error::Error> {
                    $crate::serializer::struct_::merge_message(self, context)
                }
            }
        )+
    };
}
