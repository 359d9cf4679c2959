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

//! Value codecs.
//!
//! Three traits split the work:
//!
//! - [`ProtoItem`] encodes a single value once its field header is written.
//!   Scalars, strings, enums, messages and the surrogate types implement it.
//! - [`ProtoField`] encodes a member of a message: it decides whether the
//!   member is written at all, writes the header(s) and merges occurrences read
//!   back. Every `ProtoItem` is a `ProtoField`; `Option`, `Vec` and the maps
//!   add nullable, repeated and key/value semantics on top.
//! - [`ListElement`] describes how a `Vec` of a type is encoded, which lets
//!   `Vec<u8>` be a bytes field while every other `Vec<T>` is repeated.

use crate::error::Error;
use crate::meta::{DefaultValue, FieldDescriptor, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::types::{DataFormat, WireType, ROOT_VALUE_TAG};
use log::trace;

mod bcl;
mod bool;
mod box_;
mod datetime;
pub mod dynamic;
pub mod enum_;
mod list;
mod map;
mod number;
mod option;
mod string;
pub mod struct_;

pub use dynamic::Dynamic;

/// A single protobuf value.
pub trait ProtoItem: Sized + Send + Sync + 'static {
    fn shape() -> ValueShape;

    /// Wire type of one occurrence encoded with `format`.
    fn wire_type(format: DataFormat) -> WireType;

    fn accepts_format(format: DataFormat) -> bool {
        format == DataFormat::Default
    }

    /// Writes the payload for the header the writer has just emitted.
    fn write_item(&self, format: DataFormat, context: &mut WriteContext) -> Result<(), Error>;

    /// Reads the payload of the field whose header the reader has just consumed.
    fn read_item(format: DataFormat, context: &mut ReadContext) -> Result<Self, Error>;

    /// Combines another occurrence with the current value. Scalars are
    /// replaced; messages merge field by field.
    fn merge_item(&mut self, format: DataFormat, context: &mut ReadContext) -> Result<(), Error> {
        *self = Self::read_item(format, context)?;
        Ok(())
    }

    /// The value an absent field or map entry part reads as.
    fn fresh(context: &ReadContext) -> Result<Self, Error>;

    /// Whether the value equals `default`, or the zero value when `None`.
    /// Values that report `true` are omitted on write.
    fn is_default(&self, _default: Option<&DefaultValue>) -> bool {
        false
    }

    fn from_default(_default: &DefaultValue) -> Option<Self> {
        None
    }

    /// Writes the value as a complete payload. Non-message values become
    /// field 1 of an implicit wrapper message.
    fn write_as_root(&self, context: &mut WriteContext) -> Result<(), Error> {
        write_wrapped(self, context)
    }

    fn merge_as_root(&mut self, context: &mut ReadContext) -> Result<(), Error> {
        merge_wrapped(self, context)
    }
}

/// A member of a message type.
pub trait ProtoField: Sized + Send + Sync + 'static {
    fn field_shape() -> ValueShape;

    /// Wire type of one occurrence. For packed lists this is the element
    /// encoding.
    fn field_wire_type(format: DataFormat) -> WireType;

    fn is_packable(_format: DataFormat) -> bool {
        false
    }

    fn supports_format(format: DataFormat, key_format: DataFormat) -> bool;

    fn accepts_default(_default: &DefaultValue) -> bool {
        false
    }

    fn write_field(&self, field: &FieldDescriptor, context: &mut WriteContext)
        -> Result<(), Error>;

    /// Writes the member even if it holds its default.
    fn write_present(
        &self,
        field: &FieldDescriptor,
        context: &mut WriteContext,
    ) -> Result<(), Error> {
        self.write_field(field, context)
    }

    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error>;

    fn apply_default(&mut self, default: &DefaultValue) -> Result<(), Error> {
        Err(Error::not_allowed(format!(
            "{} does not take a default value (got {:?})",
            std::any::type_name::<Self>(),
            default
        )))
    }

    fn fresh_value(context: &ReadContext) -> Result<Self, Error>;

    fn write_root(&self, context: &mut WriteContext) -> Result<(), Error> {
        write_wrapped(self, context)
    }

    fn merge_root(&mut self, context: &mut ReadContext) -> Result<(), Error> {
        merge_wrapped(self, context)
    }
}

/// How a `Vec<Self>` member is encoded.
pub trait ListElement: Sized + Send + Sync + 'static {
    fn list_shape() -> ValueShape;

    fn list_wire_type(format: DataFormat) -> WireType;

    fn list_packable(_format: DataFormat) -> bool {
        false
    }

    fn list_supports_format(format: DataFormat) -> bool;

    fn list_accepts_default(_default: &DefaultValue) -> bool {
        false
    }

    fn list_apply_default(_items: &mut Vec<Self>, default: &DefaultValue) -> Result<(), Error> {
        Err(Error::not_allowed(format!(
            "lists of {} do not take a default value (got {:?})",
            std::any::type_name::<Self>(),
            default
        )))
    }

    /// `elide` is false when the list must be written even if it is empty or
    /// equal to its default.
    fn write_list(
        items: &[Self],
        field: &FieldDescriptor,
        context: &mut WriteContext,
        elide: bool,
    ) -> Result<(), Error>;

    fn merge_list(
        items: &mut Vec<Self>,
        field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error>;
}

/// Whether a member holding `value` is left out of the output.
#[inline(always)]
fn is_elided<T: ProtoItem>(value: &T, field: &FieldDescriptor, context: &WriteContext) -> bool {
    if field.required {
        return false;
    }
    match &field.default {
        Some(default) => value.is_default(Some(default)),
        None => context.config().is_implicit_zero_defaults() && value.is_default(None),
    }
}

impl<T: ProtoItem> ProtoField for T {
    fn field_shape() -> ValueShape {
        T::shape()
    }

    fn field_wire_type(format: DataFormat) -> WireType {
        T::wire_type(format)
    }

    fn supports_format(format: DataFormat, _key_format: DataFormat) -> bool {
        T::accepts_format(format)
    }

    fn accepts_default(default: &DefaultValue) -> bool {
        T::from_default(default).is_some()
    }

    #[inline(always)]
    fn write_field(&self, field: &FieldDescriptor, context: &mut WriteContext) -> Result<(), Error> {
        if is_elided(self, field, context) {
            return Ok(());
        }
        self.write_present(field, context)
    }

    #[inline(always)]
    fn write_present(
        &self,
        field: &FieldDescriptor,
        context: &mut WriteContext,
    ) -> Result<(), Error> {
        context
            .writer
            .write_field_header(field.tag, field.wire_type)?;
        self.write_item(field.format, context)
    }

    #[inline(always)]
    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error> {
        self.merge_item(field.format, context)
    }

    fn apply_default(&mut self, default: &DefaultValue) -> Result<(), Error> {
        match T::from_default(default) {
            Some(value) => {
                *self = value;
                Ok(())
            }
            None => Err(Error::not_allowed(format!(
                "default {:?} does not fit {}",
                default,
                std::any::type_name::<T>()
            ))),
        }
    }

    fn fresh_value(context: &ReadContext) -> Result<Self, Error> {
        T::fresh(context)
    }

    fn write_root(&self, context: &mut WriteContext) -> Result<(), Error> {
        self.write_as_root(context)
    }

    fn merge_root(&mut self, context: &mut ReadContext) -> Result<(), Error> {
        self.merge_as_root(context)
    }
}

/// Writes `value` as field 1 of an implicit message.
pub(crate) fn write_wrapped<F: ProtoField>(
    value: &F,
    context: &mut WriteContext,
) -> Result<(), Error> {
    value.write_field(&FieldDescriptor::root::<F>(), context)
}

/// Merges every field-1 occurrence of an implicit message into `value`.
pub(crate) fn merge_wrapped<F: ProtoField>(
    value: &mut F,
    context: &mut ReadContext,
) -> Result<(), Error> {
    let field = FieldDescriptor::root::<F>();
    while let Some(header) = context.reader.read_field_header()? {
        if header.tag == ROOT_VALUE_TAG {
            value.merge_field(&field, context)?;
        } else {
            trace!(
                "skipping field {} ({}) around a root value",
                header.tag,
                header.wire_type
            );
            context.reader.skip_field()?;
        }
    }
    Ok(())
}
