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
use crate::meta::{DefaultValue, FieldDescriptor, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::{ListElement, ProtoField, ProtoItem};
use crate::types::{DataFormat, WireType};

impl<T: ProtoItem> ListElement for T {
    fn list_shape() -> ValueShape {
        ValueShape::List(Box::new(T::shape()))
    }

    fn list_wire_type(format: DataFormat) -> WireType {
        T::wire_type(format)
    }

    fn list_packable(format: DataFormat) -> bool {
        T::wire_type(format).is_packable()
    }

    fn list_supports_format(format: DataFormat) -> bool {
        T::accepts_format(format)
    }

    /// Packed lists are written even when empty; unpacked ones emit one
    /// occurrence per element.
    fn write_list(
        items: &[Self],
        field: &FieldDescriptor,
        context: &mut WriteContext,
        _elide: bool,
    ) -> Result<(), Error> {
        if field.packed {
            context
                .writer
                .write_field_header(field.tag, WireType::LengthDelimited)?;
            let token = context.writer.start_packed(field.wire_type)?;
            for item in items {
                item.write_item(field.format, context)?;
            }
            return context.writer.end_sub_item(token);
        }
        for item in items {
            context
                .writer
                .write_field_header(field.tag, field.wire_type)?;
            item.write_item(field.format, context)?;
        }
        Ok(())
    }

    /// Accepts both encodings regardless of how the member is declared.
    fn merge_list(
        items: &mut Vec<Self>,
        field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error> {
        let element = field.wire_type;
        if element.is_packable() && context.reader.wire_type() == Some(WireType::LengthDelimited) {
            let token = context.reader.start_sub_item()?;
            while context.reader.has_more() {
                context.reader.set_wire_type(element);
                items.push(T::read_item(field.format, context)?);
            }
            return context.reader.end_sub_item(token);
        }
        items.push(T::read_item(field.format, context)?);
        Ok(())
    }
}

impl<T: ListElement> ProtoField for Vec<T> {
    fn field_shape() -> ValueShape {
        T::list_shape()
    }

    fn field_wire_type(format: DataFormat) -> WireType {
        T::list_wire_type(format)
    }

    fn is_packable(format: DataFormat) -> bool {
        T::list_packable(format)
    }

    fn supports_format(format: DataFormat, _key_format: DataFormat) -> bool {
        T::list_supports_format(format)
    }

    fn accepts_default(default: &DefaultValue) -> bool {
        T::list_accepts_default(default)
    }

    fn write_field(&self, field: &FieldDescriptor, context: &mut WriteContext) -> Result<(), Error> {
        T::write_list(self, field, context, true)
    }

    fn write_present(
        &self,
        field: &FieldDescriptor,
        context: &mut WriteContext,
    ) -> Result<(), Error> {
        T::write_list(self, field, context, false)
    }

    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error> {
        T::merge_list(self, field, context)
    }

    fn apply_default(&mut self, default: &DefaultValue) -> Result<(), Error> {
        T::list_apply_default(self, default)
    }

    fn fresh_value(_context: &ReadContext) -> Result<Self, Error> {
        Ok(Vec::new())
    }
}
