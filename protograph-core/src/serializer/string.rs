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
use crate::meta::{DefaultValue, FieldDescriptor, ScalarKind, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::{ListElement, ProtoItem};
use crate::types::{DataFormat, WireType};

impl ProtoItem for String {
    fn shape() -> ValueShape {
        ValueShape::Scalar(ScalarKind::String)
    }

    #[inline(always)]
    fn wire_type(_format: DataFormat) -> WireType {
        WireType::LengthDelimited
    }

    #[inline(always)]
    fn write_item(&self, _format: DataFormat, context: &mut WriteContext) -> Result<(), Error> {
        context.writer.write_string(self)
    }

    #[inline(always)]
    fn read_item(_format: DataFormat, context: &mut ReadContext) -> Result<Self, Error> {
        context.reader.read_string()
    }

    fn fresh(_context: &ReadContext) -> Result<Self, Error> {
        Ok(String::new())
    }

    fn is_default(&self, default: Option<&DefaultValue>) -> bool {
        match default {
            Some(DefaultValue::Str(s)) => s == self,
            Some(_) => false,
            None => self.is_empty(),
        }
    }

    fn from_default(default: &DefaultValue) -> Option<Self> {
        match default {
            DefaultValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// `Vec<u8>` is a single bytes field, not a repeated one.
impl ListElement for u8 {
    fn list_shape() -> ValueShape {
        ValueShape::Scalar(ScalarKind::Bytes)
    }

    fn list_wire_type(_format: DataFormat) -> WireType {
        WireType::LengthDelimited
    }

    fn list_supports_format(format: DataFormat) -> bool {
        format == DataFormat::Default
    }

    fn list_accepts_default(default: &DefaultValue) -> bool {
        matches!(default, DefaultValue::Bytes(_))
    }

    fn list_apply_default(items: &mut Vec<Self>, default: &DefaultValue) -> Result<(), Error> {
        match default {
            DefaultValue::Bytes(bytes) => {
                items.clone_from(bytes);
                Ok(())
            }
            other => Err(Error::not_allowed(format!(
                "default {:?} does not fit a bytes field",
                other
            ))),
        }
    }

    fn write_list(
        items: &[Self],
        field: &FieldDescriptor,
        context: &mut WriteContext,
        elide: bool,
    ) -> Result<(), Error> {
        if elide && !field.required {
            let is_default = match &field.default {
                Some(DefaultValue::Bytes(default)) => default.as_slice() == items,
                Some(_) => false,
                None => context.config().is_implicit_zero_defaults() && items.is_empty(),
            };
            if is_default {
                return Ok(());
            }
        }
        context
            .writer
            .write_field_header(field.tag, field.wire_type)?;
        context.writer.write_bytes(items)
    }

    fn merge_list(
        items: &mut Vec<Self>,
        _field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error> {
        let bytes = context.reader.read_bytes()?;
        items.clear();
        items.extend_from_slice(bytes);
        Ok(())
    }
}

/// `Vec<Vec<u8>>` is a repeated bytes field.
impl ListElement for Vec<u8> {
    fn list_shape() -> ValueShape {
        ValueShape::List(Box::new(ValueShape::Scalar(ScalarKind::Bytes)))
    }

    fn list_wire_type(_format: DataFormat) -> WireType {
        WireType::LengthDelimited
    }

    fn list_supports_format(format: DataFormat) -> bool {
        format == DataFormat::Default
    }

    fn write_list(
        items: &[Self],
        field: &FieldDescriptor,
        context: &mut WriteContext,
        _elide: bool,
    ) -> Result<(), Error> {
        for item in items {
            context
                .writer
                .write_field_header(field.tag, field.wire_type)?;
            context.writer.write_bytes(item)?;
        }
        Ok(())
    }

    fn merge_list(
        items: &mut Vec<Self>,
        _field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error> {
        items.push(context.reader.read_bytes()?.to_vec());
        Ok(())
    }
}
