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
use crate::meta::{FieldDescriptor, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::ProtoField;
use crate::types::{DataFormat, WireType};

/// Presence is carried purely by occurrence: `None` writes nothing and
/// `Some` is written even when it holds a default.
impl<F: ProtoField> ProtoField for Option<F> {
    fn field_shape() -> ValueShape {
        ValueShape::Nullable(Box::new(F::field_shape()))
    }

    fn field_wire_type(format: DataFormat) -> WireType {
        F::field_wire_type(format)
    }

    fn is_packable(format: DataFormat) -> bool {
        F::is_packable(format)
    }

    fn supports_format(format: DataFormat, key_format: DataFormat) -> bool {
        F::supports_format(format, key_format)
    }

    fn write_field(&self, field: &FieldDescriptor, context: &mut WriteContext) -> Result<(), Error> {
        match self {
            Some(value) => value.write_present(field, context),
            None if field.required => Err(Error::schema_mismatch(format!(
                "required field {} ({}) has no value",
                field.name, field.tag
            ))),
            None => Ok(()),
        }
    }

    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error> {
        match self {
            Some(value) => value.merge_field(field, context),
            None => {
                let mut value = F::fresh_value(context)?;
                value.merge_field(field, context)?;
                *self = Some(value);
                Ok(())
            }
        }
    }

    fn fresh_value(_context: &ReadContext) -> Result<Self, Error> {
        Ok(None)
    }
}
