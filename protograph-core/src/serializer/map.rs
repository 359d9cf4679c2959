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

//! Maps travel as repeated key/value pair messages: the key is field 1 of the
//! pair, encoded with the member's key format, and the value is field 2.

use crate::error::Error;
use crate::meta::{FieldDescriptor, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::{ProtoField, ProtoItem};
use crate::types::{DataFormat, WireType, MAP_KEY_TAG, MAP_VALUE_TAG};
use log::trace;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

fn entry_fields<K: ProtoItem, V: ProtoField>(
    field: &FieldDescriptor,
) -> (FieldDescriptor, FieldDescriptor) {
    (
        FieldDescriptor::synthetic::<K>(MAP_KEY_TAG, "key", field.key_format, DataFormat::Default),
        FieldDescriptor::synthetic::<V>(MAP_VALUE_TAG, "value", field.format, DataFormat::Default),
    )
}

fn write_entries<'a, K, V>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
    field: &FieldDescriptor,
    context: &mut WriteContext,
) -> Result<(), Error>
where
    K: ProtoItem,
    V: ProtoField,
{
    let (key_field, value_field) = entry_fields::<K, V>(field);
    for (key, value) in entries {
        context
            .writer
            .write_field_header(field.tag, WireType::LengthDelimited)?;
        let token = context.writer.start_sub_item()?;
        key.write_field(&key_field, context)?;
        value.write_field(&value_field, context)?;
        context.writer.end_sub_item(token)?;
    }
    Ok(())
}

/// Reads one pair. A missing key or value reads as its fresh value.
fn read_entry<K: ProtoItem, V: ProtoField>(
    field: &FieldDescriptor,
    context: &mut ReadContext,
) -> Result<(K, V), Error> {
    let (key_field, value_field) = entry_fields::<K, V>(field);
    let mut key = K::fresh(context)?;
    let mut value = V::fresh_value(context)?;
    let token = context.reader.start_sub_item()?;
    while let Some(header) = context.reader.read_field_header()? {
        match header.tag {
            MAP_KEY_TAG => key.merge_field(&key_field, context)?,
            MAP_VALUE_TAG => value.merge_field(&value_field, context)?,
            other => {
                trace!("skipping field {} of a map entry", other);
                context.reader.skip_field()?;
            }
        }
    }
    context.reader.end_sub_item(token)?;
    Ok((key, value))
}

fn map_shape<K: ProtoItem, V: ProtoField>() -> ValueShape {
    ValueShape::Map(Box::new(K::shape()), Box::new(V::field_shape()))
}

fn map_supports<K: ProtoItem, V: ProtoField>(format: DataFormat, key_format: DataFormat) -> bool {
    K::accepts_format(key_format) && V::supports_format(format, DataFormat::Default)
}

macro_rules! impl_proto_map {
    ($map:ident, $($key_bound:path),+) => {
        impl<K, V> ProtoField for $map<K, V>
        where
            K: ProtoItem $(+ $key_bound)+,
            V: ProtoField,
        {
            fn field_shape() -> ValueShape {
                map_shape::<K, V>()
            }

            fn field_wire_type(_format: DataFormat) -> WireType {
                WireType::LengthDelimited
            }

            fn supports_format(format: DataFormat, key_format: DataFormat) -> bool {
                map_supports::<K, V>(format, key_format)
            }

            fn write_field(
                &self,
                field: &FieldDescriptor,
                context: &mut WriteContext,
            ) -> Result<(), Error> {
                write_entries(self.iter(), field, context)
            }

            /// Later pairs replace earlier ones with the same key.
            fn merge_field(
                &mut self,
                field: &FieldDescriptor,
                context: &mut ReadContext,
            ) -> Result<(), Error> {
                let (key, value) = read_entry::<K, V>(field, context)?;
                self.insert(key, value);
                Ok(())
            }

            fn fresh_value(_context: &ReadContext) -> Result<Self, Error> {
                Ok($map::new())
            }
        }
    };
}

impl_proto_map!(HashMap, Eq, Hash);
impl_proto_map!(BTreeMap, Ord);
