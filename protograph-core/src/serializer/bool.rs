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

impl ProtoItem for bool {
    fn shape() -> ValueShape {
        ValueShape::Scalar(ScalarKind::Bool)
    }

    #[inline(always)]
    fn wire_type(_format: DataFormat) -> WireType {
        WireType::Varint
    }

    #[inline(always)]
    fn write_item(&self, _format: DataFormat, context: &mut WriteContext) -> Result<(), Error> {
        context.writer.write_bool(*self)
    }

    #[inline(always)]
    fn read_item(_format: DataFormat, context: &mut ReadContext) -> Result<Self, Error> {
        context.reader.read_bool()
    }

    fn fresh(_context: &ReadContext) -> Result<Self, Error> {
        Ok(false)
    }

    fn is_default(&self, default: Option<&DefaultValue>) -> bool {
        match default {
            Some(default) => Self::from_default(default) == Some(*self),
            None => !*self,
        }
    }

    fn from_default(default: &DefaultValue) -> Option<Self> {
        match default {
            DefaultValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}
