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
use crate::meta::{DefaultValue, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::ProtoItem;
use crate::types::{DataFormat, WireType};

impl<T: ProtoItem> ProtoItem for Box<T> {
    fn shape() -> ValueShape {
        T::shape()
    }

    fn wire_type(format: DataFormat) -> WireType {
        T::wire_type(format)
    }

    fn accepts_format(format: DataFormat) -> bool {
        T::accepts_format(format)
    }

    fn write_item(&self, format: DataFormat, context: &mut WriteContext) -> Result<(), Error> {
        (**self).write_item(format, context)
    }

    fn read_item(format: DataFormat, context: &mut ReadContext) -> Result<Self, Error> {
        T::read_item(format, context).map(Box::new)
    }

    fn merge_item(&mut self, format: DataFormat, context: &mut ReadContext) -> Result<(), Error> {
        (**self).merge_item(format, context)
    }

    fn fresh(context: &ReadContext) -> Result<Self, Error> {
        T::fresh(context).map(Box::new)
    }

    fn is_default(&self, default: Option<&DefaultValue>) -> bool {
        (**self).is_default(default)
    }

    fn from_default(default: &DefaultValue) -> Option<Self> {
        T::from_default(default).map(Box::new)
    }

    fn write_as_root(&self, context: &mut WriteContext) -> Result<(), Error> {
        ProtoItem::write_as_root(&**self, context)
    }

    fn merge_as_root(&mut self, context: &mut ReadContext) -> Result<(), Error> {
        ProtoItem::merge_as_root(&mut **self, context)
    }
}
