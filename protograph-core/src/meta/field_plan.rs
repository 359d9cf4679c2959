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

use super::{CodecKind, DefaultValue, TypeKey, ValueShape};
use crate::error::Error;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::ProtoField;
use crate::types::{DataFormat, WireType, ROOT_VALUE_TAG};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// One wire field of a [`TypePlan`](super::TypePlan).
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub(crate) tag: u32,
    pub(crate) name: String,
    pub(crate) wire_type: WireType,
    pub(crate) format: DataFormat,
    pub(crate) key_format: DataFormat,
    pub(crate) packed: bool,
    pub(crate) required: bool,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) shape: ValueShape,
}

impl FieldDescriptor {
    /// Descriptor for the implicit field that wraps a non-message root value.
    pub(crate) fn root<F: ProtoField>() -> FieldDescriptor {
        FieldDescriptor::synthetic::<F>(
            ROOT_VALUE_TAG,
            "value",
            DataFormat::Default,
            DataFormat::Default,
        )
    }

    /// Descriptor for a field that exists only on the wire, such as the key
    /// and value of a map entry.
    pub(crate) fn synthetic<F: ProtoField>(
        tag: u32,
        name: &str,
        format: DataFormat,
        key_format: DataFormat,
    ) -> FieldDescriptor {
        FieldDescriptor {
            tag,
            name: String::from(name),
            wire_type: F::field_wire_type(format),
            format,
            key_format,
            packed: false,
            required: false,
            default: None,
            shape: F::field_shape(),
        }
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire type of a single occurrence. For packed lists this is the element
    /// encoding; the field header itself carries `LengthDelimited`.
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    pub fn codec(&self) -> CodecKind {
        self.shape.codec()
    }

    pub fn data_format(&self) -> DataFormat {
        self.format
    }

    pub fn key_format(&self) -> DataFormat {
        self.key_format
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn shape(&self) -> &ValueShape {
        &self.shape
    }

    pub fn item_shape(&self) -> Option<&ValueShape> {
        self.shape.item()
    }
}

pub(crate) struct PlannedField {
    pub(crate) descriptor: FieldDescriptor,
    pub(crate) access: Arc<dyn ErasedMember>,
}

/// Type-erased accessor for one member of a message type, resolved once when
/// the member is declared.
pub(crate) trait ErasedMember: Send + Sync {
    fn owner(&self) -> TypeKey;
    fn shape(&self) -> ValueShape;
    fn wire_type(&self, format: DataFormat) -> WireType;
    fn packable(&self, format: DataFormat) -> bool;
    fn supports_format(&self, format: DataFormat, key_format: DataFormat) -> bool;
    fn accepts_default(&self, default: &DefaultValue) -> bool;
    fn write(
        &self,
        owner: &dyn Any,
        field: &FieldDescriptor,
        context: &mut WriteContext,
    ) -> Result<(), Error>;
    fn merge(
        &self,
        owner: &mut dyn Any,
        field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error>;
    fn apply_default(&self, owner: &mut dyn Any, default: &DefaultValue) -> Result<(), Error>;
}

pub(crate) struct Member<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
    _owner: PhantomData<fn() -> T>,
}

impl<T, F> Member<T, F> {
    pub(crate) fn new(get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self {
        Member {
            get,
            get_mut,
            _owner: PhantomData,
        }
    }
}

#[cold]
fn wrong_owner<T: 'static>() -> Error {
    Error::invalid_state(format!(
        "member accessor applied to a value that is not a {}",
        std::any::type_name::<T>()
    ))
}

impl<T: 'static, F: ProtoField> ErasedMember for Member<T, F> {
    fn owner(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn shape(&self) -> ValueShape {
        F::field_shape()
    }

    fn wire_type(&self, format: DataFormat) -> WireType {
        F::field_wire_type(format)
    }

    fn packable(&self, format: DataFormat) -> bool {
        F::is_packable(format)
    }

    fn supports_format(&self, format: DataFormat, key_format: DataFormat) -> bool {
        F::supports_format(format, key_format)
    }

    fn accepts_default(&self, default: &DefaultValue) -> bool {
        F::accepts_default(default)
    }

    fn write(
        &self,
        owner: &dyn Any,
        field: &FieldDescriptor,
        context: &mut WriteContext,
    ) -> Result<(), Error> {
        let owner = owner.downcast_ref::<T>().ok_or_else(wrong_owner::<T>)?;
        (self.get)(owner).write_field(field, context)
    }

    fn merge(
        &self,
        owner: &mut dyn Any,
        field: &FieldDescriptor,
        context: &mut ReadContext,
    ) -> Result<(), Error> {
        let owner = owner.downcast_mut::<T>().ok_or_else(wrong_owner::<T>)?;
        (self.get_mut)(owner).merge_field(field, context)
    }

    fn apply_default(&self, owner: &mut dyn Any, default: &DefaultValue) -> Result<(), Error> {
        let owner = owner.downcast_mut::<T>().ok_or_else(wrong_owner::<T>)?;
        (self.get_mut)(owner).apply_default(default)
    }
}
