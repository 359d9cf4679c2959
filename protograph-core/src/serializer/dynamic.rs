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
use crate::meta::{TypeKey, ValueShape};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::subtype_resolver::{merge_chain, write_chain, Slot};
use crate::serializer::struct_::{message_wire_type, supports_message_format};
use crate::serializer::ProtoItem;
use crate::types::{DataFormat, WireType};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// A value of `B` or of any type registered below `B` with
/// [`TypeModel::add_subtype`](crate::model::TypeModel::add_subtype).
///
/// Reading into a `Dynamic<B>` starts from a fresh `B` and replaces it with the
/// more derived type whenever the stream carries a discriminator, so the
/// concrete type survives a round trip.
///
/// ```rust
/// use protograph_core::model::TypeModel;
/// use protograph_core::serializer::Dynamic;
///
/// #[derive(Default)]
/// struct Shape {
///     id: i32,
/// }
/// #[derive(Default)]
/// struct Circle {
///     base: Shape,
///     radius: f64,
/// }
/// protograph_core::proto_message!(Shape, Circle);
///
/// let mut model = TypeModel::default();
/// model
///     .add_type::<Shape>()
///     .unwrap()
///     .use_default()
///     .field(1, "id", |s| &s.id, |s| &mut s.id);
/// model
///     .add_type::<Circle>()
///     .unwrap()
///     .use_default()
///     .field(1, "radius", |c| &c.radius, |c| &mut c.radius);
/// model
///     .add_subtype::<Shape, Circle>(10, |c| &c.base, |c| &mut c.base)
///     .unwrap();
///
/// let shape: Dynamic<Shape> = Dynamic::new(Circle {
///     base: Shape { id: 3 },
///     radius: 1.5,
/// });
/// let copy = model.deep_clone(&shape).unwrap();
/// let circle = copy.downcast_ref::<Circle>().unwrap();
/// assert_eq!(circle.base.id, 3);
/// assert_eq!(circle.radius, 1.5);
/// ```
pub struct Dynamic<B> {
    value: Box<dyn Any + Send + Sync>,
    runtime: TypeKey,
    _base: PhantomData<fn() -> B>,
}

impl<B: Send + Sync + 'static> Dynamic<B> {
    /// Wraps `value`. Whether its type really derives from `B` is checked
    /// against the model when the value is written.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Dynamic<B> {
        Dynamic {
            value: Box::new(value),
            runtime: TypeKey::of::<T>(),
            _base: PhantomData,
        }
    }

    pub fn runtime_type(&self) -> &TypeKey {
        &self.runtime
    }

    pub fn type_name(&self) -> &'static str {
        self.runtime.name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.runtime.id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// Unwraps the concrete value, or returns `self` if it is not a `T`.
    pub fn into_inner<T: 'static>(self) -> Result<T, Self> {
        if !self.is::<T>() {
            return Err(self);
        }
        let Dynamic { value, runtime, .. } = self;
        value.downcast::<T>().map(|value| *value).map_err(|value| Dynamic {
            value,
            runtime,
            _base: PhantomData,
        })
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Boxed {
            value: &mut self.value,
            runtime: &mut self.runtime,
        }
    }
}

impl<B> fmt::Debug for Dynamic<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dynamic")
            .field("base", &std::any::type_name::<B>())
            .field("runtime", &self.runtime.name)
            .finish_non_exhaustive()
    }
}

impl<B: Send + Sync + 'static> ProtoItem for Dynamic<B> {
    fn shape() -> ValueShape {
        ValueShape::Polymorphic(TypeKey::of::<B>())
    }

    fn wire_type(format: DataFormat) -> WireType {
        message_wire_type(format)
    }

    fn accepts_format(format: DataFormat) -> bool {
        supports_message_format(format)
    }

    fn write_item(&self, _format: DataFormat, context: &mut WriteContext) -> Result<(), Error> {
        let token = context.writer.start_sub_item()?;
        self.write_as_root(context)?;
        context.writer.end_sub_item(token)
    }

    fn read_item(format: DataFormat, context: &mut ReadContext) -> Result<Self, Error> {
        let mut value = Self::fresh(context)?;
        value.merge_item(format, context)?;
        Ok(value)
    }

    fn merge_item(&mut self, _format: DataFormat, context: &mut ReadContext) -> Result<(), Error> {
        let token = context.reader.start_sub_item()?;
        self.merge_as_root(context)?;
        context.reader.end_sub_item(token)
    }

    /// A fresh `B`, upgraded later if the stream selects a subtype.
    fn fresh(context: &ReadContext) -> Result<Self, Error> {
        let base = TypeKey::of::<B>();
        Ok(Dynamic {
            value: context.model().construct(base.id)?,
            runtime: base,
            _base: PhantomData,
        })
    }

    fn write_as_root(&self, context: &mut WriteContext) -> Result<(), Error> {
        write_chain(context, &*self.value, &self.runtime, TypeId::of::<B>())
    }

    fn merge_as_root(&mut self, context: &mut ReadContext) -> Result<(), Error> {
        merge_chain(context, &mut self.slot(), TypeId::of::<B>())
    }
}
