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

//! Declaring message types: the built-in [`MetaType`] builder and the
//! [`TypeConfigSource`] hook for external configuration loaders.

use crate::error::Error;
use crate::meta::{Callbacks, DefaultValue, ErasedMember, Factory, Member};
use crate::serializer::ProtoField;
use crate::types::DataFormat;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// Per-member encoding options.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldOptions {
    pub(crate) format: DataFormat,
    pub(crate) key_format: DataFormat,
    pub(crate) packed: bool,
    pub(crate) required: bool,
    pub(crate) default: Option<DefaultValue>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoding of the value, or of each element for lists and map values.
    pub fn format(mut self, format: DataFormat) -> Self {
        self.format = format;
        self
    }

    /// Encoding of map keys.
    pub fn key_format(mut self, format: DataFormat) -> Self {
        self.key_format = format;
        self
    }

    /// Write a repeated scalar as one packed occurrence.
    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }

    /// Always write the member and fail reads that do not contain it.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// One declared member: `(tag, name, options)` plus the accessor pair that
/// reaches the member inside its owner.
#[derive(Clone)]
pub struct MemberConfig {
    pub tag: u32,
    pub name: String,
    pub options: FieldOptions,
    pub(crate) access: Arc<dyn ErasedMember>,
}

impl MemberConfig {
    pub fn new<T: 'static, F: ProtoField>(
        tag: u32,
        name: impl Into<String>,
        options: FieldOptions,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> MemberConfig {
        MemberConfig {
            tag,
            name: name.into(),
            options,
            access: Arc::new(Member::new(get, get_mut)),
        }
    }
}

/// Supplies the members of a type from outside the core, e.g. from attributes
/// or generated code.
///
/// The source is consulted lazily, once, when the type's plan is built.
pub trait TypeConfigSource: Send + Sync + 'static {
    /// Members in declaration order.
    fn members(&self) -> Result<Vec<MemberConfig>, Error>;
}

impl<F> TypeConfigSource for F
where
    F: Fn() -> Result<Vec<MemberConfig>, Error> + Send + Sync + 'static,
{
    fn members(&self) -> Result<Vec<MemberConfig>, Error> {
        self()
    }
}

/// What a model knows about a registered message type before its plan exists.
#[derive(Default)]
pub(crate) struct TypeConfig {
    pub(crate) members: Vec<MemberConfig>,
    pub(crate) source: Option<Box<dyn TypeConfigSource>>,
    pub(crate) factory: Option<Factory>,
    pub(crate) callbacks: Callbacks,
}

impl TypeConfig {
    /// Members declared directly, followed by those of the external source.
    pub(crate) fn collect_members(&self) -> Result<Vec<MemberConfig>, Error> {
        let mut members = self.members.clone();
        if let Some(source) = &self.source {
            members.extend(source.members()?);
        }
        Ok(members)
    }
}

/// Builder returned by [`TypeModel::add_type`](crate::model::TypeModel::add_type).
///
/// ```rust
/// use protograph_core::model::TypeModel;
/// use protograph_core::resolver::type_resolver::FieldOptions;
/// use protograph_core::types::DataFormat;
///
/// #[derive(Default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
/// protograph_core::proto_message!(Point);
///
/// let mut model = TypeModel::default();
/// model
///     .add_type::<Point>()
///     .unwrap()
///     .use_default()
///     .field(1, "x", |p| &p.x, |p| &mut p.x)
///     .field_with(
///         2,
///         "y",
///         FieldOptions::new().format(DataFormat::ZigZag),
///         |p| &p.y,
///         |p| &mut p.y,
///     );
/// let bytes = model.serialize(&Point { x: 1, y: -1 }).unwrap();
/// assert_eq!(bytes, vec![0x08, 0x01, 0x10, 0x01]);
/// ```
pub struct MetaType<'a, T> {
    config: &'a mut TypeConfig,
    _type: PhantomData<fn() -> T>,
}

impl<'a, T: Send + Sync + 'static> MetaType<'a, T> {
    pub(crate) fn new(config: &'a mut TypeConfig) -> MetaType<'a, T> {
        MetaType {
            config,
            _type: PhantomData,
        }
    }

    pub fn field<F: ProtoField>(
        self,
        tag: u32,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.field_with(tag, name, FieldOptions::default(), get, get_mut)
    }

    pub fn field_with<F: ProtoField>(
        self,
        tag: u32,
        name: &str,
        options: FieldOptions,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.config
            .members
            .push(MemberConfig::new(tag, name, options, get, get_mut));
        self
    }

    /// Construction strategy used whenever the engine has to materialize a `T`.
    pub fn constructor(self, ctor: fn() -> T) -> Self {
        self.config.factory = Some(Arc::new(move || Box::new(ctor()) as Box<dyn Any + Send + Sync>));
        self
    }

    pub fn before_serialize(self, hook: fn(&T)) -> Self {
        self.config.callbacks.before_serialize = Some(Arc::new(move |value: &dyn Any| {
            if let Some(value) = value.downcast_ref::<T>() {
                hook(value)
            }
        }));
        self
    }

    pub fn after_serialize(self, hook: fn(&T)) -> Self {
        self.config.callbacks.after_serialize = Some(Arc::new(move |value: &dyn Any| {
            if let Some(value) = value.downcast_ref::<T>() {
                hook(value)
            }
        }));
        self
    }

    pub fn before_deserialize(self, hook: fn(&mut T)) -> Self {
        self.config.callbacks.before_deserialize = Some(Arc::new(move |value: &mut dyn Any| {
            if let Some(value) = value.downcast_mut::<T>() {
                hook(value)
            }
        }));
        self
    }

    pub fn after_deserialize(self, hook: fn(&mut T)) -> Self {
        self.config.callbacks.after_deserialize = Some(Arc::new(move |value: &mut dyn Any| {
            if let Some(value) = value.downcast_mut::<T>() {
                hook(value)
            }
        }));
        self
    }
}

impl<'a, T: Default + Send + Sync + 'static> MetaType<'a, T> {
    /// Use `T::default()` as the construction strategy.
    pub fn use_default(self) -> Self {
        self.constructor(T::default)
    }
}
