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

//! Language-neutral descriptions of how a type maps onto protobuf fields.
//!
//! A [`TypePlan`] is built once per (model, type) pair and never changes
//! afterwards. Downstream code generators can walk its [`FieldDescriptor`]s to
//! emit equivalent encoders without depending on the runtime dispatch.

mod enum_map;
mod field_plan;
mod type_plan;

pub use enum_map::EnumMap;
pub(crate) use enum_map::EnumEntry;
pub use field_plan::FieldDescriptor;
pub(crate) use field_plan::{ErasedMember, Member, PlannedField};
pub use type_plan::{SubtypeEntry, TypePlan};
pub(crate) use type_plan::{Callbacks, Factory, Hook, HookMut, PlanInputs, SUBTYPE_WIRE_TYPE};

use std::any::TypeId;
use std::fmt;

/// Identity of a Rust type inside a model.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> TypeKey {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Bytes,
}

/// Well-known non-protobuf types carried through conventional nested layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BclKind {
    Guid,
    Decimal,
    DateTime,
    TimeSpan,
}

/// Structural description of a member's value type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueShape {
    Scalar(ScalarKind),
    Enum(TypeKey),
    Surrogate(BclKind),
    Message(TypeKey),
    /// A message field that may hold any registered subtype of the key.
    Polymorphic(TypeKey),
    Nullable(Box<ValueShape>),
    List(Box<ValueShape>),
    Map(Box<ValueShape>, Box<ValueShape>),
}

impl ValueShape {
    pub fn codec(&self) -> CodecKind {
        match self {
            ValueShape::Scalar(_) => CodecKind::Scalar,
            ValueShape::Enum(_) => CodecKind::Enum,
            ValueShape::Surrogate(_) => CodecKind::Surrogate,
            ValueShape::Message(_) | ValueShape::Polymorphic(_) => CodecKind::Message,
            ValueShape::Nullable(_) => CodecKind::Nullable,
            ValueShape::List(_) => CodecKind::List,
            ValueShape::Map(..) => CodecKind::Map,
        }
    }

    /// Element shape of a collection or the wrapped shape of a nullable.
    pub fn item(&self) -> Option<&ValueShape> {
        match self {
            ValueShape::Nullable(inner) | ValueShape::List(inner) => Some(inner),
            ValueShape::Map(_, value) => Some(value),
            _ => None,
        }
    }

    /// Every message or enum type this shape refers to.
    pub(crate) fn referenced(&self, out: &mut Vec<(TypeKey, bool)>) {
        match self {
            ValueShape::Enum(key) => out.push((*key, true)),
            ValueShape::Message(key) | ValueShape::Polymorphic(key) => out.push((*key, false)),
            ValueShape::Nullable(inner) | ValueShape::List(inner) => inner.referenced(out),
            ValueShape::Map(key, value) => {
                key.referenced(out);
                value.referenced(out);
            }
            ValueShape::Scalar(_) | ValueShape::Surrogate(_) => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Scalar,
    Enum,
    List,
    Map,
    Message,
    Surrogate,
    Nullable,
}

/// A declared default for a scalar member.
///
/// A member whose value equals its default is omitted on write, and an absent
/// member reads back as the default.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}
