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

use super::{FieldDescriptor, PlannedField, TypeKey};
use crate::error::Error;
use crate::not_allowed;
use crate::resolver::type_resolver::MemberConfig;
use crate::types::{WireType, MAX_TAG, RESERVED_TAGS};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub(crate) type Factory = Arc<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;
pub(crate) type Hook = Arc<dyn Fn(&dyn Any) + Send + Sync>;
pub(crate) type HookMut = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct Callbacks {
    pub(crate) before_serialize: Option<Hook>,
    pub(crate) after_serialize: Option<Hook>,
    pub(crate) before_deserialize: Option<HookMut>,
    pub(crate) after_deserialize: Option<HookMut>,
}

/// A registered subtype of a plan's type, selected on the wire by `tag`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtypeEntry {
    pub(crate) tag: u32,
    pub(crate) derived: TypeKey,
}

impl SubtypeEntry {
    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn derived(&self) -> &TypeKey {
        &self.derived
    }
}

/// Everything the model gathered for a type before its plan is built.
pub(crate) struct PlanInputs {
    pub(crate) key: TypeKey,
    pub(crate) base: Option<TypeKey>,
    pub(crate) members: Vec<MemberConfig>,
    pub(crate) factory: Option<Factory>,
    pub(crate) callbacks: Callbacks,
    pub(crate) subtypes: Vec<SubtypeEntry>,
}

/// Resolved, immutable wire layout of one message type.
///
/// Fields keep their declaration order, which is also the write order. Nested
/// message types are referenced by [`TypeKey`] only and resolved through the
/// owning model when they are first encountered, so direct and mutual recursion
/// never recurse during the build.
pub struct TypePlan {
    key: TypeKey,
    base: Option<TypeKey>,
    fields: Vec<PlannedField>,
    tag_index: HashMap<u32, usize>,
    subtypes: Vec<SubtypeEntry>,
    factory: Option<Factory>,
    callbacks: Callbacks,
}

fn check_tag(owner: &TypeKey, tag: u32, what: &str) -> Result<(), Error> {
    if tag == 0 || tag > MAX_TAG {
        not_allowed!(
            "{} {} of {} is outside the valid range 1..={}",
            what,
            tag,
            owner,
            MAX_TAG
        );
    }
    if RESERVED_TAGS.contains(&tag) {
        not_allowed!(
            "{} {} of {} lies in the reserved range {}..={}",
            what,
            tag,
            owner,
            RESERVED_TAGS.start(),
            RESERVED_TAGS.end()
        );
    }
    Ok(())
}

impl TypePlan {
    /// Validates the declared members and turns them into a plan.
    ///
    /// `check_reference` is asked about every message (`false`) or enum
    /// (`true`) type a member refers to.
    pub(crate) fn build(
        inputs: PlanInputs,
        check_reference: impl Fn(&TypeKey, bool) -> Result<(), Error>,
    ) -> Result<TypePlan, Error> {
        let PlanInputs {
            key,
            base,
            members,
            factory,
            callbacks,
            subtypes,
        } = inputs;
        let mut fields = Vec::with_capacity(members.len());
        let mut tag_index = HashMap::with_capacity(members.len());
        for member in members {
            let MemberConfig {
                tag,
                name,
                options,
                access,
            } = member;
            if access.owner() != key {
                not_allowed!(
                    "member {} belongs to {}, not {}",
                    name,
                    access.owner(),
                    key
                );
            }
            check_tag(&key, tag, "field number")?;
            if tag_index.insert(tag, fields.len()).is_some() {
                not_allowed!("field number {} is used twice in {}", tag, key);
            }
            if !access.supports_format(options.format, options.key_format) {
                not_allowed!(
                    "field {} of {} does not support data format {:?}",
                    name,
                    key,
                    options.format
                );
            }
            if options.packed && !access.packable(options.format) {
                not_allowed!(
                    "field {} of {} cannot be packed; only repeated varint and fixed-width scalars can",
                    name,
                    key
                );
            }
            if let Some(default) = &options.default {
                if !access.accepts_default(default) {
                    not_allowed!(
                        "default {:?} does not fit field {} of {}",
                        default,
                        name,
                        key
                    );
                }
            }
            let shape = access.shape();
            let mut referenced = Vec::new();
            shape.referenced(&mut referenced);
            for (target, is_enum) in &referenced {
                check_reference(target, *is_enum)?;
            }
            fields.push(PlannedField {
                descriptor: FieldDescriptor {
                    tag,
                    name,
                    wire_type: access.wire_type(options.format),
                    format: options.format,
                    key_format: options.key_format,
                    packed: options.packed,
                    required: options.required,
                    default: options.default,
                    shape,
                },
                access,
            });
        }
        let mut sibling_tags = HashMap::with_capacity(subtypes.len());
        for entry in &subtypes {
            check_tag(&key, entry.tag, "subtype tag")?;
            if tag_index.contains_key(&entry.tag) {
                not_allowed!(
                    "subtype tag {} of {} collides with a field number",
                    entry.tag,
                    key
                );
            }
            if let Some(previous) = sibling_tags.insert(entry.tag, entry.derived) {
                not_allowed!(
                    "subtypes {} and {} of {} share tag {}",
                    previous,
                    entry.derived,
                    key,
                    entry.tag
                );
            }
        }
        Ok(TypePlan {
            key,
            base,
            fields,
            tag_index,
            subtypes,
            factory,
            callbacks,
        })
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn type_name(&self) -> &'static str {
        self.key.name
    }

    /// The registered base type, if this type was added as a subtype.
    pub fn base(&self) -> Option<&TypeKey> {
        self.base.as_ref()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.fields.iter().map(|f| &f.descriptor)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, tag: u32) -> Option<&FieldDescriptor> {
        self.tag_index.get(&tag).map(|&i| &self.fields[i].descriptor)
    }

    pub fn subtypes(&self) -> &[SubtypeEntry] {
        &self.subtypes
    }

    pub fn subtype_by_tag(&self, tag: u32) -> Option<&SubtypeEntry> {
        self.subtypes.iter().find(|s| s.tag == tag)
    }

    pub fn subtype_for(&self, derived: TypeId) -> Option<&SubtypeEntry> {
        self.subtypes.iter().find(|s| s.derived.id == derived)
    }

    pub fn has_constructor(&self) -> bool {
        self.factory.is_some()
    }

    pub(crate) fn planned_fields(&self) -> &[PlannedField] {
        &self.fields
    }

    pub(crate) fn planned(&self, tag: u32) -> Option<(usize, &PlannedField)> {
        self.tag_index.get(&tag).map(|&i| (i, &self.fields[i]))
    }

    /// Creates a fresh instance with every explicit default applied.
    pub(crate) fn construct(&self) -> Result<Box<dyn Any + Send + Sync>, Error> {
        let factory = self.factory.as_ref().ok_or_else(|| {
            Error::construction(format!(
                "{} has no construction strategy; register it with constructor() or use_default()",
                self.key
            ))
        })?;
        let mut value = factory();
        for field in &self.fields {
            if let Some(default) = &field.descriptor.default {
                field.access.apply_default(&mut *value, default)?;
            }
        }
        Ok(value)
    }

    /// Fails with a schema mismatch naming the first required field not in `seen`.
    pub(crate) fn check_required(&self, seen: &[bool]) -> Result<(), Error> {
        for (field, seen) in self.fields.iter().zip(seen) {
            if field.descriptor.required && !*seen {
                return Err(Error::schema_mismatch(format!(
                    "required field {} ({}) of {} is missing",
                    field.descriptor.name, field.descriptor.tag, self.key
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn before_serialize(&self, value: &dyn Any) {
        if let Some(hook) = &self.callbacks.before_serialize {
            hook(value);
        }
    }

    pub(crate) fn after_serialize(&self, value: &dyn Any) {
        if let Some(hook) = &self.callbacks.after_serialize {
            hook(value);
        }
    }

    pub(crate) fn before_deserialize(&self, value: &mut dyn Any) {
        if let Some(hook) = &self.callbacks.before_deserialize {
            hook(value);
        }
    }

    pub(crate) fn after_deserialize(&self, value: &mut dyn Any) {
        if let Some(hook) = &self.callbacks.after_deserialize {
            hook(value);
        }
    }
}

impl fmt::Debug for TypePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypePlan")
            .field("type", &self.key.name)
            .field("base", &self.base.map(|b| b.name))
            .field("fields", &self.fields().collect::<Vec<_>>())
            .field("subtypes", &self.subtypes)
            .field("has_constructor", &self.factory.is_some())
            .finish()
    }
}

/// The wire type a discriminator field uses for its nested payload.
pub(crate) const SUBTYPE_WIRE_TYPE: WireType = WireType::LengthDelimited;
