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

//! Inheritance on top of protobuf's flat messages.
//!
//! A derived type embeds its base and is linked to it by a [`SubtypeEdge`]. On
//! the wire each level writes its own fields followed by one discriminator field
//! whose payload is the next, more derived level. Reading walks the same nesting
//! and, where the target is a [`Dynamic`](crate::serializer::dynamic::Dynamic)
//! holder, upgrades the instance to the more derived type on the fly.

use super::context::{ReadContext, WriteContext};
use crate::error::Error;
use crate::meta::{SubtypeEntry, TypeKey, SUBTYPE_WIRE_TYPE};
use crate::model::TypeModel;
use log::trace;
use std::any::{Any, TypeId};

/// Type-erased view conversion from a derived type to its embedded base.
pub(crate) trait ErasedUpcast: Send + Sync {
    fn upcast<'a>(&self, derived: &'a dyn Any) -> Option<&'a dyn Any>;
    fn upcast_mut<'a>(&self, derived: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
    /// Replaces the embedded base of `derived` with `base`.
    fn install_base(
        &self,
        derived: &mut dyn Any,
        base: Box<dyn Any + Send + Sync>,
    ) -> Result<(), Error>;
}

pub(crate) struct Upcast<B, D> {
    up: fn(&D) -> &B,
    up_mut: fn(&mut D) -> &mut B,
}

impl<B, D> Upcast<B, D> {
    pub(crate) fn new(up: fn(&D) -> &B, up_mut: fn(&mut D) -> &mut B) -> Self {
        Upcast { up, up_mut }
    }
}

impl<B: Send + Sync + 'static, D: 'static> ErasedUpcast for Upcast<B, D> {
    fn upcast<'a>(&self, derived: &'a dyn Any) -> Option<&'a dyn Any> {
        derived
            .downcast_ref::<D>()
            .map(|derived| (self.up)(derived) as &dyn Any)
    }

    fn upcast_mut<'a>(&self, derived: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        derived
            .downcast_mut::<D>()
            .map(|derived| (self.up_mut)(derived) as &mut dyn Any)
    }

    fn install_base(
        &self,
        derived: &mut dyn Any,
        base: Box<dyn Any + Send + Sync>,
    ) -> Result<(), Error> {
        let derived = derived.downcast_mut::<D>().ok_or_else(|| {
            Error::invalid_state(format!(
                "expected a {} instance",
                std::any::type_name::<D>()
            ))
        })?;
        let base = base.downcast::<B>().map_err(|_| {
            Error::invalid_state(format!(
                "expected a {} base instance",
                std::any::type_name::<B>()
            ))
        })?;
        *(self.up_mut)(derived) = *base;
        Ok(())
    }
}

/// Link from a derived type to its direct base.
pub(crate) struct SubtypeEdge {
    pub(crate) base: TypeKey,
    pub(crate) derived: TypeKey,
    pub(crate) tag: u32,
    pub(crate) caster: Box<dyn ErasedUpcast>,
}

/// The instance a read fills in.
pub(crate) enum Slot<'a> {
    /// A value of a fixed Rust type; it can only be filled, never upgraded.
    Fixed {
        value: &'a mut dyn Any,
        runtime: TypeId,
    },
    /// A boxed value whose concrete type may be replaced by a more derived one.
    Boxed {
        value: &'a mut Box<dyn Any + Send + Sync>,
        runtime: &'a mut TypeKey,
    },
}

impl Slot<'_> {
    fn runtime(&self) -> TypeId {
        match self {
            Slot::Fixed { runtime, .. } => *runtime,
            Slot::Boxed { runtime, .. } => runtime.id,
        }
    }

    /// The part of the instance that belongs to `level`.
    fn view_mut(&mut self, model: &TypeModel, level: TypeId) -> Result<&mut dyn Any, Error> {
        let (mut view, mut current) = match self {
            Slot::Fixed { value, runtime } => (&mut **value, *runtime),
            Slot::Boxed { value, runtime } => (&mut ***value as &mut dyn Any, runtime.id),
        };
        while current != level {
            let edge = model.parent_edge(current).ok_or_else(|| {
                Error::schema_mismatch(format!(
                    "{} is not derived from {}",
                    model.type_name(current),
                    model.type_name(level)
                ))
            })?;
            view = edge.caster.upcast_mut(view).ok_or_else(|| {
                Error::invalid_state(format!("cannot view {} as {}", edge.derived, edge.base))
            })?;
            current = edge.base.id;
        }
        Ok(view)
    }

    /// Prepares the instance for the payload of the discriminator `entry`
    /// found while reading `level`.
    fn enter_subtype(
        &mut self,
        model: &TypeModel,
        level: TypeId,
        entry: &SubtypeEntry,
    ) -> Result<(), Error> {
        let current = self.runtime();
        if current != level {
            if model.is_same_or_derived(current, entry.derived.id) {
                return Ok(());
            }
            return Err(Error::schema_mismatch(format!(
                "stream selects subtype {} but the instance is a {}",
                entry.derived,
                model.type_name(current)
            )));
        }
        match self {
            Slot::Fixed { .. } => Err(Error::schema_mismatch(format!(
                "a {} value cannot become the subtype {}; hold it in a Dynamic",
                model.type_name(level),
                entry.derived
            ))),
            Slot::Boxed { value, runtime } => {
                let edge = model.parent_edge(entry.derived.id).ok_or_else(|| {
                    Error::schema_mismatch(format!("{} has no registered base", entry.derived))
                })?;
                let derived = model.construct(entry.derived.id)?;
                let base = std::mem::replace(&mut **value, derived);
                edge.caster.install_base(&mut ***value, base)?;
                trace!("upgraded {} to {}", runtime.name, entry.derived.name);
                **runtime = entry.derived;
                Ok(())
            }
        }
    }
}

/// Views of `value` for every level from the root of its hierarchy down to
/// its runtime type.
fn ancestry<'v>(
    model: &TypeModel,
    value: &'v dyn Any,
    runtime: TypeId,
) -> Result<Vec<(TypeId, &'v dyn Any)>, Error> {
    let mut chain = vec![(runtime, value)];
    let mut current = runtime;
    let mut view = value;
    while let Some(edge) = model.parent_edge(current) {
        view = edge.caster.upcast(view).ok_or_else(|| {
            Error::invalid_state(format!("cannot view {} as {}", edge.derived, edge.base))
        })?;
        current = edge.base.id;
        chain.push((current, view));
    }
    chain.reverse();
    Ok(chain)
}

/// Writes `value`, whose concrete type is `runtime`, for a member declared as
/// `declared`.
pub(crate) fn write_chain(
    context: &mut WriteContext,
    value: &dyn Any,
    runtime: &TypeKey,
    declared: TypeId,
) -> Result<(), Error> {
    let model = context.model();
    let chain = ancestry(model, value, runtime.id)?;
    if !chain.iter().any(|(level, _)| *level == declared) {
        return Err(Error::schema_mismatch(format!(
            "{} is not a registered subtype of {}",
            runtime,
            model.type_name(declared)
        )));
    }
    write_levels(context, &chain)
}

fn write_levels(context: &mut WriteContext, chain: &[(TypeId, &dyn Any)]) -> Result<(), Error> {
    let Some((&(level, view), rest)) = chain.split_first() else {
        return Ok(());
    };
    let plan = context.plan(level)?;
    plan.before_serialize(view);
    for field in plan.planned_fields() {
        field.access.write(view, &field.descriptor, context)?;
    }
    if let Some(&(child, _)) = rest.first() {
        let entry = plan.subtype_for(child).ok_or_else(|| {
            Error::schema_mismatch(format!(
                "{} has no discriminator for {}",
                plan.key(),
                context.model().type_name(child)
            ))
        })?;
        context
            .writer
            .write_field_header(entry.tag, SUBTYPE_WIRE_TYPE)?;
        let token = context.writer.start_sub_item()?;
        write_levels(context, rest)?;
        context.writer.end_sub_item(token)?;
    }
    plan.after_serialize(view);
    Ok(())
}

/// Reads fields into `slot` for a member declared as `declared`, starting at
/// the root of its hierarchy.
pub(crate) fn merge_chain(
    context: &mut ReadContext,
    slot: &mut Slot,
    declared: TypeId,
) -> Result<(), Error> {
    let root = context.model().root_of(declared);
    merge_level(context, slot, root)
}

fn merge_level(context: &mut ReadContext, slot: &mut Slot, level: TypeId) -> Result<(), Error> {
    let model = context.model();
    let plan = context.plan(level)?;
    plan.before_deserialize(slot.view_mut(model, level)?);
    let mut seen = vec![false; plan.field_count()];
    while let Some(header) = context.reader.read_field_header()? {
        if let Some((index, field)) = plan.planned(header.tag) {
            seen[index] = true;
            let view = slot.view_mut(model, level)?;
            field.access.merge(view, &field.descriptor, context)?;
        } else if let Some(entry) = plan.subtype_by_tag(header.tag) {
            slot.enter_subtype(model, level, entry)?;
            let token = context.reader.start_sub_item()?;
            merge_level(context, slot, entry.derived.id)?;
            context.reader.end_sub_item(token)?;
        } else {
            trace!(
                "skipping unknown field {} ({}) of {}",
                header.tag,
                header.wire_type,
                plan.key()
            );
            context.reader.skip_field()?;
        }
    }
    plan.check_required(&seen)?;
    plan.after_deserialize(slot.view_mut(model, level)?);
    Ok(())
}
