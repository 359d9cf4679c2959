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

use crate::config::Config;
use crate::error::Error;
use crate::meta::{EnumEntry, EnumMap, PlanInputs, SubtypeEntry, TypeKey, TypePlan};
use crate::not_allowed;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::plan_cache::{ContentionHandler, LockContention, PlanEntry, PlanState};
use crate::resolver::subtype_resolver::{SubtypeEdge, Upcast};
use crate::resolver::type_resolver::{MetaType, TypeConfig, TypeConfigSource};
use crate::serializer::ProtoField;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

struct TypeRegistration {
    key: TypeKey,
    config: TypeConfig,
    entry: PlanEntry,
}

/// A set of registered types and the plans built for them.
///
/// `TypeModel` is the entry point for encoding values to the protobuf wire
/// format and decoding them back. Types are registered once through `&mut self`;
/// afterwards the model is shared (typically behind an `Arc`) and used from any
/// number of threads.
///
/// # Plan lifecycle
///
/// Each registered type moves through `Unbuilt -> Building -> Built` the first
/// time a call needs it. Building is guarded by a lock owned by that (model,
/// type) pair only:
///
/// - threads needing the same plan wait for the builder, up to
///   [`lock_timeout`](Self::lock_timeout), and then see the finished plan
/// - threads needing different plans, or using a different model, never wait
///   on each other
/// - a built plan is immutable and read without locking
///
/// Waiting for a builder raises a [`LockContention`] event that handlers
/// registered with [`on_lock_contention`](Self::on_lock_contention) receive.
///
/// # Examples
///
/// ```rust
/// use protograph_core::model::TypeModel;
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Customer {
///     id: i32,
///     name: String,
///     tags: Vec<String>,
/// }
/// protograph_core::proto_message!(Customer);
///
/// let mut model = TypeModel::default();
/// model
///     .add_type::<Customer>()
///     .unwrap()
///     .use_default()
///     .field(1, "id", |c| &c.id, |c| &mut c.id)
///     .field(2, "name", |c| &c.name, |c| &mut c.name)
///     .field(3, "tags", |c| &c.tags, |c| &mut c.tags);
///
/// let customer = Customer {
///     id: 7,
///     name: "Ada".to_string(),
///     tags: vec!["vip".to_string()],
/// };
/// let bytes = model.serialize(&customer).unwrap();
/// let back: Customer = model.deserialize(&bytes).unwrap();
/// assert_eq!(back, customer);
/// ```
pub struct TypeModel {
    id: u64,
    config: Config,
    types: HashMap<TypeId, TypeRegistration>,
    enums: HashMap<TypeId, EnumEntry>,
    parents: HashMap<TypeId, SubtypeEdge>,
    children: HashMap<TypeId, Vec<SubtypeEntry>>,
    contention_handlers: Vec<ContentionHandler>,
}

impl Default for TypeModel {
    fn default() -> Self {
        TypeModel {
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            config: Config::default(),
            types: HashMap::new(),
            enums: HashMap::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
            contention_handlers: Vec::new(),
        }
    }
}

impl TypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long a caller waits for another thread that is building the
    /// plan it needs. Exceeding it fails the call with [`Error::Timeout`].
    ///
    /// # Default
    ///
    /// Five seconds.
    ///
    /// ```rust
    /// use protograph_core::model::TypeModel;
    /// use std::time::Duration;
    ///
    /// let model = TypeModel::default().lock_timeout(Duration::from_millis(250));
    /// assert_eq!(model.config().lock_timeout(), Duration::from_millis(250));
    /// ```
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.lock_timeout = timeout;
        self
    }

    /// Sets the maximum sub-item nesting accepted on reads and writes.
    ///
    /// Object graphs must be trees; a cycle is reported as
    /// [`Error::DepthExceed`] once it reaches this depth.
    ///
    /// # Default
    ///
    /// 512.
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Controls whether scalars without an explicit default treat their zero
    /// value as the default, omitting it on write.
    ///
    /// # Default
    ///
    /// `true`.
    pub fn implicit_zero_defaults(mut self, enabled: bool) -> Self {
        self.config.implicit_zero_defaults = enabled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process-unique identifier of this model, as reported in
    /// [`LockContention`] events.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Registers a message type and returns a builder for its members.
    ///
    /// Fails with [`Error::NotAllowed`] if `T` is already registered.
    pub fn add_type<T: Send + Sync + 'static>(&mut self) -> Result<MetaType<'_, T>, Error> {
        let key = TypeKey::of::<T>();
        if self.types.contains_key(&key.id) || self.enums.contains_key(&key.id) {
            not_allowed!("type {} is already registered", key);
        }
        let registration = self.types.entry(key.id).or_insert(TypeRegistration {
            key,
            config: TypeConfig::default(),
            entry: PlanEntry::new(key),
        });
        Ok(MetaType::new(&mut registration.config))
    }

    /// Registers a message type whose members come from an external
    /// configuration source.
    ///
    /// The source is consulted when the plan is built, after any members
    /// declared on the returned builder.
    pub fn add_type_with_source<T: Send + Sync + 'static>(
        &mut self,
        source: impl TypeConfigSource,
    ) -> Result<MetaType<'_, T>, Error> {
        let key = TypeKey::of::<T>();
        self.add_type::<T>()?;
        let registration = self
            .types
            .get_mut(&key.id)
            .ok_or_else(|| Error::invalid_state(format!("{} vanished during registration", key)))?;
        registration.config.source = Some(Box::new(source));
        Ok(MetaType::new(&mut registration.config))
    }

    /// Registers an enum with its `(member, wire value)` pairs.
    ///
    /// Duplicate members or wire values are reported when a plan that uses the
    /// enum is built.
    pub fn add_enum<E>(&mut self, values: &[(E, i32)]) -> Result<&mut Self, Error>
    where
        E: Copy + Eq + Hash + Debug + Send + Sync + 'static,
    {
        let key = TypeKey::of::<E>();
        if self.types.contains_key(&key.id) || self.enums.contains_key(&key.id) {
            not_allowed!("type {} is already registered", key);
        }
        self.enums.insert(key.id, EnumEntry::new(values));
        Ok(self)
    }

    /// Registers `D` as a subtype of `B`, selected on the wire by `tag` inside
    /// `B`'s message.
    ///
    /// Rust has no class inheritance: `D` embeds a `B` and exposes it through
    /// `upcast` and `upcast_mut`. Both types must already be registered, a type
    /// has at most one base, and `B`'s plan must not be built yet.
    pub fn add_subtype<B, D>(
        &mut self,
        tag: u32,
        upcast: fn(&D) -> &B,
        upcast_mut: fn(&mut D) -> &mut B,
    ) -> Result<&mut Self, Error>
    where
        B: Send + Sync + 'static,
        D: Send + Sync + 'static,
    {
        let base = TypeKey::of::<B>();
        let derived = TypeKey::of::<D>();
        if base == derived {
            not_allowed!("{} cannot be a subtype of itself", base);
        }
        for key in [&base, &derived] {
            if !self.types.contains_key(&key.id) {
                not_allowed!("{} must be registered with add_type before add_subtype", key);
            }
        }
        if let Some(existing) = self.parents.get(&derived.id) {
            not_allowed!(
                "{} is already a subtype of {}",
                derived,
                existing.base
            );
        }
        if self.is_same_or_derived(base.id, derived.id) {
            not_allowed!("making {} a subtype of {} would form a cycle", derived, base);
        }
        if self
            .types
            .get(&base.id)
            .is_some_and(|r| r.entry.get().is_some())
        {
            not_allowed!("the plan of {} is already built; add subtypes before first use", base);
        }
        self.parents.insert(
            derived.id,
            SubtypeEdge {
                base,
                derived,
                tag,
                caster: Box::new(Upcast::new(upcast, upcast_mut)),
            },
        );
        self.children
            .entry(base.id)
            .or_default()
            .push(SubtypeEntry { tag, derived });
        Ok(self)
    }

    /// Registers an observer for plan-lock contention events.
    pub fn on_lock_contention<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&LockContention) + Send + Sync + 'static,
    {
        self.contention_handlers.push(Arc::new(handler));
        self
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        let id = TypeId::of::<T>();
        self.types.contains_key(&id) || self.enums.contains_key(&id)
    }

    /// Returns the plan of `T`, building it if needed.
    ///
    /// Code generators can walk the returned plan; it never changes once built.
    pub fn plan<T: 'static>(&self) -> Result<Arc<TypePlan>, Error> {
        self.resolve_entry(TypeId::of::<T>())
            .cloned()
            .map_err(Error::enhance_type_error::<T>)
    }

    /// Current build state of `T`'s plan, or `None` if `T` is not a registered
    /// message type.
    pub fn plan_state<T: 'static>(&self) -> Option<PlanState> {
        self.types
            .get(&TypeId::of::<T>())
            .map(|r| r.entry.state())
    }

    /// How many times `T`'s plan has been built. Never more than one.
    pub fn build_count<T: 'static>(&self) -> usize {
        self.types
            .get(&TypeId::of::<T>())
            .map_or(0, |r| r.entry.build_count())
    }

    /// Builds `T`'s plan ahead of first use.
    pub fn prepare<T: 'static>(&self) -> Result<(), Error> {
        self.plan::<T>().map(|_| ())
    }

    /// Builds every registered plan and validates every registered enum.
    pub fn compile_all(&self) -> Result<(), Error> {
        let mut ids: Vec<(&'static str, TypeId)> =
            self.types.values().map(|r| (r.key.name, r.key.id)).collect();
        ids.sort_by_key(|(name, _)| *name);
        for (_, id) in ids {
            self.resolve_entry(id)?;
        }
        for entry in self.enums.values() {
            entry.validate()?;
        }
        Ok(())
    }

    fn resolve_entry(&self, id: TypeId) -> Result<&Arc<TypePlan>, Error> {
        let registration = self.types.get(&id).ok_or_else(|| {
            Error::not_allowed(format!(
                "{} is not a registered message type",
                self.type_name(id)
            ))
        })?;
        registration.entry.get_or_build(
            self.id,
            self.config.lock_timeout,
            |event| self.report_contention(event),
            || self.build_plan(registration),
        )
    }

    #[inline(always)]
    pub(crate) fn resolve_plan(&self, id: TypeId) -> Result<&TypePlan, Error> {
        if let Some(plan) = self.types.get(&id).and_then(|r| r.entry.get()) {
            return Ok(plan);
        }
        self.resolve_entry(id).map(|plan| plan.as_ref())
    }

    fn build_plan(&self, registration: &TypeRegistration) -> Result<TypePlan, Error> {
        let key = registration.key;
        let inputs = PlanInputs {
            key,
            base: self.parents.get(&key.id).map(|edge| edge.base),
            members: registration.config.collect_members()?,
            factory: registration.config.factory.clone(),
            callbacks: registration.config.callbacks.clone(),
            subtypes: self.children.get(&key.id).cloned().unwrap_or_default(),
        };
        TypePlan::build(inputs, |target, is_enum| {
            if is_enum {
                match self.enums.get(&target.id) {
                    Some(entry) => entry.validate(),
                    None => Err(Error::not_allowed(format!(
                        "enum {} used by {} is not registered",
                        target, key
                    ))),
                }
            } else if self.types.contains_key(&target.id) {
                Ok(())
            } else {
                Err(Error::not_allowed(format!(
                    "message type {} used by {} is not registered",
                    target, key
                )))
            }
        })
    }

    fn report_contention(&self, event: &LockContention) {
        for handler in &self.contention_handlers {
            handler(event);
        }
    }

    pub(crate) fn enum_map<E: Copy + Eq + Hash + Debug + Send + Sync + 'static>(
        &self,
    ) -> Result<&EnumMap<E>, Error> {
        match self.enums.get(&TypeId::of::<E>()) {
            Some(entry) => entry.typed::<E>(),
            None => Err(Error::not_allowed(format!(
                "enum {} is not registered",
                std::any::type_name::<E>()
            ))),
        }
    }

    pub(crate) fn parent_edge(&self, id: TypeId) -> Option<&SubtypeEdge> {
        self.parents.get(&id)
    }

    pub(crate) fn type_name(&self, id: TypeId) -> &'static str {
        if let Some(registration) = self.types.get(&id) {
            return registration.key.name;
        }
        if let Some(entry) = self.enums.get(&id) {
            return entry.key.name;
        }
        "<unregistered type>"
    }

    /// Whether `candidate` is `ancestor` or registered below it.
    pub(crate) fn is_same_or_derived(&self, candidate: TypeId, ancestor: TypeId) -> bool {
        let mut current = candidate;
        loop {
            if current == ancestor {
                return true;
            }
            match self.parents.get(&current) {
                Some(edge) => current = edge.base.id,
                None => return false,
            }
        }
    }

    pub(crate) fn root_of(&self, id: TypeId) -> TypeId {
        let mut current = id;
        while let Some(edge) = self.parents.get(&current) {
            current = edge.base.id;
        }
        current
    }

    pub(crate) fn construct(&self, id: TypeId) -> Result<Box<dyn Any + Send + Sync>, Error> {
        self.resolve_plan(id)?.construct()
    }

    /// Serializes `value` to a new buffer.
    ///
    /// Messages are written as a bare field sequence. Any other value is
    /// written as field 1 of an implicit wrapper message.
    pub fn serialize<T: ProtoField>(&self, value: &T) -> Result<Vec<u8>, Error> {
        let mut context = WriteContext::new(self);
        if let Err(e) = value.write_root(&mut context) {
            context.writer.abandon();
            return Err(Error::enhance_type_error::<T>(e));
        }
        context.finish()
    }

    /// Serializes `value` into `sink`. Nothing reaches the sink unless the
    /// whole value was encoded successfully.
    pub fn serialize_into<T: ProtoField, W: Write + ?Sized>(
        &self,
        value: &T,
        sink: &mut W,
    ) -> Result<(), Error> {
        let mut context = WriteContext::new(self);
        if let Err(e) = value.write_root(&mut context) {
            context.writer.abandon();
            return Err(Error::enhance_type_error::<T>(e));
        }
        context.writer.flush_to(sink)
    }

    pub fn deserialize<T: ProtoField>(&self, bf: &[u8]) -> Result<T, Error> {
        let mut context = ReadContext::new(self, bf);
        let mut value = T::fresh_value(&context).map_err(Error::enhance_type_error::<T>)?;
        value
            .merge_root(&mut context)
            .map_err(Error::enhance_type_error::<T>)?;
        Ok(value)
    }

    /// Reads `source` to its end and deserializes the bytes.
    pub fn deserialize_from<T: ProtoField, R: Read + ?Sized>(
        &self,
        source: &mut R,
    ) -> Result<T, Error> {
        let mut bf = Vec::new();
        source.read_to_end(&mut bf)?;
        self.deserialize(&bf)
    }

    /// Merges the fields in `bf` into an existing value: scalars present in
    /// the payload overwrite, repeated fields append, nested messages merge.
    ///
    /// On failure `target` keeps whatever was merged before the error.
    pub fn merge<T: ProtoField>(&self, bf: &[u8], target: &mut T) -> Result<(), Error> {
        let mut context = ReadContext::new(self, bf);
        target
            .merge_root(&mut context)
            .map_err(Error::enhance_type_error::<T>)
    }

    /// Copies `value` by serializing and deserializing it.
    pub fn deep_clone<T: ProtoField>(&self, value: &T) -> Result<T, Error> {
        let bytes = self.serialize(value)?;
        self.deserialize(&bytes)
    }
}

impl fmt::Debug for TypeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeModel")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("types", &self.types.len())
            .field("enums", &self.enums.len())
            .field("subtypes", &self.parents.len())
            .finish()
    }
}
