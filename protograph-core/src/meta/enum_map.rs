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

use super::TypeKey;
use crate::error::Error;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Two-way mapping between enum members and their declared wire values.
///
/// Values are matched by wire value, never by declaration position, so two
/// different enums that agree on wire values interoperate.
#[derive(Debug)]
pub struct EnumMap<E> {
    members: Vec<(E, i32)>,
    by_member: HashMap<E, i32>,
    by_wire: HashMap<i32, E>,
}

impl<E: Copy + Eq + Hash + Debug + Send + Sync + 'static> EnumMap<E> {
    fn build(key: &TypeKey, pairs: &[(E, i32)]) -> Result<EnumMap<E>, String> {
        if pairs.is_empty() {
            return Err(format!("enum {} declares no members", key));
        }
        let mut by_member = HashMap::with_capacity(pairs.len());
        let mut by_wire = HashMap::with_capacity(pairs.len());
        for &(member, wire) in pairs {
            if by_member.insert(member, wire).is_some() {
                return Err(format!("enum {} declares member {:?} twice", key, member));
            }
            if let Some(previous) = by_wire.insert(wire, member) {
                return Err(format!(
                    "enum {} maps both {:?} and {:?} to wire value {}",
                    key, previous, member, wire
                ));
            }
        }
        Ok(EnumMap {
            members: pairs.to_vec(),
            by_member,
            by_wire,
        })
    }

    pub fn wire_value(&self, member: E) -> Option<i32> {
        self.by_member.get(&member).copied()
    }

    pub fn member(&self, wire: i32) -> Option<E> {
        self.by_wire.get(&wire).copied()
    }

    /// The member an absent field reads as: the one with wire value 0, or the
    /// first declared member when no member maps to 0.
    pub fn default_member(&self) -> E {
        match self.by_wire.get(&0) {
            Some(member) => *member,
            None => self.members[0].0,
        }
    }

    pub fn members(&self) -> &[(E, i32)] {
        &self.members
    }
}

/// Registration record of an enum inside a model. Validation runs when the
/// enum is added but its outcome is only reported when a plan uses the enum.
pub(crate) struct EnumEntry {
    pub(crate) key: TypeKey,
    map: Result<Arc<dyn Any + Send + Sync>, String>,
}

impl EnumEntry {
    pub(crate) fn new<E: Copy + Eq + Hash + Debug + Send + Sync + 'static>(
        pairs: &[(E, i32)],
    ) -> EnumEntry {
        let key = TypeKey::of::<E>();
        let map = EnumMap::build(&key, pairs).map(|m| Arc::new(m) as Arc<dyn Any + Send + Sync>);
        EnumEntry { key, map }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        match &self.map {
            Ok(_) => Ok(()),
            Err(msg) => Err(Error::not_allowed(msg.clone())),
        }
    }

    pub(crate) fn typed<E: 'static>(&self) -> Result<&EnumMap<E>, Error> {
        match &self.map {
            Ok(map) => map.downcast_ref::<EnumMap<E>>().ok_or_else(|| {
                Error::invalid_state(format!("enum entry {} has a different type", self.key))
            }),
            Err(msg) => Err(Error::not_allowed(msg.clone())),
        }
    }
}
