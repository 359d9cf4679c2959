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

use crate::buffer::{ProtoReader, ProtoWriter};
use crate::config::Config;
use crate::error::Error;
use crate::meta::{EnumMap, TypePlan};
use crate::model::TypeModel;
use std::any::TypeId;
use std::fmt::Debug;
use std::hash::Hash;

/// Per-call state of a serialization: the output cursor and the model whose
/// plans drive it.
pub struct WriteContext<'m> {
    pub writer: ProtoWriter,
    model: &'m TypeModel,
}

impl<'m> WriteContext<'m> {
    pub fn new(model: &'m TypeModel) -> WriteContext<'m> {
        WriteContext {
            writer: ProtoWriter::with_max_depth(model.config().max_depth()),
            model,
        }
    }

    #[inline(always)]
    pub fn model(&self) -> &'m TypeModel {
        self.model
    }

    #[inline(always)]
    pub fn config(&self) -> &'m Config {
        self.model.config()
    }

    #[inline(always)]
    pub fn plan(&self, type_id: TypeId) -> Result<&'m TypePlan, Error> {
        self.model.resolve_plan(type_id)
    }

    #[inline(always)]
    pub fn enum_map<E: Copy + Eq + Hash + Debug + Send + Sync + 'static>(
        &self,
    ) -> Result<&'m EnumMap<E>, Error> {
        self.model.enum_map::<E>()
    }

    /// Completes the call, yielding the written bytes.
    pub fn finish(self) -> Result<Vec<u8>, Error> {
        self.writer.finish()
    }
}

pub struct ReadContext<'m, 'bf> {
    pub reader: ProtoReader<'bf>,
    model: &'m TypeModel,
}

impl<'m, 'bf> ReadContext<'m, 'bf> {
    pub fn new(model: &'m TypeModel, bf: &'bf [u8]) -> ReadContext<'m, 'bf> {
        ReadContext {
            reader: ProtoReader::with_max_depth(bf, model.config().max_depth()),
            model,
        }
    }

    #[inline(always)]
    pub fn model(&self) -> &'m TypeModel {
        self.model
    }

    #[inline(always)]
    pub fn config(&self) -> &'m Config {
        self.model.config()
    }

    #[inline(always)]
    pub fn plan(&self, type_id: TypeId) -> Result<&'m TypePlan, Error> {
        self.model.resolve_plan(type_id)
    }

    #[inline(always)]
    pub fn enum_map<E: Copy + Eq + Hash + Debug + Send + Sync + 'static>(
        &self,
    ) -> Result<&'m EnumMap<E>, Error> {
        self.model.enum_map::<E>()
    }
}
