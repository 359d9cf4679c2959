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

use std::time::Duration;

/// Configuration for a [`TypeModel`](crate::model::TypeModel).
///
/// The model owns one `Config` and hands it to every `WriteContext` and
/// `ReadContext` it creates, so all calls against one model behave alike.
#[derive(Clone, Debug)]
pub struct Config {
    /// How long a caller waits for another thread building the same plan.
    pub lock_timeout: Duration,
    /// Maximum sub-item nesting for reads and writes.
    pub max_depth: u32,
    /// Treat the zero value of a scalar without an explicit default as its default.
    pub implicit_zero_defaults: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lock_timeout: Duration::from_secs(5),
            max_depth: 512,
            implicit_zero_defaults: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    #[inline(always)]
    pub fn max_depth(&self) -> usize {
        self.max_depth as usize
    }

    #[inline(always)]
    pub fn is_implicit_zero_defaults(&self) -> bool {
        self.implicit_zero_defaults
    }
}
