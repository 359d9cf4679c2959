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

//! Lazy, per-type plan construction.
//!
//! Every registered type owns one [`PlanEntry`]. The first caller that needs the
//! plan takes the entry's lock and builds it; callers needing the same plan wait
//! on that lock for at most the configured timeout, callers needing other plans
//! are never blocked. Once built, the plan is published through a `OnceLock`
//! and read without locking.

use crate::error::Error;
use crate::meta::{TypeKey, TypePlan};
use log::{debug, warn};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum PlanState {
    Unbuilt = 0,
    Building = 1,
    Built = 2,
}

/// Diagnostic event raised when a caller had to wait for another thread that
/// was building the same plan.
#[derive(Clone, Debug)]
pub struct LockContention {
    pub model_id: u64,
    pub type_name: &'static str,
    /// Thread building the plan while the caller waited, if known.
    pub owner: Option<String>,
    pub waited: Duration,
    pub timed_out: bool,
}

pub(crate) type ContentionHandler = Arc<dyn Fn(&LockContention) + Send + Sync>;

pub(crate) struct PlanEntry {
    key: TypeKey,
    plan: OnceLock<Arc<TypePlan>>,
    lock: Mutex<()>,
    /// Last thread to start a build. Kept after the build so that a waiter
    /// which arrived before the builder recorded itself can still name it.
    owner: Mutex<Option<String>>,
    state: AtomicU8,
    builds: AtomicUsize,
}

fn describe_current_thread() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => format!("{} ({:?})", name, current.id()),
        None => format!("{:?}", current.id()),
    }
}

impl PlanEntry {
    pub(crate) fn new(key: TypeKey) -> PlanEntry {
        PlanEntry {
            key,
            plan: OnceLock::new(),
            lock: Mutex::new(()),
            owner: Mutex::new(None),
            state: AtomicU8::new(PlanState::Unbuilt.into()),
            builds: AtomicUsize::new(0),
        }
    }

    pub(crate) fn state(&self) -> PlanState {
        PlanState::try_from(self.state.load(Ordering::Acquire)).unwrap_or(PlanState::Unbuilt)
    }

    pub(crate) fn build_count(&self) -> usize {
        self.builds.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub(crate) fn get(&self) -> Option<&Arc<TypePlan>> {
        self.plan.get()
    }

    /// Returns the plan, building it with `build` if no other caller has.
    pub(crate) fn get_or_build(
        &self,
        model_id: u64,
        timeout: Duration,
        on_contention: impl Fn(&LockContention),
        build: impl FnOnce() -> Result<TypePlan, Error>,
    ) -> Result<&Arc<TypePlan>, Error> {
        if let Some(plan) = self.plan.get() {
            return Ok(plan);
        }
        let _guard = match self.lock.try_lock() {
            Some(guard) => guard,
            None => {
                let owner = self.owner.lock().clone();
                let started = Instant::now();
                let acquired = self.lock.try_lock_for(timeout);
                let owner = owner.or_else(|| self.owner.lock().clone());
                let event = LockContention {
                    model_id,
                    type_name: self.key.name,
                    owner,
                    waited: started.elapsed(),
                    timed_out: acquired.is_none(),
                };
                warn!(
                    "plan lock for {} contended (model {}, owner {:?}, waited {:?}, timed out: {})",
                    event.type_name, model_id, event.owner, event.waited, event.timed_out
                );
                on_contention(&event);
                match acquired {
                    Some(guard) => guard,
                    None => {
                        return Err(Error::timeout(format!(
                            "timed out after {:?} waiting for the plan of {} (held by {})",
                            timeout,
                            self.key,
                            event.owner.as_deref().unwrap_or("unknown")
                        )))
                    }
                }
            }
        };
        if let Some(plan) = self.plan.get() {
            return Ok(plan);
        }
        self.state.store(PlanState::Building.into(), Ordering::Release);
        *self.owner.lock() = Some(describe_current_thread());
        debug!("building plan for {}", self.key);
        let started = Instant::now();
        let result = build();
        match result {
            Ok(plan) => {
                let fields = plan.field_count();
                let plan = self.plan.get_or_init(|| Arc::new(plan));
                self.builds.fetch_add(1, Ordering::AcqRel);
                self.state.store(PlanState::Built.into(), Ordering::Release);
                debug!(
                    "built plan for {} with {} field(s) in {:?}",
                    self.key,
                    fields,
                    started.elapsed()
                );
                Ok(plan)
            }
            Err(e) => {
                self.state.store(PlanState::Unbuilt.into(), Ordering::Release);
                debug!("plan for {} failed to build: {}", self.key, e);
                Err(e)
            }
        }
    }
}
