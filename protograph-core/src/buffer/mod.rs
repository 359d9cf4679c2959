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

//! Sequential cursors over the protobuf wire format.
//!
//! [`ProtoWriter`] owns an in-memory output buffer and a LIFO stack of open
//! sub-items; [`ProtoReader`] walks a borrowed input slice with a stack of read
//! boundaries. Both are created per call and never shared between threads.

mod reader;
mod writer;

pub use reader::ProtoReader;
pub use writer::ProtoWriter;

/// Handle for an open sub-item (nested message, group or packed payload).
///
/// Tokens are returned by `start_sub_item` and must be handed back to
/// `end_sub_item` of the same cursor in strict LIFO order.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "every opened sub-item must be closed with end_sub_item"]
pub struct SubItemToken {
    depth: usize,
    serial: u32,
}

impl SubItemToken {
    /// Nesting depth of the region this token opened, starting at 1.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
