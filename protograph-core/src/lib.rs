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

//! # Protograph Core
//!
//! The engine behind `protograph`: a Protocol Buffers encoder and decoder for
//! Rust types whose wire layout is declared at runtime instead of generated
//! from `.proto` files.
//!
//! ## Architecture
//!
//! - **`varint`**: base-128 varint, zigzag and fixed-width primitives
//! - **`buffer`**: [`ProtoWriter`](buffer::ProtoWriter) and
//!   [`ProtoReader`](buffer::ProtoReader), the cursors that manage field
//!   headers and length-prefixed or group-delimited nesting
//! - **`meta`**: [`TypePlan`](meta::TypePlan) and
//!   [`FieldDescriptor`](meta::FieldDescriptor), the immutable per-type field
//!   layout
//! - **`resolver`**: registration builders, the lazily built plan cache and
//!   subtype dispatch
//! - **`serializer`**: codecs for every supported value shape
//! - **`model`**: [`TypeModel`](model::TypeModel), the registry and entry point
//! - **`framing`**: length-prefixed message streams
//! - **`config`**, **`types`**, **`error`**: settings, wire enums and errors
//!
//! ## Wire compatibility
//!
//! Output is plain protobuf. Messages written by this crate can be read by any
//! protobuf implementation given an equivalent `.proto` schema, and vice versa.
//! Inheritance, which protobuf lacks, is mapped onto nested messages under
//! discriminator field numbers; GUIDs, decimals, date-times and time spans use
//! the conventional `bcl.*` message layouts.
//!
//! ## Usage
//!
//! ```rust
//! use protograph_core::model::TypeModel;
//! use protograph_core::resolver::type_resolver::FieldOptions;
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Order {
//!     id: u64,
//!     lines: Vec<i32>,
//! }
//! protograph_core::proto_message!(Order);
//!
//! let mut model = TypeModel::default();
//! model
//!     .add_type::<Order>()
//!     .unwrap()
//!     .use_default()
//!     .field(1, "id", |o| &o.id, |o| &mut o.id)
//!     .field_with(2, "lines", FieldOptions::new().packed(), |o| &o.lines, |o| &mut o.lines);
//!
//! let order = Order { id: 150, lines: vec![3, 270] };
//! let bytes = model.serialize(&order).unwrap();
//! assert_eq!(bytes, vec![0x08, 0x96, 0x01, 0x12, 0x03, 0x03, 0x8e, 0x02]);
//! assert_eq!(model.deserialize::<Order>(&bytes).unwrap(), order);
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod framing;
pub mod meta;
pub mod model;
pub mod resolver;
pub mod serializer;
pub mod types;
pub mod varint;

pub use resolver::plan_cache::{LockContention, PlanState};
