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

//! # Protograph
//!
//! Protograph reads and writes the Protocol Buffers wire format for ordinary
//! Rust types. There is no `.proto` compiler step: each type's fields are
//! declared once on a [`TypeModel`], which turns the declaration into an
//! immutable field plan the first time the type is used.
//!
//! ## Key Features
//!
//! - **Wire compatible**: output is plain protobuf, readable by any protobuf
//!   implementation with an equivalent schema
//! - **Runtime schemas**: field numbers, encodings, defaults and required
//!   flags are declared in code or supplied by an external configuration source
//! - **Inheritance**: type hierarchies are mapped onto nested messages under
//!   discriminator field numbers, and [`Dynamic`] preserves the concrete type
//! - **Concurrent first use**: plans are built lazily, once per type, under a
//!   per-type lock with a bounded wait and contention diagnostics
//!
//! ## Messages
//!
//! ```rust
//! use protograph::{proto_message, Error, FieldOptions, TypeModel};
//! use std::collections::HashMap;
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: i32,
//!     address: Option<Address>,
//!     hobbies: Vec<String>,
//!     metadata: HashMap<String, String>,
//! }
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Address {
//!     street: String,
//!     city: String,
//! }
//!
//! proto_message!(Person, Address);
//!
//! # fn main() -> Result<(), Error> {
//! let mut model = TypeModel::default();
//! model
//!     .add_type::<Address>()?
//!     .use_default()
//!     .field(1, "street", |a| &a.street, |a| &mut a.street)
//!     .field(2, "city", |a| &a.city, |a| &mut a.city);
//! model
//!     .add_type::<Person>()?
//!     .use_default()
//!     .field(1, "name", |p| &p.name, |p| &mut p.name)
//!     .field_with(2, "age", FieldOptions::new().required(), |p| &p.age, |p| &mut p.age)
//!     .field(3, "address", |p| &p.address, |p| &mut p.address)
//!     .field(4, "hobbies", |p| &p.hobbies, |p| &mut p.hobbies)
//!     .field(5, "metadata", |p| &p.metadata, |p| &mut p.metadata);
//!
//! let person = Person {
//!     name: "John Doe".to_string(),
//!     age: 30,
//!     address: Some(Address {
//!         street: "123 Main St".to_string(),
//!         city: "New York".to_string(),
//!     }),
//!     hobbies: vec!["reading".to_string(), "coding".to_string()],
//!     metadata: HashMap::from([("level".to_string(), "senior".to_string())]),
//! };
//!
//! let bytes = model.serialize(&person)?;
//! let back: Person = model.deserialize(&bytes)?;
//! assert_eq!(person, back);
//! # Ok(())
//! # }
//! ```
//!
//! ## Supported Types
//!
//! ### Scalars
//! - `bool`, `i8`, `i16`, `i32`, `i64`, `u16`, `u32`, `u64`, `f32`, `f64`
//! - `String`, and `Vec<u8>` for bytes
//!
//! Integers take [`DataFormat::ZigZag`] (`sint32`/`sint64`) or
//! [`DataFormat::FixedSize`] (`fixed32`/`sfixed64`, ...) through
//! [`FieldOptions::format`].
//!
//! ### Collections
//! - `Vec<T>`, repeated or packed ([`FieldOptions::packed`])
//! - `Option<T>` for nullable values, `Option<Vec<T>>` to tell an absent list
//!   from an empty one
//! - `HashMap<K, V>` and `BTreeMap<K, V>` as repeated key/value messages
//!
//! ### Surrogates
//! - `uuid::Uuid`, `rust_decimal::Decimal`, `chrono::NaiveDateTime` and
//!   `chrono::TimeDelta` in the `bcl.*` layouts; date-times and spans also as
//!   raw ticks ([`DataFormat::FixedSize`]) or as `google.protobuf.Timestamp`
//!   and `Duration` ([`DataFormat::WellKnown`])
//!
//! ```rust
//! use chrono::{DateTime, NaiveDateTime};
//! use protograph::{proto_message, DataFormat, Error, FieldOptions, TypeModel};
//! use uuid::Uuid;
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Order {
//!     id: Uuid,
//!     placed: NaiveDateTime,
//!     shipped: NaiveDateTime,
//! }
//!
//! proto_message!(Order);
//!
//! # fn main() -> Result<(), Error> {
//! let mut model = TypeModel::default();
//! model
//!     .add_type::<Order>()?
//!     .use_default()
//!     .field(1, "id", |o| &o.id, |o| &mut o.id)
//!     .field(2, "placed", |o| &o.placed, |o| &mut o.placed)
//!     .field_with(
//!         3,
//!         "shipped",
//!         FieldOptions::new().format(DataFormat::WellKnown),
//!         |o| &o.shipped,
//!         |o| &mut o.shipped,
//!     );
//!
//! let order = Order {
//!     id: Uuid::from_u128(0x6ba7b810_9dad_11d1_80b4_00c04fd430c8),
//!     placed: DateTime::from_timestamp(1_700_000_000, 0).unwrap().naive_utc(),
//!     shipped: DateTime::from_timestamp(1_700_086_400, 5).unwrap().naive_utc(),
//! };
//!
//! let bytes = model.serialize(&order)?;
//! let back: Order = model.deserialize(&bytes)?;
//! assert_eq!(order, back);
//! # Ok(())
//! # }
//! ```
//!
//! ### Custom Types
//! - Structs with [`proto_message!`], registered with [`TypeModel::add_type`]
//! - Enums with [`proto_enum!`], registered with [`TypeModel::add_enum`]
//! - `Box<T>` for recursive types and [`Dynamic<B>`] for polymorphic members
//!
//! ## Inheritance
//!
//! ```rust
//! use protograph::{proto_message, Dynamic, TypeModel};
//!
//! #[derive(Default)]
//! struct Animal {
//!     name: String,
//! }
//!
//! #[derive(Default)]
//! struct Dog {
//!     animal: Animal,
//!     good: bool,
//! }
//!
//! proto_message!(Animal, Dog);
//!
//! let mut model = TypeModel::default();
//! model
//!     .add_type::<Animal>()
//!     .unwrap()
//!     .use_default()
//!     .field(1, "name", |a| &a.name, |a| &mut a.name);
//! model
//!     .add_type::<Dog>()
//!     .unwrap()
//!     .use_default()
//!     .field(1, "good", |d| &d.good, |d| &mut d.good);
//! model
//!     .add_subtype::<Animal, Dog>(5, |d| &d.animal, |d| &mut d.animal)
//!     .unwrap();
//!
//! let pet: Dynamic<Animal> = Dynamic::new(Dog {
//!     animal: Animal { name: "Rex".to_string() },
//!     good: true,
//! });
//! let bytes = model.serialize(&pet).unwrap();
//! let back: Dynamic<Animal> = model.deserialize(&bytes).unwrap();
//! assert!(back.is::<Dog>());
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`Error`]. Malformed input, schema disagreements,
//! lock timeouts and invalid registrations are all reported; a failed write
//! never hands partial output to the caller.
//!
//! ```rust
//! use protograph::{Error, TypeModel};
//!
//! let model = TypeModel::default();
//! // a length-delimited field that claims more bytes than exist
//! let result = model.deserialize::<String>(&[0x0A, 0x05, b'a']);
//! assert!(matches!(result, Err(Error::Format(_))));
//! ```
//!
//! ## Getting Started
//!
//! ```toml
//! [dependencies]
//! protograph = "0.3"
//! ```

pub use protograph_core::{
    buffer::{ProtoReader, ProtoWriter, SubItemToken},
    config::Config,
    error::Error,
    framing::{try_read_length_prefix, DeserializeItems},
    meta::{
        BclKind, CodecKind, DefaultValue, EnumMap, FieldDescriptor, ScalarKind, SubtypeEntry,
        TypeKey, TypePlan, ValueShape,
    },
    model::TypeModel,
    proto_enum, proto_message,
    resolver::type_resolver::{FieldOptions, MemberConfig, MetaType, TypeConfigSource},
    serializer::{Dynamic, ListElement, ProtoField, ProtoItem},
    types::{DataFormat, PrefixStyle, WireType},
    LockContention, PlanState,
};
