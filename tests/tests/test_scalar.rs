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


use protograph::{proto_message, DataFormat, DefaultValue, Error, FieldOptions, TypeModel};
use std::sync::atomic::{AtomicUsize, Ordering};
use test_helpers::{test_roundtrip, test_wire};

#[test]
fn root_scalars() {
    let model = TypeModel::default();
    test_wire(&model, 150i32, &[0x08, 0x96, 0x01]);
    test_wire(&model, true, &[0x08, 0x01]);
    test_wire(&model, "testing".to_string(), b"\x0A\x07testing");
    test_wire(&model, vec![1u8, 2, 3], &[0x0A, 0x03, 1, 2, 3]);
    test_wire(&model, 1.5f64, &[0x09, 0, 0, 0, 0, 0, 0, 0xF8, 0x3F]);
    test_wire(&model, 1.0f32, &[0x0D, 0, 0, 0x80, 0x3F]);
    let mut max = vec![0x08];
    max.extend_from_slice(&[0xFF; 9]);
    max.push(0x01);
    test_wire(&model, u64::MAX, &max);
    test_wire(&model, -1i64, &max);
    test_roundtrip(&model, i8::MIN);
    test_roundtrip(&model, i16::MAX);
    test_roundtrip(&model, u16::MAX);
    test_roundtrip(&model, u32::MAX);
    test_roundtrip(&model, "üñí©ødé".to_string());
}

#[test]
fn zero_root_values_are_empty() {
    let model = TypeModel::default();
    test_wire(&model, 0i32, &[]);
    test_wire(&model, false, &[]);
    test_wire(&model, String::new(), &[]);
    test_wire(&model, Vec::<u8>::new(), &[]);
    assert_eq!(model.deserialize::<u64>(&[]).unwrap(), 0);
}

#[test]
fn negative_zero_is_written() {
    let model = TypeModel::default();
    let bytes = model.serialize(&-0.0f64).unwrap();
    assert_eq!(bytes.len(), 9);
    let value: f64 = model.deserialize(&bytes).unwrap();
    assert!(value == 0.0 && value.is_sign_negative());
}

#[test]
fn narrow_integer_overflow() {
    let model = TypeModel::default();
    // 70000 does not fit an i16
    let err = model
        .deserialize::<i16>(&[0x08, 0xF0, 0xA2, 0x04])
        .unwrap_err();
    assert!(matches!(err, Error::Format(_)));
    assert_eq!(model.deserialize::<i32>(&[0x08, 0xF0, 0xA2, 0x04]).unwrap(), 70000);
}

#[derive(Default, Debug, PartialEq)]
struct Test1 {
    a: i32,
}

#[derive(Default, Debug, PartialEq)]
struct Encodings {
    plain: i32,
    zigzag: i64,
    fixed: u32,
    sfixed: i64,
    small: i16,
}

proto_message!(Test1, Encodings);

#[test]
fn canonical_message() {
    let mut model = TypeModel::default();
    model
        .add_type::<Test1>()
        .unwrap()
        .use_default()
        .field(1, "a", |t| &t.a, |t| &mut t.a);
    test_wire(&model, Test1 { a: 150 }, &[0x08, 0x96, 0x01]);
    test_wire(&model, Test1 { a: 0 }, &[]);
}

fn encodings_model() -> TypeModel {
    let mut model = TypeModel::default();
    model
        .add_type::<Encodings>()
        .unwrap()
        .use_default()
        .field(1, "plain", |e| &e.plain, |e| &mut e.plain)
        .field_with(
            2,
            "zigzag",
            FieldOptions::new().format(DataFormat::ZigZag),
            |e| &e.zigzag,
            |e| &mut e.zigzag,
        )
        .field_with(
            3,
            "fixed",
            FieldOptions::new().format(DataFormat::FixedSize),
            |e| &e.fixed,
            |e| &mut e.fixed,
        )
        .field_with(
            4,
            "sfixed",
            FieldOptions::new().format(DataFormat::FixedSize),
            |e| &e.sfixed,
            |e| &mut e.sfixed,
        )
        .field_with(
            5,
            "small",
            FieldOptions::new().format(DataFormat::ZigZag),
            |e| &e.small,
            |e| &mut e.small,
        );
    model
}

#[test]
fn data_formats() {
    let model = encodings_model();
    test_wire(
        &model,
        Encodings {
            plain: -1,
            zigzag: -2,
            fixed: 5,
            sfixed: -1,
            small: -64,
        },
        &[
            0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, // plain
            0x10, 0x03, // zigzag
            0x1D, 0x05, 0x00, 0x00, 0x00, // fixed32
            0x21, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // sfixed64
            0x28, 0x7F, // sint32
        ],
    );
    test_roundtrip(
        &model,
        Encodings {
            plain: i32::MIN,
            zigzag: i64::MIN,
            fixed: u32::MAX,
            sfixed: i64::MAX,
            small: i16::MIN,
        },
    );
}

#[test]
fn unsigned_types_reject_zigzag() {
    #[derive(Default)]
    struct Counter {
        hits: u32,
    }
    proto_message!(Counter);

    let mut model = TypeModel::default();
    model.add_type::<Counter>().unwrap().use_default().field_with(
        1,
        "hits",
        FieldOptions::new().format(DataFormat::ZigZag),
        |c| &c.hits,
        |c| &mut c.hits,
    );
    let err = model.serialize(&Counter { hits: 1 }).unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)), "{}", err);
}

#[derive(Debug, PartialEq)]
struct Settings {
    retries: i32,
    name: String,
    ratio: f64,
    verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            retries: 0,
            name: String::new(),
            ratio: 0.0,
            verbose: false,
        }
    }
}

proto_message!(Settings);

fn settings_model(implicit_zero: bool) -> TypeModel {
    let mut model = TypeModel::default().implicit_zero_defaults(implicit_zero);
    model
        .add_type::<Settings>()
        .unwrap()
        .use_default()
        .field_with(
            1,
            "retries",
            FieldOptions::new().default_value(DefaultValue::Int(3)),
            |s| &s.retries,
            |s| &mut s.retries,
        )
        .field_with(
            2,
            "name",
            FieldOptions::new().default_value(DefaultValue::Str("guest".to_string())),
            |s| &s.name,
            |s| &mut s.name,
        )
        .field(3, "ratio", |s| &s.ratio, |s| &mut s.ratio)
        .field(4, "verbose", |s| &s.verbose, |s| &mut s.verbose);
    model
}

#[test]
fn explicit_defaults() {
    let model = settings_model(true);
    // absent members read back as their declared defaults
    let fresh: Settings = model.deserialize(&[]).unwrap();
    assert_eq!(
        fresh,
        Settings {
            retries: 3,
            name: "guest".to_string(),
            ratio: 0.0,
            verbose: false,
        }
    );
    assert_eq!(model.serialize(&fresh).unwrap(), Vec::<u8>::new());

    // a zero that differs from the declared default is written
    let zero = Settings::default();
    test_wire(&model, zero, &[0x08, 0x00, 0x12, 0x00]);
}

#[test]
fn implicit_zero_defaults_can_be_disabled() {
    let model = settings_model(false);
    let bytes = model
        .serialize(&Settings {
            retries: 3,
            name: "guest".to_string(),
            ratio: 0.0,
            verbose: false,
        })
        .unwrap();
    // explicit defaults are still omitted, zero values are not
    assert_eq!(bytes, vec![0x19, 0, 0, 0, 0, 0, 0, 0, 0, 0x20, 0x00]);
}

#[test]
fn required_members() {
    #[derive(Default, Debug, PartialEq)]
    struct Login {
        user: String,
        attempts: i32,
    }
    proto_message!(Login);

    let mut model = TypeModel::default();
    model
        .add_type::<Login>()
        .unwrap()
        .use_default()
        .field_with(
            1,
            "user",
            FieldOptions::new().required(),
            |l| &l.user,
            |l| &mut l.user,
        )
        .field(2, "attempts", |l| &l.attempts, |l| &mut l.attempts);

    // required members are written even when empty
    test_wire(&model, Login::default(), &[0x0A, 0x00]);

    let err = model.deserialize::<Login>(&[0x10, 0x01]).unwrap_err();
    match err {
        Error::SchemaMismatch(msg) => {
            assert!(msg.contains("user"), "{}", msg);
            assert!(msg.contains("Login"), "{}", msg);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn nullable_scalars_carry_presence() {
    #[derive(Default, Debug, PartialEq)]
    struct Patch {
        count: Option<i32>,
        label: Option<String>,
    }
    proto_message!(Patch);

    let mut model = TypeModel::default();
    model
        .add_type::<Patch>()
        .unwrap()
        .use_default()
        .field(1, "count", |p| &p.count, |p| &mut p.count)
        .field(2, "label", |p| &p.label, |p| &mut p.label);

    test_wire(&model, Patch::default(), &[]);
    test_wire(
        &model,
        Patch {
            count: Some(0),
            label: Some(String::new()),
        },
        &[0x08, 0x00, 0x12, 0x00],
    );
    test_wire(
        &model,
        Patch {
            count: Some(-3),
            label: None,
        },
        &[0x08, 0xFD, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01],
    );
}

#[test]
fn merge_overwrites_scalars_and_appends_lists() {
    #[derive(Default, Debug, PartialEq)]
    struct Bag {
        n: i32,
        items: Vec<i32>,
        data: Vec<u8>,
    }
    proto_message!(Bag);

    let mut model = TypeModel::default();
    model
        .add_type::<Bag>()
        .unwrap()
        .use_default()
        .field(1, "n", |b| &b.n, |b| &mut b.n)
        .field(2, "items", |b| &b.items, |b| &mut b.items)
        .field(3, "data", |b| &b.data, |b| &mut b.data);

    let mut bag = Bag {
        n: 1,
        items: vec![1],
        data: vec![1, 1],
    };
    let update = model
        .serialize(&Bag {
            n: 2,
            items: vec![2],
            data: vec![9],
        })
        .unwrap();
    model.merge(&update, &mut bag).unwrap();
    assert_eq!(
        bag,
        Bag {
            n: 2,
            items: vec![1, 2],
            data: vec![9],
        }
    );
}

static BEFORE_SERIALIZE: AtomicUsize = AtomicUsize::new(0);
static AFTER_SERIALIZE: AtomicUsize = AtomicUsize::new(0);

#[test]
fn lifecycle_hooks() {
    #[derive(Default, Debug, PartialEq)]
    struct Invoice {
        net: i64,
        tax: i64,
        total: i64,
    }
    proto_message!(Invoice);

    let mut model = TypeModel::default();
    model
        .add_type::<Invoice>()
        .unwrap()
        .use_default()
        .field(1, "net", |i| &i.net, |i| &mut i.net)
        .field(2, "tax", |i| &i.tax, |i| &mut i.tax)
        .before_serialize(|_| {
            BEFORE_SERIALIZE.fetch_add(1, Ordering::SeqCst);
        })
        .after_serialize(|_| {
            AFTER_SERIALIZE.fetch_add(1, Ordering::SeqCst);
        })
        .before_deserialize(|i| i.total = -1)
        .after_deserialize(|i| i.total = i.net + i.tax);

    let bytes = model
        .serialize(&Invoice {
            net: 100,
            tax: 20,
            total: 0,
        })
        .unwrap();
    assert_eq!(BEFORE_SERIALIZE.load(Ordering::SeqCst), 1);
    assert_eq!(AFTER_SERIALIZE.load(Ordering::SeqCst), 1);
    let invoice: Invoice = model.deserialize(&bytes).unwrap();
    assert_eq!(invoice.total, 120);
}
