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

use protograph::{
    proto_message, CodecKind, DataFormat, DefaultValue, Error, FieldOptions, MemberConfig,
    PlanState, ScalarKind, TypeConfigSource, TypeKey, TypeModel, ValueShape, WireType,
};

#[derive(Default, Debug, PartialEq)]
struct Account {
    id: u32,
    owner: String,
    balance: Option<i64>,
    history: Vec<i32>,
}

proto_message!(Account);

#[test]
fn plan_describes_every_field() {
    let mut model = TypeModel::default();
    assert!(!model.is_registered::<Account>());
    model
        .add_type::<Account>()
        .unwrap()
        .use_default()
        .field_with(
            1,
            "id",
            FieldOptions::new().required(),
            |a| &a.id,
            |a| &mut a.id,
        )
        .field_with(
            2,
            "owner",
            FieldOptions::new().default_value(DefaultValue::Str("bank".to_string())),
            |a| &a.owner,
            |a| &mut a.owner,
        )
        .field_with(
            3,
            "balance",
            FieldOptions::new().format(DataFormat::ZigZag),
            |a| &a.balance,
            |a| &mut a.balance,
        )
        .field_with(
            4,
            "history",
            FieldOptions::new().packed(),
            |a| &a.history,
            |a| &mut a.history,
        );
    assert!(model.is_registered::<Account>());
    assert_eq!(model.plan_state::<Account>(), Some(PlanState::Unbuilt));
    assert_eq!(model.build_count::<Account>(), 0);

    let plan = model.plan::<Account>().unwrap();
    assert_eq!(model.plan_state::<Account>(), Some(PlanState::Built));
    assert_eq!(plan.key(), &TypeKey::of::<Account>());
    assert!(plan.base().is_none());
    assert!(plan.subtypes().is_empty());
    assert!(plan.has_constructor());
    assert_eq!(plan.field_count(), 4);
    let tags: Vec<u32> = plan.fields().map(|f| f.tag()).collect();
    assert_eq!(tags, vec![1, 2, 3, 4]);

    let id = plan.field(1).unwrap();
    assert_eq!(id.name(), "id");
    assert!(id.is_required());
    assert_eq!(id.wire_type(), WireType::Varint);
    assert_eq!(id.codec(), CodecKind::Scalar);

    let owner = plan.field(2).unwrap();
    assert_eq!(owner.wire_type(), WireType::LengthDelimited);
    assert_eq!(
        owner.default_value(),
        Some(&DefaultValue::Str("bank".to_string()))
    );

    let balance = plan.field(3).unwrap();
    assert_eq!(balance.codec(), CodecKind::Nullable);
    assert_eq!(balance.data_format(), DataFormat::ZigZag);
    assert_eq!(balance.wire_type(), WireType::SignedVarint);
    assert_eq!(
        balance.item_shape(),
        Some(&ValueShape::Scalar(ScalarKind::Int64))
    );

    let history = plan.field(4).unwrap();
    assert!(history.is_packed());
    assert_eq!(history.codec(), CodecKind::List);
    assert_eq!(history.wire_type(), WireType::Varint);
    assert!(plan.field(5).is_none());

    // later lookups reuse the same plan
    model.prepare::<Account>().unwrap();
    model.compile_all().unwrap();
    assert_eq!(model.build_count::<Account>(), 1);
}

#[test]
fn defaults_apply_to_new_instances() {
    let mut model = TypeModel::default();
    model
        .add_type::<Account>()
        .unwrap()
        .use_default()
        .field(1, "id", |a| &a.id, |a| &mut a.id)
        .field_with(
            2,
            "owner",
            FieldOptions::new().default_value(DefaultValue::Str("bank".to_string())),
            |a| &a.owner,
            |a| &mut a.owner,
        );
    let account: Account = model.deserialize(&[0x08, 0x03]).unwrap();
    assert_eq!(account.id, 3);
    assert_eq!(account.owner, "bank");
    let bytes = model.serialize(&account).unwrap();
    assert_eq!(bytes, vec![0x08, 0x03]);
}

fn register_with<F>(configure: F) -> Result<(), Error>
where
    F: FnOnce(protograph::MetaType<'_, Account>) -> protograph::MetaType<'_, Account>,
{
    let mut model = TypeModel::default();
    configure(model.add_type::<Account>()?.use_default());
    model.prepare::<Account>()
}

#[test]
fn invalid_field_declarations() {
    let cases = [
        register_with(|t| t.field(0, "id", |a| &a.id, |a| &mut a.id)),
        register_with(|t| t.field(19500, "id", |a| &a.id, |a| &mut a.id)),
        register_with(|t| t.field(1 << 29, "id", |a| &a.id, |a| &mut a.id)),
        register_with(|t| {
            t.field(1, "id", |a| &a.id, |a| &mut a.id)
                .field(1, "owner", |a| &a.owner, |a| &mut a.owner)
        }),
        register_with(|t| {
            t.field_with(
                2,
                "owner",
                FieldOptions::new().format(DataFormat::ZigZag),
                |a| &a.owner,
                |a| &mut a.owner,
            )
        }),
        register_with(|t| {
            t.field_with(
                1,
                "id",
                FieldOptions::new().format(DataFormat::ZigZag),
                |a| &a.id,
                |a| &mut a.id,
            )
        }),
        register_with(|t| {
            t.field_with(
                1,
                "id",
                FieldOptions::new().default_value(DefaultValue::Str("one".to_string())),
                |a| &a.id,
                |a| &mut a.id,
            )
        }),
        register_with(|t| {
            t.field_with(
                1,
                "id",
                FieldOptions::new().packed(),
                |a| &a.id,
                |a| &mut a.id,
            )
        }),
    ];
    for (i, case) in cases.into_iter().enumerate() {
        assert!(
            matches!(case, Err(Error::NotAllowed(_))),
            "case {} gave {:?}",
            i,
            case
        );
    }
    // the boundaries are fine
    register_with(|t| t.field(18999, "id", |a| &a.id, |a| &mut a.id)).unwrap();
    register_with(|t| t.field(20000, "id", |a| &a.id, |a| &mut a.id)).unwrap();
    register_with(|t| t.field((1 << 29) - 1, "id", |a| &a.id, |a| &mut a.id)).unwrap();
}

#[test]
fn failed_build_is_retried() {
    let mut model = TypeModel::default();
    model
        .add_type::<Account>()
        .unwrap()
        .use_default()
        .field(0, "id", |a| &a.id, |a| &mut a.id);
    assert!(model.serialize(&Account::default()).is_err());
    assert_eq!(model.plan_state::<Account>(), Some(PlanState::Unbuilt));
    assert_eq!(model.build_count::<Account>(), 0);
    assert!(matches!(model.compile_all(), Err(Error::NotAllowed(_))));
}

#[test]
fn unregistered_and_duplicate_types() {
    let mut model = TypeModel::default();
    assert_eq!(model.plan_state::<Account>(), None);
    assert!(matches!(model.plan::<Account>(), Err(Error::NotAllowed(_))));
    assert!(model.serialize(&Account::default()).is_err());
    assert!(model.deserialize::<Account>(&[]).is_err());

    model.add_type::<Account>().unwrap().use_default();
    assert!(matches!(model.add_type::<Account>(), Err(Error::NotAllowed(_))));
}

#[test]
fn missing_constructor() {
    struct Handle {
        fd: i32,
    }
    proto_message!(Handle);

    let mut model = TypeModel::default();
    model
        .add_type::<Handle>()
        .unwrap()
        .field(1, "fd", |h| &h.fd, |h| &mut h.fd);
    assert!(!model.plan::<Handle>().unwrap().has_constructor());
    // writing needs no constructor
    assert_eq!(model.serialize(&Handle { fd: 3 }).unwrap(), vec![0x08, 0x03]);
    let err = model.deserialize::<Handle>(&[0x08, 0x03]).map(|_| ()).unwrap_err();
    assert!(matches!(err, Error::Construction(_)), "{}", err);
    assert!(err.to_string().contains("Handle"));
}

#[test]
fn nesting_depth_is_bounded() {
    #[derive(Default, Debug, PartialEq)]
    struct Node {
        value: i32,
        next: Option<Box<Node>>,
    }
    proto_message!(Node);

    fn register(model: &mut TypeModel) {
        model
            .add_type::<Node>()
            .unwrap()
            .use_default()
            .field(1, "value", |n| &n.value, |n| &mut n.value)
            .field(2, "next", |n| &n.next, |n| &mut n.next);
    }
    fn chain(len: i32) -> Node {
        let mut node = Node {
            value: len,
            next: None,
        };
        for value in (0..len).rev() {
            node = Node {
                value,
                next: Some(Box::new(node)),
            };
        }
        node
    }

    let mut shallow = TypeModel::new().max_depth(16);
    register(&mut shallow);
    let mut deep = TypeModel::default();
    register(&mut deep);

    let short = chain(5);
    assert_eq!(shallow.deep_clone(&short).unwrap(), short);

    let long = chain(30);
    assert!(matches!(
        shallow.serialize(&long),
        Err(Error::DepthExceed(_))
    ));
    let bytes = deep.serialize(&long).unwrap();
    assert_eq!(deep.deserialize::<Node>(&bytes).unwrap(), long);
    assert!(matches!(
        shallow.deserialize::<Node>(&bytes),
        Err(Error::DepthExceed(_))
    ));
}

#[test]
fn members_from_a_config_source() {
    struct AccountSchema;

    impl TypeConfigSource for AccountSchema {
        fn members(&self) -> Result<Vec<MemberConfig>, Error> {
            Ok(vec![
                MemberConfig::new::<Account, String>(
                    2,
                    "owner",
                    FieldOptions::new(),
                    |a| &a.owner,
                    |a| &mut a.owner,
                ),
                MemberConfig::new::<Account, Vec<i32>>(
                    4,
                    "history",
                    FieldOptions::new().packed(),
                    |a| &a.history,
                    |a| &mut a.history,
                ),
            ])
        }
    }

    let mut model = TypeModel::default();
    model
        .add_type_with_source::<Account>(AccountSchema)
        .unwrap()
        .use_default()
        .field(1, "id", |a| &a.id, |a| &mut a.id);
    let plan = model.plan::<Account>().unwrap();
    let names: Vec<&str> = plan.fields().map(|f| f.name()).collect();
    assert_eq!(names, vec!["id", "owner", "history"]);

    let account = Account {
        id: 1,
        owner: "x".to_string(),
        balance: Some(9),
        history: vec![1, 2],
    };
    let bytes = model.serialize(&account).unwrap();
    assert_eq!(
        bytes,
        vec![0x08, 0x01, 0x12, 0x01, b'x', 0x22, 0x02, 0x01, 0x02]
    );
    let back: Account = model.deserialize(&bytes).unwrap();
    assert_eq!(back.balance, None);
    assert_eq!(back.history, vec![1, 2]);
}

#[test]
fn failing_config_source() {
    let mut model = TypeModel::default();
    model
        .add_type_with_source::<Account>(|| -> Result<Vec<MemberConfig>, Error> {
            Err(Error::invalid_state("schema store unavailable"))
        })
        .unwrap()
        .use_default();
    assert!(matches!(
        model.prepare::<Account>(),
        Err(Error::InvalidState(_))
    ));
    assert_eq!(model.plan_state::<Account>(), Some(PlanState::Unbuilt));
}

#[test]
fn member_of_another_type_is_rejected() {
    #[derive(Default)]
    struct Other {
        id: u32,
    }
    proto_message!(Other);

    let mut model = TypeModel::default();
    model
        .add_type_with_source::<Account>(|| -> Result<Vec<MemberConfig>, Error> {
            Ok(vec![MemberConfig::new::<Other, u32>(
                1,
                "id",
                FieldOptions::new(),
                |o| &o.id,
                |o| &mut o.id,
            )])
        })
        .unwrap()
        .use_default();
    assert!(matches!(
        model.prepare::<Account>(),
        Err(Error::NotAllowed(_))
    ));
}
