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
    proto_message, Error, FieldOptions, LockContention, MemberConfig, PlanState, TypeModel,
};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default, Debug, PartialEq, Clone)]
struct Order {
    id: i64,
    items: Vec<String>,
    total: f64,
}

#[derive(Default, Debug, PartialEq)]
struct Slow {
    value: i32,
}

proto_message!(Order, Slow);

fn order_model() -> TypeModel {
    let mut model = TypeModel::default();
    model
        .add_type::<Order>()
        .unwrap()
        .use_default()
        .field(1, "id", |o| &o.id, |o| &mut o.id)
        .field(2, "items", |o| &o.items, |o| &mut o.items)
        .field(3, "total", |o| &o.total, |o| &mut o.total);
    model
}

/// Registers `Slow` with a source that takes `delay` to answer.
fn add_slow(model: &mut TypeModel, delay: Duration) {
    model
        .add_type_with_source::<Slow>(move || -> Result<Vec<MemberConfig>, Error> {
            thread::sleep(delay);
            Ok(vec![MemberConfig::new::<Slow, i32>(
                1,
                "value",
                FieldOptions::new(),
                |s| &s.value,
                |s| &mut s.value,
            )])
        })
        .unwrap()
        .use_default();
}

fn record_contention(model: &mut TypeModel) -> Arc<Mutex<Vec<LockContention>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    model.on_lock_contention(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

#[test]
fn concurrent_first_use_builds_once() {
    let mut model = order_model();
    let events = record_contention(&mut model);
    let model = Arc::new(model);
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let model = Arc::clone(&model);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..200 {
                    let order = Order {
                        id: t * 1000 + i,
                        items: vec![format!("item-{}", i)],
                        total: i as f64 * 0.5,
                    };
                    let bytes = model.serialize(&order).unwrap();
                    assert_eq!(model.deserialize::<Order>(&bytes).unwrap(), order);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(model.build_count::<Order>(), 1);
    assert_eq!(model.plan_state::<Order>(), Some(PlanState::Built));
    assert!(events.lock().unwrap().iter().all(|e| !e.timed_out));
}

#[test]
fn separate_models_do_not_contend() {
    let mut first = TypeModel::default();
    add_slow(&mut first, Duration::from_millis(200));
    let first_events = record_contention(&mut first);
    let mut second = TypeModel::default();
    add_slow(&mut second, Duration::from_millis(200));
    let second_events = record_contention(&mut second);

    let (first, second) = (Arc::new(first), Arc::new(second));
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [Arc::clone(&first), Arc::clone(&second)]
        .into_iter()
        .map(|model| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                model.prepare::<Slow>().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(first_events.lock().unwrap().is_empty());
    assert!(second_events.lock().unwrap().is_empty());
    assert_eq!(first.build_count::<Slow>(), 1);
    assert_eq!(second.build_count::<Slow>(), 1);
}

#[test]
fn repeated_races_share_one_plan_per_model() {
    const THREADS: usize = 20;
    for trial in 0..100 {
        let mut first = order_model();
        let first_events = record_contention(&mut first);
        let mut second = order_model();
        let second_events = record_contention(&mut second);
        let (first_id, second_id) = (first.id(), second.id());
        assert_ne!(first_id, second_id);

        let barrier = Barrier::new(THREADS);
        let plans: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let model = if t % 2 == 0 { &first } else { &second };
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        (t % 2, model.plan::<Order>().unwrap())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for side in 0..2 {
            let mut same_side = plans.iter().filter(|(s, _)| *s == side).map(|(_, p)| p);
            let leader = same_side.next().unwrap();
            assert!(
                same_side.all(|plan| Arc::ptr_eq(leader, plan)),
                "trial {} saw two plans for one model",
                trial
            );
        }
        let (first_plan, second_plan) = (&plans[0].1, &plans[1].1);
        assert!(!Arc::ptr_eq(first_plan, second_plan));
        assert_eq!(first.build_count::<Order>(), 1, "trial {}", trial);
        assert_eq!(second.build_count::<Order>(), 1, "trial {}", trial);

        for (events, own_id) in [(&first_events, first_id), (&second_events, second_id)] {
            let events = events.lock().unwrap();
            assert!(events.iter().all(|e| !e.timed_out), "trial {}", trial);
            assert!(events.iter().all(|e| e.model_id == own_id), "trial {}", trial);
        }
    }
}

#[test]
fn waiting_for_another_builder_is_reported() {
    let mut model = order_model();
    add_slow(&mut model, Duration::from_millis(300));
    let events = record_contention(&mut model);
    let model = Arc::new(model);

    let builder = {
        let model = Arc::clone(&model);
        thread::spawn(move || model.prepare::<Slow>())
    };
    thread::sleep(Duration::from_millis(50));
    // other plans are not held up by the slow build
    assert_eq!(
        model.deserialize::<Order>(&[0x08, 0x01]).unwrap().id,
        1
    );
    let value: Slow = model.deserialize(&[0x08, 0x05]).unwrap();
    assert_eq!(value.value, 5);
    builder.join().unwrap().unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert!(!event.timed_out);
    assert!(event.owner.is_some());
    assert_eq!(event.model_id, model.id());
    assert_eq!(event.type_name, std::any::type_name::<Slow>());
    assert_eq!(model.build_count::<Slow>(), 1);
}

#[test]
fn waiting_too_long_times_out() {
    let mut model = TypeModel::new().lock_timeout(Duration::from_millis(50));
    add_slow(&mut model, Duration::from_secs(1));
    let events = record_contention(&mut model);
    let model = Arc::new(model);

    let builder = {
        let model = Arc::clone(&model);
        thread::Builder::new()
            .name("plan-builder".to_string())
            .spawn(move || model.prepare::<Slow>())
            .unwrap()
    };
    thread::sleep(Duration::from_millis(100));
    assert_eq!(model.plan_state::<Slow>(), Some(PlanState::Building));
    let err = model.serialize(&Slow { value: 1 }).unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "{}", err);

    builder.join().unwrap().unwrap();
    {
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].timed_out);
        assert!(events[0]
            .owner
            .as_deref()
            .is_some_and(|owner| owner.contains("plan-builder")));
    }

    // the plan is usable once the builder is done
    assert_eq!(model.serialize(&Slow { value: 1 }).unwrap(), vec![0x08, 0x01]);
    assert_eq!(model.build_count::<Slow>(), 1);
    assert_eq!(model.plan_state::<Slow>(), Some(PlanState::Built));
}
