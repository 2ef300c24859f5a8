//! Scheduler integration tests
//!
//! The externally observable contracts: non-blocking spawn, round-robin
//! fairness, promise settlement, and the `all()` combinator.

use std::cell::RefCell;
use std::rc::Rc;

use kestrel::runtime::error::RuntimeError;
use kestrel::runtime::scheduler::{Promise, Scheduler, TaskStep};
use kestrel::runtime::value::Value;

#[test]
fn three_yielding_tasks_settle_with_their_own_values() {
    let mut scheduler = Scheduler::new();
    let slices = Rc::new(RefCell::new(Vec::new()));

    let mut promises = Vec::new();
    for name in ["t1", "t2", "t3"] {
        let log = slices.clone();
        let mut yielded = false;
        promises.push(scheduler.spawn_task(Box::new(move || {
            log.borrow_mut().push(name);
            if yielded {
                Ok(TaskStep::Done(Value::string(name)))
            } else {
                yielded = true;
                Ok(TaskStep::Yield)
            }
        })));
    }

    // One tick: each ready task ran exactly once.
    scheduler.run_one_iteration();
    assert_eq!(*slices.borrow(), vec!["t1", "t2", "t3"]);

    scheduler.run_until_complete();
    for (promise, name) in promises.iter().zip(["t1", "t2", "t3"]) {
        assert!(promise.is_fulfilled());
        assert!(promise.result().unwrap().equals(&Value::string(name)));
    }
}

#[test]
fn all_combinator_first_rejection_wins() {
    let mut scheduler = Scheduler::new();

    // p_ok needs several ticks; p_fail rejects on the first one.
    let mut remaining = 5;
    let p_ok = scheduler.spawn_task(Box::new(move || {
        if remaining > 0 {
            remaining -= 1;
            Ok(TaskStep::Yield)
        } else {
            Ok(TaskStep::Done(Value::int(1)))
        }
    }));
    let p_fail = scheduler.spawn_task(Box::new(|| {
        Err(RuntimeError::Value("p_fail exploded".to_string()))
    }));

    let combined = scheduler.all(&[p_ok.clone(), p_fail]);
    assert!(combined.is_rejected());
    assert!(combined.error_message().unwrap().contains("p_fail exploded"));
    // The rejection won even though p_ok would eventually resolve.
    scheduler.run_until_complete();
    assert!(p_ok.is_fulfilled());
}

#[test]
fn all_combinator_preserves_input_order() {
    let mut scheduler = Scheduler::new();

    let mut remaining = 3;
    let slow = scheduler.spawn_task(Box::new(move || {
        if remaining > 0 {
            remaining -= 1;
            Ok(TaskStep::Yield)
        } else {
            Ok(TaskStep::Done(Value::string("slow")))
        }
    }));
    let fast = scheduler.spawn_task(Box::new(|| Ok(TaskStep::Done(Value::string("fast")))));

    let combined = scheduler.all(&[slow, fast]);
    assert_eq!(combined.result().unwrap().to_string(), "[slow, fast]");
}

#[test]
fn await_promise_returns_none_when_nothing_can_settle_it() {
    let mut scheduler = Scheduler::new();
    let orphan = Promise::new();
    // Give-up-gracefully policy: none, not an error.
    let result = scheduler.await_promise(&orphan).unwrap();
    assert!(matches!(result, Value::None));
}

#[test]
fn promise_values_participate_in_the_object_model() {
    let promise = Promise::resolved(Value::int(5));
    let value = Value::Promise(promise);
    assert!(value.is_truthy());
    assert_eq!(value.to_string(), "Promise{FULFILLED: 5}");
}

#[test]
fn failed_task_rejection_carries_the_error_taxonomy() {
    let mut scheduler = Scheduler::new();
    let promise = scheduler.spawn_task(Box::new(|| {
        Value::int(1).divide(&Value::int(0)).map(TaskStep::Done)
    }));
    scheduler.run_until_complete();

    assert!(promise.is_rejected());
    let message = promise.error_message().unwrap();
    assert!(message.starts_with("ZeroDivisionError"));

    let err = scheduler.await_promise(&promise).unwrap_err();
    assert!(err.to_string().contains("Promise rejected"));
}
