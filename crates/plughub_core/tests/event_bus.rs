use plughub_core::{handler, EventBus, HandlerResult, InvalidArgument};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn handler_added_during_emit_runs_only_on_next_emit() {
    let bus = EventBus::new();
    let late_calls = Rc::new(Cell::new(0u32));

    let counter = Rc::clone(&late_calls);
    bus.on("tick", move |bus, _args| {
        let counter = Rc::clone(&counter);
        bus.on("tick", move |_bus, _args| {
            counter.set(counter.get() + 1);
            Ok(())
        })?;
        Ok(())
    })
    .expect("subscribe");

    assert_eq!(bus.emit("tick", &[]).expect("first emit"), 1);
    assert_eq!(late_calls.get(), 0);
    assert_eq!(bus.handler_count("tick"), 2);

    // The original handler adds another late handler on every pass.
    assert_eq!(bus.emit("tick", &[]).expect("second emit"), 2);
    assert_eq!(late_calls.get(), 1);
    assert_eq!(bus.handler_count("tick"), 3);
}

#[test]
fn handler_removed_during_emit_still_runs_for_that_emit() {
    let bus = EventBus::new();
    let log = Rc::new(RefCell::new(Vec::<&'static str>::new()));

    let second_log = Rc::clone(&log);
    let second = handler(move |_bus, _args| {
        second_log.borrow_mut().push("second");
        Ok(())
    });

    let first_log = Rc::clone(&log);
    let victim = Rc::clone(&second);
    bus.on("tick", move |bus, _args| {
        first_log.borrow_mut().push("first");
        bus.unsubscribe_handler("tick", &victim);
        Ok(())
    })
    .expect("first");
    bus.subscribe("tick", second).expect("second");

    bus.emit("tick", &[]).expect("first emit");
    assert_eq!(*log.borrow(), vec!["first", "second"]);

    bus.emit("tick", &[]).expect("second emit");
    assert_eq!(*log.borrow(), vec!["first", "second", "first"]);
}

#[test]
fn nested_emit_from_handler_is_delivered_synchronously() {
    let bus = EventBus::new();
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    let outer_log = Rc::clone(&log);
    bus.on("request", move |bus, args| {
        outer_log.borrow_mut().push("request:start".to_string());
        bus.emit("response", args)?;
        outer_log.borrow_mut().push("request:end".to_string());
        Ok(())
    })
    .expect("request");

    let inner_log = Rc::clone(&log);
    bus.on("response", move |_bus, args| {
        inner_log.borrow_mut().push(format!("response:{}", args[0]));
        Ok(())
    })
    .expect("response");

    bus.emit("request", &[json!("ping")]).expect("emit");
    assert_eq!(
        *log.borrow(),
        vec![
            "request:start".to_string(),
            "response:\"ping\"".to_string(),
            "request:end".to_string(),
        ]
    );
}

#[test]
fn first_failing_handler_aborts_remaining_handlers() {
    let bus = EventBus::new();
    let log = Rc::new(RefCell::new(Vec::<&'static str>::new()));

    let a = Rc::clone(&log);
    bus.on("save", move |_bus, _args| {
        a.borrow_mut().push("a");
        Ok(())
    })
    .expect("a");
    let failing = bus
        .on("save", |_bus, _args| Err("disk full".into()))
        .expect("b");
    let c = Rc::clone(&log);
    bus.on("save", move |_bus, _args| {
        c.borrow_mut().push("c");
        Ok(())
    })
    .expect("c");

    let err = bus.emit("save", &[]).expect_err("emit must fail");
    assert_eq!(err.event, "save");
    assert_eq!(err.position, 1);
    assert_eq!(err.subscription_id, failing.id());
    assert_eq!(err.source.to_string(), "disk full");
    assert_eq!(*log.borrow(), vec!["a"]);
}

#[test]
fn handlers_share_identical_args() {
    let bus = EventBus::new();
    let seen = Rc::new(RefCell::new(Vec::<Vec<Value>>::new()));
    for _ in 0..3 {
        let seen = Rc::clone(&seen);
        bus.on("media:ended", move |_bus, args| -> HandlerResult {
            seen.borrow_mut().push(args.to_vec());
            Ok(())
        })
        .expect("subscribe");
    }

    let args = [json!("track-7"), json!({"position": 240})];
    bus.emit("media:ended", &args).expect("emit");
    assert_eq!(seen.borrow().len(), 3);
    assert!(seen.borrow().iter().all(|received| received == &args));
}

#[test]
fn unsubscribing_unknown_registration_is_noop() {
    let bus = EventBus::new();
    let handle = bus.on("tick", |_bus, _args| Ok(())).expect("subscribe");
    assert_eq!(bus.unsubscribe(&handle), 1);
    assert_eq!(bus.unsubscribe(&handle), 0);

    let never_registered = handler(|_bus, _args| Ok(()));
    assert_eq!(bus.unsubscribe_handler("tick", &never_registered), 0);
    assert_eq!(bus.unsubscribe_handler("no-such-event", &never_registered), 0);
}

#[test]
fn empty_event_name_is_invalid_argument() {
    let bus = EventBus::new();
    let err = bus
        .subscribe("", handler(|_bus, _args| Ok(())))
        .expect_err("empty event must fail");
    assert_eq!(err, InvalidArgument::EmptyEventName);
    assert!(bus.event_names().is_empty());
}
