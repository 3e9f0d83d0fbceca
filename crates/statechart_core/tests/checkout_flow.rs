//! A hierarchical machine loaded from JSON, driven through an actor

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use statechart_core::{
    create_actor, event_types, ActorOptions, ActorStatus, EventObject, Implementations, Machine,
    StateValue, StatechartError,
};

const CHECKOUT: &str = r#"{
    "id": "checkout",
    "initial": "cart",
    "context": { "items": 0, "log": [] },
    "states": {
        "cart": {
            "entry": ["enter_cart"],
            "exit": ["exit_cart"],
            "on": {
                "ADD": { "actions": ["add_item"] },
                "CHECKOUT": [{ "target": "payment", "guard": "has_items" }]
            }
        },
        "payment": {
            "initial": "card",
            "entry": ["enter_payment"],
            "tags": ["busy"],
            "states": {
                "card": { "on": { "SWITCH": "paypal" } },
                "paypal": {}
            },
            "on": { "PAY": "done", "BACK": "cart" }
        },
        "done": { "type": "final" }
    }
}"#;

fn push_log(ctx: &mut Value, entry: &str) {
    if let Some(log) = ctx["log"].as_array_mut() {
        log.push(json!(entry));
    }
}

fn checkout() -> Machine {
    Machine::from_json(CHECKOUT).unwrap().provide(
        Implementations::new()
            .action("enter_cart", |ctx, _| push_log(ctx, "enter cart"))
            .action("exit_cart", |ctx, _| push_log(ctx, "exit cart"))
            .action("enter_payment", |ctx, _| push_log(ctx, "enter payment"))
            .action("add_item", |ctx, event| {
                let qty = event.get("qty").and_then(Value::as_u64).unwrap_or(1);
                ctx["items"] = json!(ctx["items"].as_u64().unwrap_or(0) + qty);
            })
            .guard("has_items", |ctx, _| ctx["items"].as_u64().unwrap_or(0) > 0),
    )
}

#[test]
fn test_checkout_walkthrough() {
    let actor = create_actor(&checkout(), ActorOptions::new()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    actor.subscribe(move |snapshot| {
        recorder
            .lock()
            .unwrap()
            .push(snapshot.event().event_type().to_string());
    });

    assert_eq!(actor.snapshot().event().event_type(), event_types::INIT);
    assert_eq!(actor.snapshot().context()["log"], json!(["enter cart"]));

    // guard blocks an empty checkout
    actor.send("CHECKOUT").unwrap();
    assert_eq!(actor.snapshot().value(), &StateValue::from("cart"));

    actor.send(EventObject::new("ADD").with("qty", json!(2))).unwrap();
    assert_eq!(actor.snapshot().context()["items"], json!(2));
    assert_eq!(actor.snapshot().value(), &StateValue::from("cart"));

    actor.send("CHECKOUT").unwrap();
    let snapshot = actor.snapshot();
    assert_eq!(snapshot.value(), &StateValue::from_path("payment.card"));
    assert!(snapshot.has_tag("busy"));
    assert_eq!(
        snapshot.context()["log"],
        json!(["enter cart", "exit cart", "enter payment"])
    );

    actor.send("SWITCH").unwrap();
    assert!(actor.snapshot().matches("payment.paypal"));

    actor.send("PAY").unwrap();
    assert_eq!(actor.status(), ActorStatus::Done);
    assert!(!actor.snapshot().has_tag("busy"));

    // finished actors ignore events without failing
    actor.send("BACK").unwrap();
    assert_eq!(actor.snapshot().value(), &StateValue::from("done"));

    assert_eq!(*seen.lock().unwrap(), vec!["ADD", "CHECKOUT", "SWITCH", "PAY"]);

    actor.stop();
    assert!(matches!(
        actor.send("BACK"),
        Err(StatechartError::ActorNotRunning { .. })
    ));
}

#[test]
fn test_resume_skips_entry_actions() {
    let actor = create_actor(
        &checkout(),
        ActorOptions::new()
            .snapshot(StateValue::from_path("payment.paypal"))
            .context(json!({ "items": 5, "log": [] })),
    )
    .unwrap();

    assert_eq!(actor.snapshot().value(), &StateValue::from_path("payment.paypal"));
    assert_eq!(actor.snapshot().context()["log"], json!([]));

    actor.send("BACK").unwrap();
    assert_eq!(actor.snapshot().value(), &StateValue::from("cart"));
    assert_eq!(actor.snapshot().context()["log"], json!(["enter cart"]));
}

#[test]
fn test_missing_implementation_is_rejected() {
    let machine = Machine::from_json(CHECKOUT).unwrap();
    let err = create_actor(&machine, ActorOptions::new()).unwrap_err();
    assert!(matches!(err, StatechartError::InvalidDefinition { .. }));
}
