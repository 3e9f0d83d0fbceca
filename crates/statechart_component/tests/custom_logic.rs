//! Setting up with an alternate logic type
//!
//! Lives in its own test binary because setup is once per process.

use serde_json::Value;
use statechart_component::prelude::*;
use statechart_component::setup_component_machines_with;
use statechart_core::{Actor, ActorLogic, ActorOptions};

/// A machine from a second copy of the library
struct VersionedMachine(Machine);

impl ActorLogic for VersionedMachine {
    fn logic_id(&self) -> &str {
        self.0.id()
    }

    fn provide(&self, implementations: Implementations) -> Self {
        VersionedMachine(self.0.provide(implementations))
    }

    fn create_actor(&self, options: ActorOptions) -> statechart_core::Result<Actor> {
        let options = match options.input {
            Some(_) => options,
            None => ActorOptions {
                input: Some(Value::from("v2")),
                ..options
            },
        };
        self.0.create_actor(options)
    }
}

#[test]
fn test_first_setup_wins() {
    assert!(setup_component_machines_with::<VersionedMachine>());
    assert!(!setup_component_machines());
    assert!(!setup_component_machines_with::<VersionedMachine>());

    let machine = Machine::builder("door")
        .initial("closed")
        .state("closed", StateConfig::new().on("OPEN", "open"))
        .state("open", StateConfig::new())
        .build()
        .unwrap();

    let mut host = ComponentHost::new();
    assert!(matches!(
        host.mount(&machine, ComponentArgs::new()),
        Err(ComponentError::NoComponentManager { .. })
    ));

    let id = host
        .mount(&VersionedMachine(machine), ComponentArgs::new())
        .unwrap();
    let component = host.component(id).unwrap();
    assert_eq!(component.actor().input(), Some(&Value::from("v2")));

    host.send(id, "OPEN").unwrap();
    assert_eq!(host.view(id).unwrap().state_path(), "open");
}
