//! Snapshot projection
//!
//! Turns an actor snapshot into the fields templates read.

use std::sync::Arc;

use statechart_core::{Snapshot, StateValue};

/// Renderable form of a snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    /// The raw state value
    pub value: StateValue,
    /// The state value as a dot-separated string
    pub state_path: String,
    /// The snapshot itself, unchanged
    pub snapshot: Arc<Snapshot>,
}

/// Project a snapshot. Pure and total.
pub fn project(snapshot: &Arc<Snapshot>) -> Projection {
    let value = snapshot.value().clone();
    let state_path = value.state_path();
    Projection {
        value,
        state_path,
        snapshot: Arc::clone(snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statechart_core::{create_actor, ActorOptions, Machine, StateConfig};

    #[test]
    fn test_scalar_value_projects_unchanged() {
        let machine = Machine::builder("flat")
            .initial("idle")
            .state("idle", StateConfig::new())
            .build()
            .unwrap();
        let actor = create_actor(&machine, ActorOptions::new()).unwrap();
        let snapshot = actor.snapshot();

        let projection = project(&snapshot);
        assert_eq!(projection.value, StateValue::from("idle"));
        assert_eq!(projection.state_path, "idle");
        assert!(Arc::ptr_eq(&projection.snapshot, &snapshot));
    }

    #[test]
    fn test_nested_value_flattens() {
        let machine = Machine::builder("nested")
            .initial("a")
            .state(
                "a",
                StateConfig::new().initial("b").state(
                    "b",
                    StateConfig::new().initial("c").state("c", StateConfig::new()),
                ),
            )
            .build()
            .unwrap();
        let actor = create_actor(&machine, ActorOptions::new()).unwrap();

        let projection = project(&actor.snapshot());
        assert_eq!(projection.value, StateValue::from_path("a.b.c"));
        assert_eq!(projection.state_path, "a.b.c");
    }
}
