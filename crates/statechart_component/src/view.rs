//! Rendered view model
//!
//! What a template sees for a mounted machine: the projected state plus the
//! event dispatch facade.

use std::sync::Arc;

use statechart_core::{Actor, EventObject, Result, Snapshot, StateValue, Subscription};

use crate::projection::{project, Projection};

/// Template-facing view of a machine component
///
/// Built from the actor's latest snapshot at the time it is requested.
#[derive(Clone, Debug)]
pub struct MachineView {
    projection: Projection,
    actor: Actor,
}

impl MachineView {
    pub(crate) fn new(actor: &Actor) -> Self {
        Self {
            projection: project(&actor.snapshot()),
            actor: actor.clone(),
        }
    }

    /// Raw state value
    pub fn value(&self) -> &StateValue {
        &self.projection.value
    }

    /// State value as a dot-separated path, e.g. `"a.b.c"`
    pub fn state_path(&self) -> &str {
        &self.projection.state_path
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.projection.snapshot
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Forward an event to the actor
    ///
    /// `"GO"` and `EventObject::new("GO")` are the same event.
    pub fn send(&self, event: impl Into<EventObject>) -> Result<()> {
        self.actor.send(event)
    }

    /// Cloneable send handle, for wiring into event handlers
    pub fn sender(&self) -> Sender {
        Sender {
            actor: self.actor.clone(),
        }
    }

    /// Register a transition callback on the actor
    ///
    /// Callbacks run on every snapshot change, in registration order.
    pub fn on_transition<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.actor.subscribe(callback)
    }

    /// The running actor, for advanced use
    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}

/// Dispatch-only handle to a component's actor
#[derive(Clone, Debug)]
pub struct Sender {
    actor: Actor,
}

impl Sender {
    pub fn send(&self, event: impl Into<EventObject>) -> Result<()> {
        self.actor.send(event)
    }
}
