//! Component arguments
//!
//! The named arguments a host passes when it mounts a machine component.
//! They are read once, at creation; changing them afterwards does not
//! recreate the actor.

use serde_json::Value;
use statechart_core::{ActorOptions, Implementations, StateValue};

/// Arguments consumed when a machine component is created
#[derive(Clone, Debug, Default)]
pub struct ComponentArgs {
    /// Action and guard implementations layered over the machine's own
    pub config: Option<Implementations>,
    /// Replaces the machine's starting context
    pub context: Option<Value>,
    /// One-time startup input
    pub input: Option<Value>,
    /// Resume from this state value instead of the initial state
    pub snapshot: Option<StateValue>,
}

impl ComponentArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, implementations: Implementations) -> Self {
        self.config = Some(implementations);
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn snapshot(mut self, value: impl Into<StateValue>) -> Self {
        self.snapshot = Some(value.into());
        self
    }

    /// Split into implementation overrides and actor options
    pub(crate) fn into_parts(self) -> (Option<Implementations>, ActorOptions) {
        let options = ActorOptions {
            id: None,
            input: self.input,
            context: self.context,
            snapshot: self.snapshot,
        };
        (self.config, options)
    }
}
