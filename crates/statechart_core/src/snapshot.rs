//! Snapshots
//!
//! A snapshot is the immutable, point-in-time view an actor publishes on
//! start and after every event that changed it. Actors hand snapshots out as
//! `Arc<Snapshot>`; nothing mutates one after publication.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::events::{event_types, EventObject};
use crate::value::StateValue;

/// Lifecycle status of an actor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorStatus {
    /// Started and accepting events
    Active,
    /// Reached a top-level final state; further events are ignored
    Done,
    /// Stopped by its owner; sending events is an error
    Stopped,
}

/// Point-in-time view of an actor
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    value: StateValue,
    context: Value,
    status: ActorStatus,
    tags: BTreeSet<String>,
    /// The event that produced this snapshot
    event: EventObject,
}

impl Snapshot {
    pub(crate) fn new(
        value: StateValue,
        context: Value,
        status: ActorStatus,
        tags: BTreeSet<String>,
        event: EventObject,
    ) -> Self {
        Self {
            value,
            context,
            status,
            tags,
            event,
        }
    }

    /// Copy of this snapshot marking the actor as stopped
    pub(crate) fn stopped(&self) -> Self {
        Self {
            status: ActorStatus::Stopped,
            event: EventObject::new(event_types::STOP),
            ..self.clone()
        }
    }

    /// The state value: a string for flat machines, nested for hierarchical ones
    pub fn value(&self) -> &StateValue {
        &self.value
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn status(&self) -> ActorStatus {
        self.status
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn event(&self) -> &EventObject {
        &self.event
    }

    /// Check whether the actor is in the state named by a dot path
    pub fn matches(&self, path: &str) -> bool {
        self.value.matches(path)
    }

    /// Check whether any active state carries `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}
