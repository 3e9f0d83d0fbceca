//! Event objects
//!
//! Every input an actor processes is an [`EventObject`]: a `type` name plus
//! an optional JSON payload. Bare strings normalize to payload-free events,
//! so `"GO"` and `EventObject::new("GO")` are the same input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event types raised by the runtime itself
pub mod event_types {
    /// Carried by the snapshot an actor publishes when it starts
    pub const INIT: &str = "statechart.init";
    /// Carried by the snapshot left behind when an actor is stopped
    pub const STOP: &str = "statechart.stop";
}

/// A structured event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventObject {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(flatten, default)]
    payload: Map<String, Value>,
}

impl EventObject {
    /// Create an event without payload
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The event name transitions are keyed on
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Get a payload field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub(crate) fn is_internal(&self) -> bool {
        self.event_type.starts_with("statechart.")
    }
}

impl From<&str> for EventObject {
    fn from(event_type: &str) -> Self {
        EventObject::new(event_type)
    }
}

impl From<String> for EventObject {
    fn from(event_type: String) -> Self {
        EventObject::new(event_type)
    }
}

impl From<&String> for EventObject {
    fn from(event_type: &String) -> Self {
        EventObject::new(event_type.as_str())
    }
}

impl From<&EventObject> for EventObject {
    fn from(event: &EventObject) -> Self {
        event.clone()
    }
}
