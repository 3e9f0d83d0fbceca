//! Declarative machine configuration
//!
//! Machines can be described in code with the builder methods below, or
//! loaded from JSON/TOML. Both routes produce the same [`MachineConfig`],
//! which [`Machine`](crate::machine::Machine) compiles and validates.
//!
//! ```toml
//! id = "toggle"
//! initial = "inactive"
//!
//! [states.inactive.on]
//! TOGGLE = "active"
//!
//! [states.active.on]
//! TOGGLE = "inactive"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a state node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    /// No children
    Atomic,
    /// Exactly one child active at a time
    Compound,
    /// Every child region active at once
    Parallel,
    /// Terminal state; entering a top-level final state finishes the actor
    Final,
}

/// Top-level machine configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub id: String,
    /// Static starting context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// The root state node
    #[serde(flatten)]
    pub root: StateConfig,
}

impl MachineConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context: None,
            root: StateConfig::default(),
        }
    }

    /// Set the static starting context
    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the root's initial state
    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.root = self.root.initial(key);
        self
    }

    /// Make the root a parallel state
    pub fn parallel(mut self) -> Self {
        self.root = self.root.kind(StateKind::Parallel);
        self
    }

    /// Add a top-level state
    pub fn state(mut self, key: impl Into<String>, state: StateConfig) -> Self {
        self.root = self.root.state(key, state);
        self
    }

    /// Add a root-level transition, available from every state
    pub fn on(mut self, event: impl Into<String>, transition: impl Into<TransitionConfig>) -> Self {
        self.root = self.root.on(event, transition);
        self
    }
}

/// Configuration of a single state node
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    /// Explicit kind; inferred from `states` when absent
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<StateKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub states: IndexMap<String, StateConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub on: IndexMap<String, TransitionsConfig>,
    /// Named actions run when the state is entered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<String>,
    /// Named actions run when the state is exited
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exit: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl StateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A final state
    pub fn final_state() -> Self {
        Self::default().kind(StateKind::Final)
    }

    pub fn kind(mut self, kind: StateKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.initial = Some(key.into());
        self
    }

    /// Add a child state
    pub fn state(mut self, key: impl Into<String>, state: StateConfig) -> Self {
        self.states.insert(key.into(), state);
        self
    }

    /// Add a transition candidate for `event`
    ///
    /// Calling this more than once for the same event appends candidates; the
    /// first one whose guard passes is taken.
    pub fn on(mut self, event: impl Into<String>, transition: impl Into<TransitionConfig>) -> Self {
        let event = event.into();
        let mut candidates = self
            .on
            .get(&event)
            .map(TransitionsConfig::to_vec)
            .unwrap_or_default();
        candidates.push(transition.into());
        self.on.insert(event, TransitionsConfig::Many(candidates));
        self
    }

    pub fn entry(mut self, action: impl Into<String>) -> Self {
        self.entry.push(action.into());
        self
    }

    pub fn exit(mut self, action: impl Into<String>) -> Self {
        self.exit.push(action.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Kind as declared, or inferred from the presence of children
    pub fn resolved_kind(&self) -> StateKind {
        match self.kind {
            Some(kind) => kind,
            None if self.states.is_empty() => StateKind::Atomic,
            None => StateKind::Compound,
        }
    }
}

/// Transition candidates for one event
///
/// Accepts the shorthand forms `"target"`, `{ target, guard, actions }` and a
/// list of the latter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransitionsConfig {
    Target(String),
    Many(Vec<TransitionConfig>),
    One(TransitionConfig),
}

impl TransitionsConfig {
    /// Normalize into the candidate list
    pub fn into_vec(self) -> Vec<TransitionConfig> {
        match self {
            TransitionsConfig::Target(target) => vec![TransitionConfig::to(target)],
            TransitionsConfig::One(transition) => vec![transition],
            TransitionsConfig::Many(transitions) => transitions,
        }
    }

    pub fn to_vec(&self) -> Vec<TransitionConfig> {
        self.clone().into_vec()
    }
}

/// A single transition candidate
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
}

impl TransitionConfig {
    /// Transition to `target`
    ///
    /// Targets are sibling keys (`"running"`), descendants of the source
    /// (`".child"`), or absolute paths from the root (`"#machine.a.b"`).
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Transition without a target: runs its actions and stays put
    pub fn internal() -> Self {
        Self::default()
    }

    /// Only take this transition when the named guard passes
    pub fn guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    /// Add a named action
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }
}

impl From<&str> for TransitionConfig {
    fn from(target: &str) -> Self {
        TransitionConfig::to(target)
    }
}

impl From<String> for TransitionConfig {
    fn from(target: String) -> Self {
        TransitionConfig::to(target)
    }
}
