//! Machine definitions
//!
//! A [`Machine`] is the immutable, compiled form of a [`MachineConfig`]. It is
//! cheap to clone and safe to share across any number of actors.
//!
//! Supports:
//! - Compound and parallel states
//! - Guards (named conditions over context and event)
//! - Entry/exit actions
//! - Transition actions
//! - Final states
//!
//! Actions and guards are referenced by name in the definition. Their
//! implementations are registered on the builder, and can be swapped per use
//! site with [`Machine::provide`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::config::{MachineConfig, StateConfig, StateKind, TransitionConfig};
use crate::error::{Result, StatechartError};
use crate::events::EventObject;
use crate::value::StateValue;

/// Index of a state node within its machine, in document order
pub type StateId = usize;

/// Active state nodes: the atomic states plus all of their ancestors
pub type Configuration = BTreeSet<StateId>;

/// An action mutating the context in response to an event
pub type Action = Arc<dyn Fn(&mut Value, &EventObject) + Send + Sync>;

/// A guard that determines if a transition should occur
pub type Guard = Arc<dyn Fn(&Value, &EventObject) -> bool + Send + Sync>;

/// Builds the starting context from the actor input
pub type ContextFactory = Arc<dyn Fn(Option<&Value>) -> Value + Send + Sync>;

const ROOT: StateId = 0;

// =========================================================================
// Implementations
// =========================================================================

/// Named action and guard implementations
#[derive(Clone, Default)]
pub struct Implementations {
    actions: FxHashMap<String, Action>,
    guards: FxHashMap<String, Guard>,
}

impl Implementations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action (builder pattern)
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut Value, &EventObject) + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    /// Register a guard (builder pattern)
    pub fn guard<F>(mut self, name: impl Into<String>, guard: F) -> Self
    where
        F: Fn(&Value, &EventObject) -> bool + Send + Sync + 'static,
    {
        self.guards.insert(name.into(), Arc::new(guard));
        self
    }

    /// Merge `other` into this set; entries in `other` win
    pub fn merge(&mut self, other: Implementations) {
        self.actions.extend(other.actions);
        self.guards.extend(other.guards);
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn has_guard(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    fn run_action(&self, name: &str, context: &mut Value, event: &EventObject) {
        match self.actions.get(name) {
            Some(action) => action(context, event),
            None => warn!("action `{}` has no implementation", name),
        }
    }

    fn check_guard(&self, name: &str, context: &Value, event: &EventObject) -> bool {
        match self.guards.get(name) {
            Some(guard) => guard(context, event),
            None => {
                warn!("guard `{}` has no implementation", name);
                false
            }
        }
    }
}

impl fmt::Debug for Implementations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        let mut guards: Vec<&str> = self.guards.keys().map(String::as_str).collect();
        actions.sort_unstable();
        guards.sort_unstable();
        f.debug_struct("Implementations")
            .field("actions", &actions)
            .field("guards", &guards)
            .finish()
    }
}

// =========================================================================
// Compiled graph
// =========================================================================

/// A compiled transition
#[derive(Clone, Debug)]
struct Transition {
    source: StateId,
    target: Option<StateId>,
    guard: Option<String>,
    actions: SmallVec<[String; 2]>,
}

#[derive(Clone, Debug)]
struct StateNode {
    key: String,
    /// Machine id followed by the keys from the root, joined with `.`
    id: String,
    path: Vec<String>,
    kind: StateKind,
    parent: Option<StateId>,
    children: Vec<StateId>,
    initial: Option<StateId>,
    on: IndexMap<String, SmallVec<[Transition; 1]>>,
    entry: Vec<String>,
    exit: Vec<String>,
    tags: Vec<String>,
}

impl StateNode {
    fn is_atomic(&self) -> bool {
        matches!(self.kind, StateKind::Atomic | StateKind::Final)
    }
}

#[derive(Clone)]
enum ContextInit {
    Static(Value),
    Factory(ContextFactory),
}

struct MachineInner {
    id: String,
    nodes: Arc<[StateNode]>,
    context: ContextInit,
    implementations: Implementations,
}

/// An immutable state machine definition
#[derive(Clone)]
pub struct Machine {
    inner: Arc<MachineInner>,
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.inner.id)
            .field("states", &self.inner.nodes.len())
            .field("implementations", &self.inner.implementations)
            .finish()
    }
}

impl Machine {
    /// Create a builder for a machine
    pub fn builder(id: impl Into<String>) -> MachineBuilder {
        MachineBuilder::new(id)
    }

    /// Compile a declarative configuration without any implementations
    pub fn from_config(config: MachineConfig) -> Result<Self> {
        MachineBuilder::from_config(config).build()
    }

    /// Load a machine from JSON
    pub fn from_json(src: &str) -> Result<Self> {
        let config: MachineConfig = serde_json::from_str(src)?;
        Self::from_config(config)
    }

    /// Load a machine from TOML
    pub fn from_toml(src: &str) -> Result<Self> {
        let config: MachineConfig = toml::from_str(src)?;
        Self::from_config(config)
    }

    fn compile(
        config: MachineConfig,
        context: Option<ContextInit>,
        implementations: Implementations,
    ) -> Result<Self> {
        let nodes = Compiler::compile(&config.id, &config.root)?;
        Ok(Self {
            inner: Arc::new(MachineInner {
                id: config.id,
                nodes: nodes.into(),
                context: context.unwrap_or_else(|| ContextInit::Static(Value::Object(Map::new()))),
                implementations,
            }),
        })
    }

    /// Return a copy of this machine with additional or replacement
    /// implementations. The state graph is shared with the original.
    pub fn provide(&self, implementations: Implementations) -> Self {
        let mut merged = self.inner.implementations.clone();
        merged.merge(implementations);
        Self {
            inner: Arc::new(MachineInner {
                id: self.inner.id.clone(),
                nodes: Arc::clone(&self.inner.nodes),
                context: self.inner.context.clone(),
                implementations: merged,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Ids of every state node, in document order
    pub fn state_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.nodes.iter().map(|node| node.id.as_str())
    }

    pub fn implementations(&self) -> &Implementations {
        &self.inner.implementations
    }

    /// The state value an actor starts in
    pub fn initial_value(&self) -> StateValue {
        self.state_value(&self.initial_configuration())
    }

    /// Check that every action and guard the definition names has an
    /// implementation
    pub fn validate(&self) -> Result<()> {
        let impls = &self.inner.implementations;
        for node in self.inner.nodes.iter() {
            for name in node.entry.iter().chain(&node.exit) {
                if !impls.has_action(name) {
                    return Err(self.invalid(format!(
                        "state `{}` references unknown action `{}`",
                        node.id, name
                    )));
                }
            }
            for (event, transitions) in &node.on {
                for transition in transitions {
                    if let Some(guard) = transition.guard.as_deref() {
                        if !impls.has_guard(guard) {
                            return Err(self.invalid(format!(
                                "transition `{}` on `{}` references unknown guard `{}`",
                                event, node.id, guard
                            )));
                        }
                    }
                    if let Some(action) = transition.actions.iter().find(|a| !impls.has_action(a)) {
                        return Err(self.invalid(format!(
                            "transition `{}` on `{}` references unknown action `{}`",
                            event, node.id, action
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> StatechartError {
        StatechartError::invalid(self.inner.id.clone(), reason)
    }

    fn node(&self, state: StateId) -> &StateNode {
        &self.inner.nodes[state]
    }

    fn is_descendant(&self, state: StateId, ancestor: StateId) -> bool {
        let mut current = self.node(state).parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).parent;
        }
        false
    }

    fn add_descendants(&self, state: StateId, into: &mut Configuration) {
        let node = self.node(state);
        match node.kind {
            StateKind::Compound => {
                if let Some(initial) = node.initial {
                    into.insert(initial);
                    self.add_descendants(initial, into);
                }
            }
            StateKind::Parallel => {
                for &child in &node.children {
                    into.insert(child);
                    self.add_descendants(child, into);
                }
            }
            StateKind::Atomic | StateKind::Final => {}
        }
    }

    fn child(&self, state: StateId, key: &str) -> std::result::Result<StateId, String> {
        let node = self.node(state);
        node.children
            .iter()
            .copied()
            .find(|&child| self.node(child).key == key)
            .ok_or_else(|| format!("`{}` has no child state `{}`", node.id, key))
    }

    // =====================================================================
    // Starting and resuming
    // =====================================================================

    pub(crate) fn initial_configuration(&self) -> Configuration {
        let mut configuration = BTreeSet::from([ROOT]);
        self.add_descendants(ROOT, &mut configuration);
        configuration
    }

    pub(crate) fn initial_context(&self, input: Option<&Value>) -> Value {
        match &self.inner.context {
            ContextInit::Static(context) => context.clone(),
            ContextInit::Factory(factory) => factory(input),
        }
    }

    /// Run the entry actions of a freshly started configuration
    pub(crate) fn enter(&self, configuration: &Configuration, context: &mut Value, event: &EventObject) {
        for &state in configuration {
            self.run_actions(&self.node(state).entry, context, event);
        }
    }

    /// Resolve a resume state value into a configuration
    ///
    /// Partial values are completed with initial children. Every state in the
    /// result must be reachable from the initial configuration.
    pub(crate) fn resolve_resume(&self, value: &StateValue) -> Result<Configuration> {
        let incompatible = |reason: String| StatechartError::IncompatibleResumeState {
            machine: self.inner.id.clone(),
            value: value.to_string(),
            reason,
        };

        let mut configuration = BTreeSet::from([ROOT]);
        self.resolve_into(ROOT, value, &mut configuration)
            .map_err(incompatible)?;

        let reachable = self.reachable_states();
        if let Some(&state) = configuration.iter().find(|&&state| !reachable[state]) {
            return Err(incompatible(format!(
                "state `{}` is not reachable",
                self.node(state).id
            )));
        }
        Ok(configuration)
    }

    fn resolve_into(
        &self,
        state: StateId,
        value: &StateValue,
        configuration: &mut Configuration,
    ) -> std::result::Result<(), String> {
        let node = self.node(state);
        match (node.kind, value) {
            (StateKind::Compound, StateValue::Leaf(key)) => {
                let child = self.child(state, key)?;
                configuration.insert(child);
                self.add_descendants(child, configuration);
                Ok(())
            }
            (StateKind::Compound, StateValue::Nested(children)) => {
                let mut iter = children.iter();
                match (iter.next(), iter.next()) {
                    (Some((key, child_value)), None) => {
                        let child = self.child(state, key)?;
                        configuration.insert(child);
                        self.resolve_into(child, child_value, configuration)
                    }
                    _ => Err(format!(
                        "compound state `{}` must have exactly one active child",
                        node.id
                    )),
                }
            }
            (StateKind::Parallel, StateValue::Nested(regions)) => {
                for (key, region_value) in regions {
                    let region = self.child(state, key)?;
                    configuration.insert(region);
                    self.resolve_into(region, region_value, configuration)?;
                }
                for &region in &node.children {
                    if configuration.insert(region) {
                        self.add_descendants(region, configuration);
                    }
                }
                Ok(())
            }
            (StateKind::Parallel, StateValue::Leaf(key)) => Err(format!(
                "parallel state `{}` needs a value per region, got `{}`",
                node.id, key
            )),
            (StateKind::Atomic | StateKind::Final, StateValue::Nested(children))
                if children.is_empty() =>
            {
                Ok(())
            }
            (StateKind::Atomic | StateKind::Final, _) => {
                Err(format!("state `{}` has no child states", node.id))
            }
        }
    }

    /// Every state that can become active, ignoring guards
    fn reachable_states(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.inner.nodes.len()];
        let mut queue: Vec<StateId> = self.initial_configuration().into_iter().collect();
        for &state in &queue {
            reachable[state] = true;
        }

        while let Some(state) = queue.pop() {
            for transition in self.node(state).on.values().flatten() {
                let Some(target) = transition.target else {
                    continue;
                };
                let domain = self.transition_domain(transition.source, target);
                for entered in self.entry_set(target, domain) {
                    if !reachable[entered] {
                        reachable[entered] = true;
                        queue.push(entered);
                    }
                }
            }
        }
        reachable
    }

    // =====================================================================
    // Transitions
    // =====================================================================

    /// Process one event
    ///
    /// Returns the new configuration and context, or `None` if no transition
    /// was enabled for the event.
    pub(crate) fn transition(
        &self,
        configuration: &Configuration,
        context: &Value,
        event: &EventObject,
    ) -> Option<(Configuration, Value)> {
        let selected = self.select_transitions(configuration, context, event);
        if selected.is_empty() {
            return None;
        }

        let mut configuration = configuration.clone();
        let mut context = context.clone();
        for transition in selected {
            // An earlier transition in this step exited the source
            if !configuration.contains(&transition.source) {
                continue;
            }
            self.microstep(transition, &mut configuration, &mut context, event);
        }
        Some((configuration, context))
    }

    fn select_transitions(
        &self,
        configuration: &Configuration,
        context: &Value,
        event: &EventObject,
    ) -> SmallVec<[&Transition; 2]> {
        let mut selected: SmallVec<[&Transition; 2]> = SmallVec::new();
        let atomic = configuration
            .iter()
            .copied()
            .filter(|&state| self.node(state).is_atomic());

        for leaf in atomic {
            let mut current = Some(leaf);
            'walk: while let Some(state) = current {
                let node = self.node(state);
                if let Some(candidates) = node.on.get(event.event_type()) {
                    for candidate in candidates {
                        if self.guard_passes(candidate, context, event) {
                            if !selected.iter().any(|t| std::ptr::eq(*t, candidate)) {
                                selected.push(candidate);
                            }
                            break 'walk;
                        }
                    }
                }
                current = node.parent;
            }
        }
        selected
    }

    fn guard_passes(&self, transition: &Transition, context: &Value, event: &EventObject) -> bool {
        match transition.guard.as_deref() {
            Some(guard) => self.inner.implementations.check_guard(guard, context, event),
            None => true,
        }
    }

    fn microstep(
        &self,
        transition: &Transition,
        configuration: &mut Configuration,
        context: &mut Value,
        event: &EventObject,
    ) {
        let Some(target) = transition.target else {
            self.run_actions(&transition.actions, context, event);
            return;
        };

        let domain = self.transition_domain(transition.source, target);

        // Exit deepest first
        let exiting: Vec<StateId> = configuration
            .iter()
            .rev()
            .copied()
            .filter(|&state| self.is_descendant(state, domain))
            .collect();
        for state in exiting {
            self.run_actions(&self.node(state).exit, context, event);
            configuration.remove(&state);
        }

        self.run_actions(&transition.actions, context, event);

        for state in self.entry_set(target, domain) {
            self.run_actions(&self.node(state).entry, context, event);
            configuration.insert(state);
        }

        trace!(
            "{}: {} --{}--> {}",
            self.inner.id,
            self.node(transition.source).id,
            event.event_type(),
            self.node(target).id
        );
    }

    /// The state whose descendants a transition exits and re-enters
    fn transition_domain(&self, source: StateId, target: StateId) -> StateId {
        if self.is_descendant(target, source) {
            return source;
        }
        let mut current = self.node(source).parent;
        while let Some(ancestor) = current {
            let node = self.node(ancestor);
            let is_compound = node.kind == StateKind::Compound || node.parent.is_none();
            if is_compound && self.is_descendant(target, ancestor) {
                return ancestor;
            }
            current = node.parent;
        }
        ROOT
    }

    /// States entered when moving to `target` below `domain`, in document order
    fn entry_set(&self, target: StateId, domain: StateId) -> Configuration {
        let mut chain = Vec::new();
        let mut current = Some(target);
        while let Some(state) = current {
            if state == domain {
                break;
            }
            chain.push(state);
            current = self.node(state).parent;
        }

        let mut entered: Configuration = chain.iter().copied().collect();
        self.add_descendants(target, &mut entered);

        // Sibling regions of any parallel ancestor start in their defaults
        for &ancestor in chain.iter().skip(1).chain(std::iter::once(&domain)) {
            let node = self.node(ancestor);
            if node.kind != StateKind::Parallel {
                continue;
            }
            for &region in &node.children {
                if entered.insert(region) {
                    self.add_descendants(region, &mut entered);
                }
            }
        }
        entered
    }

    fn run_actions(&self, actions: &[String], context: &mut Value, event: &EventObject) {
        for name in actions {
            self.inner.implementations.run_action(name, context, event);
        }
    }

    // =====================================================================
    // Reading a configuration
    // =====================================================================

    pub(crate) fn state_value(&self, configuration: &Configuration) -> StateValue {
        self.value_of(ROOT, configuration)
    }

    fn value_of(&self, state: StateId, configuration: &Configuration) -> StateValue {
        let node = self.node(state);
        match node.kind {
            StateKind::Compound => {
                let active = node
                    .children
                    .iter()
                    .copied()
                    .find(|child| configuration.contains(child));
                match active {
                    Some(child) if self.node(child).is_atomic() => {
                        StateValue::Leaf(self.node(child).key.clone())
                    }
                    Some(child) => [(
                        self.node(child).key.clone(),
                        self.value_of(child, configuration),
                    )]
                    .into_iter()
                    .collect(),
                    None => StateValue::Nested(IndexMap::new()),
                }
            }
            StateKind::Parallel => node
                .children
                .iter()
                .map(|&child| (self.node(child).key.clone(), self.value_of(child, configuration)))
                .collect(),
            StateKind::Atomic | StateKind::Final => StateValue::Nested(IndexMap::new()),
        }
    }

    pub(crate) fn tags(&self, configuration: &Configuration) -> BTreeSet<String> {
        configuration
            .iter()
            .flat_map(|&state| self.node(state).tags.iter().cloned())
            .collect()
    }

    /// True once the root has reached a final state
    pub(crate) fn is_done(&self, configuration: &Configuration) -> bool {
        self.in_final(ROOT, configuration)
    }

    fn in_final(&self, state: StateId, configuration: &Configuration) -> bool {
        let node = self.node(state);
        match node.kind {
            StateKind::Final => true,
            StateKind::Compound => node
                .children
                .iter()
                .any(|child| configuration.contains(child) && self.node(*child).kind == StateKind::Final),
            StateKind::Parallel => node
                .children
                .iter()
                .all(|&child| self.in_final(child, configuration)),
            StateKind::Atomic => false,
        }
    }
}

// =========================================================================
// Compiler
// =========================================================================

struct Compiler<'a> {
    machine: &'a str,
    nodes: Vec<StateNode>,
    by_path: FxHashMap<Vec<String>, StateId>,
    initials: Vec<(StateId, String)>,
    pending: Vec<(StateId, String, Vec<TransitionConfig>)>,
}

impl<'a> Compiler<'a> {
    fn compile(machine: &'a str, root: &StateConfig) -> Result<Vec<StateNode>> {
        if machine.is_empty() {
            return Err(StatechartError::invalid("<unnamed>", "machine id is empty"));
        }
        if root.states.is_empty() {
            return Err(StatechartError::invalid(machine, "machine has no states"));
        }

        let mut compiler = Compiler {
            machine,
            nodes: Vec::new(),
            by_path: FxHashMap::default(),
            initials: Vec::new(),
            pending: Vec::new(),
        };
        compiler.add_node(machine.to_string(), Vec::new(), None, root)?;
        compiler.resolve()?;
        Ok(compiler.nodes)
    }

    fn invalid(&self, reason: String) -> StatechartError {
        StatechartError::invalid(self.machine, reason)
    }

    fn add_node(
        &mut self,
        key: String,
        path: Vec<String>,
        parent: Option<StateId>,
        config: &StateConfig,
    ) -> Result<StateId> {
        let kind = config.resolved_kind();
        let id = std::iter::once(self.machine)
            .chain(path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(".");

        match kind {
            StateKind::Atomic | StateKind::Final if !config.states.is_empty() => {
                return Err(self.invalid(format!("{:?} state `{}` cannot have child states", kind, id)));
            }
            StateKind::Compound | StateKind::Parallel if config.states.is_empty() => {
                return Err(self.invalid(format!("{:?} state `{}` has no child states", kind, id)));
            }
            StateKind::Parallel if config.initial.is_some() => {
                return Err(self.invalid(format!("parallel state `{}` cannot declare an initial state", id)));
            }
            StateKind::Compound if config.initial.is_none() => {
                return Err(self.invalid(format!("compound state `{}` has no initial state", id)));
            }
            _ => {}
        }

        let state = self.nodes.len();
        self.nodes.push(StateNode {
            key,
            id,
            path: path.clone(),
            kind,
            parent,
            children: Vec::new(),
            initial: None,
            on: IndexMap::new(),
            entry: config.entry.clone(),
            exit: config.exit.clone(),
            tags: config.tags.clone(),
        });
        self.by_path.insert(path.clone(), state);

        if let Some(initial) = &config.initial {
            self.initials.push((state, initial.clone()));
        }
        for (event, transitions) in &config.on {
            self.pending.push((state, event.clone(), transitions.to_vec()));
        }

        for (child_key, child_config) in &config.states {
            if child_key.is_empty() || child_key.contains(|c: char| c == '.' || c == '#') {
                return Err(self.invalid(format!(
                    "state key `{}` under `{}` must be non-empty and free of `.` and `#`",
                    child_key, self.nodes[state].id
                )));
            }
            let mut child_path = path.clone();
            child_path.push(child_key.clone());
            let child = self.add_node(child_key.clone(), child_path, Some(state), child_config)?;
            self.nodes[state].children.push(child);
        }
        Ok(state)
    }

    fn resolve(&mut self) -> Result<()> {
        for (state, initial) in std::mem::take(&mut self.initials) {
            let child = self.nodes[state]
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child].key == initial)
                .ok_or_else(|| {
                    self.invalid(format!(
                        "initial state `{}` is not a child of `{}`",
                        initial, self.nodes[state].id
                    ))
                })?;
            self.nodes[state].initial = Some(child);
        }

        for (source, event, candidates) in std::mem::take(&mut self.pending) {
            if event.is_empty() {
                return Err(self.invalid(format!(
                    "state `{}` has a transition with an empty event name",
                    self.nodes[source].id
                )));
            }
            let mut compiled = SmallVec::new();
            for candidate in candidates {
                let target = match candidate.target.as_deref() {
                    Some(target) => Some(self.resolve_target(source, target)?),
                    None => None,
                };
                compiled.push(Transition {
                    source,
                    target,
                    guard: candidate.guard,
                    actions: candidate.actions.into_iter().collect(),
                });
            }
            self.nodes[source].on.insert(event, compiled);
        }
        Ok(())
    }

    fn resolve_target(&self, source: StateId, target: &str) -> Result<StateId> {
        let segments = |s: &str| -> Vec<String> {
            s.split('.')
                .filter(|segment| !segment.is_empty())
                .map(String::from)
                .collect()
        };

        let path = if let Some(absolute) = target.strip_prefix('#') {
            let mut path = segments(absolute);
            if path.first().map(String::as_str) == Some(self.machine) {
                path.remove(0);
            }
            path
        } else if let Some(relative) = target.strip_prefix('.') {
            let mut path = self.nodes[source].path.clone();
            path.extend(segments(relative));
            path
        } else {
            let mut path = match self.nodes[source].parent {
                Some(parent) => self.nodes[parent].path.clone(),
                None => Vec::new(),
            };
            path.extend(segments(target));
            path
        };

        self.by_path.get(&path).copied().ok_or_else(|| {
            self.invalid(format!(
                "transition target `{}` from `{}` does not exist",
                target, self.nodes[source].id
            ))
        })
    }
}

// =========================================================================
// Builder
// =========================================================================

/// Builder for creating machines in code
pub struct MachineBuilder {
    config: MachineConfig,
    context: Option<ContextInit>,
    implementations: Implementations,
}

impl MachineBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            config: MachineConfig::new(id),
            context: None,
            implementations: Implementations::default(),
        }
    }

    /// Start from an existing declarative configuration
    pub fn from_config(config: MachineConfig) -> Self {
        let context = config.context.clone().map(ContextInit::Static);
        Self {
            config,
            context,
            implementations: Implementations::default(),
        }
    }

    /// Set the root's initial state
    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.config = self.config.initial(key);
        self
    }

    /// Make the root a parallel state
    pub fn parallel(mut self) -> Self {
        self.config = self.config.parallel();
        self
    }

    /// Add a top-level state
    pub fn state(mut self, key: impl Into<String>, state: StateConfig) -> Self {
        self.config = self.config.state(key, state);
        self
    }

    /// Add a root-level transition
    pub fn on(mut self, event: impl Into<String>, transition: impl Into<TransitionConfig>) -> Self {
        self.config = self.config.on(event, transition);
        self
    }

    /// Set a static starting context
    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(ContextInit::Static(context));
        self
    }

    /// Derive the starting context from the actor input
    pub fn context_from_input<F>(mut self, factory: F) -> Self
    where
        F: Fn(Option<&Value>) -> Value + Send + Sync + 'static,
    {
        self.context = Some(ContextInit::Factory(Arc::new(factory)));
        self
    }

    /// Register an action implementation
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut Value, &EventObject) + Send + Sync + 'static,
    {
        self.implementations = self.implementations.action(name, action);
        self
    }

    /// Register a guard implementation
    pub fn guard<F>(mut self, name: impl Into<String>, guard: F) -> Self
    where
        F: Fn(&Value, &EventObject) -> bool + Send + Sync + 'static,
    {
        self.implementations = self.implementations.guard(name, guard);
        self
    }

    /// Compile the machine
    pub fn build(self) -> Result<Machine> {
        Machine::compile(self.config, self.context, self.implementations)
    }
}
