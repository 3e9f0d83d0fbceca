//! Actor runtime
//!
//! An [`Actor`] is a running instance of a [`Machine`]. It is created already
//! started by [`create_actor`], processes events one at a time, and publishes
//! a new [`Snapshot`] to its observers whenever an event changes its state
//! value or context.
//!
//! Events sent from inside an observer are queued and processed once the
//! current notification round completes, so observers always see snapshots in
//! the order transitions happened.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{Result, StatechartError};
use crate::events::{event_types, EventObject};
use crate::machine::{Configuration, Implementations, Machine};
use crate::snapshot::{ActorStatus, Snapshot};
use crate::value::StateValue;

/// Observer called with every published snapshot
pub type Observer = Arc<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

type ObserverId = u64;

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(0);

// =========================================================================
// Options
// =========================================================================

/// Options for [`create_actor`]
#[derive(Clone, Debug, Default)]
pub struct ActorOptions {
    /// Name used in logs; generated from the machine id when absent
    pub id: Option<String>,
    /// Data passed once at start, immutable thereafter
    pub input: Option<Value>,
    /// Replaces the machine's starting context
    pub context: Option<Value>,
    /// Resume from this state value instead of the initial state
    pub snapshot: Option<StateValue>,
}

impl ActorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn snapshot(mut self, value: impl Into<StateValue>) -> Self {
        self.snapshot = Some(value.into());
        self
    }
}

// =========================================================================
// Actor logic
// =========================================================================

/// Anything that can spawn actors
///
/// [`Machine`] is the stock implementation. Wrapping types can implement this
/// to be registered separately, e.g. when two versions of a machine library
/// live in one process.
pub trait ActorLogic: Send + Sync + 'static {
    /// Identifier used in logs and errors
    fn logic_id(&self) -> &str;

    /// Copy of this logic with additional or replacement implementations
    fn provide(&self, implementations: Implementations) -> Self
    where
        Self: Sized;

    /// Create and start an actor
    fn create_actor(&self, options: ActorOptions) -> Result<Actor>;
}

impl ActorLogic for Machine {
    fn logic_id(&self) -> &str {
        self.id()
    }

    fn provide(&self, implementations: Implementations) -> Self {
        Machine::provide(self, implementations)
    }

    fn create_actor(&self, options: ActorOptions) -> Result<Actor> {
        create_actor(self, options)
    }
}

/// Create an actor for `machine` and start it
///
/// The returned actor has already entered its starting state and published
/// its first snapshot. Fails with `InvalidDefinition` when the machine
/// references actions or guards without implementations, and with
/// `IncompatibleResumeState` when `options.snapshot` does not name a
/// reachable state.
pub fn create_actor(machine: &Machine, options: ActorOptions) -> Result<Actor> {
    machine.validate()?;

    let ActorOptions {
        id,
        input,
        context,
        snapshot,
    } = options;
    let id = id.unwrap_or_else(|| {
        format!(
            "{}:{}",
            machine.id(),
            NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed)
        )
    });

    let event = EventObject::new(event_types::INIT);
    let (configuration, context) = match snapshot {
        // Resumed actors do not rerun entry actions
        Some(value) => {
            let configuration = machine.resolve_resume(&value)?;
            let context = context.unwrap_or_else(|| machine.initial_context(input.as_ref()));
            (configuration, context)
        }
        None => {
            let configuration = machine.initial_configuration();
            let mut context = context.unwrap_or_else(|| machine.initial_context(input.as_ref()));
            machine.enter(&configuration, &mut context, &event);
            (configuration, context)
        }
    };

    let status = if machine.is_done(&configuration) {
        ActorStatus::Done
    } else {
        ActorStatus::Active
    };
    let snapshot = Snapshot::new(
        machine.state_value(&configuration),
        context,
        status,
        machine.tags(&configuration),
        event,
    );
    debug!("actor `{}` started in `{}`", id, snapshot.value());

    Ok(Actor {
        shared: Arc::new(ActorShared {
            id,
            machine: machine.clone(),
            input,
            next_observer: AtomicU64::new(0),
            state: Mutex::new(ActorState {
                status,
                configuration,
                snapshot: Arc::new(snapshot),
                observers: Vec::new(),
                mailbox: VecDeque::new(),
                processing: false,
            }),
        }),
    })
}

// =========================================================================
// Actor
// =========================================================================

struct ActorState {
    status: ActorStatus,
    configuration: Configuration,
    snapshot: Arc<Snapshot>,
    observers: Vec<(ObserverId, Observer)>,
    mailbox: VecDeque<EventObject>,
    processing: bool,
}

struct ActorShared {
    id: String,
    machine: Machine,
    input: Option<Value>,
    next_observer: AtomicU64,
    state: Mutex<ActorState>,
}

impl ActorShared {
    fn lock(&self) -> MutexGuard<'_, ActorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the mailbox if an action or observer panics mid-drain
struct DrainGuard<'a> {
    shared: &'a ActorShared,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let mut state = self.shared.lock();
        let dropped = state.mailbox.len();
        state.mailbox.clear();
        state.processing = false;
        warn!(
            "actor `{}` panicked while processing; dropped {} queued event(s)",
            self.shared.id, dropped
        );
    }
}

/// Handle to a running actor
///
/// Handles are cheap to clone; every clone drives the same actor.
#[derive(Clone)]
pub struct Actor {
    shared: Arc<ActorShared>,
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.shared.id)
            .field("machine", &self.shared.machine.id())
            .field("status", &self.status())
            .finish()
    }
}

impl Actor {
    fn lock(&self) -> MutexGuard<'_, ActorState> {
        self.shared.lock()
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn machine(&self) -> &Machine {
        &self.shared.machine
    }

    /// The input the actor was started with
    pub fn input(&self) -> Option<&Value> {
        self.shared.input.as_ref()
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.lock().snapshot)
    }

    pub fn status(&self) -> ActorStatus {
        self.lock().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == ActorStatus::Active
    }

    /// Send an event to the actor
    ///
    /// Accepts an [`EventObject`] or a bare event name. The event is
    /// processed before this returns, unless it was sent from inside an
    /// observer, in which case it runs right after the current notification
    /// round. Events sent to a finished actor are ignored; events sent to a
    /// stopped actor fail with `ActorNotRunning`. Event types starting with
    /// `statechart.` are reserved and fail with `ReservedEvent`.
    pub fn send(&self, event: impl Into<EventObject>) -> Result<()> {
        let event = event.into();
        if event.is_internal() {
            return Err(StatechartError::ReservedEvent {
                event: event.event_type().to_string(),
            });
        }
        {
            let mut state = self.lock();
            match state.status {
                ActorStatus::Stopped => {
                    return Err(StatechartError::ActorNotRunning {
                        actor: self.shared.id.clone(),
                    });
                }
                ActorStatus::Done => {
                    warn!(
                        "actor `{}` is done; ignoring event `{}`",
                        self.shared.id,
                        event.event_type()
                    );
                    return Ok(());
                }
                ActorStatus::Active => {}
            }

            state.mailbox.push_back(event);
            if state.processing {
                return Ok(());
            }
            state.processing = true;
        }

        self.drain();
        Ok(())
    }

    /// Process queued events until the mailbox is empty
    fn drain(&self) {
        let _unwind = DrainGuard {
            shared: &self.shared,
        };
        loop {
            let (snapshot, observers) = {
                let mut state = self.lock();
                let Some(event) = state.mailbox.pop_front() else {
                    state.processing = false;
                    return;
                };
                if state.status != ActorStatus::Active {
                    state.mailbox.clear();
                    state.processing = false;
                    return;
                }
                let Some(snapshot) = self.process(&mut state, event) else {
                    continue;
                };
                let observers: Vec<(ObserverId, Observer)> = state
                    .observers
                    .iter()
                    .map(|(id, observer)| (*id, Arc::clone(observer)))
                    .collect();
                (snapshot, observers)
            };

            // Observers may stop the actor or unsubscribe one another
            for (id, observer) in observers {
                if self.is_subscribed(id) {
                    observer(&snapshot);
                }
            }
        }
    }

    fn process(&self, state: &mut ActorState, event: EventObject) -> Option<Arc<Snapshot>> {
        let machine = &self.shared.machine;
        let Some((configuration, context)) =
            machine.transition(&state.configuration, state.snapshot.context(), &event)
        else {
            trace!(
                "actor `{}` has no transition for `{}` in `{}`",
                self.shared.id,
                event.event_type(),
                state.snapshot.value()
            );
            return None;
        };

        let value = machine.state_value(&configuration);
        let changed = value != *state.snapshot.value() || context != *state.snapshot.context();
        let tags = machine.tags(&configuration);
        let done = machine.is_done(&configuration);
        state.configuration = configuration;
        if !changed {
            return None;
        }

        state.status = if done {
            debug!("actor `{}` reached a final state", self.shared.id);
            ActorStatus::Done
        } else {
            ActorStatus::Active
        };
        trace!(
            "actor `{}` processed `{}` -> `{}`",
            self.shared.id,
            event.event_type(),
            value
        );
        state.snapshot = Arc::new(Snapshot::new(value, context, state.status, tags, event));
        Some(Arc::clone(&state.snapshot))
    }

    fn is_subscribed(&self, id: ObserverId) -> bool {
        self.lock().observers.iter().any(|(observer, _)| *observer == id)
    }

    /// Observe every snapshot published from now on
    ///
    /// Subscribing to a stopped actor yields an inactive subscription.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        let id = self.shared.next_observer.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();
        if state.status == ActorStatus::Stopped {
            debug!("subscribe on stopped actor `{}` ignored", self.shared.id);
        } else {
            state.observers.push((id, Arc::new(observer)));
        }
        Subscription {
            actor: Arc::downgrade(&self.shared),
            id,
        }
    }

    /// Number of live observers
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// Stop the actor
    ///
    /// Drops every observer and pending event. No snapshot is published after
    /// this returns. Stopping twice is a no-op.
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.status == ActorStatus::Stopped {
            return;
        }
        state.status = ActorStatus::Stopped;
        state.observers.clear();
        state.mailbox.clear();
        state.snapshot = Arc::new(state.snapshot.stopped());
        debug!(
            "actor `{}` stopped in `{}`",
            self.shared.id,
            state.snapshot.value()
        );
    }
}

// =========================================================================
// Subscription
// =========================================================================

/// Handle returned by [`Actor::subscribe`]
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    actor: Weak<ActorShared>,
    id: ObserverId,
}

impl Subscription {
    /// Detach the observer. Safe to call more than once, and after the actor
    /// has stopped.
    pub fn unsubscribe(&self) {
        if let Some(shared) = self.actor.upgrade() {
            shared
                .lock()
                .observers
                .retain(|(observer, _)| *observer != self.id);
        }
    }

    /// True while the observer is still attached
    pub fn is_active(&self) -> bool {
        self.actor.upgrade().is_some_and(|shared| {
            shared
                .lock()
                .observers
                .iter()
                .any(|(observer, _)| *observer == self.id)
        })
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StateConfig, TransitionConfig};
    use serde_json::json;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    fn traffic_light() -> Machine {
        Machine::builder("light")
            .initial("green")
            .state("green", StateConfig::new().on("TIMER", "yellow"))
            .state("yellow", StateConfig::new().on("TIMER", "red"))
            .state("red", StateConfig::new().on("TIMER", "green"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_actor_starts_synchronously() {
        let actor = create_actor(&traffic_light(), ActorOptions::new()).unwrap();
        assert!(actor.is_running());
        assert_eq!(actor.snapshot().value(), &StateValue::from("green"));
        assert_eq!(actor.snapshot().event().event_type(), event_types::INIT);
    }

    #[test]
    fn test_observers_see_transitions_in_order() {
        let actor = create_actor(&traffic_light(), ActorOptions::new()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        actor.subscribe(move |snapshot| {
            seen_clone.lock().unwrap().push(snapshot.value().state_path());
        });

        actor.send("TIMER").unwrap();
        actor.send("IGNORED").unwrap();
        actor.send("TIMER").unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["yellow", "red"]);
    }

    #[test]
    fn test_context_changes_notify_without_state_change() {
        let machine = Machine::builder("counter")
            .initial("active")
            .context(json!({ "count": 0 }))
            .action("increment", |ctx, _| {
                let count = ctx["count"].as_i64().unwrap_or(0);
                ctx["count"] = json!(count + 1);
            })
            .state(
                "active",
                StateConfig::new().on("INC", TransitionConfig::internal().action("increment")),
            )
            .build()
            .unwrap();
        let actor = create_actor(&machine, ActorOptions::new()).unwrap();
        let notified = Arc::new(AtomicU64::new(0));
        let notified_clone = notified.clone();
        actor.subscribe(move |_| {
            notified_clone.fetch_add(1, Ordering::SeqCst);
        });

        actor.send("INC").unwrap();
        actor.send("INC").unwrap();

        assert_eq!(notified.load(Ordering::SeqCst), 2);
        assert_eq!(actor.snapshot().context()["count"], json!(2));
    }

    #[test]
    fn test_input_seeds_context_and_override_replaces_it() {
        let machine = Machine::builder("greeter")
            .initial("idle")
            .context_from_input(|input| json!({ "name": input.and_then(|i| i.get("name")).cloned() }))
            .state("idle", StateConfig::new())
            .build()
            .unwrap();

        let from_input =
            create_actor(&machine, ActorOptions::new().input(json!({ "name": "ada" }))).unwrap();
        assert_eq!(from_input.snapshot().context(), &json!({ "name": "ada" }));
        assert_eq!(from_input.input(), Some(&json!({ "name": "ada" })));

        let overridden = create_actor(
            &machine,
            ActorOptions::new()
                .input(json!({ "name": "ada" }))
                .context(json!({ "name": "grace" })),
        )
        .unwrap();
        assert_eq!(overridden.snapshot().context(), &json!({ "name": "grace" }));
    }

    #[test]
    fn test_resume_from_state_value() {
        let actor =
            create_actor(&traffic_light(), ActorOptions::new().snapshot("red")).unwrap();
        assert_eq!(actor.snapshot().value(), &StateValue::from("red"));

        actor.send("TIMER").unwrap();
        assert_eq!(actor.snapshot().value(), &StateValue::from("green"));
    }

    #[test]
    fn test_resume_to_unknown_state_fails() {
        let result = create_actor(&traffic_light(), ActorOptions::new().snapshot("blue"));
        assert!(matches!(
            result,
            Err(StatechartError::IncompatibleResumeState { .. })
        ));
    }

    #[test]
    fn test_missing_implementation_fails_creation() {
        let machine = Machine::builder("lazy")
            .initial("a")
            .state("a", StateConfig::new().entry("greet"))
            .build()
            .unwrap();
        let result = create_actor(&machine, ActorOptions::new());
        assert!(matches!(
            result,
            Err(StatechartError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_stop_silences_observers_and_rejects_events() {
        let actor = create_actor(&traffic_light(), ActorOptions::new()).unwrap();
        let notified = Arc::new(AtomicU64::new(0));
        let notified_clone = notified.clone();
        let subscription = actor.subscribe(move |_| {
            notified_clone.fetch_add(1, Ordering::SeqCst);
        });

        actor.stop();
        actor.stop();

        assert!(!subscription.is_active());
        assert_eq!(actor.status(), ActorStatus::Stopped);
        assert!(matches!(
            actor.send("TIMER"),
            Err(StatechartError::ActorNotRunning { .. })
        ));
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_inside_observer_skips_remaining_observers() {
        let actor = create_actor(&traffic_light(), ActorOptions::new()).unwrap();
        let handle = actor.clone();
        actor.subscribe(move |_| handle.stop());
        let notified = Arc::new(AtomicU64::new(0));
        let notified_clone = notified.clone();
        actor.subscribe(move |_| {
            notified_clone.fetch_add(1, Ordering::SeqCst);
        });

        actor.send("TIMER").unwrap();

        assert_eq!(notified.load(Ordering::SeqCst), 0);
        assert_eq!(actor.status(), ActorStatus::Stopped);
        assert!(matches!(
            actor.send("TIMER"),
            Err(StatechartError::ActorNotRunning { .. })
        ));
    }

    #[test]
    fn test_panicking_observer_does_not_wedge_actor() {
        let actor = create_actor(&traffic_light(), ActorOptions::new()).unwrap();
        let fail_once = Arc::new(AtomicBool::new(true));
        let fail_clone = fail_once.clone();
        actor.subscribe(move |_| {
            if fail_clone.swap(false, Ordering::SeqCst) {
                panic!("observer failed");
            }
        });

        let result = panic::catch_unwind(AssertUnwindSafe(|| actor.send("TIMER")));
        assert!(result.is_err());
        assert_eq!(actor.snapshot().value(), &StateValue::from("yellow"));

        actor.send("TIMER").unwrap();
        assert_eq!(actor.snapshot().value(), &StateValue::from("red"));
        assert!(actor.is_running());
    }

    #[test]
    fn test_panicking_action_keeps_previous_state() {
        let machine = Machine::builder("fragile")
            .initial("a")
            .state(
                "a",
                StateConfig::new()
                    .on("BREAK", TransitionConfig::to("b").action("explode"))
                    .on("GO", "b"),
            )
            .state("b", StateConfig::new())
            .action("explode", |_, _| panic!("action failed"))
            .build()
            .unwrap();
        let actor = create_actor(&machine, ActorOptions::new()).unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| actor.send("BREAK")));
        assert!(result.is_err());
        assert_eq!(actor.snapshot().value(), &StateValue::from("a"));

        actor.send("GO").unwrap();
        assert_eq!(actor.snapshot().value(), &StateValue::from("b"));
    }

    #[test]
    fn test_reserved_events_are_rejected() {
        let actor = create_actor(&traffic_light(), ActorOptions::new()).unwrap();

        assert!(matches!(
            actor.send(event_types::STOP),
            Err(StatechartError::ReservedEvent { .. })
        ));
        assert!(actor.is_running());
        assert_eq!(actor.snapshot().value(), &StateValue::from("green"));
    }

    #[test]
    fn test_events_sent_from_observers_are_queued() {
        let actor = create_actor(&traffic_light(), ActorOptions::new()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handle = actor.clone();
        actor.subscribe(move |snapshot| {
            if snapshot.matches("yellow") {
                handle.send("TIMER").unwrap();
            }
        });
        let seen_clone = seen.clone();
        actor.subscribe(move |snapshot| {
            seen_clone.lock().unwrap().push(snapshot.value().state_path());
        });

        actor.send("TIMER").unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["yellow", "red"]);
        assert_eq!(actor.snapshot().value(), &StateValue::from("red"));
    }

    #[test]
    fn test_final_state_finishes_actor() {
        let machine = Machine::builder("job")
            .initial("running")
            .state("running", StateConfig::new().on("FINISH", "complete"))
            .state("complete", StateConfig::final_state())
            .build()
            .unwrap();
        let actor = create_actor(&machine, ActorOptions::new()).unwrap();

        actor.send("FINISH").unwrap();
        assert_eq!(actor.status(), ActorStatus::Done);

        // Ignored, not an error
        assert!(actor.send("FINISH").is_ok());
    }

    #[test]
    fn test_unsubscribe() {
        let actor = create_actor(&traffic_light(), ActorOptions::new()).unwrap();
        let subscription = actor.subscribe(|_| {});
        assert_eq!(actor.observer_count(), 1);

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert_eq!(actor.observer_count(), 0);
    }
}
