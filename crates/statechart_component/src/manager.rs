//! Statechart component manager
//!
//! Implements the host lifecycle contract for statechart logic: creating a
//! component starts an actor, destroying it stops the actor.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use statechart_core::{
    Actor, ActorLogic, EventObject, Machine, Result, Snapshot, Subscription,
};
use tracing::debug;

use crate::args::ComponentArgs;
use crate::error::ComponentError;
use crate::lifecycle::{ComponentLifecycle, Phase};
use crate::render::{Invalidator, RenderTrigger};
use crate::view::MachineView;

/// Component manager for values of logic type `L`
pub struct StatechartManager<L = Machine> {
    _logic: PhantomData<fn() -> L>,
}

impl<L> StatechartManager<L> {
    pub fn new() -> Self {
        Self {
            _logic: PhantomData,
        }
    }
}

impl<L> Default for StatechartManager<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> fmt::Debug for StatechartManager<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatechartManager")
            .field("logic", &std::any::type_name::<L>())
            .finish()
    }
}

impl<L: ActorLogic> ComponentLifecycle for StatechartManager<L> {
    type Definition = L;
    type Component = MachineComponent;

    fn on_create(
        &self,
        logic: &L,
        args: ComponentArgs,
        invalidator: Invalidator,
    ) -> std::result::Result<MachineComponent, ComponentError> {
        MachineComponent::create(logic, args, invalidator)
    }

    fn on_destroy(&self, component: &mut MachineComponent) {
        component.destroy();
    }
}

/// One mounted statechart component
///
/// Owns its actor exclusively; dropping the component destroys it.
pub struct MachineComponent {
    phase: Phase,
    actor: Actor,
    trigger: Option<RenderTrigger>,
    invalidator: Invalidator,
}

impl MachineComponent {
    /// Start an actor for `logic` and attach it to `invalidator`
    ///
    /// `args.config` is layered over the logic's own implementations before
    /// the actor is created. Any failure leaves no actor behind.
    pub fn create<L: ActorLogic>(
        logic: &L,
        args: ComponentArgs,
        invalidator: Invalidator,
    ) -> std::result::Result<Self, ComponentError> {
        let (config, options) = args.into_parts();
        let actor = match config {
            Some(implementations) => logic.provide(implementations).create_actor(options)?,
            None => logic.create_actor(options)?,
        };

        let mut component = Self {
            phase: Phase::Uninitialized,
            actor,
            trigger: None,
            invalidator,
        };
        component.mount();
        Ok(component)
    }

    fn mount(&mut self) {
        self.trigger = Some(RenderTrigger::attach(&self.actor, self.invalidator.clone()));
        self.phase = Phase::Mounted;
        debug!(
            "mounted `{}` in `{}`",
            self.actor.id(),
            self.actor.snapshot().value()
        );
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.actor.snapshot()
    }

    /// View model for the latest snapshot
    pub fn view(&self) -> MachineView {
        MachineView::new(&self.actor)
    }

    pub fn send(&self, event: impl Into<EventObject>) -> Result<()> {
        self.actor.send(event)
    }

    pub fn on_transition<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.actor.subscribe(callback)
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    /// Re-render requests issued so far
    pub fn render_revision(&self) -> u64 {
        self.invalidator.revision()
    }

    /// Stop the actor and detach from the host. Idempotent.
    pub fn destroy(&mut self) {
        if self.phase == Phase::Destroyed {
            return;
        }
        if let Some(trigger) = self.trigger.take() {
            trigger.detach();
        }
        self.actor.stop();
        self.phase = Phase::Destroyed;
        debug!("destroyed `{}`", self.actor.id());
    }
}

impl Drop for MachineComponent {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for MachineComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineComponent")
            .field("phase", &self.phase)
            .field("actor", &self.actor.id())
            .field("invalidator", &self.invalidator)
            .finish()
    }
}
