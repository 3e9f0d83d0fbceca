//! Render invalidation
//!
//! A component never renders itself. It flips a dirty flag and, when the host
//! installed one, calls a rebuild callback; the host decides when to actually
//! re-render. [`RenderTrigger`] wires an actor's notifications to that flag.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use statechart_core::{Actor, Subscription};
use tracing::trace;

/// Shared dirty flag for signaling that a component needs rebuilding
pub type DirtyFlag = Arc<AtomicBool>;

/// Host callback run on every invalidation
pub type RenderCallback = Arc<dyn Fn() + Send + Sync>;

/// Handle a component uses to mark its host output stale
#[derive(Clone, Default)]
pub struct Invalidator {
    dirty: DirtyFlag,
    revision: Arc<AtomicU64>,
    callback: Option<RenderCallback>,
}

impl Invalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidator that also calls `callback` whenever it fires
    pub fn with_callback<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(callback)),
            ..Self::default()
        }
    }

    /// Mark the component stale
    pub fn invalidate(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        self.revision.fetch_add(1, Ordering::SeqCst);
        if let Some(callback) = &self.callback {
            callback();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Read and clear the dirty flag
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    /// Number of invalidations so far
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Invalidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invalidator")
            .field("dirty", &self.is_dirty())
            .field("revision", &self.revision())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Requests one host re-render per actor notification
#[derive(Debug)]
pub(crate) struct RenderTrigger {
    subscription: Subscription,
}

impl RenderTrigger {
    pub(crate) fn attach(actor: &Actor, invalidator: Invalidator) -> Self {
        let actor_id = actor.id().to_string();
        let subscription = actor.subscribe(move |snapshot| {
            trace!(
                "`{}` moved to `{}`, requesting render",
                actor_id,
                snapshot.value()
            );
            invalidator.invalidate();
        });
        Self { subscription }
    }

    pub(crate) fn detach(&self) {
        self.subscription.unsubscribe();
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }
}
