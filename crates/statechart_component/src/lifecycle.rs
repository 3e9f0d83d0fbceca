//! Host lifecycle contract
//!
//! A host UI runtime owns component creation and destruction. Anything that
//! wants to be rendered as a component implements [`ComponentLifecycle`]; the
//! host calls `on_create` when it mounts a value and `on_destroy` when it
//! unmounts the resulting component.

use crate::args::ComponentArgs;
use crate::error::ComponentError;
use crate::render::Invalidator;

/// Lifetime of a managed component
///
/// `Uninitialized -> Mounted -> Destroyed`; nothing leaves `Destroyed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    Mounted,
    Destroyed,
}

/// Creation and destruction hooks a host runtime drives
pub trait ComponentLifecycle: Send + Sync {
    /// The kind of value this manager renders
    type Definition: ?Sized;

    /// Per-instance state handed back to the host
    type Component;

    /// Create a component for `definition`
    ///
    /// `invalidator` is how the component tells the host its output is
    /// stale. A failure here means no component exists.
    fn on_create(
        &self,
        definition: &Self::Definition,
        args: ComponentArgs,
        invalidator: Invalidator,
    ) -> Result<Self::Component, ComponentError>;

    /// Tear a component down. Must tolerate being called more than once.
    fn on_destroy(&self, component: &mut Self::Component);
}
