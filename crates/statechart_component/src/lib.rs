//! Statechart Components
//!
//! Renders statechart machines as UI components. A host runtime mounts a
//! [`Machine`](statechart_core::Machine) value; the component starts an actor
//! for it, exposes the projected state and a `send` facade to templates, asks
//! the host to re-render on every state change, and stops the actor when the
//! host tears the component down.
//!
//! # Example
//!
//! ```rust
//! use statechart_component::prelude::*;
//!
//! setup_component_machines();
//!
//! let machine = Machine::builder("fetch")
//!     .initial("idle")
//!     .state("idle", StateConfig::new().on("FETCH", "loading"))
//!     .state("loading", StateConfig::new().on("DONE", "idle"))
//!     .build()?;
//!
//! let mut host = ComponentHost::new();
//! let id = host.mount(&machine, ComponentArgs::new())?;
//!
//! let view = host.view(id).unwrap();
//! assert_eq!(view.state_path(), "idle");
//!
//! view.send("FETCH")?;
//! assert_eq!(host.take_stale(), vec![id]);
//! assert_eq!(host.view(id).unwrap().state_path(), "loading");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod args;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod manager;
pub mod projection;
pub mod registration;
pub mod render;
pub mod view;

pub use args::ComponentArgs;
pub use error::ComponentError;
pub use host::{ComponentHost, ComponentId};
pub use lifecycle::{ComponentLifecycle, Phase};
pub use manager::{MachineComponent, StatechartManager};
pub use projection::{project, Projection};
pub use registration::{
    component_manager_for, is_setup, set_component_manager, setup_component_machines,
    setup_component_machines_with, ErasedManager,
};
pub use render::{DirtyFlag, Invalidator, RenderCallback};
pub use view::{MachineView, Sender};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        setup_component_machines, ComponentArgs, ComponentError, ComponentHost, ComponentId,
        Invalidator, MachineComponent, MachineView, Phase,
    };
    pub use statechart_core::{
        EventObject, Implementations, Machine, Snapshot, StateConfig, StateValue,
        StatechartError, TransitionConfig,
    };
}
