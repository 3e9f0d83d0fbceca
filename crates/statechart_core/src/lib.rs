//! Statechart Core
//!
//! This crate provides the actor side of statechart components:
//!
//! - **Machine Definitions**: compound, parallel and final states, guards,
//!   entry/exit and transition actions, built in code or loaded from JSON/TOML
//! - **Actors**: running machine instances that process events one at a time
//!   and publish immutable snapshots to their observers
//! - **State Values**: flat or nested positions in the state graph, with a
//!   deterministic dot-path form
//!
//! # Example
//!
//! ```rust
//! use statechart_core::{create_actor, ActorOptions, Machine, StateConfig};
//!
//! let machine = Machine::builder("toggle")
//!     .initial("inactive")
//!     .state("inactive", StateConfig::new().on("TOGGLE", "active"))
//!     .state("active", StateConfig::new().on("TOGGLE", "inactive"))
//!     .build()
//!     .unwrap();
//!
//! let actor = create_actor(&machine, ActorOptions::new()).unwrap();
//! actor.subscribe(|snapshot| {
//!     println!("now in {}", snapshot.value());
//! });
//!
//! actor.send("TOGGLE").unwrap();
//! assert_eq!(actor.snapshot().value().state_path(), "active");
//! ```

pub mod actor;
pub mod config;
pub mod error;
pub mod events;
pub mod machine;
pub mod snapshot;
pub mod value;

pub use actor::{create_actor, Actor, ActorLogic, ActorOptions, Observer, Subscription};
pub use config::{MachineConfig, StateConfig, StateKind, TransitionConfig, TransitionsConfig};
pub use error::{Result, StatechartError};
pub use events::{event_types, EventObject};
pub use machine::{Implementations, Machine, MachineBuilder};
pub use snapshot::{ActorStatus, Snapshot};
pub use value::StateValue;
