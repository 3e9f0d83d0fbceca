//! Component manager registration
//!
//! The host looks managers up by the Rust type of the value it is asked to
//! render. [`setup_component_machines`] installs the statechart manager for
//! [`Machine`] values; it is safe to call from every entry point since only
//! the first call in a process does anything.

use std::any::{type_name, Any, TypeId};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use rustc_hash::FxHashMap;
use statechart_core::{ActorLogic, Machine, StatechartError};
use tracing::{debug, trace};

use crate::args::ComponentArgs;
use crate::error::ComponentError;
use crate::lifecycle::ComponentLifecycle;
use crate::manager::{MachineComponent, StatechartManager};
use crate::render::Invalidator;

// =========================================================================
// Type-erased managers
// =========================================================================

/// A [`ComponentLifecycle`] the host can drive without knowing its types
pub trait ErasedManager: Send + Sync {
    /// Name of the value type this manager renders
    fn definition_name(&self) -> &'static str;

    fn create(
        &self,
        definition: &(dyn Any + Send + Sync),
        args: ComponentArgs,
        invalidator: Invalidator,
    ) -> Result<MachineComponent, ComponentError>;

    fn destroy(&self, component: &mut MachineComponent);
}

impl<M> ErasedManager for M
where
    M: ComponentLifecycle<Component = MachineComponent>,
    M::Definition: Sized + Any,
{
    fn definition_name(&self) -> &'static str {
        type_name::<M::Definition>()
    }

    fn create(
        &self,
        definition: &(dyn Any + Send + Sync),
        args: ComponentArgs,
        invalidator: Invalidator,
    ) -> Result<MachineComponent, ComponentError> {
        let definition = definition
            .downcast_ref::<M::Definition>()
            .ok_or_else(|| StatechartError::InvalidDefinition {
                machine: self.definition_name().to_string(),
                reason: "value handed to the wrong component manager".to_string(),
            })?;
        self.on_create(definition, args, invalidator)
    }

    fn destroy(&self, component: &mut MachineComponent) {
        self.on_destroy(component);
    }
}

// =========================================================================
// Global registry
// =========================================================================

type ManagerMap = FxHashMap<TypeId, Arc<dyn ErasedManager>>;

static MANAGERS: OnceLock<RwLock<ManagerMap>> = OnceLock::new();

/// Logic type installed by the first setup call
static SETUP: OnceLock<&'static str> = OnceLock::new();

fn managers() -> &'static RwLock<ManagerMap> {
    MANAGERS.get_or_init(|| RwLock::new(FxHashMap::default()))
}

/// Register `manager` for values of its definition type
///
/// Replaces any manager previously registered for the same type.
pub fn set_component_manager<M>(manager: M)
where
    M: ComponentLifecycle<Component = MachineComponent> + 'static,
    M::Definition: Sized + Any,
{
    let type_id = TypeId::of::<M::Definition>();
    let previous = managers()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(type_id, Arc::new(manager));
    if previous.is_some() {
        debug!(
            "replaced component manager for `{}`",
            type_name::<M::Definition>()
        );
    } else {
        debug!(
            "registered component manager for `{}`",
            type_name::<M::Definition>()
        );
    }
}

/// Manager registered for the concrete type behind `value`, if any
pub fn component_manager_for(value: &(dyn Any + Send + Sync)) -> Option<Arc<dyn ErasedManager>> {
    managers()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&(*value).type_id())
        .cloned()
}

// =========================================================================
// Setup
// =========================================================================

/// Install the statechart manager for [`Machine`] values
///
/// Returns `true` when this call performed the registration and `false` when
/// an earlier call already had.
pub fn setup_component_machines() -> bool {
    setup_component_machines_with::<Machine>()
}

/// Install the statechart manager for logic type `L`
///
/// Shares the once-per-process flag with [`setup_component_machines`]: the
/// first call wins, whichever logic type it names.
pub fn setup_component_machines_with<L: ActorLogic>() -> bool {
    let mut performed = false;
    let installed = SETUP.get_or_init(|| {
        set_component_manager(StatechartManager::<L>::new());
        performed = true;
        type_name::<L>()
    });
    if !performed {
        trace!("component machines already set up for `{}`", installed);
    }
    performed
}

/// Whether a setup call has run in this process
pub fn is_setup() -> bool {
    SETUP.get().is_some()
}
