//! Component host
//!
//! A minimal host runtime: mounts values through whatever manager is
//! registered for their type, keeps the resulting components in a slot map,
//! and reports which ones asked to be re-rendered.

use std::any::Any;
use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};
use statechart_core::EventObject;
use tracing::debug;

use crate::args::ComponentArgs;
use crate::error::ComponentError;
use crate::manager::MachineComponent;
use crate::registration::{component_manager_for, ErasedManager};
use crate::render::Invalidator;
use crate::view::MachineView;

new_key_type! {
    /// Handle to a mounted component
    pub struct ComponentId;
}

struct Mounted {
    component: MachineComponent,
    manager: Arc<dyn ErasedManager>,
}

/// Owns mounted components and unmounts them on drop
#[derive(Default)]
pub struct ComponentHost {
    components: SlotMap<ComponentId, Mounted>,
}

impl ComponentHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `value` with a fresh invalidator
    ///
    /// Fails with `NoComponentManager` if nothing is registered for the
    /// value's type.
    pub fn mount(
        &mut self,
        value: &(dyn Any + Send + Sync),
        args: ComponentArgs,
    ) -> Result<ComponentId, ComponentError> {
        self.mount_with(value, args, Invalidator::new())
    }

    /// Mount `value`, reporting staleness through `invalidator`
    pub fn mount_with(
        &mut self,
        value: &(dyn Any + Send + Sync),
        args: ComponentArgs,
        invalidator: Invalidator,
    ) -> Result<ComponentId, ComponentError> {
        let manager = component_manager_for(value).ok_or(ComponentError::NoComponentManager {
            type_id: (*value).type_id(),
        })?;
        let component = manager.create(value, args, invalidator)?;
        let id = self.components.insert(Mounted { component, manager });
        debug!("host mounted {:?}", id);
        Ok(id)
    }

    pub fn component(&self, id: ComponentId) -> Option<&MachineComponent> {
        self.components.get(id).map(|mounted| &mounted.component)
    }

    pub fn view(&self, id: ComponentId) -> Option<MachineView> {
        self.component(id).map(MachineComponent::view)
    }

    pub fn send(
        &self,
        id: ComponentId,
        event: impl Into<EventObject>,
    ) -> Result<(), ComponentError> {
        let component = self
            .component(id)
            .ok_or(ComponentError::UnknownComponent(id))?;
        component.send(event)?;
        Ok(())
    }

    /// Components invalidated since the last call, clearing their flags
    pub fn take_stale(&self) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|(_, mounted)| mounted.component.invalidator().take_dirty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Destroy and forget a component. Returns `false` for unknown ids.
    pub fn unmount(&mut self, id: ComponentId) -> bool {
        match self.components.remove(id) {
            Some(mut mounted) => {
                mounted.manager.destroy(&mut mounted.component);
                debug!("host unmounted {:?}", id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Drop for ComponentHost {
    fn drop(&mut self) {
        for (_, mut mounted) in self.components.drain() {
            mounted.manager.destroy(&mut mounted.component);
        }
    }
}
