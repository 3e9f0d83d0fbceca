use std::any::TypeId;

use statechart_core::StatechartError;
use thiserror::Error;

use crate::host::ComponentId;

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error(transparent)]
    Statechart(#[from] StatechartError),

    #[error("no component manager registered for {type_id:?}")]
    NoComponentManager { type_id: TypeId },

    #[error("unknown component {0:?}")]
    UnknownComponent(ComponentId),
}
