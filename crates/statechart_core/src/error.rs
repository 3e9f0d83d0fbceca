use thiserror::Error;

/// Errors raised by machine definitions and actors
#[derive(Debug, Error)]
pub enum StatechartError {
    /// The machine definition is malformed, or the value handed over is not
    /// a machine definition at all
    #[error("invalid machine definition `{machine}`: {reason}")]
    InvalidDefinition { machine: String, reason: String },

    /// A resume state value does not name a reachable state of the machine
    #[error("state value `{value}` cannot be resumed in machine `{machine}`: {reason}")]
    IncompatibleResumeState {
        machine: String,
        value: String,
        reason: String,
    },

    /// An event was sent to an actor that has been stopped
    #[error("actor `{actor}` is not running")]
    ActorNotRunning { actor: String },

    /// A caller sent an event whose type uses the reserved `statechart.` prefix
    #[error("event `{event}` is reserved for the actor runtime")]
    ReservedEvent { event: String },

    #[error("machine config (json): {0}")]
    Json(#[from] serde_json::Error),

    #[error("machine config (toml): {0}")]
    Toml(#[from] toml::de::Error),
}

impl StatechartError {
    pub(crate) fn invalid(machine: impl Into<String>, reason: impl Into<String>) -> Self {
        StatechartError::InvalidDefinition {
            machine: machine.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatechartError>;
