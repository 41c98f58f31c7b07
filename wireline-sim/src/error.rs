use thiserror::Error;

/// Errors that can occur while building or driving a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The simulation is in an invalid state for the requested operation.
    #[error("invalid simulation state: {0}")]
    InvalidState(String),
    /// Both endpoints of the channel are already attached.
    #[error("channel already has two attached devices")]
    ChannelFull,
    /// The device has no attached channel.
    #[error("device is not attached to a channel")]
    NotAttached,
}

/// A type alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;
