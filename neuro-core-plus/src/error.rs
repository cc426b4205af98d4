use neuro_core::{ConfigError, NeuronError, NeuronId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Neuron(#[from] NeuronError),

    #[error("unknown neuron {0}")]
    UnknownNeuron(NeuronId),

    #[error("neuron id {got} does not match its slot {expected}")]
    IdMismatch { expected: NeuronId, got: NeuronId },

    #[error("synaptic delay {delay} outside 1..={max}")]
    InvalidDelay { delay: u64, max: u64 },
}

pub type SimulationResult<T, E = SimulationError> = core::result::Result<T, E>;
