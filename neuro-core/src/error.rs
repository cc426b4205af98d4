//! Error taxonomy for the kernel: configuration, numeric and listener failures.

use thiserror::Error;

use crate::neuron::NeuronId;

/// Rejected model parameters. Raised at construction, never mid-simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("membrane time constant must be positive, got {0}")]
    NonPositiveTimeConstant(f64),

    #[error("membrane capacitance must be positive, got {0}")]
    NonPositiveCapacitance(f64),

    #[error("reset potential {reset} must be below threshold {threshold}")]
    ResetNotBelowThreshold { reset: f64, threshold: f64 },

    #[error("refractory period must be non-negative, got {0}")]
    NegativeRefractoryPeriod(f64),

    #[error("parameter `{name}` must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },
}

/// Hard failure of a single `step` call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NeuronError {
    #[error("neuron {neuron} produced non-finite potential {value} at tick {tick}")]
    NumericDegeneracy { neuron: NeuronId, value: f64, tick: u64 },

    #[error("timestep must be finite and positive, got {0}")]
    InvalidTimestep(f64),
}

/// Failure reported by a listener while handling a firing notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    #[error("listener rejected notification: {0}")]
    Rejected(String),

    #[error("unknown target neuron {0}")]
    UnknownTarget(NeuronId),

    #[error("listener panicked: {0}")]
    Panicked(String),
}

pub type ConfigResult<T> = core::result::Result<T, ConfigError>;
pub type StepResult<T> = core::result::Result<T, NeuronError>;
