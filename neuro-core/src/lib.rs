//! neuro-core: segment and neuron capabilities for a discrete-time spiking kernel
//!
//! - `Segment` / `SimpleSegment`: membrane compartments owned by a neuron
//! - `Neuron` / `IafNeuron`: one timestep per `step`, spike dispatch in `fire`
//! - `Listener`: best-effort firing notifications
//! - `TimeWheel`: calendar queue used by drivers for delayed delivery

pub mod error;
pub mod event_queue;
pub mod iaf;
pub mod listener;
pub mod neuron;
pub mod segment;

// Re-exports
pub use error::{ConfigError, ConfigResult, ListenerError, NeuronError, StepResult};
pub use event_queue::{SpikeEvent, TimeWheel};
pub use iaf::{IafNeuron, IafParams};
pub use listener::{notify_all, FireReport, Listener};
pub use neuron::{Neuron, NeuronId, NeuronState, StepContext, StepOutcome};
pub use segment::{Segment, SimpleSegment};
