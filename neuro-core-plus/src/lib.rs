//! neuro-core-plus: two-phase simulation driver atop neuro-core
//!
//! Additions:
//! - `Simulation`: Phase 1 step (parallel for large populations), barrier,
//!   Phase 2 fire, then an input hand-over to the next tick
//! - `InputCurrents`: atomic per-neuron accumulators plus a delay wheel
//! - `Synapse` and `SpikeRecorder` listeners
//!
//! Neuron and listener behavior comes from neuro-core; this crate only owns
//! ordering and delivery.

pub mod accumulator;
pub mod error;
pub mod recorder;
pub mod runtime;
pub mod synapse;

// Re-exports
pub use accumulator::InputCurrents;
pub use error::{SimulationError, SimulationResult};
pub use recorder::SpikeRecorder;
pub use runtime::{RunSummary, Simulation, SimulationConfig, TickReport};
pub use synapse::Synapse;
