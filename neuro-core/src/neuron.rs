//! Neuron capability: owns segments, advances one timestep at a time, fires.

use core::fmt;
use std::sync::Arc;

use crate::error::StepResult;
use crate::listener::{FireReport, Listener};
use crate::segment::Segment;

/// Stable neuron identity (index into the driver's population).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeuronId(pub u32);

impl NeuronId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Point-neuron state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeuronState {
    Resting,
    Integrating,
    Refractory,
}

/// Everything a neuron may read during one `step`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepContext {
    pub tick: u64,
    pub time: f64,
    pub dt: f64,
    /// Net input current for this neuron and this tick.
    pub input_current: f64,
}

impl StepContext {
    pub fn new(tick: u64, dt: f64, input_current: f64) -> Self {
        Self {
            tick,
            time: tick as f64 * dt,
            dt,
            input_current,
        }
    }
}

/// Result of a successful `step`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    pub spiked: bool,
    pub potential: f64,
    pub state: NeuronState,
}

/// A single biological neuron, point model or multi-compartment.
///
/// `step` performs local integration only and must never call listeners;
/// the driver calls `fire` afterwards for neurons whose `has_spiked` is set,
/// once every neuron has finished stepping.
pub trait Neuron: Send + Sync {
    fn id(&self) -> NeuronId;

    /// Simulate exactly one timestep. Calling twice models two timesteps.
    fn step(&mut self, ctx: &StepContext) -> StepResult<StepOutcome>;

    /// Whether the most recent `step` crossed threshold.
    fn has_spiked(&self) -> bool;

    /// Notify all listeners that this neuron fired at `time`.
    fn fire(&self, time: f64) -> FireReport;

    /// Owned segments, primary segment first.
    fn segments(&self) -> &[Box<dyn Segment>];

    fn add_listener(&mut self, listener: Arc<dyn Listener>);

    fn state(&self) -> NeuronState;

    /// Potential of the primary segment, the one compared with threshold.
    fn membrane_potential(&self) -> f64 {
        self.segments()
            .first()
            .map(|s| s.membrane_potential())
            .unwrap_or(f64::NAN)
    }
}
