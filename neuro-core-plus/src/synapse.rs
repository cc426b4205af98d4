//! Synaptic listener: turns a presynaptic spike into input current on a target.

use std::sync::Arc;

use neuro_core::{Listener, ListenerError, NeuronId};

use crate::accumulator::InputCurrents;

pub struct Synapse {
    pub target: NeuronId,
    pub weight: f64,
    /// Ticks between the presynaptic spike and delivery; at least 1.
    pub delay: u64,
    currents: Arc<InputCurrents>,
}

impl Synapse {
    pub fn new(target: NeuronId, weight: f64, delay: u64, currents: Arc<InputCurrents>) -> Self {
        Self {
            target,
            weight,
            delay,
            currents,
        }
    }
}

impl Listener for Synapse {
    fn on_fire(&self, _source: NeuronId, _time: f64) -> Result<(), ListenerError> {
        self.currents.deliver(self.target, self.weight, self.delay)
    }
}
