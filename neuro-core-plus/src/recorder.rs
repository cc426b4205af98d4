//! Spike recorder: a monitoring listener that keeps every firing it sees.

use neuro_core::{Listener, ListenerError, NeuronId, SpikeEvent};
use parking_lot::Mutex;

pub struct SpikeRecorder {
    dt: f64,
    spikes: Mutex<Vec<SpikeEvent>>,
}

impl SpikeRecorder {
    /// `dt` converts notification times back to ticks.
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            spikes: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot sorted by (tick, neuron).
    pub fn spikes(&self) -> Vec<SpikeEvent> {
        let mut out = self.spikes.lock().clone();
        out.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.neuron_id.cmp(&b.neuron_id)));
        out
    }

    pub fn count_for(&self, id: NeuronId) -> usize {
        self.spikes.lock().iter().filter(|s| s.neuron_id == id).count()
    }

    pub fn len(&self) -> usize {
        self.spikes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.spikes.lock().clear();
    }
}

impl Default for SpikeRecorder {
    /// Recorder for the default `SimulationConfig` timestep of 1.0.
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Listener for SpikeRecorder {
    fn on_fire(&self, source: NeuronId, time: f64) -> Result<(), ListenerError> {
        let tick = if self.dt > 0.0 { (time / self.dt).round() as u64 } else { 0 };
        self.spikes.lock().push(SpikeEvent {
            neuron_id: source,
            tick,
            time,
        });
        Ok(())
    }
}
