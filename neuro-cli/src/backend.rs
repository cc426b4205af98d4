// Backend abstraction for the driver so different simulation engines can be swapped.

use anyhow::Result;
use neuro_core::{IafParams, NeuronId, SpikeEvent};
use neuro_core_plus::{Simulation, SimulationConfig};

/// Common interface for any backend that can drive the headless runner.
pub trait SimBackend {
    /// Advance the simulation by one tick and return all spikes emitted during that tick.
    fn step(&mut self) -> Result<Vec<SpikeEvent>>;
    /// Number of neurons in the model.
    fn neurons(&self) -> usize;
    /// Primary-segment potential of every neuron, by id.
    fn potentials(&self) -> Vec<f64>;
}

/// Implementation backed by the two-phase `Simulation`.
pub struct CoreBackend {
    sim: Simulation,
}

impl CoreBackend {
    pub fn new() -> Result<Self> {
        // Small feed-forward demo: a tonically driven input neuron fanning
        // out to a fast and a delayed follower, the follower inhibiting back.
        let mut sim = Simulation::new(SimulationConfig::default())?;
        let params = IafParams::default();
        let n0 = sim.add_iaf_neuron(params)?;
        let n1 = sim.add_iaf_neuron(params)?;
        let n2 = sim.add_iaf_neuron(params.with_refractory_period(4.0))?;
        sim.set_bias(n0, 0.15)?;
        sim.connect(n0, n1, 1.2, 1)?;
        sim.connect(n0, n2, 0.6, 3)?;
        sim.connect(n2, n0, -0.8, 2)?;

        Ok(Self { sim })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }
}

impl SimBackend for CoreBackend {
    fn step(&mut self) -> Result<Vec<SpikeEvent>> {
        Ok(self.sim.step_once()?.spikes)
    }

    fn neurons(&self) -> usize {
        self.sim.neurons().len()
    }

    fn potentials(&self) -> Vec<f64> {
        (0..self.neurons() as u32)
            .filter_map(|id| self.sim.neuron(NeuronId(id)))
            .map(|n| n.membrane_potential())
            .collect()
    }
}
