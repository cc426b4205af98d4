//! Two-phase simulation driver.
//!
//! Semantics per tick t:
//! - Phase 1: every neuron steps on its own state and its input for tick t.
//!   Neurons are independent here, so large populations fan out over rayon.
//! - Barrier: Phase 1 results are collected before anything fires.
//! - Phase 2: neurons whose Phase 1 outcome spiked fire, in ascending id
//!   order. Listener writes land in the accumulators for tick t + delay.
//! - Hand-over: accumulators advance, then the tick counter does.
//!
//! A neuron whose step fails does not fire, but the rest of the population
//! still completes the tick; the first failure (ascending id) is returned
//! after the hand-over. The driver only stops on completed tick boundaries.

use std::sync::Arc;

use neuro_core::{
    IafNeuron, IafParams, Listener, Neuron, NeuronError, NeuronId, SpikeEvent, StepContext,
    StepOutcome, StepResult,
};
use rayon::prelude::*;
use tracing::{debug, error};

use crate::accumulator::InputCurrents;
use crate::error::{SimulationError, SimulationResult};
use crate::synapse::Synapse;

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// Timestep size, in the same unit as the neuron time constants.
    pub dt: f64,
    /// Delay-wheel slots; bounds the longest synaptic delay.
    pub wheel_size: u64,
    /// Populations at least this large step in parallel.
    pub parallel_threshold: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 1.0,
            wheel_size: 64,
            parallel_threshold: 1024,
        }
    }
}

impl SimulationConfig {
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_wheel_size(mut self, wheel_size: u64) -> Self {
        self.wheel_size = wheel_size;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn validate(&self) -> SimulationResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimulationError::InvalidConfiguration("dt must be finite and positive"));
        }
        if self.wheel_size < 2 {
            return Err(SimulationError::InvalidConfiguration("wheel_size must be at least 2"));
        }
        Ok(())
    }
}

/// What happened during one completed tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub time: f64,
    /// Neurons that fired this tick, ascending by id.
    pub spikes: Vec<SpikeEvent>,
    pub listener_failures: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub spikes: usize,
    pub listener_failures: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.spikes += report.spikes.len();
        self.listener_failures += report.listener_failures;
    }
}

pub struct Simulation {
    config: SimulationConfig,
    neurons: Vec<Box<dyn Neuron>>,
    currents: Arc<InputCurrents>,
    tick: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;
        debug!(?config, "simulation created");
        Ok(Self {
            config,
            neurons: Vec::new(),
            currents: Arc::new(InputCurrents::new(config.wheel_size)),
            tick: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Next tick to be simulated.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn time(&self) -> f64 {
        self.tick as f64 * self.config.dt
    }

    pub fn currents(&self) -> &Arc<InputCurrents> {
        &self.currents
    }

    pub fn neurons(&self) -> &[Box<dyn Neuron>] {
        &self.neurons
    }

    pub fn neuron(&self, id: NeuronId) -> Option<&dyn Neuron> {
        self.neurons.get(id.index()).map(|n| n.as_ref())
    }

    fn next_id(&self) -> NeuronId {
        NeuronId(self.neurons.len() as u32)
    }

    fn check(&self, id: NeuronId) -> SimulationResult<()> {
        if id.index() < self.neurons.len() {
            Ok(())
        } else {
            Err(SimulationError::UnknownNeuron(id))
        }
    }

    /// Add a neuron; its id must equal its position in the population.
    pub fn add_neuron(&mut self, neuron: Box<dyn Neuron>) -> SimulationResult<NeuronId> {
        let expected = self.next_id();
        if neuron.id() != expected {
            return Err(SimulationError::IdMismatch {
                expected,
                got: neuron.id(),
            });
        }
        self.neurons.push(neuron);
        self.currents.ensure_len(self.neurons.len());
        Ok(expected)
    }

    pub fn add_iaf_neuron(&mut self, params: IafParams) -> SimulationResult<NeuronId> {
        let neuron = IafNeuron::new(self.next_id(), params)?;
        self.add_neuron(Box::new(neuron))
    }

    /// Register an arbitrary listener on `source`.
    pub fn add_listener(
        &mut self,
        source: NeuronId,
        listener: Arc<dyn Listener>,
    ) -> SimulationResult<()> {
        self.check(source)?;
        self.neurons[source.index()].add_listener(listener);
        Ok(())
    }

    /// Wire `source -> target` with a synapse delivering `weight` after `delay` ticks.
    pub fn connect(
        &mut self,
        source: NeuronId,
        target: NeuronId,
        weight: f64,
        delay: u64,
    ) -> SimulationResult<()> {
        self.check(target)?;
        let max = self.currents.max_delay();
        if delay == 0 || delay > max {
            return Err(SimulationError::InvalidDelay { delay, max });
        }
        let synapse = Synapse::new(target, weight, delay, self.currents.clone());
        self.add_listener(source, Arc::new(synapse))
    }

    /// Constant external input current for `id`.
    pub fn set_bias(&mut self, id: NeuronId, current: f64) -> SimulationResult<()> {
        self.check(id)?;
        self.currents
            .set_bias(id, current)
            .map_err(|_| SimulationError::UnknownNeuron(id))
    }

    /// One-off current visible to `id` on the next simulated tick.
    pub fn inject(&mut self, id: NeuronId, amount: f64) -> SimulationResult<()> {
        self.check(id)?;
        self.currents
            .deliver(id, amount, 1)
            .map_err(|_| SimulationError::UnknownNeuron(id))
    }

    /// Advance one tick.
    ///
    /// Every neuron steps even if another one fails. Neurons that stepped
    /// cleanly and spiked still fire, the accumulators and tick counter still
    /// advance, and then the failure of the lowest failing id is returned.
    /// Failed neurons keep their pre-step potential and do not fire.
    pub fn step_once(&mut self) -> SimulationResult<TickReport> {
        let tick = self.tick;
        let dt = self.config.dt;
        let time = tick as f64 * dt;

        // Phase 1
        let results = self.step_all(tick, dt);

        // Phase 2
        let mut spikes = Vec::new();
        let mut listener_failures = 0;
        let mut first_failure: Option<NeuronError> = None;
        let mut failed = 0usize;
        for (neuron, result) in self.neurons.iter().zip(results) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    failed += 1;
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                    continue;
                }
            };
            if !outcome.spiked {
                continue;
            }
            let report = neuron.fire(time);
            listener_failures += report.failures.len();
            spikes.push(SpikeEvent {
                neuron_id: neuron.id(),
                tick,
                time,
            });
        }

        self.currents.advance();
        self.tick = tick.saturating_add(1);

        if let Some(err) = first_failure {
            error!(tick, failed, error = %err, "phase 1 failed");
            return Err(err.into());
        }
        if !spikes.is_empty() {
            debug!(tick, spikes = spikes.len(), listener_failures, "tick complete");
        }
        Ok(TickReport {
            tick,
            time,
            spikes,
            listener_failures,
        })
    }

    /// Phase 1 for the whole population, results in id order. Never stops
    /// early, so one failure cannot leave later neurons a step behind.
    fn step_all(&mut self, tick: u64, dt: f64) -> Vec<StepResult<StepOutcome>> {
        let currents = &self.currents;
        let step_one = |neuron: &mut Box<dyn Neuron>| {
            let ctx = StepContext::new(tick, dt, currents.input_for(neuron.id()));
            neuron.step(&ctx)
        };
        if self.neurons.len() >= self.config.parallel_threshold {
            self.neurons.par_iter_mut().map(&step_one).collect()
        } else {
            self.neurons.iter_mut().map(&step_one).collect()
        }
    }

    /// Run until the given tick (inclusive).
    pub fn run_until(&mut self, until: u64) -> SimulationResult<RunSummary> {
        let mut summary = RunSummary::default();
        while self.tick <= until {
            let report = self.step_once()?;
            summary.absorb(&report);
        }
        Ok(summary)
    }

    /// Convenience: run a fixed number of ticks.
    pub fn run_ticks(&mut self, ticks: u64) -> SimulationResult<RunSummary> {
        let mut summary = RunSummary::default();
        for _ in 0..ticks {
            let report = self.step_once()?;
            summary.absorb(&report);
        }
        Ok(summary)
    }

    /// Run up to `max_ticks`, stopping after the first tick for which
    /// `keep_going` returns false.
    pub fn run_while<F>(
        &mut self,
        max_ticks: u64,
        mut keep_going: F,
    ) -> SimulationResult<RunSummary>
    where
        F: FnMut(&TickReport) -> bool,
    {
        let mut summary = RunSummary::default();
        for _ in 0..max_ticks {
            let report = self.step_once()?;
            summary.absorb(&report);
            if !keep_going(&report) {
                break;
            }
        }
        Ok(summary)
    }
}
