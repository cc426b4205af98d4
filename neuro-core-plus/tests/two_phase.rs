use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use neuro_core::{
    notify_all, FireReport, IafParams, Listener, ListenerError, Neuron, NeuronError, NeuronId,
    NeuronState, Segment, SimpleSegment, StepContext, StepOutcome, StepResult,
};
use neuro_core_plus::{Simulation, SimulationConfig, SimulationError, SpikeRecorder};
use parking_lot::Mutex;
use proptest::prelude::*;

/// Passive neuron that logs the input current it was handed each tick.
struct InputTap {
    id: NeuronId,
    segments: Vec<Box<dyn Segment>>,
    listeners: Vec<Arc<dyn Listener>>,
    seen: Arc<Mutex<Vec<f64>>>,
}

impl InputTap {
    fn new(id: NeuronId, seen: Arc<Mutex<Vec<f64>>>) -> Self {
        Self {
            id,
            segments: vec![Box::new(SimpleSegment::default())],
            listeners: Vec::new(),
            seen,
        }
    }
}

impl Neuron for InputTap {
    fn id(&self) -> NeuronId {
        self.id
    }

    fn step(&mut self, ctx: &StepContext) -> StepResult<StepOutcome> {
        self.seen.lock().push(ctx.input_current);
        let v = self.segments[0].increment_membrane_potential(ctx.input_current);
        Ok(StepOutcome {
            spiked: false,
            potential: v,
            state: NeuronState::Integrating,
        })
    }

    fn has_spiked(&self) -> bool {
        false
    }

    fn fire(&self, time: f64) -> FireReport {
        notify_all(&self.listeners, self.id, time)
    }

    fn segments(&self) -> &[Box<dyn Segment>] {
        &self.segments
    }

    fn add_listener(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    fn state(&self) -> NeuronState {
        NeuronState::Integrating
    }
}

struct Counter(AtomicUsize);

impl Listener for Counter {
    fn on_fire(&self, _source: NeuronId, _time: f64) -> Result<(), ListenerError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn driver_params() -> IafParams {
    IafParams::default()
}

fn expected_tap_trace(ticks: usize) -> Vec<f64> {
    // Driver spikes at 0, 3, 6, ... (two refractory ticks between spikes);
    // the tap must only see each spike on the following tick.
    (0..ticks).map(|t| if t % 3 == 1 { 0.3 } else { 0.0 }).collect()
}

#[test]
fn same_tick_spikes_are_never_visible_in_phase_one() {
    for parallel_threshold in [0, usize::MAX] {
        let config = SimulationConfig::default().with_parallel_threshold(parallel_threshold);
        let mut sim = Simulation::new(config).unwrap();
        let driver = sim.add_iaf_neuron(driver_params()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tap = InputTap::new(NeuronId(1), seen.clone());
        let tap = sim.add_neuron(Box::new(tap)).unwrap();
        sim.set_bias(driver, 5.0).unwrap();
        sim.connect(driver, tap, 0.3, 1).unwrap();

        sim.run_ticks(9).unwrap();
        assert_eq!(
            *seen.lock(),
            expected_tap_trace(9),
            "parallel_threshold={parallel_threshold}"
        );
    }
}

#[test]
fn insertion_order_does_not_change_results() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    // Listener target stepped before the firing neuron this time.
    let tap = sim.add_neuron(Box::new(InputTap::new(NeuronId(0), seen.clone()))).unwrap();
    let driver = sim.add_iaf_neuron(driver_params()).unwrap();
    sim.set_bias(driver, 5.0).unwrap();
    sim.connect(driver, tap, 0.3, 1).unwrap();

    sim.run_ticks(9).unwrap();
    assert_eq!(*seen.lock(), expected_tap_trace(9));
}

#[test]
fn chain_propagates_one_tick_per_hop() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let params = driver_params().with_refractory_period(10.0);
    let a = sim.add_iaf_neuron(params).unwrap();
    let b = sim.add_iaf_neuron(params).unwrap();
    let c = sim.add_iaf_neuron(params).unwrap();
    sim.connect(a, b, 2.0, 1).unwrap();
    sim.connect(b, c, 2.0, 1).unwrap();
    sim.inject(a, 2.0).unwrap();

    let r0 = sim.step_once().unwrap();
    let r1 = sim.step_once().unwrap();
    let r2 = sim.step_once().unwrap();
    let r3 = sim.step_once().unwrap();
    assert!(r0.spikes.is_empty());
    assert_eq!(r1.spikes.iter().map(|s| s.neuron_id).collect::<Vec<_>>(), vec![a]);
    assert_eq!(r2.spikes.iter().map(|s| s.neuron_id).collect::<Vec<_>>(), vec![b]);
    assert_eq!(r3.spikes.iter().map(|s| s.neuron_id).collect::<Vec<_>>(), vec![c]);
}

#[test]
fn delayed_synapse_respects_its_delay() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let driver = sim.add_iaf_neuron(driver_params().with_refractory_period(100.0)).unwrap();
    let tap = sim.add_neuron(Box::new(InputTap::new(NeuronId(1), seen.clone()))).unwrap();
    sim.set_bias(driver, 5.0).unwrap();
    sim.connect(driver, tap, 1.0, 4).unwrap();

    sim.run_ticks(6).unwrap();
    assert_eq!(*seen.lock(), vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_delay_lands_exactly_on_its_tick(delay in 1u64..=64, weight in -5.0f64..5.0) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let params = driver_params().with_refractory_period(100.0);
        let driver = sim.add_iaf_neuron(params).unwrap();
        let tap = sim.add_neuron(Box::new(InputTap::new(NeuronId(1), seen.clone()))).unwrap();
        sim.set_bias(driver, 5.0).unwrap();
        sim.connect(driver, tap, weight, delay).unwrap();

        // Driver fires once, at tick 0, then stays refractory.
        sim.run_ticks(delay + 2).unwrap();
        let seen = seen.lock();
        prop_assert_eq!(seen.len() as u64, delay + 2);
        for (tick, &input) in seen.iter().enumerate() {
            let expected = if tick as u64 == delay { weight } else { 0.0 };
            prop_assert_eq!(input.to_bits(), expected.to_bits(), "tick {}", tick);
        }
    }
}

#[test]
fn one_failing_listener_of_three_does_not_block_the_others() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let n = sim.add_iaf_neuron(driver_params()).unwrap();
    let first = Arc::new(Counter(AtomicUsize::new(0)));
    let third = Arc::new(Counter(AtomicUsize::new(0)));
    let failing: Arc<dyn Listener> = Arc::new(|_: NeuronId, _: f64| -> Result<(), ListenerError> {
        Err(ListenerError::Rejected("queue closed".into()))
    });
    sim.add_listener(n, first.clone()).unwrap();
    sim.add_listener(n, failing).unwrap();
    sim.add_listener(n, third.clone()).unwrap();
    sim.inject(n, 5.0).unwrap();

    sim.step_once().unwrap();
    let report = sim.step_once().unwrap();
    assert_eq!(report.spikes.len(), 1);
    assert_eq!(report.listener_failures, 1);
    assert_eq!(first.0.load(Ordering::SeqCst), 1);
    assert_eq!(third.0.load(Ordering::SeqCst), 1);
    assert_eq!(sim.neuron(n).unwrap().membrane_potential(), 0.0);
}

#[test]
fn degenerate_neuron_does_not_stall_the_rest_of_the_tick() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let healthy = sim.add_iaf_neuron(driver_params()).unwrap();
    let broken = sim.add_iaf_neuron(driver_params()).unwrap();
    let fired = Arc::new(Counter(AtomicUsize::new(0)));
    sim.add_listener(healthy, fired.clone()).unwrap();
    sim.set_bias(healthy, 5.0).unwrap();
    sim.set_bias(broken, f64::INFINITY).unwrap();

    let err = sim.step_once().unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Neuron(NeuronError::NumericDegeneracy { neuron, tick: 0, .. })
            if neuron == broken
    ));
    // The healthy neuron's spike was delivered and the tick completed.
    assert_eq!(fired.0.load(Ordering::SeqCst), 1);
    assert_eq!(sim.tick(), 1);
    assert_eq!(sim.neuron(healthy).unwrap().state(), NeuronState::Refractory);
    assert_eq!(sim.neuron(broken).unwrap().membrane_potential(), 0.0);

    // Recovering the input resumes normal stepping with no double step:
    // two refractory ticks, then the next spike on tick 3.
    sim.set_bias(broken, 0.0).unwrap();
    let summary = sim.run_ticks(3).unwrap();
    assert_eq!(summary.spikes, 1);
    assert_eq!(fired.0.load(Ordering::SeqCst), 2);
    assert_eq!(sim.tick(), 4);
}

#[test]
fn subthreshold_population_never_fires() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    let n = sim.add_iaf_neuron(driver_params()).unwrap();
    sim.set_bias(n, 0.05).unwrap();
    let summary = sim.run_ticks(1000).unwrap();
    assert_eq!(summary.spikes, 0);
    assert!((sim.neuron(n).unwrap().membrane_potential() - 0.5).abs() < 1e-9);
}

/// Deterministic xorshift so the wiring is identical across runs.
fn xorshift(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn random_network(parallel_threshold: usize) -> (Simulation, Arc<SpikeRecorder>) {
    let config = SimulationConfig::default().with_parallel_threshold(parallel_threshold);
    let mut sim = Simulation::new(config).unwrap();
    let recorder = Arc::new(SpikeRecorder::new(config.dt));
    let mut rng = 0x9E37_79B9_7F4A_7C15u64;

    let count = 1500u32;
    for _ in 0..count {
        sim.add_iaf_neuron(IafParams::default()).unwrap();
    }
    for id in 0..count {
        let id = NeuronId(id);
        let bias = (xorshift(&mut rng) % 150) as f64 / 1000.0;
        sim.set_bias(id, bias).unwrap();
        sim.add_listener(id, recorder.clone()).unwrap();
        for _ in 0..8 {
            let target = NeuronId((xorshift(&mut rng) % count as u64) as u32);
            let weight = ((xorshift(&mut rng) % 200) as f64 - 60.0) / 1000.0;
            let delay = 1 + xorshift(&mut rng) % 5;
            sim.connect(id, target, weight, delay).unwrap();
        }
    }
    (sim, recorder)
}

#[test]
fn parallel_and_sequential_stepping_agree_bit_for_bit() {
    let (mut par, par_rec) = random_network(0);
    let (mut seq, seq_rec) = random_network(usize::MAX);

    par.run_ticks(200).unwrap();
    seq.run_ticks(200).unwrap();

    assert!(!par_rec.is_empty());
    assert_eq!(par_rec.spikes(), seq_rec.spikes());
    for (a, b) in par.neurons().iter().zip(seq.neurons()) {
        assert_eq!(a.membrane_potential().to_bits(), b.membrane_potential().to_bits());
    }
}
