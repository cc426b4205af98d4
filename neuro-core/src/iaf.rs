//! Leaky integrate-and-fire neuron over a single segment.
//!
//! ```text
//! V_new = V + dt * ( -(V - V_rest) / tau_m + I_syn / C_m )
//!
//! if V_new >= V_threshold:
//!     V <- V_reset, refractory for round(refractory_period / dt) steps
//! else:
//!     V <- V_new
//! ```
//!
//! Integration is forward Euler so results are bit-for-bit reproducible.

use std::sync::{Arc, OnceLock};

use tracing::{debug, error, trace};

use crate::error::{ConfigError, ConfigResult, NeuronError, StepResult};
use crate::listener::{notify_all, FireReport, Listener};
use crate::neuron::{Neuron, NeuronId, NeuronState, StepContext, StepOutcome};
use crate::segment::{Segment, SimpleSegment};

/// Per-step tracing, enabled with `NEURO_TRACE_STEPS=1`.
fn trace_steps() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var("NEURO_TRACE_STEPS")
            .ok()
            .as_deref()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// IAF model parameters. Time values share the driver's `dt` unit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IafParams {
    pub resting_potential: f64,
    pub threshold: f64,
    pub reset_potential: f64,
    /// Membrane time constant (tau_m).
    pub tau_m: f64,
    /// Membrane capacitance (C_m).
    pub capacitance: f64,
    pub refractory_period: f64,
}

impl Default for IafParams {
    fn default() -> Self {
        Self {
            resting_potential: 0.0,
            threshold: 1.0,
            reset_potential: 0.0,
            tau_m: 10.0,
            capacitance: 1.0,
            refractory_period: 2.0,
        }
    }
}

impl IafParams {
    pub fn with_resting_potential(mut self, v: f64) -> Self {
        self.resting_potential = v;
        self
    }

    pub fn with_threshold(mut self, v: f64) -> Self {
        self.threshold = v;
        self
    }

    pub fn with_reset_potential(mut self, v: f64) -> Self {
        self.reset_potential = v;
        self
    }

    pub fn with_tau_m(mut self, tau_m: f64) -> Self {
        self.tau_m = tau_m;
        self
    }

    pub fn with_capacitance(mut self, c_m: f64) -> Self {
        self.capacitance = c_m;
        self
    }

    pub fn with_refractory_period(mut self, period: f64) -> Self {
        self.refractory_period = period;
        self
    }

    /// Leak conductance g_L = C_m / tau_m.
    pub fn leak_conductance(&self) -> f64 {
        self.capacitance / self.tau_m
    }

    /// Steady-state potential under a constant input current.
    pub fn steady_state(&self, input_current: f64) -> f64 {
        self.resting_potential + input_current * self.tau_m / self.capacitance
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let fields = [
            ("resting_potential", self.resting_potential),
            ("threshold", self.threshold),
            ("reset_potential", self.reset_potential),
            ("tau_m", self.tau_m),
            ("capacitance", self.capacitance),
            ("refractory_period", self.refractory_period),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { name, value });
            }
        }
        if self.tau_m <= 0.0 {
            return Err(ConfigError::NonPositiveTimeConstant(self.tau_m));
        }
        if self.capacitance <= 0.0 {
            return Err(ConfigError::NonPositiveCapacitance(self.capacitance));
        }
        if self.reset_potential >= self.threshold {
            return Err(ConfigError::ResetNotBelowThreshold {
                reset: self.reset_potential,
                threshold: self.threshold,
            });
        }
        if self.refractory_period < 0.0 {
            return Err(ConfigError::NegativeRefractoryPeriod(self.refractory_period));
        }
        Ok(())
    }
}

pub struct IafNeuron {
    id: NeuronId,
    params: IafParams,
    segments: Vec<Box<dyn Segment>>,
    listeners: Vec<Arc<dyn Listener>>,
    state: NeuronState,
    refractory_remaining: u32,
    spiked: bool,
}

impl IafNeuron {
    /// Build a neuron at rest on a `SimpleSegment`.
    pub fn new(id: NeuronId, params: IafParams) -> ConfigResult<Self> {
        Self::with_segment(id, params, Box::new(SimpleSegment::default()))
    }

    /// Build a neuron on a caller-supplied segment; the segment is reset to
    /// the resting potential.
    pub fn with_segment(
        id: NeuronId,
        params: IafParams,
        mut segment: Box<dyn Segment>,
    ) -> ConfigResult<Self> {
        params.validate()?;
        segment.set_membrane_potential(params.resting_potential);
        debug!(neuron = %id, ?params, "created IAF neuron");
        Ok(Self {
            id,
            params,
            segments: vec![segment],
            listeners: Vec::new(),
            state: NeuronState::Resting,
            refractory_remaining: 0,
            spiked: false,
        })
    }

    pub fn params(&self) -> &IafParams {
        &self.params
    }

    pub fn refractory_remaining(&self) -> u32 {
        self.refractory_remaining
    }

    fn primary(&self) -> &dyn Segment {
        self.segments[0].as_ref()
    }

    fn primary_mut(&mut self) -> &mut dyn Segment {
        self.segments[0].as_mut()
    }

    fn refractory_steps(&self, dt: f64) -> u32 {
        // Saturating float-to-int cast; validated params keep this non-negative.
        (self.params.refractory_period / dt).round() as u32
    }

    fn outcome(&self) -> StepOutcome {
        StepOutcome {
            spiked: self.spiked,
            potential: self.primary().membrane_potential(),
            state: self.state,
        }
    }
}

impl Neuron for IafNeuron {
    fn id(&self) -> NeuronId {
        self.id
    }

    fn step(&mut self, ctx: &StepContext) -> StepResult<StepOutcome> {
        if !(ctx.dt.is_finite() && ctx.dt > 0.0) {
            return Err(NeuronError::InvalidTimestep(ctx.dt));
        }
        self.spiked = false;

        if self.state == NeuronState::Refractory {
            // Input is ignored while refractory; a corrupted segment is not.
            let v = self.primary().membrane_potential();
            if !v.is_finite() {
                error!(neuron = %self.id, tick = ctx.tick, v, "degenerate while refractory");
                return Err(NeuronError::NumericDegeneracy {
                    neuron: self.id,
                    value: v,
                    tick: ctx.tick,
                });
            }
            self.refractory_remaining = self.refractory_remaining.saturating_sub(1);
            if self.refractory_remaining == 0 {
                self.state = NeuronState::Resting;
            }
            return Ok(self.outcome());
        }

        let p = &self.params;
        let v = self.primary().membrane_potential();
        let leak = -(v - p.resting_potential) / p.tau_m;
        let v_new = v + ctx.dt * (leak + ctx.input_current / p.capacitance);

        if !v_new.is_finite() {
            error!(
                neuron = %self.id,
                tick = ctx.tick,
                v,
                input = ctx.input_current,
                "numeric degeneracy"
            );
            return Err(NeuronError::NumericDegeneracy {
                neuron: self.id,
                value: v_new,
                tick: ctx.tick,
            });
        }

        if v_new >= p.threshold {
            let reset = p.reset_potential;
            let steps = self.refractory_steps(ctx.dt);
            self.primary_mut().set_membrane_potential(reset);
            self.spiked = true;
            self.refractory_remaining = steps;
            self.state = if steps > 0 { NeuronState::Refractory } else { NeuronState::Resting };
            trace!(
                neuron = %self.id,
                tick = ctx.tick,
                v_new,
                refractory_steps = steps,
                "threshold crossed"
            );
        } else {
            let committed = self.primary_mut().increment_membrane_potential(v_new);
            self.state = if committed == self.params.resting_potential && ctx.input_current == 0.0 {
                NeuronState::Resting
            } else {
                NeuronState::Integrating
            };
        }

        if trace_steps() {
            trace!(neuron = %self.id, tick = ctx.tick, v, v_new, state = ?self.state, "step");
        }
        Ok(self.outcome())
    }

    fn has_spiked(&self) -> bool {
        self.spiked
    }

    fn fire(&self, time: f64) -> FireReport {
        trace!(neuron = %self.id, time, listeners = self.listeners.len(), "fire");
        notify_all(&self.listeners, self.id, time)
    }

    fn segments(&self) -> &[Box<dyn Segment>] {
        &self.segments
    }

    fn add_listener(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    fn state(&self) -> NeuronState {
        self.state
    }
}
