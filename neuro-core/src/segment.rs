//! Membrane segments: the addressable units of membrane a neuron is built from.
//!
//! A segment handles local biophysics. In the simplest case (`SimpleSegment`)
//! it carries a potential that is prescribed entirely from outside, which is
//! what point models such as the IAF neuron need.

use core::fmt::Debug;

/// Capability shared by every segment variant.
///
/// Future channel-gated compartments implement the same contract, so neuron
/// logic never needs to know which variant it owns.
pub trait Segment: Debug + Send + Sync {
    /// Current membrane potential. Pure.
    fn membrane_potential(&self) -> f64;

    /// Overwrite the potential unconditionally. Callers pass finite values.
    fn set_membrane_potential(&mut self, v: f64);

    /// Apply `v` as the new potential and report the resulting value.
    ///
    /// This is set-and-return, not additive: after the call the potential is
    /// exactly `v`. Integration happens in the neuron model, not here.
    fn increment_membrane_potential(&mut self, v: f64) -> f64 {
        self.set_membrane_potential(v);
        self.membrane_potential()
    }
}

/// Segment whose potential is driven purely by its owner; no channels, no leak.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimpleSegment {
    membrane_potential: f64,
}

impl SimpleSegment {
    pub fn new(membrane_potential: f64) -> Self {
        Self { membrane_potential }
    }
}

impl Segment for SimpleSegment {
    #[inline]
    fn membrane_potential(&self) -> f64 {
        self.membrane_potential
    }

    #[inline]
    fn set_membrane_potential(&mut self, v: f64) {
        self.membrane_potential = v;
    }
}
