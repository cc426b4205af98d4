//! Per-neuron input-current accumulators with a one-tick hand-over.
//!
//! Semantics:
//! - Phase 1 of tick t reads `current + bias` for each neuron.
//! - Phase 2 of tick t writes into `pending` (delay 1) or the delay wheel
//!   (delay > 1). Nothing written in Phase 2 is visible before tick t + 1.
//! - `advance` is the barrier hand-over between ticks.

use std::sync::atomic::{AtomicU64, Ordering};

use neuro_core::{ListenerError, NeuronId, TimeWheel};
use parking_lot::{Mutex, RwLock};
use tracing::trace;

/// `f64` stored as raw bits; adds are compare-and-swap loops.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    #[inline]
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Release);
    }

    #[inline]
    fn take(&self) -> f64 {
        f64::from_bits(self.0.swap(0f64.to_bits(), Ordering::AcqRel))
    }

    #[inline]
    fn fetch_add(&self, delta: f64) {
        let mut old = self.0.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(old) + delta).to_bits();
            match self.0.compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return,
                Err(actual) => old = actual,
            }
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    current: AtomicF64,
    pending: AtomicF64,
    bias: AtomicF64,
}

pub struct InputCurrents {
    slots: RwLock<Vec<Slot>>,
    // Keyed by the tick the current becomes visible; its cursor is always
    // the next tick to hand over.
    delayed: Mutex<TimeWheel<(NeuronId, f64)>>,
}

impl InputCurrents {
    pub fn new(wheel_size: u64) -> Self {
        let mut wheel = TimeWheel::new(wheel_size);
        // Tick 0 is already current; align the cursor with tick 1.
        let _ = wheel.next();
        Self {
            slots: RwLock::new(Vec::new()),
            delayed: Mutex::new(wheel),
        }
    }

    /// Longest synaptic delay the wheel can hold, in ticks.
    pub fn max_delay(&self) -> u64 {
        self.delayed.lock().horizon() + 1
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow to hold at least `len` neurons.
    pub fn ensure_len(&self, len: usize) {
        let mut slots = self.slots.write();
        if slots.len() < len {
            slots.resize_with(len, Slot::default);
        }
    }

    /// Net current Phase 1 should feed neuron `id` this tick.
    pub fn input_for(&self, id: NeuronId) -> f64 {
        self.slots
            .read()
            .get(id.index())
            .map(|s| s.current.load() + s.bias.load())
            .unwrap_or(0.0)
    }

    /// Constant external stimulus, applied every tick until changed.
    pub fn set_bias(&self, id: NeuronId, current: f64) -> Result<(), ListenerError> {
        let slots = self.slots.read();
        let slot = slots.get(id.index()).ok_or(ListenerError::UnknownTarget(id))?;
        slot.bias.store(current);
        Ok(())
    }

    pub fn bias(&self, id: NeuronId) -> f64 {
        self.slots.read().get(id.index()).map(|s| s.bias.load()).unwrap_or(0.0)
    }

    /// Add `amount` to `target`'s input `delay` ticks after the tick now firing.
    pub fn deliver(&self, target: NeuronId, amount: f64, delay: u64) -> Result<(), ListenerError> {
        let slots = self.slots.read();
        let slot = slots.get(target.index()).ok_or(ListenerError::UnknownTarget(target))?;
        match delay {
            0 => Err(ListenerError::Rejected(
                "zero delay would leak into the current tick".into(),
            )),
            1 => {
                slot.pending.fetch_add(amount);
                Ok(())
            }
            _ => {
                let mut wheel = self.delayed.lock();
                let due = wheel.current_tick() + delay - 1;
                wheel.schedule(due, (target, amount)).map_err(|_| {
                    ListenerError::Rejected(format!("delay {delay} beyond wheel horizon"))
                })
            }
        }
    }

    /// Current injected by an external source for the next tick.
    pub fn inject(&self, target: NeuronId, amount: f64) -> Result<(), ListenerError> {
        self.deliver(target, amount, 1)
    }

    /// Hand everything due next tick over to the read side.
    pub fn advance(&self) {
        let due = self.delayed.lock().next();
        let slots = self.slots.read();
        for (target, amount) in due {
            if let Some(slot) = slots.get(target.index()) {
                slot.pending.fetch_add(amount);
            }
        }
        for slot in slots.iter() {
            slot.current.store(slot.pending.take());
        }
        trace!(neurons = slots.len(), "input currents advanced");
    }

    /// Deliveries still waiting in the delay wheel.
    pub fn delayed_pending(&self) -> usize {
        self.delayed.lock().pending()
    }
}

impl Default for InputCurrents {
    fn default() -> Self {
        Self::new(64)
    }
}
