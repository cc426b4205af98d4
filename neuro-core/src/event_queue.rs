//! Time wheel (calendar queue) and spike event

use crate::neuron::NeuronId;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpikeEvent {
    pub neuron_id: NeuronId,
    pub tick: u64,
    pub time: f64,
}

/// Fixed-horizon calendar queue keyed by tick.
///
/// Events may be scheduled from the current tick up to `wheel_size - 1`
/// ticks ahead; anything else would alias an occupied slot.
pub struct TimeWheel<E> {
    buckets: Vec<Vec<E>>,
    current_tick: u64,
    wheel_size: u64,
}

impl<E> TimeWheel<E> {
    pub fn new(wheel_size: u64) -> Self {
        let wheel_size = wheel_size.max(1);
        let mut buckets = Vec::with_capacity(wheel_size as usize);
        for _ in 0..wheel_size {
            buckets.push(Vec::new());
        }
        Self {
            buckets,
            current_tick: 0,
            wheel_size,
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn horizon(&self) -> u64 {
        self.wheel_size - 1
    }

    /// Schedule `event` for `tick`. Returns the event back if `tick` is in the
    /// past or beyond the wheel horizon.
    #[inline]
    pub fn schedule(&mut self, tick: u64, event: E) -> Result<(), E> {
        if tick < self.current_tick || tick - self.current_tick > self.horizon() {
            return Err(event);
        }
        let slot = (tick % self.wheel_size) as usize;
        self.buckets[slot].push(event);
        Ok(())
    }

    /// Return all events scheduled at the current tick, then advance time by 1 tick.
    pub fn next(&mut self) -> Vec<E> {
        let slot = (self.current_tick % self.wheel_size) as usize;
        let events = core::mem::take(&mut self.buckets[slot]);
        self.current_tick = self.current_tick.saturating_add(1);
        events
    }

    /// Events waiting across all slots.
    pub fn pending(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}
