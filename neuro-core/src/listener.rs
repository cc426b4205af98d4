//! Firing listeners and best-effort fan-out.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::error::ListenerError;
use crate::neuron::NeuronId;

/// Something that wants to know when a neuron fires (synapses, monitors).
///
/// Implementations are shared across worker threads during the fire phase,
/// so any state they write must be synchronized.
pub trait Listener: Send + Sync {
    fn on_fire(&self, source: NeuronId, time: f64) -> Result<(), ListenerError>;
}

impl<F> Listener for F
where
    F: Fn(NeuronId, f64) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_fire(&self, source: NeuronId, time: f64) -> Result<(), ListenerError> {
        self(source, time)
    }
}

/// Outcome of one `fire` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FireReport {
    pub notified: usize,
    /// (listener index, error) for every listener that failed.
    pub failures: Vec<(usize, ListenerError)>,
}

impl FireReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Notify every listener once, in registration order.
///
/// A failing or panicking listener is recorded and skipped; it never stops
/// the remaining notifications.
pub fn notify_all(
    listeners: &[Arc<dyn Listener>],
    source: NeuronId,
    time: f64,
) -> FireReport {
    let mut report = FireReport::default();
    for (idx, listener) in listeners.iter().enumerate() {
        let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_fire(source, time)))
            .unwrap_or_else(|payload| {
                Err(ListenerError::Panicked(panic_message(payload.as_ref())))
            });
        match outcome {
            Ok(()) => report.notified += 1,
            Err(err) => {
                warn!(neuron = %source, listener = idx, error = %err, "listener failed");
                report.failures.push((idx, err));
            }
        }
    }
    report
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
