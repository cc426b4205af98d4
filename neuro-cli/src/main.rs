//! Headless driver: steps a small demo population and logs spike activity.
//! Log level follows `RUST_LOG` (default `info`).

mod app;
mod backend;

use anyhow::Result;
use app::App;
use backend::{CoreBackend, SimBackend};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TICKS: u64 = 200;
const WINDOW: usize = 80;

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let backend = CoreBackend::new()?;
    info!(
        neurons = backend.neurons(),
        dt = backend.simulation().config().dt,
        ticks = TICKS,
        "starting run"
    );

    let mut app = App::new(backend, WINDOW);
    for _ in 0..TICKS {
        app.step()?;
    }

    let potentials = app.backend.potentials();
    let rates = app.window_rates();
    for (idx, (total, rate)) in app.totals.iter().zip(&rates).enumerate() {
        info!(
            neuron = idx,
            spikes = total,
            window_rate = *rate,
            potential = potentials.get(idx).copied().unwrap_or(f64::NAN),
            "summary"
        );
    }
    for line in app.raster_lines() {
        info!("{line}");
    }
    Ok(())
}
