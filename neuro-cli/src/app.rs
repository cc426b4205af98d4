// Run state for the driver, including a circular per-neuron spike window.

use anyhow::Result;
use neuro_core::SpikeEvent;

use crate::backend::SimBackend;

pub struct App<B: SimBackend> {
    pub backend: B,
    pub tick: u64,
    pub width: usize,             // number of columns (time window)
    pub raster: Vec<Vec<bool>>,   // [neuron][col]
    pub totals: Vec<u64>,
}

impl<B: SimBackend> App<B> {
    pub fn new(backend: B, width: usize) -> Self {
        let n = backend.neurons();
        let width = width.max(1);
        Self {
            backend,
            tick: 0,
            width,
            raster: vec![vec![false; width]; n],
            totals: vec![0; n],
        }
    }

    /// Advance simulation by one tick and update the window column for it.
    pub fn step(&mut self) -> Result<()> {
        let spikes: Vec<SpikeEvent> = self.backend.step()?;

        let col = (self.tick as usize) % self.width;
        for row in self.raster.iter_mut() {
            row[col] = false;
        }
        for sp in spikes {
            let row = sp.neuron_id.index();
            if row < self.raster.len() {
                self.raster[row][col] = true;
                self.totals[row] += 1;
            }
        }

        self.tick = self.tick.saturating_add(1);
        Ok(())
    }

    /// Spikes per tick over the window, per neuron.
    pub fn window_rates(&self) -> Vec<f64> {
        let span = (self.tick as usize).min(self.width).max(1) as f64;
        self.raster
            .iter()
            .map(|row| row.iter().filter(|&&s| s).count() as f64 / span)
            .collect()
    }

    /// One line per neuron, `|` for a spike, `.` otherwise, oldest first.
    pub fn raster_lines(&self) -> Vec<String> {
        let filled = (self.tick as usize).min(self.width);
        let tick = self.tick as usize;
        let start = if tick < self.width { 0 } else { tick % self.width };
        self.raster
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let cells: String = (0..filled)
                    .map(|k| if row[(start + k) % self.width] { '|' } else { '.' })
                    .collect();
                format!("n{:02} {}", idx, cells)
            })
            .collect()
    }
}
