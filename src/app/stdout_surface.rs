// ABOUTME: Emulation surface backed by the local terminal
// The host terminal renders glyphs itself; sizes are measured in cells

use crate::terminal::{convert_eol, CellMetrics, Grid, PixelBox, TerminalSurface};
use std::io::{self, Write};
use tracing::warn;

pub struct StdoutSurface {
    grid: Grid,
}

impl StdoutSurface {
    pub fn new() -> Self {
        let grid = crossterm::terminal::size()
            .map(|(cols, rows)| Grid::new(cols, rows))
            .unwrap_or(Grid::new(80, 24));
        Self { grid }
    }
}

impl Default for StdoutSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalSurface for StdoutSurface {
    fn measure(&self) -> Option<PixelBox> {
        let (cols, rows) = crossterm::terminal::size().ok()?;
        Some(PixelBox {
            width: f64::from(cols),
            height: f64::from(rows),
        })
    }

    fn cell_metrics(&self) -> CellMetrics {
        CellMetrics::UNIT
    }

    fn grid(&self) -> Grid {
        self.grid
    }

    fn resize(&mut self, grid: Grid) {
        // the host terminal already has this size
        self.grid = grid;
    }

    fn write(&mut self, bytes: &[u8]) {
        // raw mode: the host terminal no longer returns the carriage on \n
        let converted = convert_eol(bytes);
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout.write_all(&converted).and_then(|()| stdout.flush()) {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}
