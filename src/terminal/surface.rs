// ABOUTME: Terminal-emulation surface abstraction that attachments bind streams to
// Includes a headless vt100-backed surface with settable host geometry

use crate::terminal::resize::{CellMetrics, Grid, PixelBox};

/// Host-surface handle injected into an attachment.
///
/// Glyph rendering happens behind this trait; the attachment only feeds bytes
/// in, writes notices, and drives the grid size.
pub trait TerminalSurface {
    /// Displayed box of the host element, `None` while it is not laid out
    fn measure(&self) -> Option<PixelBox>;

    fn cell_metrics(&self) -> CellMetrics;

    /// Pixels the scrollbar takes from the available width
    fn scrollbar_width(&self) -> f64 {
        0.0
    }

    fn grid(&self) -> Grid;

    fn resize(&mut self, grid: Grid);

    /// Raw output bytes, in arrival order
    fn write(&mut self, bytes: &[u8]);

    /// A notice line generated locally
    fn write_line(&mut self, line: &str) {
        self.write(line.as_bytes());
        self.write(b"\r\n");
    }
}

impl<S: TerminalSurface + ?Sized> TerminalSurface for Box<S> {
    fn measure(&self) -> Option<PixelBox> {
        (**self).measure()
    }

    fn cell_metrics(&self) -> CellMetrics {
        (**self).cell_metrics()
    }

    fn scrollbar_width(&self) -> f64 {
        (**self).scrollbar_width()
    }

    fn grid(&self) -> Grid {
        (**self).grid()
    }

    fn resize(&mut self, grid: Grid) {
        (**self).resize(grid);
    }

    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes);
    }

    fn write_line(&mut self, line: &str) {
        (**self).write_line(line);
    }
}

/// Expand bare `\n` to `\r\n` so every line starts at column 0
pub fn convert_eol(bytes: &[u8]) -> Vec<u8> {
    let mut converted = Vec::with_capacity(bytes.len());
    let mut previous = 0u8;
    for &byte in bytes {
        if byte == b'\n' && previous != b'\r' {
            converted.push(b'\r');
        }
        converted.push(byte);
        previous = byte;
    }
    converted
}

/// Headless emulation surface backed by `vt100`.
pub struct Vt100Surface {
    parser: vt100::Parser,
    bounds: Option<PixelBox>,
    cell: CellMetrics,
    scrollbar_width: f64,
    resize_count: usize,
}

impl Vt100Surface {
    pub fn new(grid: Grid, cell: CellMetrics) -> Self {
        Self {
            parser: vt100::Parser::new(grid.rows, grid.cols, 1000),
            bounds: None,
            cell,
            scrollbar_width: 0.0,
            resize_count: 0,
        }
    }

    pub fn with_bounds(mut self, bounds: PixelBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_scrollbar_width(mut self, width: f64) -> Self {
        self.scrollbar_width = width;
        self
    }

    /// Change the host element's displayed box (layout change)
    pub fn set_bounds(&mut self, bounds: Option<PixelBox>) {
        self.bounds = bounds;
    }

    /// Visible screen contents as plain text
    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    /// Number of local resizes applied so far
    pub fn resize_count(&self) -> usize {
        self.resize_count
    }
}

impl TerminalSurface for Vt100Surface {
    fn measure(&self) -> Option<PixelBox> {
        self.bounds
    }

    fn cell_metrics(&self) -> CellMetrics {
        self.cell
    }

    fn scrollbar_width(&self) -> f64 {
        self.scrollbar_width
    }

    fn grid(&self) -> Grid {
        let (rows, cols) = self.parser.screen().size();
        Grid { cols, rows }
    }

    fn resize(&mut self, grid: Grid) {
        self.parser.set_size(grid.rows, grid.cols);
        self.resize_count += 1;
    }

    fn write(&mut self, bytes: &[u8]) {
        self.parser.process(&convert_eol(bytes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_eol() {
        assert_eq!(convert_eol(b"a\nb\n"), b"a\r\nb\r\n".to_vec());
        assert_eq!(convert_eol(b"a\r\nb"), b"a\r\nb".to_vec());
        assert_eq!(convert_eol(b"\n\n"), b"\r\n\r\n".to_vec());
        assert_eq!(convert_eol(b"no newline"), b"no newline".to_vec());
        assert!(convert_eol(b"").is_empty());
    }

    #[test]
    fn test_write_converts_line_endings() {
        let mut surface = Vt100Surface::new(Grid::new(20, 5), CellMetrics::UNIT);
        surface.write(b"first\nsecond\n");
        let contents = surface.contents();
        assert!(contents.starts_with("first\nsecond"));
    }

    #[test]
    fn test_write_line() {
        let mut surface = Vt100Surface::new(Grid::new(40, 5), CellMetrics::UNIT);
        surface.write_line("Connection closed");
        assert!(surface.contents().contains("Connection closed"));
    }

    #[test]
    fn test_resize_updates_grid() {
        let mut surface = Vt100Surface::new(Grid::new(80, 24), CellMetrics::UNIT);
        surface.resize(Grid::new(100, 30));
        assert_eq!(surface.grid(), Grid { cols: 100, rows: 30 });
        assert_eq!(surface.resize_count(), 1);
    }
}
