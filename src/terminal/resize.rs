// ABOUTME: Resize negotiation - grid computation from pixel geometry and the resize side channel
// Failed negotiations are logged and swallowed; only the latest grid is ever sent

use crate::terminal::error::ResizeError;
use crate::terminal::protocol;
use futures_util::future::BoxFuture;
use reqwest::Url;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Smallest grid the emulation surface accepts input on
pub const MIN_COLS: u16 = 2;
pub const MIN_ROWS: u16 = 1;

/// Largest grid applied locally or sent to the remote side
pub const MAX_COLS: u16 = 1000;
pub const MAX_ROWS: u16 = 500;

/// Terminal grid in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid {
    pub cols: u16,
    pub rows: u16,
}

impl Grid {
    pub const MIN: Grid = Grid {
        cols: MIN_COLS,
        rows: MIN_ROWS,
    };

    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: cols.max(MIN_COLS),
            rows: rows.max(MIN_ROWS),
        }
    }
}

/// Displayed box of the host element, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub width: f64,
    pub height: f64,
}

/// Size of one rendered character cell, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub width: f64,
    pub height: f64,
}

impl CellMetrics {
    /// One pixel per cell, for surfaces that already measure in cells
    pub const UNIT: CellMetrics = CellMetrics {
        width: 1.0,
        height: 1.0,
    };
}

/// Compute the grid that fits a pixel box.
///
/// Never returns less than [`MIN_COLS`] x [`MIN_ROWS`], whatever the inputs:
/// degenerate cell sizes and negative or NaN widths all collapse to the floor.
/// Huge boxes or tiny cells clamp to [`MAX_COLS`] x [`MAX_ROWS`].
pub fn compute_grid(
    pixel_width: f64,
    pixel_height: f64,
    cell_width: f64,
    cell_height: f64,
    scrollbar_width: f64,
) -> Grid {
    Grid {
        cols: fit(pixel_width - scrollbar_width, cell_width).clamp(MIN_COLS, MAX_COLS),
        rows: fit(pixel_height, cell_height).clamp(MIN_ROWS, MAX_ROWS),
    }
}

fn fit(available: f64, cell: f64) -> u16 {
    if !(cell > 0.0) || !(available > 0.0) {
        return 0;
    }
    let cells = (available / cell).floor();
    if cells >= f64::from(u16::MAX) {
        u16::MAX
    } else {
        // in range and non-negative after the checks above
        cells as u16
    }
}

/// Grid for a measured box and the surface's cell metrics
pub fn grid_for(bounds: PixelBox, cell: CellMetrics, scrollbar_width: f64) -> Grid {
    compute_grid(bounds.width, bounds.height, cell.width, cell.height, scrollbar_width)
}

/// Transport for the resize side channel.
#[cfg_attr(test, mockall::automock)]
pub trait ResizeSink: Send + Sync {
    fn send_resize(&self, resize_id: &str, grid: Grid) -> BoxFuture<'static, Result<(), ResizeError>>;
}

/// Resize side channel over HTTP, addressed relative to the stream's host
pub struct HttpResizeSink {
    client: reqwest::Client,
    api_url: Url,
    auth_token: Option<String>,
}

impl HttpResizeSink {
    pub fn new(api_url: Url, auth_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            auth_token,
        }
    }
}

impl ResizeSink for HttpResizeSink {
    fn send_resize(&self, resize_id: &str, grid: Grid) -> BoxFuture<'static, Result<(), ResizeError>> {
        let url = protocol::resize_url(&self.api_url, resize_id, grid);
        let client = self.client.clone();
        let auth_token = self.auth_token.clone();

        Box::pin(async move {
            let mut request = client.post(url?);
            if let Some(token) = auth_token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(ResizeError::Rejected(response.status().as_u16()));
            }
            Ok(())
        })
    }
}

/// Per-attachment resize state.
///
/// The resize id is generated once and stays stable for the attachment's
/// lifetime so the server can route resizes to the right pseudo-terminal.
pub struct ResizeNegotiator {
    resize_id: String,
    sink: Arc<dyn ResizeSink>,
    last_applied: Option<Grid>,
}

impl ResizeNegotiator {
    pub fn new(sink: Arc<dyn ResizeSink>) -> Self {
        Self::with_id(Uuid::new_v4().simple().to_string(), sink)
    }

    pub fn with_id(resize_id: String, sink: Arc<dyn ResizeSink>) -> Self {
        Self {
            resize_id,
            sink,
            last_applied: None,
        }
    }

    pub fn resize_id(&self) -> &str {
        &self.resize_id
    }

    pub fn last_applied(&self) -> Option<Grid> {
        self.last_applied
    }

    /// Negotiate `grid` unless it is what the remote side already has.
    ///
    /// Returns the handle of the in-flight request, if one was sent.
    pub fn apply(&mut self, grid: Grid) -> Option<JoinHandle<()>> {
        if self.last_applied == Some(grid) {
            return None;
        }
        self.last_applied = Some(grid);
        Some(self.negotiate(grid))
    }

    /// Fire-and-forget resize request; errors are logged only.
    ///
    /// Superseded requests are not cancelled; the latest one to land wins.
    pub fn negotiate(&self, grid: Grid) -> JoinHandle<()> {
        let request = self.sink.send_resize(&self.resize_id, grid);
        let resize_id = self.resize_id.clone();

        tokio::spawn(async move {
            match request.await {
                Ok(()) => debug!(resize_id = %resize_id, cols = grid.cols, rows = grid.rows, "Resize negotiated"),
                Err(e) => warn!(resize_id = %resize_id, "Resize negotiation failed: {}", e),
            }
        })
    }
}
