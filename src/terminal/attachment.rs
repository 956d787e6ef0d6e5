// ABOUTME: Terminal attachment - binds one session stream to one emulation surface
// Drives resize on layout change, renders stream notices, and reports closure through a callback

use crate::models::{CloseReason, SessionDescriptor, SessionKey};
use crate::terminal::error::StreamError;
use crate::terminal::protocol::{self, StreamEvent};
use crate::terminal::resize::{self, Grid, ResizeNegotiator, ResizeSink};
use crate::terminal::stream::{StreamConnector, StreamHandle};
use crate::terminal::surface::TerminalSurface;
use reqwest::Url;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Close notification back to the owning view
pub type CloseCallback = Arc<dyn Fn(CloseReason) + Send + Sync>;

/// Lifecycle of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentState {
    /// No surface bound yet
    Unattached,
    /// Stream opened, waiting for the first visible layout measurement
    Attaching,
    /// Stream and surface bound, grid applied
    Attached,
    /// Stream gone or attachment torn down
    Closed,
}

/// What happens when the stream goes away
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentOptions {
    pub close_on_connection_lost: bool,
    /// Delay before the close callback fires after a lost connection
    pub close_delay: Option<Duration>,
    /// Negotiate the grid with the remote pseudo-terminal
    pub remote_resize: bool,
}

pub struct TerminalAttachment<S: TerminalSurface> {
    key: SessionKey,
    stream_url: Url,
    interactive: bool,
    visible: bool,
    fullscreen: bool,
    options: AttachmentOptions,
    state: AttachmentState,

    surface: Option<S>,
    connector: Arc<dyn StreamConnector>,
    stream: Option<StreamHandle>,
    negotiator: ResizeNegotiator,

    /// A measurement was skipped while hidden and must be replayed on reveal
    needs_layout: bool,
    /// Layout-change listener is subscribed
    listening: bool,

    closed: Arc<AtomicBool>,
    on_close: Option<CloseCallback>,
    pending_close: Option<JoinHandle<()>>,
}

impl<S: TerminalSurface> TerminalAttachment<S> {
    pub fn new(
        descriptor: &SessionDescriptor,
        options: AttachmentOptions,
        connector: Arc<dyn StreamConnector>,
        resize_sink: Arc<dyn ResizeSink>,
    ) -> Self {
        Self {
            key: descriptor.key.clone(),
            stream_url: descriptor.stream_url.clone(),
            interactive: descriptor.is_interactive(),
            visible: descriptor.visible,
            fullscreen: false,
            options,
            state: AttachmentState::Unattached,
            surface: None,
            connector,
            stream: None,
            negotiator: ResizeNegotiator::new(resize_sink),
            needs_layout: false,
            listening: false,
            closed: Arc::new(AtomicBool::new(false)),
            on_close: None,
            pending_close: None,
        }
    }

    pub fn with_on_close(mut self, on_close: CloseCallback) -> Self {
        self.on_close = Some(on_close);
        self
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn state(&self) -> AttachmentState {
        if self.is_closed() {
            AttachmentState::Closed
        } else {
            self.state
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// True once the attachment has been torn down
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn needs_layout(&self) -> bool {
        self.needs_layout
    }

    pub fn resize_id(&self) -> &str {
        self.negotiator.resize_id()
    }

    /// Grid most recently negotiated with the remote side
    pub fn negotiated_grid(&self) -> Option<Grid> {
        self.negotiator.last_applied()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// Remote resize only makes sense for sessions backed by a pseudo-terminal
    fn is_resizable(&self) -> bool {
        self.options.remote_resize && self.interactive
    }

    /// Bind the surface and open the stream. Binds exactly once.
    ///
    /// A missing host surface is a silent no-op; the caller retries once it exists.
    pub fn attach(&mut self, surface: Option<S>) {
        let Some(surface) = surface else {
            debug!(session = %self.key, "Host surface not available yet, deferring attach");
            return;
        };

        if self.state != AttachmentState::Unattached || self.is_closed() {
            debug!(session = %self.key, "Attachment already bound, ignoring attach");
            return;
        }

        self.state = AttachmentState::Attaching;
        self.surface = Some(surface);

        let url = if self.is_resizable() {
            protocol::with_resize_id(&self.stream_url, self.negotiator.resize_id())
        } else {
            self.stream_url.clone()
        };

        info!(session = %self.key, "Opening stream {}", url);
        self.stream = Some(self.connector.open(&url, self.interactive));
        self.listening = true;

        self.on_layout_change();
    }

    /// Re-measure the host surface and apply the resulting grid.
    ///
    /// Deferred while hidden: a hidden surface measures as zero and would
    /// collapse the grid to the floor values.
    pub fn on_layout_change(&mut self) {
        if !self.listening || self.is_closed() {
            return;
        }

        if !self.visible {
            self.needs_layout = true;
            return;
        }

        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        let Some(bounds) = surface.measure() else {
            self.needs_layout = true;
            return;
        };

        let grid = resize::grid_for(bounds, surface.cell_metrics(), surface.scrollbar_width());
        if surface.grid() != grid {
            debug!(session = %self.key, cols = grid.cols, rows = grid.rows, "Resizing surface");
            surface.resize(grid);
        }

        let stream_open = self.stream.as_ref().is_some_and(StreamHandle::is_open);
        if self.is_resizable() && stream_open {
            self.negotiator.apply(grid);
        }

        self.needs_layout = false;
        if self.state == AttachmentState::Attaching {
            self.state = AttachmentState::Attached;
            info!(session = %self.key, cols = grid.cols, rows = grid.rows, "Attachment ready");
        }
    }

    /// Foreground/background switch from the registry
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible && self.needs_layout {
            self.on_layout_change();
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        self.on_layout_change();
    }

    /// Deliver pending stream events to the surface, in arrival order.
    ///
    /// Returns the number of events processed.
    pub fn pump(&mut self) -> usize {
        if self.is_closed() {
            return 0;
        }

        let mut processed = 0;
        while let Some(event) = self.stream.as_mut().and_then(StreamHandle::try_next) {
            processed += 1;
            match event {
                StreamEvent::Data(bytes) => {
                    if let Some(surface) = self.surface.as_mut() {
                        surface.write(&bytes);
                    }
                }
                StreamEvent::Error(message) => {
                    self.write_notice(&format!("\u{1b}[31m{}", message));
                }
                StreamEvent::Closed { had_error } => {
                    self.stream = None;
                    self.on_stream_closed(had_error);
                }
            }
        }
        processed
    }

    /// Stream went away on the remote side.
    ///
    /// With both a close delay and close-on-loss, the close is announced and
    /// deferred; with close-on-loss alone it fires immediately; otherwise the
    /// terminal stays open showing the notice.
    pub fn on_stream_closed(&mut self, had_error: bool) {
        if self.is_closed() {
            return;
        }

        info!(session = %self.key, had_error, "Stream closed");
        self.state = AttachmentState::Closed;

        if let (Some(delay), true, Some(on_close)) = (
            self.options.close_delay.filter(|d| !d.is_zero()),
            self.options.close_on_connection_lost,
            self.on_close.clone(),
        ) {
            self.write_notice(&format!(
                "Connection closed, will close in {} seconds",
                delay.as_secs_f64()
            ));

            let closed = self.closed.clone();
            self.pending_close = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if !closed.load(Ordering::SeqCst) {
                    on_close(CloseReason::Lost);
                }
            }));
            return;
        }

        self.write_notice("Connection closed");
        if self.options.close_on_connection_lost {
            if let Some(on_close) = &self.on_close {
                on_close(CloseReason::Lost);
            }
        }
    }

    /// Keystrokes from the user; only interactive sessions forward them
    pub fn send_input(&self, bytes: Vec<u8>) -> Result<(), StreamError> {
        if !self.interactive {
            return Err(StreamError::ReadOnly);
        }
        match &self.stream {
            Some(stream) => stream.send(bytes),
            None => Err(StreamError::Closed),
        }
    }

    /// User asked to kill the terminal
    pub fn kill(&mut self) {
        if self.is_closed() {
            return;
        }

        info!(session = %self.key, "Terminal killed by user");
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        self.state = AttachmentState::Closed;
        if let Some(on_close) = self.on_close.clone() {
            on_close(CloseReason::Manual);
        }
    }

    /// Tear down: unsubscribe from layout changes, drop observers, close the stream.
    /// Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!(session = %self.key, "Closing attachment");
        self.listening = false;
        self.on_close = None;
        if let Some(pending) = self.pending_close.take() {
            pending.abort();
        }
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        self.state = AttachmentState::Closed;
    }

    fn write_notice(&mut self, line: &str) {
        match self.surface.as_mut() {
            Some(surface) => surface.write_line(line),
            None => warn!(session = %self.key, "No surface for notice: {}", line),
        }
    }
}

impl<S: TerminalSurface> Drop for TerminalAttachment<S> {
    fn drop(&mut self) {
        self.close();
    }
}
