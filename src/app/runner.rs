// ABOUTME: Event loop for the command-line client
// Pumps one session view, forwards keystrokes, and re-measures on terminal resize

use crate::app::keys;
use crate::app::stdout_surface::StdoutSurface;
use crate::config::Config;
use crate::models::{SelectionEvent, SessionDescriptor};
use crate::session::SessionView;
use crate::terminal::{HttpResizeSink, StreamError, WebSocketConnector};
use anyhow::{anyhow, Result};
use crossterm::event::{self, Event, KeyEventKind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(50);

pub struct Runner {
    view: SessionView<StdoutSurface>,
}

impl Runner {
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let resize_sink = Arc::new(HttpResizeSink::new(
            endpoint.base_url().clone(),
            config.api.auth_token.clone(),
        ));

        let view = SessionView::new(
            endpoint,
            config.api.namespace.clone(),
            config.attachment_options(),
            Arc::new(WebSocketConnector::new()),
            resize_sink,
            Box::new(|_: &SessionDescriptor| Some(StdoutSurface::new())),
        );

        Ok(Self { view })
    }

    /// Open the selected session and run until it closes or the user detaches
    pub async fn run(&mut self, selection: SelectionEvent) -> Result<()> {
        self.view.select(selection);
        let key = self
            .view
            .highlighted()
            .cloned()
            .ok_or_else(|| anyhow!("Selection does not name a session"))?;
        info!(session = %key, "Session opened");

        let mut last_tick = Instant::now();
        loop {
            let timeout = TICK_RATE
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
                        if keys::is_detach(&key_event) {
                            info!("Detached by user");
                            break;
                        }
                        if let Some(bytes) = keys::encode_key(&key_event) {
                            match self.view.send_input(bytes) {
                                Ok(()) | Err(StreamError::ReadOnly) => {}
                                Err(e) => debug!("Input dropped: {}", e),
                            }
                        }
                    }
                    Event::Resize(_, _) => self.view.on_layout_change(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= TICK_RATE {
                self.view.pump();
                last_tick = Instant::now();
            }

            if self.view.registry().get(&key).is_none() {
                info!(session = %key, "Session closed");
                break;
            }

            // yield so stream tasks on this worker get a turn
            tokio::task::yield_now().await;
        }

        self.view.close();
        Ok(())
    }
}
