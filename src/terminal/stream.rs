// ABOUTME: Bidirectional byte-stream transport behind each terminal attachment
// Provides the injected stream factory trait and the WebSocket implementation

use crate::terminal::error::StreamError;
use crate::terminal::protocol::StreamEvent;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, error, info, warn};

/// Stream factory injected into attachments.
///
/// `open` must not block: connection progress and failures are reported as
/// [`StreamEvent`]s on the returned handle.
pub trait StreamConnector: Send + Sync {
    fn open(&self, url: &Url, bidirectional: bool) -> StreamHandle;
}

/// The attachment's end of a stream.
pub struct StreamHandle {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    input: Option<mpsc::UnboundedSender<Vec<u8>>>,
    shutdown: Option<oneshot::Sender<()>>,
    finished: bool,
}

/// The transport's end of a stream.
pub struct StreamPeer {
    pub events: mpsc::UnboundedSender<StreamEvent>,
    /// Keystrokes from the attachment; `None` for read-only streams
    pub input: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    /// Resolves when the attachment closes its end
    pub shutdown: oneshot::Receiver<()>,
}

impl StreamHandle {
    /// Create a connected handle/peer pair
    pub fn pair(bidirectional: bool) -> (StreamHandle, StreamPeer) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (input_tx, input_rx) = if bidirectional {
            let (tx, rx) = mpsc::unbounded_channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        (
            StreamHandle {
                events: events_rx,
                input: input_tx,
                shutdown: Some(shutdown_tx),
                finished: false,
            },
            StreamPeer {
                events: events_tx,
                input: input_rx,
                shutdown: shutdown_rx,
            },
        )
    }

    pub fn is_bidirectional(&self) -> bool {
        self.input.is_some()
    }

    /// True until the stream has reported `Closed` or been closed locally
    pub fn is_open(&self) -> bool {
        !self.finished && self.shutdown.is_some()
    }

    /// Next inbound event without waiting
    pub fn try_next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        match self.events.try_recv() {
            Ok(event) => {
                if matches!(event, StreamEvent::Closed { .. }) {
                    self.finished = true;
                }
                Some(event)
            }
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                // transport went away without a close frame
                self.finished = true;
                Some(StreamEvent::Closed { had_error: true })
            }
        }
    }

    /// Forward input bytes to the remote side
    pub fn send(&self, bytes: Vec<u8>) -> Result<(), StreamError> {
        let input = self.input.as_ref().ok_or(StreamError::ReadOnly)?;
        if !self.is_open() {
            return Err(StreamError::Closed);
        }
        input.send(bytes).map_err(|_| StreamError::Closed)
    }

    /// Close the local end. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.input = None;
        self.finished = true;
        self.events.close();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        // the transport task sends a close frame and exits on its own
        self.close();
    }
}

/// Production connector: one WebSocket connection per stream
#[derive(Debug, Default, Clone)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }

    async fn run(url: Url, peer: StreamPeer) {
        let StreamPeer {
            events,
            mut input,
            mut shutdown,
        } = peer;

        let had_error = match Self::connection_handler(&url, &events, &mut input, &mut shutdown).await {
            Ok(()) => {
                info!("Stream closed: {}", url);
                false
            }
            Err(e) => {
                error!("Stream error on {}: {}", url, e);
                let _ = events.send(StreamEvent::Error(e.to_string()));
                true
            }
        };

        let _ = events.send(StreamEvent::Closed { had_error });
    }

    async fn connection_handler(
        url: &Url,
        events: &mpsc::UnboundedSender<StreamEvent>,
        input: &mut Option<mpsc::UnboundedReceiver<Vec<u8>>>,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> Result<(), StreamError> {
        debug!("Attempting WebSocket handshake with {}", url);

        let (ws_stream, response) = tokio::select! {
            result = connect_async(url.as_str()) => {
                result.map_err(|e| StreamError::ConnectFailed(e.to_string()))?
            }
            _ = &mut *shutdown => {
                debug!("Stream closed before handshake completed");
                return Ok(());
            }
        };
        debug!("WebSocket response status: {:?}", response.status());

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                _ = &mut *shutdown => {
                    debug!("Closing stream from local side");
                    let _ = ws_sender.send(tungstenite::Message::Close(None)).await;
                    return Ok(());
                }

                bytes = next_input(input) => {
                    match bytes {
                        Some(bytes) => ws_sender.send(tungstenite::Message::Binary(bytes)).await?,
                        None => *input = None,
                    }
                }

                frame = ws_receiver.next() => {
                    match frame {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            if events.send(StreamEvent::Data(text.into_bytes())).is_err() {
                                return Ok(());
                            }
                        }
                        Some(Ok(tungstenite::Message::Binary(bytes))) => {
                            if events.send(StreamEvent::Data(bytes)).is_err() {
                                return Ok(());
                            }
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            info!("Stream closed by server: {:?}", frame);
                            return Ok(());
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong are answered by tungstenite
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            warn!("Stream ended without close frame");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

async fn next_input(input: &mut Option<mpsc::UnboundedReceiver<Vec<u8>>>) -> Option<Vec<u8>> {
    match input {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl StreamConnector for WebSocketConnector {
    fn open(&self, url: &Url, bidirectional: bool) -> StreamHandle {
        let (handle, peer) = StreamHandle::pair(bidirectional);
        tokio::spawn(Self::run(url.clone(), peer));
        handle
    }
}
