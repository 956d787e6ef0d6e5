// ABOUTME: Shared fakes for integration tests - an in-process stream connector and a recording resize sink
// Lets tests drive the remote side of a stream and inspect negotiated grids

#![allow(dead_code)]

use futures_util::future::BoxFuture;
use podterm::models::{SessionDescriptor, SessionKey};
use podterm::terminal::{
    ApiEndpoint, CellMetrics, Grid, PixelBox, ResizeError, ResizeSink, StreamConnector,
    StreamEvent, StreamHandle, StreamPeer, Vt100Surface,
};
use reqwest::Url;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One stream opened through the fake connector
pub struct OpenedStream {
    pub url: Url,
    pub bidirectional: bool,
    pub peer: StreamPeer,
}

impl OpenedStream {
    pub fn emit(&self, event: StreamEvent) {
        self.peer.events.send(event).unwrap();
    }

    pub fn emit_data(&self, text: &str) {
        self.emit(StreamEvent::Data(text.as_bytes().to_vec()));
    }

    /// True once the attachment closed its end
    pub fn is_shut_down(&mut self) -> bool {
        self.peer.shutdown.try_recv().is_ok()
    }
}

#[derive(Default, Clone)]
pub struct FakeConnector {
    pub opened: Arc<Mutex<Vec<OpenedStream>>>,
}

impl FakeConnector {
    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn url(&self, index: usize) -> Url {
        self.opened.lock().unwrap()[index].url.clone()
    }

    pub fn with_stream<R>(&self, index: usize, f: impl FnOnce(&mut OpenedStream) -> R) -> R {
        let mut opened = self.opened.lock().unwrap();
        f(&mut opened[index])
    }
}

impl StreamConnector for FakeConnector {
    fn open(&self, url: &Url, bidirectional: bool) -> StreamHandle {
        let (handle, peer) = StreamHandle::pair(bidirectional);
        self.opened.lock().unwrap().push(OpenedStream {
            url: url.clone(),
            bidirectional,
            peer,
        });
        handle
    }
}

#[derive(Default, Clone)]
pub struct RecordingSink {
    pub sent: Arc<Mutex<Vec<(String, Grid)>>>,
}

impl RecordingSink {
    pub fn grids(&self) -> Vec<Grid> {
        self.sent.lock().unwrap().iter().map(|(_, grid)| *grid).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }
}

impl ResizeSink for RecordingSink {
    fn send_resize(&self, resize_id: &str, grid: Grid) -> BoxFuture<'static, Result<(), ResizeError>> {
        self.sent.lock().unwrap().push((resize_id.to_string(), grid));
        Box::pin(async { Ok(()) })
    }
}

/// Resize sink whose requests take `delay` to land
#[derive(Clone)]
pub struct SlowSink {
    pub delay: Duration,
    pub sent: Arc<Mutex<Vec<Grid>>>,
    pub completed: Arc<Mutex<Vec<Grid>>>,
}

impl SlowSink {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            sent: Arc::default(),
            completed: Arc::default(),
        }
    }
}

impl ResizeSink for SlowSink {
    fn send_resize(&self, _resize_id: &str, grid: Grid) -> BoxFuture<'static, Result<(), ResizeError>> {
        self.sent.lock().unwrap().push(grid);
        let delay = self.delay;
        let completed = self.completed.clone();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            completed.lock().unwrap().push(grid);
            Ok(())
        })
    }
}

pub fn endpoint() -> ApiEndpoint {
    ApiEndpoint::new("ws", "localhost:8090").unwrap()
}

pub fn descriptor(key: SessionKey, visible: bool) -> SessionDescriptor {
    let url = endpoint().stream_url(&key, "dev");
    let mut descriptor = SessionDescriptor::new(key, url, "dev");
    descriptor.visible = visible;
    descriptor
}

/// 10x20 pixel cells in an 800x240 box: an 80x12 grid
pub fn laid_out_surface() -> Vt100Surface {
    Vt100Surface::new(Grid::new(40, 10), CellMetrics { width: 10.0, height: 20.0 }).with_bounds(
        PixelBox {
            width: 800.0,
            height: 240.0,
        },
    )
}
