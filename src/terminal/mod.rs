// ABOUTME: Terminal module for session streams, resize negotiation, and attachments
// Binds remote container streams to terminal-emulation surfaces

pub mod attachment;
pub mod error;
pub mod protocol;
pub mod resize;
pub mod stream;
pub mod surface;

pub use attachment::{AttachmentOptions, AttachmentState, CloseCallback, TerminalAttachment};
pub use error::{EndpointError, ResizeError, StreamError};
pub use protocol::{ApiEndpoint, StreamEvent};
pub use resize::{compute_grid, CellMetrics, Grid, HttpResizeSink, PixelBox, ResizeNegotiator, ResizeSink};
pub use stream::{StreamConnector, StreamHandle, StreamPeer, WebSocketConnector};
pub use surface::{convert_eol, TerminalSurface, Vt100Surface};
