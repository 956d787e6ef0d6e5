// ABOUTME: Core data models for session identity, descriptors, and inventory snapshots

pub mod descriptor;
pub mod inventory;
pub mod session_key;

pub use descriptor::{CloseReason, SessionDescriptor};
pub use inventory::Inventory;
pub use session_key::{SelectionEvent, SessionKey};
