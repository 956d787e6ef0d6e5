// ABOUTME: Session management module - registry of open sessions and the view that mounts them
// Provides session lifecycle for one namespace and kube context

pub mod registry;
pub mod view;

pub use registry::{DeleteCallback, SessionRegistry};
pub use view::{SessionView, SurfaceFactory};
