// ABOUTME: Command-line runtime for a single session view
// Key encoding, the local terminal surface, and the tick-driven event loop

pub mod keys;
pub mod runner;
pub mod stdout_surface;

pub use runner::Runner;
pub use stdout_surface::StdoutSurface;
