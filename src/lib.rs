// ABOUTME: Library crate for podterm, the pod terminal session multiplexer
// Exposes the session registry, terminal attachments, and the CLI runtime

pub mod app;
pub mod config;
pub mod models;
pub mod session;
pub mod terminal;
