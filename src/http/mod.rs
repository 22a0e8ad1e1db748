//! HTTP server module.
//!
//! Serves the router on the configured address until SIGTERM/SIGINT, then
//! drains open connections for a bounded window before exiting.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
