//! Process lifecycle.
//!
//! Graceful shutdown fans out over a broadcast channel: the HTTP server
//! and the artifact watcher each hold a receiver and wind down when the
//! signal fires.

pub mod shutdown;

pub use shutdown::Shutdown;
