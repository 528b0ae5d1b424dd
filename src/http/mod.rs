//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → /health short-circuit, or static delivery, or dispatch
//!     → access log + metrics at response end
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
