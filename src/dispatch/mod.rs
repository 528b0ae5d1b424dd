//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → dispatcher.rs (route → action → fetch → interpret)
//!     → response.rs (construction helpers)
//!     → on failure: error.rs (taxonomy) → recovery.rs (error cascade)
//! ```
//!
//! # Design Decisions
//! - Per-request errors never crash the process; the cascade always
//!   produces a response
//! - The dispatcher works on config snapshots taken at request start

pub mod dispatcher;
pub mod error;
pub mod recovery;
pub mod response;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
