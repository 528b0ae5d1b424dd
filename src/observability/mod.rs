//! Observability subsystem.
//!
//! # Responsibilities
//! - Per-request access log entries on a broadcast sink (`access_log`)
//! - Request counters and latency histograms (`metrics`)
//!
//! Structured logging itself goes through `tracing`; the subscriber is
//! installed by the binary.

pub mod access_log;
pub mod metrics;

pub use access_log::{AccessLogEntry, AccessLogSink};
