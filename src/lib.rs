//! Backend-for-frontend dispatcher.
//!
//! Resolves inbound requests to logical actions through a declarative
//! route table, fetches their data (upstream API proxy or static JSON
//! fixture), and answers with a template render, a JSON passthrough, or
//! a redirect — with hot reload of its own configuration while running.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                BFF DISPATCHER                     │
//!                 │                                                   │
//!   Request ──────┼─▶ http ──▶ statics ──▶ dispatch ──▶ routing       │
//!                 │                            │          action      │
//!                 │                            ▼                      │
//!                 │                          proxy ──▶ upstream /     │
//!                 │                            │        fixtures      │
//!   Response ◀────┼── render / passthrough / redirect ◀┘              │
//!                 │                                                   │
//!                 │  config (ArcSwap snapshots) ◀── watcher (notify)  │
//!                 │  observability: access log + metrics              │
//!                 └──────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod action;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod proxy;
pub mod render;
pub mod routing;
pub mod statics;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::{ConfigStore, Loader};
pub use dispatch::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
