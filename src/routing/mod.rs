//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → resolver.rs (walk the route tree)
//!     → Return: action identifier + captured parameters
//!
//! Route tree (at load time):
//!     → inverse.rs (rebuild action → URL template map)
//!     → stored in the config snapshot for redirects and the url() helper
//! ```
//!
//! # Design Decisions
//! - The tree is an immutable snapshot; resolution never mutates it
//! - Resolution cannot fail: an unmatched path yields the reserved
//!   not-found action
//! - The inverse map is computed once per reload, not per request

pub mod inverse;
pub mod resolver;

pub use inverse::{expand, invert};
pub use resolver::{resolve, ActionAndParams, NOT_FOUND_ACTION};
