//! Dispatch error taxonomy.
//!
//! Every fallible step of the dispatch pipeline converges on
//! [`DispatchError`]; the orchestrator funnels all of them into one
//! recovery branch. None of these crash the process — they select an
//! error status and an error page.

use bytes::Bytes;
use thiserror::Error;

use crate::action::ActionError;
use crate::proxy::ProxyError;
use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Action(#[from] ActionError),

    /// A template was promised but the payload is not renderable JSON.
    #[error("upstream payload is not renderable JSON: {0}")]
    BadUpstreamPayload(serde_json::Error),

    /// Non-2xx upstream response on an action with a template.
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16, body: Bytes },

    #[error("redirect requested but no target was provided")]
    RedirectTargetMissing,

    #[error("redirect target {0:?} is not a known action")]
    RedirectTargetNotFound(String),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl DispatchError {
    /// Error status shown to the client.
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::UpstreamStatus { status, .. } => *status,
            DispatchError::Proxy(ProxyError::UpstreamTimeout) => 504,
            _ => 500,
        }
    }
}
