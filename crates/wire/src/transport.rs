//! The action transport seam between the runtime and real carriers.

use crate::ComponentIdentity;
use thiserror::Error;

/// One action invocation, ready for a carrier.
///
/// `fields` are already merged in precedence order; the carrier appends the
/// reserved identity/action fields on top.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionPayload {
    pub identity: ComponentIdentity,
    pub action: String,
    pub fields: Vec<(String, String)>,
    /// DOM event name when the invocation came from a trigger binding.
    pub trigger_event: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Redirect {
    pub url: String,
    pub after_seconds: u32,
}

/// A successful (2xx) action response.
///
/// `events_raw` is the unparsed event feed header; feed parsing and its
/// error tolerance belong to the event bus, not the carrier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionResponse {
    pub html: String,
    pub events_raw: Option<String>,
    pub redirect: Option<Redirect>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("server returned status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

pub trait Transport {
    fn post(&mut self, payload: &ActionPayload) -> Result<ActionResponse, TransportError>;
}
