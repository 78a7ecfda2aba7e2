//! Protocol types shared by the runtime and the transports.
//!
//! The server contract: actions are POSTed as form-encoded fields (or sent as
//! JSON frames over a socket), responses are HTML bodies plus a small set of
//! headers (event feed, redirect), and event payloads may carry targeting
//! metadata steering delivery scope.

mod event;
mod frame;
mod transport;
mod ws;

pub use event::{EventData, EventEnvelope, FeedError, ServerEvent, parse_event_feed, targeting};
pub use frame::{ClientFrame, ServerFrame, UpdateData};
pub use transport::{ActionPayload, ActionResponse, Redirect, Transport, TransportError};
pub use ws::{CloseOutcome, Connection, ReconnectPolicy, SocketState};

/// Addresses one live server-side component instance.
///
/// Within one document, at most one live root node carries a given
/// `instance_id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentIdentity {
    pub kind: String,
    pub instance_id: String,
}

impl ComponentIdentity {
    pub fn new(kind: impl Into<String>, instance_id: impl Into<String>) -> Self {
        ComponentIdentity {
            kind: kind.into(),
            instance_id: instance_id.into(),
        }
    }
}

/// Reserved POST field names; user form fields with these names are
/// overwritten by the invoker.
pub mod field {
    pub const COMPONENT: &str = "tw_component";
    pub const INSTANCE: &str = "tw_id";
    pub const ACTION: &str = "tw_action";
}

/// HTTP header names of the action contract.
pub mod header {
    pub const EVENTS: &str = "X-Tidewire-Events";
    pub const REDIRECT: &str = "X-Tidewire-Redirect";
    pub const REDIRECT_AFTER: &str = "X-Tidewire-Redirect-After";
    /// Sent by the client to announce it understands fragment-targeted
    /// responses.
    pub const FRAGMENTS: &str = "X-Tidewire-Fragments";
    /// DOM event name that fired a trigger-initiated request.
    pub const TRIGGER: &str = "X-Tidewire-Trigger";
}
