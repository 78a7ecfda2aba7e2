//! Real carriers for the action protocol: a blocking HTTP transport and a
//! threaded WebSocket pump. Everything protocol-shaped lives in `wire`; this
//! crate only moves bytes.

mod http;
mod ws;

pub use http::HttpTransport;
pub use ws::{SocketHandle, SocketSignal, derive_ws_url, spawn};
