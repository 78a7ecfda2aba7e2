//! WebSocket frame types. JSON text frames tagged by `type`, field names
//! matching the server contract.

use crate::event::EventData;
use serde::{Deserialize, Serialize};

/// Outbound frames.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Init {
        #[serde(rename = "componentID")]
        component_id: String,
    },
    Action {
        #[serde(rename = "componentID")]
        component_id: String,
        action: String,
        data: EventData,
    },
}

/// Inbound frames.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Update {
        #[serde(rename = "componentID")]
        component_id: String,
        #[serde(default)]
        data: UpdateData,
    },
    Redirect {
        url: String,
    },
    Error {
        #[serde(default)]
        message: String,
        #[serde(default)]
        code: i64,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct UpdateData {
    #[serde(default)]
    pub html: String,
}
