//! Server event feed and delivery envelopes.

use serde_json::Value;
use thiserror::Error;

pub type EventData = serde_json::Map<String, Value>;

/// Keys a server may plant in an event payload to steer delivery scope.
/// They are stripped before the payload reaches any listener.
pub mod targeting {
    /// Component kind the event is addressed to.
    pub const TARGET: &str = "__target";
    /// Component instance id the event is addressed to.
    pub const TARGET_ID: &str = "__target_id";
    /// Deliver only to the instance that originated the request.
    pub const SELF_ONLY: &str = "__self";
}

/// One entry of the transport-supplied event feed.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerEvent {
    pub name: String,
    pub data: EventData,
}

/// What a listener receives. Created at dispatch time, immutable once
/// delivered; `data` and `detail` are the same map.
#[derive(Clone, Debug, PartialEq)]
pub struct EventEnvelope {
    pub name: String,
    pub data: EventData,
}

impl EventEnvelope {
    pub fn new(name: impl Into<String>, data: EventData) -> Self {
        EventEnvelope {
            name: name.into(),
            data,
        }
    }

    /// Alias of `data` for DOM-interop naming.
    pub fn detail(&self) -> &EventData {
        &self.data
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FeedError {
    #[error("event feed is not valid JSON: {0}")]
    Invalid(String),
    #[error("event feed is not an array")]
    NotAnArray,
}

/// Parses a raw events header into entries.
///
/// Tolerant per entry: entries that are not objects or lack a `name` string
/// are skipped with a warning. A feed that is not a JSON array is an error —
/// the caller aborts event processing without touching the rest of the
/// response.
pub fn parse_event_feed(raw: &str) -> Result<Vec<ServerEvent>, FeedError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| FeedError::Invalid(e.to_string()))?;
    let Value::Array(entries) = value else {
        return Err(FeedError::NotAnArray);
    };

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let Value::Object(mut map) = entry else {
            log::warn!(target: "wire.events", "skipping non-object event entry");
            continue;
        };
        let name = match map.remove("name") {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => {
                log::warn!(target: "wire.events", "skipping event entry without a name");
                continue;
            }
        };
        let data = match map.remove("data") {
            Some(Value::Object(data)) => data,
            _ => EventData::new(),
        };
        out.push(ServerEvent { name, data });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{FeedError, parse_event_feed};

    #[test]
    fn parses_entries_and_skips_malformed_ones() {
        let feed = r#"[
            {"name": "saved", "data": {"count": 2}},
            {"data": {"orphan": true}},
            "not-an-object",
            {"name": "plain"}
        ]"#;
        let events = parse_event_feed(feed).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "saved");
        assert_eq!(events[0].data["count"], 2);
        assert_eq!(events[1].name, "plain");
        assert!(events[1].data.is_empty());
    }

    #[test]
    fn non_array_feed_is_an_error() {
        assert_eq!(
            parse_event_feed(r#"{"name": "x"}"#),
            Err(FeedError::NotAnArray)
        );
        assert!(matches!(
            parse_event_feed("not json"),
            Err(FeedError::Invalid(_))
        ));
    }
}
