//! HTTP carrier for the action protocol.
//!
//! `POST <endpoint>` with a form-encoded body of the collected fields plus
//! the reserved identity/action fields. The fragment opt-in header goes out
//! on every request; the trigger header only when the payload names the DOM
//! event that fired.

use std::time::Duration;

use url::form_urlencoded;
use wire::{ActionPayload, ActionResponse, Redirect, Transport, TransportError, field, header};

pub struct HttpTransport {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, Duration::from_secs(10))
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        HttpTransport {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: endpoint.into(),
        }
    }

    fn encode_body(payload: &ActionPayload) -> String {
        let mut body = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &payload.fields {
            body.append_pair(name, value);
        }
        body.append_pair(field::COMPONENT, &payload.identity.kind);
        body.append_pair(field::INSTANCE, &payload.identity.instance_id);
        body.append_pair(field::ACTION, &payload.action);
        body.finish()
    }
}

impl Transport for HttpTransport {
    fn post(&mut self, payload: &ActionPayload) -> Result<ActionResponse, TransportError> {
        let body = Self::encode_body(payload);
        let mut request = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/x-www-form-urlencoded")
            .set("Accept", "text/html")
            .set(header::FRAGMENTS, "enabled");
        if let Some(event) = &payload.trigger_event {
            request = request.set(header::TRIGGER, event);
        }

        log::debug!(
            target: "net.http",
            "POST {} action={} component={}/{}",
            self.endpoint,
            payload.action,
            payload.identity.kind,
            payload.identity.instance_id,
        );

        let response = match request.send_string(&body) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(TransportError::Status(code)),
            Err(ureq::Error::Transport(transport)) => {
                let message = transport.to_string();
                if message.contains("timed out") {
                    return Err(TransportError::Timeout);
                }
                return Err(TransportError::Network(message));
            }
        };

        let events_raw = response.header(header::EVENTS).map(str::to_string);
        let redirect = response.header(header::REDIRECT).map(|url| Redirect {
            url: url.to_string(),
            after_seconds: response
                .header(header::REDIRECT_AFTER)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        });
        let html = response
            .into_string()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(ActionResponse {
            html,
            events_raw,
            redirect,
        })
    }
}
