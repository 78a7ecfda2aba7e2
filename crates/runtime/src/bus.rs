//! Component-scoped event bus.
//!
//! Two listener classes: global (process-wide per event name) and
//! component-scoped (per instance id per event name). Dispatch order is
//! fixed: globals in registration order, then scoped listeners across all
//! instances in registration order, then one document-level custom event
//! through the [`DomEventSink`] seam. A listener error is logged and never
//! interrupts delivery to the rest.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use dom::Document;
use serde_json::Value;
use wire::{ComponentIdentity, EventData, EventEnvelope, parse_event_feed, targeting};

use crate::config::AttrNames;
use crate::locator;

pub type ListenerError = Box<dyn std::error::Error>;
type Listener = Rc<RefCell<dyn FnMut(&EventEnvelope) -> Result<(), ListenerError>>>;

/// Where bus dispatches surface as document-level custom events, for interop
/// with DOM-event-based code outside this subsystem.
pub trait DomEventSink {
    fn custom_event(&mut self, envelope: &EventEnvelope);
}

pub struct NullSink;

impl DomEventSink for NullSink {
    fn custom_event(&mut self, _envelope: &EventEnvelope) {}
}

/// Records every custom event; handy for embedders and tests.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<EventEnvelope>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.borrow().clone()
    }
}

impl DomEventSink for RecordingSink {
    fn custom_event(&mut self, envelope: &EventEnvelope) {
        self.events.borrow_mut().push(envelope.clone());
    }
}

#[derive(Clone, PartialEq)]
enum Scope {
    Global,
    Instance(String),
}

struct Entry {
    id: u64,
    scope: Scope,
    event: String,
    callback: Listener,
}

#[derive(Default)]
struct BusInner {
    entries: Vec<Entry>,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

/// Disposable listener handle. Dropping it without calling
/// [`Subscription::dispose`] leaves the listener registered.
pub struct Subscription {
    inner: Weak<RefCell<BusInner>>,
    id: u64,
}

impl Subscription {
    pub fn dispose(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.borrow_mut().entries.retain(|e| e.id != self.id);
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(
        &self,
        scope: Scope,
        event: &str,
        callback: impl FnMut(&EventEnvelope) -> Result<(), ListenerError> + 'static,
    ) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(Entry {
            id,
            scope,
            event: event.to_string(),
            callback: Rc::new(RefCell::new(callback)),
        });
        Subscription {
            inner: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Registers a process-wide listener.
    pub fn on(
        &self,
        event: &str,
        callback: impl FnMut(&EventEnvelope) -> Result<(), ListenerError> + 'static,
    ) -> Subscription {
        self.register(Scope::Global, event, callback)
    }

    /// Registers a listener scoped to one component instance.
    pub fn on_component(
        &self,
        instance_id: &str,
        event: &str,
        callback: impl FnMut(&EventEnvelope) -> Result<(), ListenerError> + 'static,
    ) -> Subscription {
        self.register(Scope::Instance(instance_id.to_string()), event, callback)
    }

    /// Snapshots matching listeners so callbacks can re-enter the bus
    /// (subscribe/dispose) without holding the registry borrow.
    fn matching(&self, scope_filter: impl Fn(&Scope) -> bool, event: &str) -> Vec<Listener> {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|e| e.event == event && scope_filter(&e.scope))
            .map(|e| e.callback.clone())
            .collect()
    }

    fn run(listeners: Vec<Listener>, envelope: &EventEnvelope) {
        for listener in listeners {
            let result = (&mut *listener.borrow_mut())(envelope);
            if let Err(e) = result {
                log::error!(
                    target: "runtime.bus",
                    "listener for '{}' failed: {e}",
                    envelope.name,
                );
            }
        }
    }

    /// Global broadcast: globals, then all component-scoped listeners, then
    /// the document-level custom event.
    pub fn dispatch(&self, name: &str, data: EventData, sink: &mut dyn DomEventSink) {
        let envelope = EventEnvelope::new(name, data);
        Self::run(self.matching(|s| *s == Scope::Global, name), &envelope);
        Self::run(
            self.matching(|s| matches!(s, Scope::Instance(_)), name),
            &envelope,
        );
        sink.custom_event(&envelope);
    }

    /// Delivery to one instance's scoped listeners only; never broadcasts.
    pub fn deliver_to_instance(&self, instance_id: &str, envelope: &EventEnvelope) {
        Self::run(
            self.matching(
                |s| matches!(s, Scope::Instance(id) if id == instance_id),
                &envelope.name,
            ),
            envelope,
        );
    }

    /// Applies a transport-supplied event feed, resolving targeting metadata
    /// against the live document.
    ///
    /// Targeted events deliver only to matching instances and are dropped
    /// when resolution finds none. `__self` events deliver only to the
    /// origin instance. Anything else is a global [`EventBus::dispatch`].
    /// A malformed feed aborts processing here; it never propagates.
    pub fn process_server_events(
        &self,
        raw: &str,
        origin: &ComponentIdentity,
        doc: &Document,
        attrs: &AttrNames,
        sink: &mut dyn DomEventSink,
    ) {
        let events = match parse_event_feed(raw) {
            Ok(events) => events,
            Err(e) => {
                log::error!(target: "runtime.bus", "discarding event feed: {e}");
                return;
            }
        };

        for event in events {
            let mut data = event.data;
            let target_kind = match take_targeting_string(&mut data, targeting::TARGET) {
                Ok(value) => value,
                Err(()) => continue,
            };
            let target_id = match take_targeting_string(&mut data, targeting::TARGET_ID) {
                Ok(value) => value,
                Err(()) => continue,
            };

            if target_kind.is_some() || target_id.is_some() {
                let instances: Vec<String> = match (&target_kind, &target_id) {
                    (Some(kind), Some(id)) => locator::find_component(doc, attrs, kind, id)
                        .map(|_| vec![id.clone()])
                        .unwrap_or_default(),
                    (Some(kind), None) => locator::instances_of_kind(doc, attrs, kind),
                    // id alone: re-derive the root through the origin's kind
                    (None, Some(id)) => locator::find_component(doc, attrs, &origin.kind, id)
                        .map(|_| vec![id.clone()])
                        .unwrap_or_default(),
                    (None, None) => unreachable!(),
                };
                if instances.is_empty() {
                    log::debug!(
                        target: "runtime.bus",
                        "dropping '{}': target resolved to no instance",
                        event.name,
                    );
                    continue;
                }
                let envelope = EventEnvelope::new(&event.name, data);
                for instance in instances {
                    self.deliver_to_instance(&instance, &envelope);
                }
                continue;
            }

            if data.remove(targeting::SELF_ONLY).is_some() {
                let envelope = EventEnvelope::new(&event.name, data);
                self.deliver_to_instance(&origin.instance_id, &envelope);
                continue;
            }

            self.dispatch(&event.name, data, sink);
        }
    }
}

/// Strips a targeting key. `Err` marks an unusable (non-string) value; the
/// whole entry is dropped rather than mis-delivered.
fn take_targeting_string(data: &mut EventData, key: &str) -> Result<Option<String>, ()> {
    match data.remove(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => {
            log::warn!(target: "runtime.bus", "non-string {key} value {other}; dropping event");
            Err(())
        }
    }
}
