//! Server-driven component runtime.
//!
//! Declarative triggers bind DOM events to named server actions; responses
//! patch the live document (full subtree or selector-addressed fragments);
//! server-emitted events flow through a component-scoped bus; the same
//! action protocol also rides a socket.
//!
//! The runtime is headless and single-threaded: the host owns a
//! [`dom::Document`], feeds DOM events into [`Runtime::fire_event`], pumps
//! expired timers with [`Runtime::run_due`], and wires socket lifecycle
//! callbacks through the `socket_*` methods. All durable state is
//! server-side; everything here is per-page wiring.

mod bus;
mod config;
mod hooks;
mod indicator;
mod invoke;
mod locator;
mod patch;
mod schedule;
mod socket;
mod trigger;

use std::collections::HashSet;
use std::rc::Rc;

use dom::{Document, NodeId};
use wire::{ComponentIdentity, EventData, Transport};

pub use bus::{DomEventSink, EventBus, ListenerError, NullSink, RecordingSink, Subscription};
pub use config::AttrNames;
pub use hooks::{HostHooks, NullHooks};
pub use invoke::{InFlight, InvokeOutcome};
pub use locator::{
    ComponentMetadata, find_by_instance, find_component, instances_of_kind, resolve_identity,
};
pub use schedule::{Clock, ManualClock, SystemClock, TimerId};
pub use socket::SocketId;
pub use trigger::{
    Filter, FilterKind, Modifiers, QueueMode, TriggerDefinition, default_events, parse_duration,
    parse_spec,
};

use schedule::{TimerTask, Timers};
use trigger::{ElementTriggers, TriggerSet};

/// How a fired DOM event was handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FireOutcome {
    /// At least one registered trigger along the bubble path took the event.
    pub handled_by_trigger: bool,
    /// The host should suppress the event's default behavior.
    pub default_prevented: bool,
}

/// Work surfaced by [`Runtime::run_due`] that only the host can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DueAction {
    /// Open a fresh connection for this socket and feed its lifecycle back
    /// through the `socket_*` methods.
    ReconnectSocket(SocketId),
}

pub struct Runtime {
    attrs: AttrNames,
    bus: EventBus,
    triggers: TriggerSet,
    /// In-flight action guard, keyed by instance id: at most one entry per
    /// instance, removed unconditionally when the request settles.
    guard: HashSet<String>,
    timers: Timers,
    sockets: Vec<socket::LiveSocket>,
    next_socket_id: u64,
    transport: Box<dyn Transport>,
    hooks: Box<dyn HostHooks>,
    sink: Box<dyn DomEventSink>,
}

impl Runtime {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self::with_clock(transport, Rc::new(SystemClock::new()))
    }

    /// Construction with an injected clock; tests advance a [`ManualClock`]
    /// and pump [`Runtime::run_due`] instead of sleeping.
    pub fn with_clock(transport: Box<dyn Transport>, clock: Rc<dyn Clock>) -> Self {
        Runtime {
            attrs: AttrNames::default(),
            bus: EventBus::new(),
            triggers: TriggerSet::default(),
            guard: HashSet::new(),
            timers: Timers::new(clock),
            sockets: Vec::new(),
            next_socket_id: 0,
            transport,
            hooks: Box::new(NullHooks),
            sink: Box::new(NullSink),
        }
    }

    pub fn set_attrs(&mut self, attrs: AttrNames) {
        self.attrs = attrs;
    }

    pub fn attrs(&self) -> &AttrNames {
        &self.attrs
    }

    pub fn set_hooks(&mut self, hooks: Box<dyn HostHooks>) {
        self.hooks = hooks;
    }

    pub fn set_sink(&mut self, sink: Box<dyn DomEventSink>) {
        self.sink = sink;
    }

    /// Handle to the event bus for listener registration.
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// Global broadcast through the bus plus the document-level custom
    /// event.
    pub fn dispatch(&mut self, name: &str, data: EventData) {
        self.bus.dispatch(name, data, &mut *self.sink);
    }

    /// Applies a raw event feed (events header, socket side-channel) against
    /// the live document. Never fails; malformed feeds are logged and
    /// dropped.
    pub fn process_server_events(&mut self, doc: &Document, raw: &str, origin: &ComponentIdentity) {
        self.bus
            .process_server_events(raw, origin, doc, &self.attrs, &mut *self.sink);
    }

    // ---- trigger registration ----

    /// Registers the trigger bindings declared on `el`. Idempotent; a second
    /// call before unregistration is a no-op. Registration is abandoned
    /// (logged, not an error) when no component identity resolves.
    pub fn register_triggers(&mut self, doc: &Document, el: NodeId) {
        if self.triggers.contains(el) {
            return;
        }
        let Some(spec) = doc.attr(el, &self.attrs.trigger).map(str::to_string) else {
            return;
        };
        let definitions = trigger::parse_spec(&spec, trigger::default_events(doc, el));
        if definitions.is_empty() {
            return;
        }
        let Some(meta) = locator::resolve_identity(doc, &self.attrs, el) else {
            log::warn!(
                target: "runtime.triggers",
                "no component identity for trigger '{spec}'; not registering",
            );
            return;
        };
        // prime the change snapshot now so the first edit is comparable
        let snapshot = definitions
            .iter()
            .any(TriggerDefinition::has_changed_filter)
            .then(|| field_snapshot(doc, &self.attrs, el, meta.root));

        self.triggers.insert(
            el,
            ElementTriggers {
                meta,
                definitions,
                fired: false,
                snapshot,
                pending: Vec::new(),
                last_throttle_fire_ms: Default::default(),
            },
        );
        log::debug!(target: "runtime.triggers", "registered triggers for '{spec}'");
    }

    /// Registers every trigger-bearing element at or under `scope`.
    pub fn register_all(&mut self, doc: &Document, scope: NodeId) {
        let selector = self.attrs.trigger_selector();
        let mut elements = Vec::new();
        if doc.matches(scope, &selector) {
            elements.push(scope);
        }
        elements.extend(doc.query_selector_all(scope, &selector));
        for el in elements {
            self.register_triggers(doc, el);
        }
    }

    /// Removes `el`'s bindings and cancels its pending timers.
    pub fn unregister_triggers(&mut self, el: NodeId) {
        if let Some(state) = self.triggers.remove(el) {
            for timer in state.pending {
                self.timers.cancel(timer);
            }
        }
    }

    /// Tears down every registration at or under `root`. Must run before the
    /// host removes the subtree from the document.
    pub fn unregister_tree(&mut self, doc: &Document, root: NodeId) {
        trigger::unregister_subtree(&mut self.triggers, &mut self.timers, doc, root);
    }

    // ---- event routing ----

    /// Routes one DOM event: bubbles from `target` to the document root,
    /// letting each registered trigger element handle it; if none consumed a
    /// click or submit, the generic action delegation runs instead.
    pub fn fire_event(&mut self, doc: &mut Document, target: NodeId, event_type: &str) -> FireOutcome {
        let mut outcome = FireOutcome::default();
        let path: Vec<NodeId> = std::iter::once(target)
            .chain(doc.ancestors(target))
            .collect();

        for el in path {
            let listening: Vec<usize> = match self.triggers.get(el) {
                Some(state) => state
                    .definitions
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| d.listens_to(event_type))
                    .map(|(i, _)| i)
                    .collect(),
                None => continue,
            };
            if listening.is_empty() {
                continue;
            }
            outcome.handled_by_trigger = true;
            for def_index in listening {
                // an earlier firing may have replaced this very subtree
                if !doc.contains(el) || !self.triggers.contains(el) {
                    break;
                }
                let prevented = self.handle_trigger(doc, el, def_index, target, event_type);
                outcome.default_prevented |= prevented;
            }
        }

        if !outcome.handled_by_trigger && (event_type == "click" || event_type == "submit") {
            outcome.default_prevented = self.delegate(doc, target, event_type);
        }
        outcome
    }

    fn handle_trigger(
        &mut self,
        doc: &mut Document,
        el: NodeId,
        def_index: usize,
        target: NodeId,
        event_type: &str,
    ) -> bool {
        let Some(state) = self.triggers.get(el) else {
            return false;
        };
        // an earlier firing may have re-registered this element with a
        // different definition list
        let Some(definition) = state.definitions.get(def_index).cloned() else {
            return false;
        };
        let meta_root = state.meta.root;

        // submit-class triggers suppress the default before anything else
        let prevented = definition.is_submit_class();

        for filter in &definition.filters {
            match filter.kind {
                FilterKind::Changed => {
                    // the snapshot updates even when a later filter blocks
                    // the firing; a blocked firing still consumes the change
                    let current = field_snapshot(doc, &self.attrs, el, meta_root);
                    let Some(state) = self.triggers.get_mut(el) else {
                        return prevented;
                    };
                    let previous = state.snapshot.replace(current.clone());
                    match previous {
                        None => return prevented,
                        Some(prev) if prev == current => return prevented,
                        Some(_) => {}
                    }
                }
                FilterKind::Once => {
                    if self.triggers.get(el).is_some_and(|s| s.fired) {
                        return prevented;
                    }
                }
                FilterKind::From => {
                    let Some(selector) = &filter.selector else {
                        continue;
                    };
                    if !doc.matches(target, selector) {
                        return prevented;
                    }
                }
                FilterKind::Not => {
                    let Some(selector) = &filter.selector else {
                        continue;
                    };
                    if doc.matches(target, selector) {
                        return prevented;
                    }
                }
            }
        }

        let queue = definition.modifiers.queue;
        if let Some(throttle) = definition.modifiers.throttle_ms.filter(|t| *t > 0) {
            let now = self.timers.now_ms();
            let last = self
                .triggers
                .get(el)
                .and_then(|s| s.last_throttle_fire_ms.get(&def_index).copied());
            match last {
                Some(last_ms) if now.saturating_sub(last_ms) < throttle => {
                    // trailing edge: fire when the window reopens
                    let remaining = throttle - (now - last_ms);
                    if queue == QueueMode::Replace {
                        self.cancel_pending(el);
                    }
                    let timer = self.timers.schedule(
                        remaining,
                        TimerTask::TriggerFire {
                            element: el,
                            definition: def_index,
                            event_type: event_type.to_string(),
                        },
                    );
                    if let Some(state) = self.triggers.get_mut(el) {
                        state.pending.push(timer);
                    }
                }
                _ => {
                    if let Some(state) = self.triggers.get_mut(el) {
                        state.last_throttle_fire_ms.insert(def_index, now);
                    }
                    self.fire_trigger_action(doc, el, event_type);
                }
            }
        } else if let Some(delay) = definition.modifiers.delay_ms.filter(|d| *d > 0) {
            if queue == QueueMode::Replace {
                self.cancel_pending(el);
            }
            let timer = self.timers.schedule(
                delay,
                TimerTask::TriggerFire {
                    element: el,
                    definition: def_index,
                    event_type: event_type.to_string(),
                },
            );
            if let Some(state) = self.triggers.get_mut(el) {
                state.pending.push(timer);
            }
        } else {
            self.fire_trigger_action(doc, el, event_type);
        }

        prevented
    }

    fn cancel_pending(&mut self, el: NodeId) {
        let pending = match self.triggers.get_mut(el) {
            Some(state) => std::mem::take(&mut state.pending),
            None => return,
        };
        for timer in pending {
            self.timers.cancel(timer);
        }
    }

    fn fire_trigger_action(&mut self, doc: &mut Document, el: NodeId, event_type: &str) {
        let action = doc
            .attr(el, &self.attrs.action)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .or_else(|| {
                doc.closest(el, &self.attrs.action_selector())
                    .and_then(|n| doc.attr(n, &self.attrs.action))
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
            });
        let Some(action) = action else {
            log::warn!(target: "runtime.triggers", "no action for trigger element; skipping");
            return;
        };
        let outcome = self.invoke(doc, el, &action, Some(event_type));
        // `once` consumes only an invocation that actually went out
        if outcome == InvokeOutcome::Invoked
            && let Some(state) = self.triggers.get_mut(el)
        {
            state.fired = true;
        }
    }

    // ---- timers ----

    /// Runs every expired timer: debounce/throttle fires, delayed redirects,
    /// socket reconnects. Returns the work only the host can do.
    pub fn run_due(&mut self, doc: &mut Document) -> Vec<DueAction> {
        let due = self.timers.take_due();
        let mut out = Vec::new();
        for (id, task) in due {
            match task {
                TimerTask::TriggerFire {
                    element,
                    definition,
                    event_type,
                } => {
                    let now = self.timers.now_ms();
                    let Some(state) = self.triggers.get_mut(element) else {
                        continue;
                    };
                    state.pending.retain(|t| *t != id);
                    // a trailing throttle fire restarts the window
                    if state
                        .definitions
                        .get(definition)
                        .is_some_and(|d| d.modifiers.throttle_ms.is_some())
                    {
                        state.last_throttle_fire_ms.insert(definition, now);
                    }
                    if !doc.contains(element) {
                        continue;
                    }
                    self.fire_trigger_action(doc, element, &event_type);
                }
                TimerTask::Redirect { url } => self.hooks.navigate(&url),
                TimerTask::SocketReconnect { socket } => {
                    self.socket_reconnect_due(socket, &mut out);
                }
            }
        }
        out
    }
}

/// Serialized form of the element's submission fields, for `changed`
/// comparison. Uses the same collection convention as a real submission so
/// the filter sees exactly what the server would.
fn field_snapshot(doc: &Document, attrs: &AttrNames, el: NodeId, root: Option<NodeId>) -> String {
    let fields = invoke::collect_submission(doc, attrs, el, root);
    serde_json::to_string(&fields).unwrap_or_default()
}
