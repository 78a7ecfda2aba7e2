//! Declarative trigger specifications.
//!
//! A trigger attribute is a comma-separated list of definitions; each
//! definition's whitespace-separated tokens are timing modifiers
//! (`delay:300ms`, `throttle:2s`, `queue:replace`), filters (`changed`,
//! `once`, `from:<selector>`, `not:<selector>`), or DOM event names. A
//! definition without event names infers them from the element type.
//!
//! Parsing happens once per element registration; re-registration after a
//! DOM swap re-parses.

use std::collections::HashMap;

use dom::{Document, NodeId, SelectorList};

use crate::locator::ComponentMetadata;
use crate::schedule::{TimerId, Timers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Changed,
    Once,
    From,
    Not,
}

#[derive(Clone, Debug)]
pub struct Filter {
    pub kind: FilterKind,
    pub selector: Option<SelectorList>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueMode {
    /// Cancel any scheduled-but-unfired timer for the element before
    /// scheduling a new one.
    #[default]
    Replace,
    /// Schedule independently.
    Independent,
}

#[derive(Clone, Debug, Default)]
pub struct Modifiers {
    pub delay_ms: Option<u64>,
    pub throttle_ms: Option<u64>,
    pub queue: QueueMode,
}

#[derive(Clone, Debug)]
pub struct TriggerDefinition {
    pub events: Vec<String>,
    pub filters: Vec<Filter>,
    pub modifiers: Modifiers,
}

impl TriggerDefinition {
    pub fn listens_to(&self, event_type: &str) -> bool {
        self.events.iter().any(|e| e == event_type)
    }

    pub fn is_submit_class(&self) -> bool {
        self.events.iter().any(|e| e == "submit")
    }

    pub fn has_changed_filter(&self) -> bool {
        self.filters.iter().any(|f| f.kind == FilterKind::Changed)
    }
}

/// `<number>(ms|s)` with `ms` the default unit; fractions allowed (`0.5s`).
pub fn parse_duration(value: &str) -> Option<u64> {
    let (digits, unit) = match value.strip_suffix("ms") {
        Some(d) => (d, 1.0),
        None => match value.strip_suffix('s') {
            Some(d) => (d, 1_000.0),
            None => (value, 1.0),
        },
    };
    let number: f64 = digits.parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    Some((number * unit) as u64)
}

/// Default events per element type when a definition names none.
pub fn default_events(doc: &Document, el: NodeId) -> &'static str {
    match doc.tag_name(el) {
        Some("input") => {
            let input_type = doc.attr(el, "type").unwrap_or("text").to_ascii_lowercase();
            match input_type.as_str() {
                "text" | "search" | "email" | "url" | "tel" | "password" | "number" => {
                    "keyup changed"
                }
                "checkbox" | "radio" => "change",
                _ => "click",
            }
        }
        Some("textarea") => "keyup changed",
        Some("select") => "change",
        Some("button") | Some("a") => "click",
        Some("form") => "submit",
        _ => "click",
    }
}

/// Parses a trigger attribute into definitions. `defaults` fills in events
/// for definitions that name none; a `changed` token in the defaults becomes
/// a filter (text inputs default to `keyup changed`).
pub fn parse_spec(spec: &str, defaults: &str) -> Vec<TriggerDefinition> {
    let mut definitions = Vec::new();

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let mut definition = TriggerDefinition {
            events: Vec::new(),
            filters: Vec::new(),
            modifiers: Modifiers::default(),
        };

        for token in part.split_whitespace() {
            if let Some((key, value)) = token.split_once(':') {
                match key {
                    "delay" => match parse_duration(value) {
                        Some(ms) => definition.modifiers.delay_ms = Some(ms),
                        None => log::warn!(target: "runtime.triggers", "invalid duration '{value}'"),
                    },
                    "throttle" => match parse_duration(value) {
                        Some(ms) => definition.modifiers.throttle_ms = Some(ms),
                        None => log::warn!(target: "runtime.triggers", "invalid duration '{value}'"),
                    },
                    "queue" => {
                        definition.modifiers.queue = if value == "replace" {
                            QueueMode::Replace
                        } else {
                            QueueMode::Independent
                        };
                    }
                    "from" | "not" => match SelectorList::parse(value) {
                        Some(selector) => definition.filters.push(Filter {
                            kind: if key == "from" {
                                FilterKind::From
                            } else {
                                FilterKind::Not
                            },
                            selector: Some(selector),
                        }),
                        None => {
                            log::warn!(target: "runtime.triggers", "invalid {key} selector '{value}'")
                        }
                    },
                    _ => log::debug!(target: "runtime.triggers", "ignoring token '{token}'"),
                }
            } else if token == "changed" || token == "once" {
                definition.filters.push(Filter {
                    kind: if token == "changed" {
                        FilterKind::Changed
                    } else {
                        FilterKind::Once
                    },
                    selector: None,
                });
            } else {
                definition.events.push(token.to_string());
            }
        }

        if definition.events.is_empty() {
            apply_defaults(&mut definition, defaults);
        }
        definitions.push(definition);
    }

    definitions
}

fn apply_defaults(definition: &mut TriggerDefinition, defaults: &str) {
    for token in defaults.split_whitespace() {
        if token == "changed" {
            if !definition.has_changed_filter() {
                definition.filters.push(Filter {
                    kind: FilterKind::Changed,
                    selector: None,
                });
            }
        } else {
            definition.events.push(token.to_string());
        }
    }
}

/// Per-element runtime state. Created on registration, destroyed on
/// unregistration; timers are cancelled there, never left to drop order.
pub(crate) struct ElementTriggers {
    pub meta: ComponentMetadata,
    pub definitions: Vec<TriggerDefinition>,
    /// Set once a `once` element actually invoked its action.
    pub fired: bool,
    /// Last serialized field set, for `changed` comparison.
    pub snapshot: Option<String>,
    pub pending: Vec<TimerId>,
    /// Per-definition leading-edge timestamps for `throttle`.
    pub last_throttle_fire_ms: HashMap<usize, u64>,
}

#[derive(Default)]
pub(crate) struct TriggerSet {
    map: HashMap<NodeId, ElementTriggers>,
}

impl TriggerSet {
    pub(crate) fn contains(&self, el: NodeId) -> bool {
        self.map.contains_key(&el)
    }

    pub(crate) fn get(&self, el: NodeId) -> Option<&ElementTriggers> {
        self.map.get(&el)
    }

    pub(crate) fn get_mut(&mut self, el: NodeId) -> Option<&mut ElementTriggers> {
        self.map.get_mut(&el)
    }

    pub(crate) fn insert(&mut self, el: NodeId, state: ElementTriggers) {
        self.map.insert(el, state);
    }

    pub(crate) fn remove(&mut self, el: NodeId) -> Option<ElementTriggers> {
        self.map.remove(&el)
    }
}

/// Tears down trigger state for `root` and everything below it, cancelling
/// pending timers. Must run before the subtree leaves the document.
pub(crate) fn unregister_subtree(
    triggers: &mut TriggerSet,
    timers: &mut Timers,
    doc: &Document,
    root: NodeId,
) {
    let nodes: Vec<NodeId> = std::iter::once(root).chain(doc.descendants(root)).collect();
    for node in nodes {
        if let Some(state) = triggers.remove(node) {
            for timer in state.pending {
                timers.cancel(timer);
            }
        }
    }
}
