//! The DOM attribute surface the runtime consumes.
//!
//! Names are injectable configuration; semantics are fixed. Hosts that mount
//! the runtime under a different prefix construct their own `AttrNames` —
//! discovery/bootstrapping of names is a host concern.

use dom::SelectorList;

#[derive(Clone, Debug)]
pub struct AttrNames {
    /// Component root marker.
    pub root: String,
    /// Component kind on the root (or on an out-of-tree trigger element).
    pub kind: String,
    /// Component instance id on the root (or on an out-of-tree trigger).
    pub instance: String,
    /// References a root element by DOM id from an out-of-tree trigger.
    pub for_ref: String,
    /// Action name on a triggering element.
    pub action: String,
    /// Trigger specification.
    pub trigger: String,
    /// Extra field sources merged into the submission.
    pub include: String,
    /// Field names removed from the submission.
    pub exclude: String,
    /// Request indicator targets.
    pub indicator: String,
    /// Response fragment selection on the triggering element.
    pub select: String,
    /// Literal parameter prefix (`<prefix><name>="value"`).
    pub param_prefix: String,
    /// Fragment selector on a `<template>` patch marker.
    pub fragment: String,
    /// Swap mode on a patch marker.
    pub swap: String,
    /// Scope validation on a patch marker.
    pub scope_kind: String,
    pub scope_id: String,
    /// Class convention for fallback indicators.
    pub indicator_class: String,
    /// Class toggled on active indicators while a request is in flight.
    pub request_class: String,
}

impl Default for AttrNames {
    fn default() -> Self {
        AttrNames {
            root: "data-tw-root".into(),
            kind: "data-tw-component".into(),
            instance: "data-tw-id".into(),
            for_ref: "data-tw-for".into(),
            action: "data-tw-action".into(),
            trigger: "data-tw-trigger".into(),
            include: "data-tw-include".into(),
            exclude: "data-tw-exclude".into(),
            indicator: "data-tw-indicator".into(),
            select: "data-tw-select".into(),
            param_prefix: "data-tw-param-".into(),
            fragment: "data-tw-fragment".into(),
            swap: "data-tw-swap".into(),
            scope_kind: "data-tw-scope".into(),
            scope_id: "data-tw-scope-id".into(),
            indicator_class: "tw-indicator".into(),
            request_class: "tw-request".into(),
        }
    }
}

impl AttrNames {
    fn presence(attr: &str) -> SelectorList {
        SelectorList::parse(&format!("[{attr}]")).expect("attribute selector")
    }

    pub(crate) fn root_selector(&self) -> SelectorList {
        Self::presence(&self.root)
    }

    pub(crate) fn action_selector(&self) -> SelectorList {
        Self::presence(&self.action)
    }

    pub(crate) fn trigger_selector(&self) -> SelectorList {
        Self::presence(&self.trigger)
    }
}
