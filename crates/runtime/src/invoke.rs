//! Action invocation and the request lifecycle.
//!
//! invoke → resolve identity → concurrency guard → collect fields →
//! indicators on → transport → reconcile response (redirect / events /
//! patch / select / full replacement) → guard released and indicators off,
//! unconditionally.

use dom::{Document, NodeId, SelectorList};
use serde_json::Value;
use wire::{ActionPayload, EventData};

use crate::config::AttrNames;
use crate::locator::{self, ComponentMetadata};
use crate::patch;
use crate::schedule::TimerTask;
use crate::trigger::unregister_subtree;
use crate::Runtime;

/// What happened to one invocation. Nothing here is an error: resolution
/// failures and guard conflicts are silent no-ops by design.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The transport was called (successfully or not).
    Invoked,
    /// No component identity could be resolved.
    NoIdentity,
    /// A request for this instance was already in flight.
    DroppedPending,
}

/// Ordered name/value merge where a later source overrides an earlier one in
/// place, preserving first-seen field order.
#[derive(Default)]
pub(crate) struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub(crate) fn upsert(&mut self, name: String, value: String) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub(crate) fn remove_all(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    pub(crate) fn into_vec(self) -> Vec<(String, String)> {
        self.entries
    }
}

/// Submission data, lowest to highest precedence: base scope fields (nearest
/// form, else the component root), include-merged fields, minus exclusions,
/// then the triggering element's own name/value and literal parameters.
pub(crate) fn collect_submission(
    doc: &Document,
    attrs: &AttrNames,
    trigger_el: NodeId,
    root: Option<NodeId>,
) -> Vec<(String, String)> {
    let mut fields = FieldMap::default();
    let form_selector = SelectorList::parse("form").expect("form selector");

    // nearest form, or the form referenced by the element's `form` attribute
    let form = doc.closest(trigger_el, &form_selector).or_else(|| {
        doc.attr(trigger_el, "form")
            .filter(|v| !v.is_empty())
            .and_then(|id| doc.find_by_dom_id(id))
            .filter(|&n| doc.tag_name(n) == Some("form"))
    });

    if let Some(base) = form.or(root) {
        for (name, value) in dom::fields::collect(doc, base) {
            fields.upsert(name, value);
        }
    }

    if let Some(include) = doc.attr(trigger_el, &attrs.include).filter(|v| !v.is_empty()) {
        match SelectorList::parse(include) {
            Some(selector) => {
                for node in doc.query_selector_all(doc.root(), &selector) {
                    if let Some((name, value)) = dom::fields::control_value(doc, node) {
                        fields.upsert(name, value);
                    } else {
                        for (name, value) in dom::fields::collect(doc, node) {
                            fields.upsert(name, value);
                        }
                    }
                }
            }
            None => log::warn!(target: "runtime.invoke", "invalid include selector '{include}'"),
        }
    }

    if let Some(exclude) = doc.attr(trigger_el, &attrs.exclude).filter(|v| !v.is_empty()) {
        match SelectorList::parse(exclude) {
            Some(selector) => {
                for node in doc.query_selector_all(doc.root(), &selector) {
                    if let Some(name) = doc.attr(node, "name").filter(|n| !n.is_empty()) {
                        fields.remove_all(name);
                    }
                }
            }
            None => log::warn!(target: "runtime.invoke", "invalid exclude selector '{exclude}'"),
        }
    }

    // the element's own name/value: a form control serializes as one, other
    // elements (buttons, links) contribute their name/value attributes
    if let Some((name, value)) = dom::fields::control_value(doc, trigger_el) {
        fields.upsert(name, value);
    } else if let Some(name) = doc.attr(trigger_el, "name").filter(|n| !n.is_empty()) {
        let value = doc.attr(trigger_el, "value").unwrap_or("").to_string();
        fields.upsert(name.to_string(), value);
    }

    for (attr_name, value) in doc.attributes(trigger_el) {
        if let Some(param) = attr_name.strip_prefix(&attrs.param_prefix)
            && !param.is_empty()
        {
            fields.upsert(param.to_string(), value.clone().unwrap_or_default());
        }
    }

    fields.into_vec()
}

/// Field collection as a JSON object, for the socket action protocol.
pub(crate) fn collect_submission_data(
    doc: &Document,
    attrs: &AttrNames,
    trigger_el: NodeId,
    root: Option<NodeId>,
) -> EventData {
    let mut data = EventData::new();
    for (name, value) in collect_submission(doc, attrs, trigger_el, root) {
        data.insert(name, Value::String(value));
    }
    data
}

/// A begun invocation: the concurrency guard is held and indicators are on.
/// The carrier runs the payload, then [`Runtime::finish_invoke`] reconciles
/// the outcome and releases everything — there is no other way out.
pub struct InFlight {
    payload: ActionPayload,
    meta: ComponentMetadata,
    trigger_el: NodeId,
    indicators: Vec<crate::indicator::ActiveIndicator>,
}

impl InFlight {
    pub fn payload(&self) -> &ActionPayload {
        &self.payload
    }
}

impl Runtime {
    /// Invokes `action` for the component resolved from `trigger_el` over
    /// the runtime's own transport, blocking until settled.
    pub fn invoke(
        &mut self,
        doc: &mut Document,
        trigger_el: NodeId,
        action: &str,
        trigger_event: Option<&str>,
    ) -> InvokeOutcome {
        match self.begin_invoke(doc, trigger_el, action, trigger_event) {
            Err(outcome) => outcome,
            Ok(in_flight) => {
                let result = self.transport.post(&in_flight.payload);
                self.finish_invoke(doc, in_flight, result);
                InvokeOutcome::Invoked
            }
        }
    }

    /// First half of the lifecycle: resolve identity, check the per-instance
    /// guard, collect submission data, then acquire the guard and start
    /// indicators. Hosts driving their own carrier call this, run the
    /// payload, and hand the result to [`Runtime::finish_invoke`].
    pub fn begin_invoke(
        &mut self,
        doc: &mut Document,
        trigger_el: NodeId,
        action: &str,
        trigger_event: Option<&str>,
    ) -> Result<InFlight, InvokeOutcome> {
        let Some(mut meta) = locator::resolve_identity(doc, &self.attrs, trigger_el) else {
            log::debug!(
                target: "runtime.invoke",
                "no component identity for action '{action}'; ignoring",
            );
            return Err(InvokeOutcome::NoIdentity);
        };
        let instance = meta.identity.instance_id.clone();

        if self.guard.contains(&instance) {
            log::debug!(
                target: "runtime.invoke",
                "request already pending for '{instance}'; dropping '{action}'",
            );
            return Err(InvokeOutcome::DroppedPending);
        }

        // out-of-tree triggers re-resolve their root by identity
        if meta.root.is_none() {
            meta.root = locator::find_component(doc, &self.attrs, &meta.identity.kind, &instance);
        }

        let fields = collect_submission(doc, &self.attrs, trigger_el, meta.root);
        let payload = ActionPayload {
            identity: meta.identity.clone(),
            action: action.to_string(),
            fields,
            trigger_event: trigger_event.map(str::to_string),
        };

        self.guard.insert(instance);
        let indicators = crate::indicator::start(doc, &self.attrs, trigger_el, meta.root);
        Ok(InFlight {
            payload,
            meta,
            trigger_el,
            indicators,
        })
    }

    /// Second half: reconcile the carrier's result, then release the guard
    /// and stop indicators unconditionally.
    pub fn finish_invoke(
        &mut self,
        doc: &mut Document,
        in_flight: InFlight,
        result: Result<wire::ActionResponse, wire::TransportError>,
    ) {
        let InFlight {
            payload,
            meta,
            trigger_el,
            indicators,
        } = in_flight;

        match result {
            Ok(response) => self.apply_response(doc, &meta, trigger_el, response),
            Err(e) => log::warn!(
                target: "runtime.invoke",
                "action '{}' on {}/{} failed: {e}",
                payload.action,
                meta.identity.kind,
                meta.identity.instance_id,
            ),
        }

        self.guard.remove(&meta.identity.instance_id);
        crate::indicator::end(doc, &self.attrs, indicators);
    }

    fn apply_response(
        &mut self,
        doc: &mut Document,
        meta: &ComponentMetadata,
        trigger_el: NodeId,
        response: wire::ActionResponse,
    ) {
        if let Some(redirect) = response.redirect {
            if redirect.after_seconds > 0 {
                self.timers.schedule(
                    u64::from(redirect.after_seconds) * 1_000,
                    TimerTask::Redirect { url: redirect.url },
                );
            } else {
                self.hooks.navigate(&redirect.url);
            }
            return;
        }

        if let Some(raw) = &response.events_raw {
            self.bus
                .process_server_events(raw, &meta.identity, doc, &self.attrs, &mut *self.sink);
        }

        let Some(root) = meta.root else {
            log::warn!(
                target: "runtime.invoke",
                "no live root for {}/{}; response dropped",
                meta.identity.kind,
                meta.identity.instance_id,
            );
            return;
        };
        let resp = Document::parse_fragment(&response.html);

        if patch::has_fragment_markers(&resp, &self.attrs) {
            let applied = patch::apply(
                doc,
                root,
                &resp,
                &self.attrs,
                &mut self.triggers,
                &mut self.timers,
                &mut *self.hooks,
            );
            if applied > 0 {
                self.hooks.wire_refresh(doc);
                return;
            }
            log::warn!(
                target: "runtime.patch",
                "no fragments applied; falling back to full replacement",
            );
        } else if let Some(select) = doc
            .attr(trigger_el, &self.attrs.select)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
        {
            if self.apply_select(doc, root, &resp, &select) {
                self.hooks.wire_refresh(doc);
                return;
            }
        }

        self.full_replace(doc, root, &resp);
    }

    /// Response filtering through the triggering element's select list: the
    /// first matching response fragment replaces the matching live node,
    /// leaving the root in place. No match on either side falls back.
    fn apply_select(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        resp: &Document,
        select: &str,
    ) -> bool {
        let Some(selector) = SelectorList::parse(select) else {
            log::warn!(target: "runtime.invoke", "invalid select list '{select}'");
            return false;
        };
        let Some(fragment_src) = resp.query_selector(resp.root(), &selector) else {
            return false;
        };
        let Some(live) = doc.query_selector(root, &selector) else {
            return false;
        };
        unregister_subtree(&mut self.triggers, &mut self.timers, doc, live);
        let node = doc.adopt(resp, fragment_src);
        if doc.replace_node(live, node) {
            self.hooks.execute_scripts(doc, node);
            true
        } else {
            false
        }
    }

    pub(crate) fn full_replace(&mut self, doc: &mut Document, root: NodeId, resp: &Document) {
        let Some(mut src) = resp.first_element_child(resp.root()) else {
            log::warn!(target: "runtime.invoke", "response has no element; DOM left untouched");
            return;
        };
        // a marker response that failed wholesale still falls back through
        // its first template's content
        if resp.tag_name(src) == Some("template") {
            match resp.first_element_child(src) {
                Some(inner) => src = inner,
                None => {
                    log::warn!(target: "runtime.invoke", "fallback template is empty");
                    return;
                }
            }
        }

        unregister_subtree(&mut self.triggers, &mut self.timers, doc, root);
        let new_root = doc.adopt(resp, src);
        if doc.replace_node(root, new_root) {
            self.hooks.execute_scripts(doc, new_root);
            self.hooks.wire_refresh(doc);
        }
    }

    /// Generic delegation for clicks and submits that no trigger consumed:
    /// the nearest action-bearing element (or enclosing form) invokes its
    /// action. Returns whether the event's default should be prevented.
    pub(crate) fn delegate(&mut self, doc: &mut Document, target: NodeId, event_type: &str) -> bool {
        match event_type {
            "click" => {
                let Some(el) = doc.closest(target, &self.attrs.action_selector()) else {
                    return false;
                };
                if doc.tag_name(el) == Some("form") {
                    return false;
                }
                let Some(action) = doc
                    .attr(el, &self.attrs.action)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                else {
                    return false;
                };
                // a submit button delegates to the form's submit event
                let form_selector = SelectorList::parse("form").expect("form selector");
                let in_form = doc.closest(el, &form_selector).is_some()
                    || doc
                        .attr(el, "form")
                        .filter(|v| !v.is_empty())
                        .and_then(|id| doc.find_by_dom_id(id))
                        .is_some();
                let tag = doc.tag_name(el);
                let is_submit_button = (tag == Some("button") || tag == Some("input"))
                    && doc
                        .attr(el, "type")
                        .is_some_and(|t| t.eq_ignore_ascii_case("submit"));
                if in_form && is_submit_button {
                    return false;
                }
                // unresolvable identity leaves the click to its default
                if locator::resolve_identity(doc, &self.attrs, el).is_none() {
                    return false;
                }
                self.invoke(doc, el, &action, None);
                true
            }
            "submit" => {
                let form_selector = SelectorList::parse("form").expect("form selector");
                let Some(form) = doc.closest(target, &form_selector) else {
                    return false;
                };
                if locator::resolve_identity(doc, &self.attrs, form).is_none() {
                    return false;
                }
                // the submitting control names the action; the form is the
                // fallback, then the default action name
                let submitter = doc
                    .query_selector(form, &self.attrs.action_selector())
                    .filter(|&n| doc.tag_name(n) != Some("form"));
                let action = submitter
                    .and_then(|s| doc.attr(s, &self.attrs.action))
                    .filter(|a| !a.is_empty())
                    .or_else(|| doc.attr(form, &self.attrs.action).filter(|a| !a.is_empty()))
                    .unwrap_or("submit")
                    .to_string();
                let trigger_el = submitter.unwrap_or(form);
                self.invoke(doc, trigger_el, &action, None);
                true
            }
            _ => false,
        }
    }
}
