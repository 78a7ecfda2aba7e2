//! Fragment-targeted patch protocol.
//!
//! A response opts in by containing inert `<template>` markers. Invariants:
//! - A full-component marker (kind attribute, no fragment selector) applies
//!   first; later selector lookups run against the *new* root.
//! - Targeted markers apply in document order; a scope mismatch or missing
//!   selector skips that marker with a warning, never the whole response.
//! - Zero applied markers rejects the response as unhandled; the caller
//!   falls back to full replacement.
//! - Every freshly inserted fragment is reported to the script hook.

use dom::{Document, InsertPosition, NodeId, SelectorList};

use crate::config::AttrNames;
use crate::hooks::HostHooks;
use crate::schedule::Timers;
use crate::trigger::{TriggerSet, unregister_subtree};

enum SwapMode {
    Replace,
    Inner,
    Adjacent(InsertPosition),
}

fn parse_swap(value: &str) -> Option<SwapMode> {
    match value {
        "replace" => Some(SwapMode::Replace),
        "inner" => Some(SwapMode::Inner),
        "beforebegin" => Some(SwapMode::Adjacent(InsertPosition::BeforeBegin)),
        "afterbegin" => Some(SwapMode::Adjacent(InsertPosition::AfterBegin)),
        "beforeend" => Some(SwapMode::Adjacent(InsertPosition::BeforeEnd)),
        "afterend" => Some(SwapMode::Adjacent(InsertPosition::AfterEnd)),
        _ => None,
    }
}

fn templates(resp: &Document) -> Vec<NodeId> {
    resp.descendants(resp.root())
        .filter(|&n| resp.tag_name(n) == Some("template"))
        .collect()
}

/// Whether the response declares itself fragment-targeted.
pub(crate) fn has_fragment_markers(resp: &Document, attrs: &AttrNames) -> bool {
    templates(resp)
        .iter()
        .any(|&t| resp.has_attr(t, &attrs.fragment) || resp.has_attr(t, &attrs.kind))
}

/// Applies all markers against the live document. Returns the number of
/// successfully applied markers; zero means "not handled".
pub(crate) fn apply(
    doc: &mut Document,
    root: NodeId,
    resp: &Document,
    attrs: &AttrNames,
    triggers: &mut TriggerSet,
    timers: &mut Timers,
    hooks: &mut dyn HostHooks,
) -> usize {
    let markers = templates(resp);
    let mut applied = 0;
    let mut current_root = root;

    // full component replacement first
    if let Some(&full) = markers
        .iter()
        .find(|&&t| resp.has_attr(t, &attrs.kind) && !resp.has_attr(t, &attrs.fragment))
    {
        match resp.first_element_child(full) {
            Some(src) => {
                unregister_subtree(triggers, timers, doc, current_root);
                let new_root = doc.adopt(resp, src);
                if doc.replace_node(current_root, new_root) {
                    hooks.execute_scripts(doc, new_root);
                    current_root = new_root;
                    applied += 1;
                }
            }
            None => {
                log::warn!(target: "runtime.patch", "full-replacement marker has no content")
            }
        }
    }

    for &marker in &markers {
        let Some(selector_text) = resp.attr(marker, &attrs.fragment).filter(|s| !s.is_empty())
        else {
            continue;
        };
        let Some(selector) = SelectorList::parse(selector_text) else {
            log::warn!(target: "runtime.patch", "unsupported selector '{selector_text}'");
            continue;
        };
        let swap_text = resp.attr(marker, &attrs.swap).unwrap_or("replace");
        let Some(swap) = parse_swap(swap_text) else {
            log::warn!(target: "runtime.patch", "unknown swap mode '{swap_text}'");
            continue;
        };

        let scope_kind = resp.attr(marker, &attrs.scope_kind).filter(|s| !s.is_empty());
        let scope_id = resp.attr(marker, &attrs.scope_id).filter(|s| !s.is_empty());
        let scoped = scope_kind.is_some() || scope_id.is_some();
        if scoped {
            if let Some(want) = scope_kind
                && doc.attr(current_root, &attrs.kind) != Some(want)
            {
                log::warn!(
                    target: "runtime.patch",
                    "scope kind mismatch for '{selector_text}': wanted {want}",
                );
                continue;
            }
            if let Some(want) = scope_id
                && doc.attr(current_root, &attrs.instance) != Some(want)
            {
                log::warn!(
                    target: "runtime.patch",
                    "scope id mismatch for '{selector_text}': wanted {want}",
                );
                continue;
            }
        }

        let search_root = if scoped { current_root } else { doc.root() };
        let Some(target) = doc.query_selector(search_root, &selector) else {
            log::warn!(target: "runtime.patch", "selector not found: '{selector_text}'");
            continue;
        };
        let Some(fragment_src) = resp.first_element_child(marker) else {
            log::warn!(target: "runtime.patch", "marker for '{selector_text}' has no content");
            continue;
        };

        match swap {
            SwapMode::Replace => {
                unregister_subtree(triggers, timers, doc, target);
                let node = doc.adopt(resp, fragment_src);
                if doc.replace_node(target, node) {
                    hooks.execute_scripts(doc, node);
                    applied += 1;
                }
            }
            SwapMode::Inner => {
                for child in doc.children(target).to_vec() {
                    unregister_subtree(triggers, timers, doc, child);
                }
                let new_children: Vec<NodeId> = resp
                    .children(fragment_src)
                    .to_vec()
                    .into_iter()
                    .map(|c| doc.adopt(resp, c))
                    .collect();
                doc.set_inner(target, new_children);
                hooks.execute_scripts(doc, target);
                applied += 1;
            }
            SwapMode::Adjacent(position) => {
                let node = doc.adopt(resp, fragment_src);
                if doc.insert_adjacent(target, position, node) {
                    hooks.execute_scripts(doc, node);
                    applied += 1;
                } else {
                    doc.remove_node(node);
                    log::warn!(
                        target: "runtime.patch",
                        "cannot insert '{swap_text}' relative to '{selector_text}'",
                    );
                }
            }
        }
    }

    applied
}
