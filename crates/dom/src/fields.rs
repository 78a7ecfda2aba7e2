//! Named form-control reading.
//!
//! Collects `input[name]`, `select[name]`, and `textarea[name]` values under
//! a scope node, in document order. Duplicate names are preserved here; merge
//! precedence is the caller's concern.

use crate::document::{Document, NodeId};

/// All named control values under `scope` (descendants only).
pub fn collect(doc: &Document, scope: NodeId) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for node in doc.descendants(scope) {
        if let Some(pair) = control_value(doc, node) {
            out.push(pair);
        }
    }
    out
}

/// The `(name, value)` pair of a single control, or `None` when the node is
/// not a named control or does not currently submit (unchecked checkbox or
/// radio, multi-select with nothing selected).
pub fn control_value(doc: &Document, el: NodeId) -> Option<(String, String)> {
    let tag = doc.tag_name(el)?;
    let name = doc.attr(el, "name")?.to_string();
    if name.is_empty() {
        return None;
    }

    let value = match tag {
        "input" => {
            let input_type = doc
                .attr(el, "type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string());
            if (input_type == "checkbox" || input_type == "radio") && !doc.has_attr(el, "checked") {
                return None;
            }
            match doc.attr(el, "value") {
                Some(v) => v.to_string(),
                // checked controls without an explicit value submit "on"
                None if input_type == "checkbox" || input_type == "radio" => "on".to_string(),
                None => String::new(),
            }
        }
        "textarea" => doc.text_content(el),
        "select" => select_value(doc, el)?,
        _ => return None,
    };

    Some((name, value))
}

fn select_value(doc: &Document, select: NodeId) -> Option<String> {
    let options: Vec<NodeId> = doc
        .descendants(select)
        .filter(|&n| doc.tag_name(n) == Some("option"))
        .collect();

    let chosen = if doc.has_attr(select, "multiple") {
        // multi-select submits its last selected value, or nothing
        options
            .iter()
            .copied()
            .filter(|&o| doc.has_attr(o, "selected"))
            .next_back()?
    } else {
        options
            .iter()
            .copied()
            .find(|&o| doc.has_attr(o, "selected"))
            .or_else(|| options.first().copied())?
    };

    Some(option_value(doc, chosen))
}

fn option_value(doc: &Document, option: NodeId) -> String {
    match doc.attr(option, "value") {
        Some(v) => v.to_string(),
        None => doc.text_content(option).trim().to_string(),
    }
}
