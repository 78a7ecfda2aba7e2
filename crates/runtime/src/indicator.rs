//! Request indicators.
//!
//! While a request is in flight, indicator elements carry the request class.
//! Targets come from the indicator attribute on the triggering element — a
//! comma list of selectors, with `this` meaning the trigger itself — or,
//! absent the attribute, the trigger plus every indicator-class element under
//! the root. An indicator hidden with inline `display:none` that did not opt
//! in via the indicator class is shown for the duration and its inline style
//! restored verbatim afterwards.

use dom::{Document, NodeId, SelectorList};

use crate::config::AttrNames;

pub(crate) struct ActiveIndicator {
    node: NodeId,
    /// Original `style` attribute when visibility was forced (`None` inside
    /// means the attribute was absent).
    restore_style: Option<Option<String>>,
}

pub(crate) fn start(
    doc: &mut Document,
    attrs: &AttrNames,
    trigger_el: NodeId,
    root: Option<NodeId>,
) -> Vec<ActiveIndicator> {
    let scope = root.unwrap_or(doc.root());
    let mut targets: Vec<NodeId> = Vec::new();

    match doc.attr(trigger_el, &attrs.indicator).map(str::to_string) {
        Some(list) if !list.trim().is_empty() => {
            for token in list.split(',') {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                if token == "this" {
                    targets.push(trigger_el);
                    continue;
                }
                match SelectorList::parse(token) {
                    Some(selector) => {
                        let matches = doc.query_selector_all(scope, &selector);
                        if matches.is_empty() {
                            log::debug!(target: "runtime.indicator", "no indicator matches '{token}'");
                        }
                        targets.extend(matches);
                    }
                    None => log::warn!(target: "runtime.indicator", "invalid indicator selector '{token}'"),
                }
            }
        }
        _ => {
            targets.push(trigger_el);
            let convention = SelectorList::parse(&format!(".{}", attrs.indicator_class))
                .expect("indicator class selector");
            targets.extend(doc.query_selector_all(scope, &convention));
        }
    }

    targets.sort();
    targets.dedup();

    let mut active = Vec::with_capacity(targets.len());
    for node in targets {
        let opted_in = doc.attr_has_token(node, "class", &attrs.indicator_class);
        let restore_style = if !opted_in && inline_display(doc, node).as_deref() == Some("none") {
            let original = doc.attr(node, "style").map(str::to_string);
            set_inline_display(doc, node, "inline-block");
            Some(original)
        } else {
            None
        };
        doc.add_attr_token(node, "class", &attrs.request_class);
        active.push(ActiveIndicator {
            node,
            restore_style,
        });
    }
    active
}

pub(crate) fn end(doc: &mut Document, attrs: &AttrNames, active: Vec<ActiveIndicator>) {
    for indicator in active {
        if !doc.contains(indicator.node) {
            continue;
        }
        doc.remove_attr_token(indicator.node, "class", &attrs.request_class);
        if let Some(original) = indicator.restore_style {
            match original {
                Some(style) => doc.set_attr(indicator.node, "style", &style),
                None => doc.remove_attr(indicator.node, "style"),
            }
        }
    }
}

fn inline_display(doc: &Document, node: NodeId) -> Option<String> {
    let style = doc.attr(node, "style")?;
    for declaration in style.split(';') {
        if let Some((name, value)) = declaration.split_once(':')
            && name.trim().eq_ignore_ascii_case("display")
        {
            return Some(value.trim().to_string());
        }
    }
    None
}

fn set_inline_display(doc: &mut Document, node: NodeId, display: &str) {
    let mut declarations: Vec<String> = Vec::new();
    if let Some(style) = doc.attr(node, "style") {
        for declaration in style.split(';') {
            let declaration = declaration.trim();
            if declaration.is_empty() {
                continue;
            }
            let is_display = declaration
                .split_once(':')
                .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case("display"));
            if !is_display {
                declarations.push(declaration.to_string());
            }
        }
    }
    declarations.push(format!("display: {display}"));
    doc.set_attr(node, "style", &declarations.join("; "));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> AttrNames {
        AttrNames::default()
    }

    fn setup(markup: &str) -> (Document, NodeId, NodeId) {
        let doc = Document::parse(markup);
        let root = doc.first_element_child(doc.root()).unwrap();
        let trigger = doc.find_by_dom_id("go").unwrap();
        (doc, root, trigger)
    }

    #[test]
    fn this_and_referenced_targets_activate() {
        let (mut doc, root, trigger) = setup(
            r#"<div data-tw-root>
                 <button id="go" data-tw-indicator="this, #spin">Go</button>
                 <span id="spin"></span>
               </div>"#,
        );
        let spin = doc.find_by_dom_id("spin").unwrap();

        let active = start(&mut doc, &attrs(), trigger, Some(root));
        assert!(doc.attr_has_token(trigger, "class", "tw-request"));
        assert!(doc.attr_has_token(spin, "class", "tw-request"));

        end(&mut doc, &attrs(), active);
        assert!(!doc.attr_has_token(trigger, "class", "tw-request"));
        assert!(!doc.attr_has_token(spin, "class", "tw-request"));
    }

    #[test]
    fn falls_back_to_class_convention() {
        let (mut doc, root, trigger) = setup(
            r#"<div data-tw-root>
                 <button id="go">Go</button>
                 <div id="spinner" class="tw-indicator"></div>
               </div>"#,
        );
        let spinner = doc.find_by_dom_id("spinner").unwrap();
        let active = start(&mut doc, &attrs(), trigger, Some(root));
        assert!(doc.attr_has_token(trigger, "class", "tw-request"));
        assert!(doc.attr_has_token(spinner, "class", "tw-request"));
        end(&mut doc, &attrs(), active);
        assert!(!doc.attr_has_token(spinner, "class", "tw-request"));
    }

    #[test]
    fn inline_hidden_targets_show_and_restore_verbatim() {
        let (mut doc, root, trigger) = setup(
            r##"<div data-tw-root>
                 <button id="go" data-tw-indicator="#hidden">Go</button>
                 <span id="hidden" style="color: red; display:none"></span>
               </div>"##,
        );
        let hidden = doc.find_by_dom_id("hidden").unwrap();

        let active = start(&mut doc, &attrs(), trigger, Some(root));
        assert_eq!(inline_display(&doc, hidden).as_deref(), Some("inline-block"));
        assert!(doc.attr(hidden, "style").unwrap().contains("color: red"));

        end(&mut doc, &attrs(), active);
        assert_eq!(doc.attr(hidden, "style"), Some("color: red; display:none"));
    }

    #[test]
    fn class_opted_indicators_keep_their_display() {
        let (mut doc, root, trigger) = setup(
            r##"<div data-tw-root>
                 <button id="go" data-tw-indicator="#local">Go</button>
                 <span id="local" class="tw-indicator" style="display:none"></span>
               </div>"##,
        );
        let local = doc.find_by_dom_id("local").unwrap();
        let active = start(&mut doc, &attrs(), trigger, Some(root));
        assert_eq!(inline_display(&doc, local).as_deref(), Some("none"));
        assert!(doc.attr_has_token(local, "class", "tw-request"));
        end(&mut doc, &attrs(), active);
        assert!(!doc.attr_has_token(local, "class", "tw-request"));
        assert_eq!(inline_display(&doc, local).as_deref(), Some("none"));
    }
}
