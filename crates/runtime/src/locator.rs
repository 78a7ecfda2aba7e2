//! Component identity resolution.
//!
//! Many DOM nodes are not component-related; every resolver here returns
//! `Option` and callers no-op silently on `None`.

use dom::{Document, NodeId};
use wire::ComponentIdentity;

use crate::config::AttrNames;

/// Identity plus the root node it was resolved from. `root` is `None` when
/// the identity came from explicit attributes on an out-of-tree trigger; it
/// must be re-resolved by instance id before any patching.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentMetadata {
    pub identity: ComponentIdentity,
    pub root: Option<NodeId>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolution order, first match wins:
/// 1. nearest ancestor-or-self carrying the root marker with kind and id,
/// 2. explicit kind/id attributes on `start` itself,
/// 3. a root referenced by DOM id, re-validated for kind and id.
pub fn resolve_identity(
    doc: &Document,
    attrs: &AttrNames,
    start: NodeId,
) -> Option<ComponentMetadata> {
    if let Some(root) = doc.closest(start, &attrs.root_selector())
        && let (Some(kind), Some(id)) = (
            non_empty(doc.attr(root, &attrs.kind)),
            non_empty(doc.attr(root, &attrs.instance)),
        )
    {
        return Some(ComponentMetadata {
            identity: ComponentIdentity::new(kind, id),
            root: Some(root),
        });
    }

    if let (Some(kind), Some(id)) = (
        non_empty(doc.attr(start, &attrs.kind)),
        non_empty(doc.attr(start, &attrs.instance)),
    ) {
        return Some(ComponentMetadata {
            identity: ComponentIdentity::new(kind, id),
            root: None,
        });
    }

    if let Some(dom_id) = non_empty(doc.attr(start, &attrs.for_ref))
        && let Some(root) = doc.find_by_dom_id(dom_id)
        && doc.has_attr(root, &attrs.root)
        && let (Some(kind), Some(id)) = (
            non_empty(doc.attr(root, &attrs.kind)),
            non_empty(doc.attr(root, &attrs.instance)),
        )
    {
        return Some(ComponentMetadata {
            identity: ComponentIdentity::new(kind, id),
            root: Some(root),
        });
    }

    None
}

fn roots(doc: &Document, attrs: &AttrNames) -> Vec<NodeId> {
    doc.query_selector_all(doc.root(), &attrs.root_selector())
}

/// Exact (kind, id) root lookup. A linear scan over live roots — this runs
/// at user-interaction rate, not in a hot path.
pub fn find_component(
    doc: &Document,
    attrs: &AttrNames,
    kind: &str,
    instance_id: &str,
) -> Option<NodeId> {
    roots(doc, attrs).into_iter().find(|&root| {
        doc.attr(root, &attrs.kind) == Some(kind) && doc.attr(root, &attrs.instance) == Some(instance_id)
    })
}

/// Root lookup by instance id alone (socket updates address components this
/// way).
pub fn find_by_instance(doc: &Document, attrs: &AttrNames, instance_id: &str) -> Option<NodeId> {
    roots(doc, attrs)
        .into_iter()
        .find(|&root| doc.attr(root, &attrs.instance) == Some(instance_id))
}

/// Instance ids of every live root of `kind`, in document order.
pub fn instances_of_kind(doc: &Document, attrs: &AttrNames, kind: &str) -> Vec<String> {
    roots(doc, attrs)
        .into_iter()
        .filter(|&root| doc.attr(root, &attrs.kind) == Some(kind))
        .filter_map(|root| non_empty(doc.attr(root, &attrs.instance)).map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> AttrNames {
        AttrNames::default()
    }

    #[test]
    fn resolves_from_nearest_ancestor_root() {
        let doc = Document::parse(
            r#"<div data-tw-root data-tw-component="counter" data-tw-id="c-1">
                 <div><button id="go">+</button></div>
               </div>"#,
        );
        let button = doc.find_by_dom_id("go").unwrap();
        let meta = resolve_identity(&doc, &attrs(), button).unwrap();
        assert_eq!(meta.identity, ComponentIdentity::new("counter", "c-1"));
        assert!(meta.root.is_some());
    }

    #[test]
    fn explicit_attributes_win_for_out_of_tree_controls() {
        let doc = Document::parse(
            r#"<button id="go" data-tw-component="counter" data-tw-id="c-9">+</button>"#,
        );
        let button = doc.find_by_dom_id("go").unwrap();
        let meta = resolve_identity(&doc, &attrs(), button).unwrap();
        assert_eq!(meta.identity.instance_id, "c-9");
        assert_eq!(meta.root, None);
    }

    #[test]
    fn for_reference_revalidates_the_root() {
        let doc = Document::parse(
            r#"<div id="panel" data-tw-root data-tw-component="panel" data-tw-id="p-1"></div>
               <button id="go" data-tw-for="panel">open</button>
               <button id="bad" data-tw-for="missing">open</button>"#,
        );
        let good = doc.find_by_dom_id("go").unwrap();
        let meta = resolve_identity(&doc, &attrs(), good).unwrap();
        assert_eq!(meta.identity.kind, "panel");
        assert!(meta.root.is_some());

        let bad = doc.find_by_dom_id("bad").unwrap();
        assert!(resolve_identity(&doc, &attrs(), bad).is_none());
    }

    #[test]
    fn unrelated_nodes_resolve_to_none() {
        let doc = Document::parse("<div><p id='x'>plain</p></div>");
        let p = doc.find_by_dom_id("x").unwrap();
        assert!(resolve_identity(&doc, &attrs(), p).is_none());
    }

    #[test]
    fn find_component_scans_live_roots() {
        let doc = Document::parse(
            r#"<div data-tw-root data-tw-component="a" data-tw-id="1"></div>
               <div data-tw-root data-tw-component="a" data-tw-id="2"></div>
               <div data-tw-root data-tw-component="b" data-tw-id="3"></div>"#,
        );
        let attrs = attrs();
        assert!(find_component(&doc, &attrs, "a", "2").is_some());
        assert!(find_component(&doc, &attrs, "b", "2").is_none());
        assert_eq!(instances_of_kind(&doc, &attrs, "a"), vec!["1", "2"]);
        assert!(find_by_instance(&doc, &attrs, "3").is_some());
    }
}
