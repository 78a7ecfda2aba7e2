//! Arena-backed document tree.
//!
//! Invariants:
//! - `NodeId`s are allocated monotonically and never reused within a document;
//!   removing a subtree tombstones its slots, so a stale id resolves to "gone"
//!   rather than aliasing a newer node.
//! - A node has at most one parent; mutation helpers detach before re-attach.
//! - Child order is explicit and deterministic; traversal is pre-order
//!   (document order).
//! - Element and attribute names are canonical ASCII-lowercase (the tokenizer
//!   lowercases on the way in).

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Document {
        doctype: Option<String>,
    },
    Element {
        name: String,
        attributes: Vec<(String, Option<String>)>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

#[derive(Debug)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Where to place an adopted node relative to an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPosition {
    BeforeBegin,
    AfterBegin,
    BeforeEnd,
    AfterEnd,
}

#[derive(Debug)]
pub struct Document {
    slots: Vec<Option<Slot>>,
    root: NodeId,
}

impl Document {
    pub fn new() -> Self {
        Document {
            slots: vec![Some(Slot {
                data: NodeData::Document { doctype: None },
                parent: None,
                children: Vec::new(),
            })],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        self.slots.get_mut(id.0 as usize).and_then(|s| s.as_mut())
    }

    /// Whether `id` still refers to a live node of this document.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.slot(id).map(|s| &s.data)
    }

    /// Allocates a detached node.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(Slot {
            data,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    pub fn create_element(&mut self, name: &str, attributes: Vec<(String, Option<String>)>) -> NodeId {
        self.create(NodeData::Element {
            name: name.to_ascii_lowercase(),
            attributes,
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create(NodeData::Text {
            text: text.to_string(),
        })
    }

    pub(crate) fn set_doctype(&mut self, doctype: String) {
        let root = self.root;
        if let Some(slot) = self.slot_mut(root)
            && let NodeData::Document { doctype: dt } = &mut slot.data
        {
            *dt = Some(doctype);
        }
    }

    pub fn doctype(&self) -> Option<&str> {
        match self.data(self.root) {
            Some(NodeData::Document { doctype }) => doctype.as_deref(),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|s| s.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element { .. }))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    /// Walks the parent chain starting at the parent of `id`.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Pre-order traversal of the subtree below `scope` (excluding `scope`).
    pub fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        let mut stack = Vec::new();
        for &child in self.children(scope).iter().rev() {
            stack.push(child);
        }
        Descendants { doc: self, stack }
    }

    // ---- attributes ----

    pub fn attributes(&self, id: NodeId) -> &[(String, Option<String>)] {
        match self.data(id) {
            Some(NodeData::Element { attributes, .. }) => attributes.as_slice(),
            _ => &[],
        }
    }

    /// First attribute value for `name`; a valueless attribute reads as "".
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if let Some(slot) = self.slot_mut(id)
            && let NodeData::Element { attributes, .. } = &mut slot.data
        {
            if let Some(entry) = attributes.iter_mut().find(|(n, _)| *n == name) {
                entry.1 = Some(value.to_string());
            } else {
                attributes.push((name, Some(value.to_string())));
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(slot) = self.slot_mut(id)
            && let NodeData::Element { attributes, .. } = &mut slot.data
        {
            attributes.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        }
    }

    /// Whether a whitespace-separated attribute (class-like) contains `token`.
    pub fn attr_has_token(&self, id: NodeId, name: &str, token: &str) -> bool {
        self.attr(id, name)
            .is_some_and(|v| v.split_ascii_whitespace().any(|t| t == token))
    }

    pub fn add_attr_token(&mut self, id: NodeId, name: &str, token: &str) {
        if self.attr_has_token(id, name, token) {
            return;
        }
        let merged = match self.attr(id, name) {
            Some(existing) if !existing.is_empty() => format!("{existing} {token}"),
            _ => token.to_string(),
        };
        self.set_attr(id, name, &merged);
    }

    pub fn remove_attr_token(&mut self, id: NodeId, name: &str, token: &str) {
        let Some(existing) = self.attr(id, name) else {
            return;
        };
        let kept: Vec<&str> = existing
            .split_ascii_whitespace()
            .filter(|t| *t != token)
            .collect();
        let joined = kept.join(" ");
        self.set_attr(id, name, &joined);
    }

    // ---- text ----

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text { text }) => out.push_str(text),
            Some(NodeData::Element { .. }) | Some(NodeData::Document { .. }) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// First element whose `id` attribute equals `value`.
    pub fn find_by_dom_id(&self, value: &str) -> Option<NodeId> {
        let root = self.root;
        std::iter::once(root)
            .chain(self.descendants(root))
            .find(|&n| self.attr(n, "id") == Some(value))
    }

    // ---- mutation ----

    /// Attaches a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.parent(child).is_none(), "child must be detached");
        if self.slot(parent).is_none() || self.slot(child).is_none() {
            return;
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.push(child);
        }
    }

    /// Inserts a detached node relative to `target`. Returns false when the
    /// position requires a parent `target` does not have.
    pub fn insert_adjacent(&mut self, target: NodeId, position: InsertPosition, node: NodeId) -> bool {
        if self.slot(target).is_none() || self.slot(node).is_none() {
            return false;
        }
        match position {
            InsertPosition::AfterBegin => {
                if let Some(slot) = self.slot_mut(node) {
                    slot.parent = Some(target);
                }
                if let Some(slot) = self.slot_mut(target) {
                    slot.children.insert(0, node);
                }
                true
            }
            InsertPosition::BeforeEnd => {
                self.append_child(target, node);
                true
            }
            InsertPosition::BeforeBegin | InsertPosition::AfterEnd => {
                let Some(parent) = self.parent(target) else {
                    return false;
                };
                let Some(index) = self.child_index(parent, target) else {
                    return false;
                };
                let at = if position == InsertPosition::BeforeBegin {
                    index
                } else {
                    index + 1
                };
                if let Some(slot) = self.slot_mut(node) {
                    slot.parent = Some(parent);
                }
                if let Some(slot) = self.slot_mut(parent) {
                    slot.children.insert(at, node);
                }
                true
            }
        }
    }

    /// Replaces `old` (and its subtree) with the detached node `new`.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        let Some(index) = self.child_index(parent, old) else {
            return false;
        };
        self.free_subtree(old);
        if let Some(slot) = self.slot_mut(new) {
            slot.parent = Some(parent);
        }
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.insert(index, new);
        }
        true
    }

    /// Replaces the children of `target` with `new_children` (each detached).
    pub fn set_inner(&mut self, target: NodeId, new_children: Vec<NodeId>) {
        let old: Vec<NodeId> = self.children(target).to_vec();
        for child in old {
            self.free_subtree(child);
        }
        for child in new_children {
            self.append_child(target, child);
        }
    }

    /// Detaches and tombstones `id` and its whole subtree.
    pub fn remove_node(&mut self, id: NodeId) {
        self.free_subtree(id);
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    fn free_subtree(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id)
            && let Some(slot) = self.slot_mut(parent)
        {
            slot.children.retain(|&c| c != id);
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(slot) = self.slots.get_mut(node.0 as usize).and_then(|s| s.take()) {
                stack.extend(slot.children);
            }
        }
    }

    /// Deep-copies a subtree from another document; the copy is detached.
    pub fn adopt(&mut self, src: &Document, node: NodeId) -> NodeId {
        let data = src
            .data(node)
            .cloned()
            .unwrap_or(NodeData::Text { text: String::new() });
        let copy = self.create(data);
        for &child in src.children(node) {
            let child_copy = self.adopt(src, child);
            self.append_child(copy, child_copy);
        }
        copy
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        for &child in self.doc.children(current).iter().rev() {
            self.stack.push(child);
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_children() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element("div", vec![("id".into(), Some("a".into()))]);
        let b = doc.create_element("span", Vec::new());
        doc.append_child(root, a);
        doc.append_child(a, b);
        (doc, root, a, b)
    }

    #[test]
    fn removal_tombstones_the_subtree() {
        let (mut doc, root, a, b) = doc_with_children();
        doc.remove_node(a);
        assert!(!doc.contains(a));
        assert!(!doc.contains(b));
        assert!(doc.children(root).is_empty());
    }

    #[test]
    fn replace_keeps_sibling_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let first = doc.create_element("p", Vec::new());
        let second = doc.create_element("p", Vec::new());
        let third = doc.create_element("p", Vec::new());
        doc.append_child(root, first);
        doc.append_child(root, second);
        doc.append_child(root, third);

        let replacement = doc.create_element("section", Vec::new());
        assert!(doc.replace_node(second, replacement));
        assert_eq!(doc.children(root), &[first, replacement, third]);
        assert!(!doc.contains(second));
    }

    #[test]
    fn insert_adjacent_positions() {
        let (mut doc, root, a, _b) = doc_with_children();
        let before = doc.create_text("before");
        let inside = doc.create_text("inside");
        assert!(doc.insert_adjacent(a, InsertPosition::BeforeBegin, before));
        assert!(doc.insert_adjacent(a, InsertPosition::AfterBegin, inside));
        assert_eq!(doc.children(root)[0], before);
        assert_eq!(doc.children(a)[0], inside);
    }

    #[test]
    fn attr_token_helpers() {
        let mut doc = Document::new();
        let el = doc.create_element("div", vec![("class".into(), Some("one two".into()))]);
        assert!(doc.attr_has_token(el, "class", "two"));
        doc.add_attr_token(el, "class", "three");
        doc.add_attr_token(el, "class", "three");
        assert_eq!(doc.attr(el, "class"), Some("one two three"));
        doc.remove_attr_token(el, "class", "two");
        assert_eq!(doc.attr(el, "class"), Some("one three"));
    }

    #[test]
    fn adopt_copies_deeply_between_documents() {
        let (src, _root, a, _b) = doc_with_children();
        let mut dst = Document::new();
        let copy = dst.adopt(&src, a);
        assert_eq!(dst.tag_name(copy), Some("div"));
        assert_eq!(dst.attr(copy, "id"), Some("a"));
        assert_eq!(dst.children(copy).len(), 1);
    }
}
