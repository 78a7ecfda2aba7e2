//! Markup serialization for subtrees.

use crate::document::{Document, NodeData, NodeId};
use crate::tokenizer::{is_rawtext_element, is_void_element};

/// Serializes `id` including its own tag.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Serializes the children of `id`.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_children(doc, id, &mut out);
    out
}

fn write_children(doc: &Document, id: NodeId, out: &mut String) {
    for &child in doc.children(id) {
        write_node(doc, child, out);
    }
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.data(id) {
        Some(NodeData::Document { doctype }) => {
            if let Some(dt) = doctype {
                out.push_str("<!DOCTYPE ");
                out.push_str(dt);
                out.push('>');
            }
            write_children(doc, id, out);
        }
        Some(NodeData::Element { name, attributes }) => {
            out.push('<');
            out.push_str(name);
            for (attr_name, value) in attributes {
                out.push(' ');
                out.push_str(attr_name);
                if let Some(value) = value {
                    out.push_str("=\"");
                    escape_attr(value, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            if is_rawtext_element(name) {
                for &child in doc.children(id) {
                    if let Some(NodeData::Text { text }) = doc.data(child) {
                        out.push_str(text);
                    }
                }
            } else {
                write_children(doc, id, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Some(NodeData::Text { text }) => escape_text(text, out),
        Some(NodeData::Comment { text }) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        None => {}
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{inner_html, outer_html};
    use crate::Document;

    #[test]
    fn round_trip_preserves_structure() {
        let markup = r#"<div id="a" data-x="1 &amp; 2"><span>hi &lt;there&gt;</span><br></div>"#;
        let doc = Document::parse(markup);
        let div = doc.first_element_child(doc.root()).unwrap();
        assert_eq!(outer_html(&doc, div), markup);
    }

    #[test]
    fn inner_excludes_own_tag() {
        let doc = Document::parse("<div><p>one</p></div>");
        let div = doc.first_element_child(doc.root()).unwrap();
        assert_eq!(inner_html(&doc, div), "<p>one</p>");
    }

    #[test]
    fn script_text_is_not_escaped() {
        let doc = Document::parse("<script>a < b && c</script>");
        let script = doc.first_element_child(doc.root()).unwrap();
        assert_eq!(outer_html(&doc, script), "<script>a < b && c</script>");
    }

    #[test]
    fn valueless_attributes_serialize_bare() {
        let doc = Document::parse("<input disabled name=q>");
        let input = doc.first_element_child(doc.root()).unwrap();
        assert_eq!(outer_html(&doc, input), r#"<input disabled name="q">"#);
    }
}
