//! Token stream to arena document construction.

use crate::NodeId;
use crate::document::{Document, NodeData};
use crate::tokenizer::{Token, tokenize};

/// Builds a document from markup. Recovering: mis-nested close tags pop to
/// the matching open element, stray close tags are ignored, and unclosed
/// elements are closed implicitly at end of input.
pub(crate) fn build(input: &str) -> Document {
    let mut doc = Document::new();
    let mut open: Vec<(String, NodeId)> = Vec::new();

    let tokens = tokenize(input);
    log::trace!(target: "dom.parser", "building document from {} tokens", tokens.len());
    for token in tokens {
        let parent = open.last().map(|(_, id)| *id).unwrap_or(doc.root());
        match token {
            Token::Doctype(s) => doc.set_doctype(s),
            Token::Comment(text) => {
                let node = doc.create(NodeData::Comment { text });
                doc.append_child(parent, node);
            }
            Token::Text(text) => {
                if !text.is_empty() {
                    let node = doc.create(NodeData::Text { text });
                    doc.append_child(parent, node);
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let node = doc.create(NodeData::Element {
                    name: name.clone(),
                    attributes,
                });
                doc.append_child(parent, node);
                if !self_closing {
                    open.push((name, node));
                }
            }
            Token::EndTag(name) => {
                // only pop if a matching element is actually open; a stray
                // close tag must not close unrelated ancestors
                if open.iter().any(|(open_name, _)| *open_name == name) {
                    while let Some((open_name, _)) = open.pop() {
                        if open_name == name {
                            break;
                        }
                    }
                } else {
                    log::trace!(target: "dom.parser", "ignoring stray close tag '{name}'");
                }
            }
        }
    }

    doc
}
