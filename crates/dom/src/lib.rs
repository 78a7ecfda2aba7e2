//! Headless DOM for the component runtime.
//!
//! An arena-backed tree with stable node ids, a recovering HTML parser, a
//! compound-selector engine, markup serialization, and form-control reading.
//! No layout, no styling, no script execution.

mod build;
mod document;
pub mod fields;
mod selector;
mod serialize;
mod tokenizer;

pub use document::{Ancestors, Descendants, Document, InsertPosition, NodeData, NodeId};
pub use selector::SelectorList;
pub use serialize::{inner_html, outer_html};

impl Document {
    /// Parses a full page or fragment; the result is rooted under a synthetic
    /// document node, so fragment payloads are reachable via
    /// [`Document::first_element_child`] of [`Document::root`].
    pub fn parse(input: &str) -> Document {
        build::build(input)
    }

    /// Alias of [`Document::parse`] for server response bodies; fragments and
    /// whole pages go through the same recovering parser.
    pub fn parse_fragment(input: &str) -> Document {
        build::build(input)
    }
}
