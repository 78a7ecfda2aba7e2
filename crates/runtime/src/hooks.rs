//! Collaborator seams the runtime calls out through.
//!
//! Script re-execution and wire re-initialization after DOM swaps are host
//! concerns; navigation leaves the page entirely. The runtime only reports
//! the moments they must happen.

use dom::{Document, NodeId};

pub trait HostHooks {
    /// A freshly inserted subtree may carry `<script>` elements to re-run.
    fn execute_scripts(&mut self, doc: &Document, inserted: NodeId) {
        let _ = (doc, inserted);
    }

    /// The document changed shape; component wiring should be refreshed.
    fn wire_refresh(&mut self, doc: &Document) {
        let _ = doc;
    }

    /// A server redirect; the host replaces the page.
    fn navigate(&mut self, url: &str) {
        let _ = url;
    }
}

pub struct NullHooks;

impl HostHooks for NullHooks {}
