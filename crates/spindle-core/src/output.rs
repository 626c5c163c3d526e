//! The output seam: linearize the finished document for a host.
//!
//! Rich-text backends live outside the core; the plain-text formatter here
//! exists so fixtures and the CLI can observe rendered text and number the
//! interaction points for [`crate::Engine::click`].

use crate::document::{Document, NodeId};

/// A rendered interaction point: sequence number plus the node to click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub id: usize,
    pub node: NodeId,
    pub text: String,
}

/// A linearized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub links: Vec<LinkRef>,
}

pub trait OutputFormatter {
    fn format(&self, doc: &Document) -> Rendered;
}

/// Flattens visible text as-is and numbers live links in document order.
pub struct PlainText;

impl OutputFormatter for PlainText {
    fn format(&self, doc: &Document) -> Rendered {
        let links = doc
            .links()
            .into_iter()
            .filter(|(node, _)| doc.has_click(*node))
            .enumerate()
            .map(|(id, (node, text))| LinkRef { id, node, text })
            .collect();
        Rendered {
            text: doc.plain_text(),
            links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::render::render_source;
    use crate::story::InMemoryStory;

    #[test]
    fn links_number_in_document_order() {
        let mut doc = Document::new();
        let mut ctx = Context::new(Box::new(InMemoryStory::single("")));
        ctx.enter_passage("Start");
        render_source("[[One]] or [[Two->B]]", &mut doc, &mut ctx).unwrap();
        let out = PlainText.format(&doc);
        assert_eq!(out.text, "One or Two");
        assert_eq!(out.links.len(), 2);
        assert_eq!(out.links[0].id, 0);
        assert_eq!(out.links[0].text, "One");
        assert_eq!(out.links[1].text, "Two");
    }
}
