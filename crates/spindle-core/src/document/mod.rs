//! The rendered document: an arena tree of text and container nodes with a
//! single write cursor.
//!
//! Node ids are stable for the lifetime of the document; revision and
//! deletion detach nodes rather than reusing slots, so side tables keyed by
//! id never dangle. The cursor addresses either a child gap of a container
//! (`Place::Child`) or a byte offset inside a text node (`Place::Offset`).

mod selector;

pub use selector::{compile_selector, Selector};

use std::collections::HashMap;
use std::rc::Rc;

use crate::context::Context;
use crate::error::EngineError;

/// A deferred render action stored against a document node: link bodies,
/// hidden hook bodies.
pub type Continuation = Rc<dyn Fn(&mut Document, &mut Context) -> Result<(), EngineError>>;

/// Stable index into the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum NodeKind {
    Text(String),
    Container {
        /// Rendering role: `hook`, `link`, `hidden`, `em`, `strong`,
        /// `align`, ...
        tag: String,
        /// Hook name assigned by `|name>` syntax or a `(hook:)` changer.
        name: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Where the cursor sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    /// Before the `i`th child of a container (equal to the child count
    /// means "at the end").
    Child(usize),
    /// At a byte offset inside a text node.
    Offset(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub node: NodeId,
    pub place: Place,
}

pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    cursor: Cursor,
    /// Click continuations, keyed by the link container's id.
    events: HashMap<NodeId, Continuation>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = NodeId(0);
        Document {
            nodes: vec![Node {
                kind: NodeKind::Container {
                    tag: "passage".to_string(),
                    name: None,
                },
                parent: None,
                children: Vec::new(),
            }],
            root,
            cursor: Cursor {
                node: root,
                place: Place::Child(0),
            },
            events: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    /// Park the cursor at the very start, before the root's first child.
    pub fn move_to_start(&mut self) {
        self.cursor = Cursor {
            node: self.root,
            place: Place::Child(0),
        };
    }

    /// Drop all rendered content and events, keeping the same root id.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
        self.events.clear();
        self.move_to_start();
    }

    fn alloc(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        id
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Container { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn hook_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Container { name, .. } => name.as_deref(),
            NodeKind::Text(_) => None,
        }
    }

    pub fn text_of(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Container { .. } => None,
        }
    }

    pub fn retag(&mut self, node: NodeId, new_tag: &str) {
        if let NodeKind::Container { tag, .. } = &mut self.nodes[node.0].kind {
            *tag = new_tag.to_string();
        }
    }

    pub fn set_hook_name(&mut self, node: NodeId, hook_name: &str) {
        if let NodeKind::Container { name, .. } = &mut self.nodes[node.0].kind {
            *name = Some(hook_name.to_string());
        }
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> usize {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == child)
            .unwrap_or(0)
    }

    /// When the cursor sits inside a text node, split the node there so a
    /// child gap exists at the cursor. Returns (parent, gap index).
    fn gap_at_cursor(&mut self) -> (NodeId, usize) {
        match self.cursor.place {
            Place::Child(i) => (self.cursor.node, i),
            Place::Offset(o) => {
                let text_node = self.cursor.node;
                let parent = self.nodes[text_node.0].parent.unwrap_or(self.root);
                let idx = self.child_index(parent, text_node);
                let tail = match &mut self.nodes[text_node.0].kind {
                    NodeKind::Text(text) => text.split_off(o),
                    NodeKind::Container { .. } => String::new(),
                };
                if tail.is_empty() {
                    (parent, idx + 1)
                } else {
                    let rest = self.alloc(NodeKind::Text(tail), parent);
                    self.nodes[parent.0].children.insert(idx + 1, rest);
                    (parent, idx + 1)
                }
            }
        }
    }

    /// Write plain text at the cursor and advance past it.
    pub fn write_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let (node, Place::Offset(o)) = (self.cursor.node, self.cursor.place) {
            if let NodeKind::Text(existing) = &mut self.nodes[node.0].kind {
                existing.insert_str(o, text);
                self.cursor.place = Place::Offset(o + text.len());
                return;
            }
        }
        let (parent, gap) = self.gap_at_cursor();
        let id = self.alloc(NodeKind::Text(text.to_string()), parent);
        self.nodes[parent.0].children.insert(gap, id);
        self.cursor = Cursor {
            node: parent,
            place: Place::Child(gap + 1),
        };
    }

    /// Insert a container at the cursor and move the cursor inside it.
    pub fn open_container(&mut self, tag: &str) -> NodeId {
        let (parent, gap) = self.gap_at_cursor();
        let id = self.alloc(
            NodeKind::Container {
                tag: tag.to_string(),
                name: None,
            },
            parent,
        );
        self.nodes[parent.0].children.insert(gap, id);
        self.cursor = Cursor {
            node: id,
            place: Place::Child(0),
        };
        id
    }

    /// Move the cursor from inside `node` (or wherever it is) to just after
    /// `node` in its parent. Returns false at the root.
    pub fn move_past(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes[node.0].parent else {
            return false;
        };
        let idx = self.child_index(parent, node);
        self.cursor = Cursor {
            node: parent,
            place: Place::Child(idx + 1),
        };
        true
    }

    /// Close the container the cursor is inside, leaving the cursor after it.
    pub fn close_container(&mut self) {
        let node = self.cursor.node;
        self.move_past(node);
    }

    /// Detach all children of a container (their ids stay allocated).
    pub fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Replace a byte range of a text node.
    pub fn splice_text(&mut self, node: NodeId, start: usize, end: usize, replacement: &str) {
        if let NodeKind::Text(text) = &mut self.nodes[node.0].kind {
            text.replace_range(start..end, replacement);
        }
    }

    /// Split a text node at a byte offset. Text after the offset moves into
    /// a new sibling placed immediately after; returns its id, or None when
    /// the offset is at or past the end.
    pub fn split_text(&mut self, node: NodeId, at: usize) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let tail = match &mut self.nodes[node.0].kind {
            NodeKind::Text(text) if at < text.len() => text.split_off(at),
            _ => return None,
        };
        let idx = self.child_index(parent, node);
        let id = self.alloc(NodeKind::Text(tail), parent);
        self.nodes[parent.0].children.insert(idx + 1, id);
        Some(id)
    }

    /// The last character of text immediately before the cursor, if the
    /// preceding content is text.
    pub fn char_before_cursor(&self) -> Option<char> {
        match self.cursor.place {
            Place::Offset(o) => match &self.nodes[self.cursor.node.0].kind {
                NodeKind::Text(text) => text[..o].chars().next_back(),
                NodeKind::Container { .. } => None,
            },
            Place::Child(i) => {
                let prev = *self.nodes[self.cursor.node.0]
                    .children
                    .get(i.checked_sub(1)?)?;
                match &self.nodes[prev.0].kind {
                    NodeKind::Text(text) => text.chars().next_back(),
                    NodeKind::Container { .. } => None,
                }
            }
        }
    }

    /// One depth-first step: descend into the next child, or move up past
    /// the current node. Returns false once the whole tree is walked.
    pub fn advance(&mut self) -> bool {
        let Cursor { node, place } = self.cursor;
        match place {
            Place::Offset(_) => self.move_past(node),
            Place::Child(i) => match self.nodes[node.0].children.get(i).copied() {
                Some(child) => {
                    self.cursor = match self.nodes[child.0].kind {
                        NodeKind::Text(_) => Cursor {
                            node: child,
                            place: Place::Offset(0),
                        },
                        NodeKind::Container { .. } => Cursor {
                            node: child,
                            place: Place::Child(0),
                        },
                    };
                    true
                }
                None => self.move_past(node),
            },
        }
    }

    /// All attached containers carrying the given hook name, in document
    /// order.
    pub fn find_named(&self, name: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(self.root, &mut |doc, id| {
            if doc.hook_name(id) == Some(name) {
                out.push(id);
            }
        });
        out
    }

    fn walk(&self, node: NodeId, f: &mut impl FnMut(&Document, NodeId)) {
        f(self, node);
        for i in 0..self.nodes[node.0].children.len() {
            let child = self.nodes[node.0].children[i];
            self.walk(child, f);
        }
    }

    /// Flatten the document to plain text. Hidden containers contribute
    /// nothing.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(self.root, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Container { tag, .. } => {
                if tag == "hidden" {
                    return;
                }
                for &child in &self.nodes[node.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// The visible text inside one node.
    pub fn text_within(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    /// All link containers in document order, with their visible text.
    pub fn links(&self) -> Vec<(NodeId, String)> {
        let mut out = Vec::new();
        self.walk(self.root, &mut |doc, id| {
            if doc.tag(id) == Some("link") {
                out.push((id, doc.text_within(id)));
            }
        });
        out
    }

    pub fn register_click(&mut self, node: NodeId, cont: Continuation) {
        self.events.insert(node, cont);
    }

    pub fn take_click(&mut self, node: NodeId) -> Option<Continuation> {
        self.events.remove(&node)
    }

    pub fn has_click(&self, node: NodeId) -> bool {
        self.events.contains_key(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_writes_append_in_order() {
        let mut doc = Document::new();
        doc.write_text("Hello, ");
        doc.write_text("world");
        assert_eq!(doc.plain_text(), "Hello, world");
    }

    #[test]
    fn containers_nest() {
        let mut doc = Document::new();
        doc.write_text("a");
        let hook = doc.open_container("hook");
        doc.write_text("b");
        doc.close_container();
        doc.write_text("c");
        assert_eq!(doc.plain_text(), "abc");
        assert_eq!(doc.text_within(hook), "b");
    }

    #[test]
    fn hidden_containers_are_invisible() {
        let mut doc = Document::new();
        doc.write_text("a");
        let h = doc.open_container("hidden");
        doc.write_text("secret");
        doc.close_container();
        assert_eq!(doc.plain_text(), "a");
        doc.retag(h, "hook");
        assert_eq!(doc.plain_text(), "asecret");
    }

    #[test]
    fn named_hooks_are_findable() {
        let mut doc = Document::new();
        let h = doc.open_container("hook");
        doc.set_hook_name(h, "door");
        doc.write_text("x");
        doc.close_container();
        assert_eq!(doc.find_named("door"), vec![h]);
        assert!(doc.find_named("window").is_empty());
    }

    #[test]
    fn clear_children_detaches() {
        let mut doc = Document::new();
        let h = doc.open_container("hook");
        doc.write_text("gone");
        doc.close_container();
        doc.clear_children(h);
        assert_eq!(doc.plain_text(), "");
    }

    #[test]
    fn offset_writes_splice_into_text() {
        let mut doc = Document::new();
        doc.write_text("ac");
        let text_node = doc.children(doc.root())[0];
        doc.set_cursor(Cursor {
            node: text_node,
            place: Place::Offset(1),
        });
        doc.write_text("b");
        assert_eq!(doc.plain_text(), "abc");
    }

    #[test]
    fn container_at_offset_splits_the_text_node() {
        let mut doc = Document::new();
        doc.write_text("ad");
        let text_node = doc.children(doc.root())[0];
        doc.set_cursor(Cursor {
            node: text_node,
            place: Place::Offset(1),
        });
        doc.open_container("hook");
        doc.write_text("bc");
        doc.close_container();
        assert_eq!(doc.plain_text(), "abcd");
    }

    #[test]
    fn split_text_moves_the_remainder_aside() {
        let mut doc = Document::new();
        doc.write_text("abcd");
        let t = doc.children(doc.root())[0];
        let tail = doc.split_text(t, 2).unwrap();
        assert_eq!(doc.text_of(t), Some("ab"));
        assert_eq!(doc.text_of(tail), Some("cd"));
        assert_eq!(doc.plain_text(), "abcd");
        assert!(doc.split_text(tail, 2).is_none());
    }

    #[test]
    fn char_before_cursor_sees_adjacent_text_only() {
        let mut doc = Document::new();
        assert_eq!(doc.char_before_cursor(), None);
        doc.write_text("ab");
        assert_eq!(doc.char_before_cursor(), Some('b'));
        doc.open_container("hook");
        assert_eq!(doc.char_before_cursor(), None);
        doc.close_container();
        assert_eq!(doc.char_before_cursor(), None);
    }

    #[test]
    fn advance_walks_the_whole_tree() {
        let mut doc = Document::new();
        doc.write_text("a");
        doc.open_container("hook");
        doc.write_text("b");
        doc.close_container();
        doc.write_text("c");

        doc.move_to_start();
        let mut steps = 0;
        while doc.advance() {
            steps += 1;
            assert!(steps < 100, "advance must terminate");
        }
        // Walked past every node and back to the root's end.
        assert_eq!(doc.cursor().node, doc.root());
    }

    #[test]
    fn links_report_their_text() {
        let mut doc = Document::new();
        let l = doc.open_container("link");
        doc.write_text("Go north");
        doc.close_container();
        assert_eq!(doc.links(), vec![(l, "Go north".to_string())]);
    }
}
