//! Live selectors over the rendered document.
//!
//! A selector is driven by the depth-first cursor walk: at each position it
//! is asked whether a match starts here. On a match it positions the cursor
//! for the revision body (per the advance type) and remembers enough state
//! to resume the walk after the body has rendered, skipping both the match
//! and whatever the body inserted.

use crate::value::{AdvanceType, SelectorSpec};

use super::{Cursor, Document, NodeId, Place};

pub trait Selector {
    /// Check for a match at the current cursor position. On success the
    /// cursor is placed where the revision body should render.
    fn match_here(&mut self, doc: &mut Document) -> bool;

    /// After the body rendered, move the cursor past the match so the walk
    /// continues without re-matching it or the inserted content.
    fn resume(&mut self, doc: &mut Document);
}

/// Turn a data-level selector description into a live selector.
pub fn compile_selector(spec: &SelectorSpec, advance: AdvanceType) -> Box<dyn Selector> {
    match spec {
        SelectorSpec::HookName(name) => Box::new(HookNameSelector {
            name: name.clone(),
            advance,
            matched: None,
        }),
        SelectorSpec::Content(needle) => Box::new(ContentSelector {
            needle: needle.clone(),
            advance,
            matched: None,
        }),
        SelectorSpec::Union(parts) => Box::new(CombinedSelector {
            parts: parts.iter().map(|p| compile_selector(p, advance)).collect(),
            last: None,
        }),
    }
}

/// Matches containers carrying a hook name, just before the walk descends
/// into them.
struct HookNameSelector {
    name: String,
    advance: AdvanceType,
    matched: Option<NodeId>,
}

impl Selector for HookNameSelector {
    fn match_here(&mut self, doc: &mut Document) -> bool {
        let Cursor {
            node,
            place: Place::Child(i),
        } = doc.cursor()
        else {
            return false;
        };
        let Some(&child) = doc.children(node).get(i) else {
            return false;
        };
        if doc.hook_name(child) != Some(self.name.as_str()) {
            return false;
        }
        match self.advance {
            AdvanceType::Prepend => doc.set_cursor(Cursor {
                node: child,
                place: Place::Child(0),
            }),
            AdvanceType::Append => {
                let end = doc.children(child).len();
                doc.set_cursor(Cursor {
                    node: child,
                    place: Place::Child(end),
                });
            }
            AdvanceType::Replace => {
                doc.clear_children(child);
                doc.set_cursor(Cursor {
                    node: child,
                    place: Place::Child(0),
                });
            }
        }
        self.matched = Some(child);
        true
    }

    fn resume(&mut self, doc: &mut Document) {
        if let Some(node) = self.matched.take() {
            doc.move_past(node);
        }
    }
}

struct ContentMatch {
    /// Original text split off past the match point; the walk resumes here.
    tail: Option<NodeId>,
    /// Leading bytes of the tail that belong to the match (the needle
    /// itself, for a prepend) and must not be rescanned.
    skip: usize,
}

/// Matches a substring of a single text node. The text after the match
/// point is split off into a fresh sibling before the body renders, so
/// everything the body writes lands strictly before the resume position
/// and is never rescanned, whatever node shape the body produced.
struct ContentSelector {
    needle: String,
    advance: AdvanceType,
    matched: Option<ContentMatch>,
}

impl Selector for ContentSelector {
    fn match_here(&mut self, doc: &mut Document) -> bool {
        if self.needle.is_empty() {
            return false;
        }
        let Cursor {
            node,
            place: Place::Offset(from),
        } = doc.cursor()
        else {
            return false;
        };
        let Some(text) = doc.text_of(node) else {
            return false;
        };
        let Some(found) = text.get(from..).and_then(|t| t.find(&self.needle)) else {
            return false;
        };
        let start = from + found;
        let end = start + self.needle.len();

        let (cut, skip) = match self.advance {
            AdvanceType::Prepend => (start, self.needle.len()),
            AdvanceType::Append => (end, 0),
            AdvanceType::Replace => {
                doc.splice_text(node, start, end, "");
                (start, 0)
            }
        };
        let tail = doc.split_text(node, cut);
        doc.move_past(node);
        self.matched = Some(ContentMatch { tail, skip });
        true
    }

    fn resume(&mut self, doc: &mut Document) {
        let Some(m) = self.matched.take() else {
            return;
        };
        // Without a tail the cursor already sits past the rendered body.
        if let Some(tail) = m.tail {
            let len = doc.text_of(tail).map_or(0, str::len);
            doc.set_cursor(Cursor {
                node: tail,
                place: Place::Offset(m.skip.min(len)),
            });
        }
    }
}

/// First-match union: the earliest part to match at a position wins.
struct CombinedSelector {
    parts: Vec<Box<dyn Selector>>,
    last: Option<usize>,
}

impl Selector for CombinedSelector {
    fn match_here(&mut self, doc: &mut Document) -> bool {
        for (i, part) in self.parts.iter_mut().enumerate() {
            if part.match_here(doc) {
                self.last = Some(i);
                return true;
            }
        }
        false
    }

    fn resume(&mut self, doc: &mut Document) {
        if let Some(i) = self.last.take() {
            self.parts[i].resume(doc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_named_hook() -> (Document, NodeId) {
        let mut doc = Document::new();
        doc.write_text("before ");
        let h = doc.open_container("hook");
        doc.set_hook_name(h, "a");
        doc.write_text("hi");
        doc.close_container();
        doc.write_text(" after");
        (doc, h)
    }

    fn drive(doc: &mut Document, sel: &mut dyn Selector, body: &str) -> usize {
        drive_with(doc, sel, |doc| doc.write_text(body))
    }

    fn drive_with(
        doc: &mut Document,
        sel: &mut dyn Selector,
        mut body: impl FnMut(&mut Document),
    ) -> usize {
        let saved = doc.cursor();
        doc.move_to_start();
        let mut matches = 0;
        loop {
            if sel.match_here(doc) {
                matches += 1;
                assert!(matches <= 32, "selector failed to move past a match");
                body(doc);
                sel.resume(doc);
                continue;
            }
            if !doc.advance() {
                break;
            }
        }
        doc.set_cursor(saved);
        matches
    }

    #[test]
    fn hook_replace_swaps_contents() {
        let (mut doc, _) = doc_with_named_hook();
        let mut sel = compile_selector(&SelectorSpec::HookName("a".into()), AdvanceType::Replace);
        let n = drive(&mut doc, sel.as_mut(), "bye");
        assert_eq!(n, 1);
        assert_eq!(doc.plain_text(), "before bye after");
    }

    #[test]
    fn hook_append_keeps_contents() {
        let (mut doc, _) = doc_with_named_hook();
        let mut sel = compile_selector(&SelectorSpec::HookName("a".into()), AdvanceType::Append);
        drive(&mut doc, sel.as_mut(), "!");
        assert_eq!(doc.plain_text(), "before hi! after");
    }

    #[test]
    fn hook_prepend_inserts_before_contents() {
        let (mut doc, _) = doc_with_named_hook();
        let mut sel = compile_selector(&SelectorSpec::HookName("a".into()), AdvanceType::Prepend);
        drive(&mut doc, sel.as_mut(), "oh ");
        assert_eq!(doc.plain_text(), "before oh hi after");
    }

    #[test]
    fn missing_hook_matches_nothing() {
        let (mut doc, _) = doc_with_named_hook();
        let mut sel = compile_selector(&SelectorSpec::HookName("b".into()), AdvanceType::Replace);
        assert_eq!(drive(&mut doc, sel.as_mut(), "x"), 0);
        assert_eq!(doc.plain_text(), "before hi after");
    }

    #[test]
    fn content_replace_rewrites_every_occurrence() {
        let mut doc = Document::new();
        doc.write_text("cat and cat");
        let mut sel = compile_selector(&SelectorSpec::Content("cat".into()), AdvanceType::Replace);
        let n = drive(&mut doc, sel.as_mut(), "dog");
        assert_eq!(n, 2);
        assert_eq!(doc.plain_text(), "dog and dog");
    }

    #[test]
    fn content_replace_does_not_rematch_inserted_text() {
        let mut doc = Document::new();
        doc.write_text("cat");
        // The body contains the needle; it must not be revised again.
        let mut sel = compile_selector(&SelectorSpec::Content("cat".into()), AdvanceType::Replace);
        let n = drive(&mut doc, sel.as_mut(), "catcat");
        assert_eq!(n, 1);
        assert_eq!(doc.plain_text(), "catcat");
    }

    #[test]
    fn content_match_skips_containers_the_body_inserted() {
        let mut doc = Document::new();
        doc.write_text("cat and cat");
        // The needle sits inside a container the body opens; the walk must
        // not descend into it.
        let mut sel = compile_selector(&SelectorSpec::Content("cat".into()), AdvanceType::Replace);
        let n = drive_with(&mut doc, sel.as_mut(), |doc| {
            let c = doc.open_container("style");
            doc.write_text("cat");
            doc.move_past(c);
        });
        assert_eq!(n, 2);
        assert_eq!(doc.plain_text(), "cat and cat");
    }

    #[test]
    fn content_append_inserts_after_match() {
        let mut doc = Document::new();
        doc.write_text("ab ab");
        let mut sel = compile_selector(&SelectorSpec::Content("ab".into()), AdvanceType::Append);
        drive(&mut doc, sel.as_mut(), "!");
        assert_eq!(doc.plain_text(), "ab! ab!");
    }

    #[test]
    fn union_matches_both_kinds() {
        let (mut doc, _) = doc_with_named_hook();
        let spec = SelectorSpec::Union(vec![
            SelectorSpec::HookName("a".into()),
            SelectorSpec::Content("after".into()),
        ]);
        let mut sel = compile_selector(&spec, AdvanceType::Replace);
        let n = drive(&mut doc, sel.as_mut(), "X");
        assert_eq!(n, 2);
        assert_eq!(doc.plain_text(), "before X X");
    }
}
