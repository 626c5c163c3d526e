//! Byte-walking parser for passage source.

use crate::error::EngineError;
use crate::expr::{parse_call_args, Expr};

use super::{AppliedHook, HookBody, InlineName, Link, Node};

/// Parse one passage's source into its node tree.
pub fn parse_passage(input: &str) -> Result<Vec<Node>, EngineError> {
    let mut scanner = Scanner::new(input);
    let nodes = scanner.parse_nodes(None)?;
    if !scanner.at_end() {
        return Err(EngineError::grammar(
            scanner.pos,
            "unmatched closing bracket",
        ));
    }
    Ok(nodes)
}

struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    /// Parse nodes until the end of input or an unconsumed `terminator`
    /// byte at this nesting level.
    fn parse_nodes(&mut self, terminator: Option<u8>) -> Result<Vec<Node>, EngineError> {
        let mut nodes = Vec::new();
        let mut text_start = self.pos;

        while let Some(c) = self.peek() {
            if Some(c) == terminator {
                break;
            }
            let special = match c {
                b'\n' => true,
                b'{' => true,
                b'[' => true,
                b'(' => self.looks_like_macro(),
                b'|' => self.front_name_len().is_some(),
                b'$' => self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()),
                b'_' => {
                    self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic())
                        && !self
                            .pos
                            .checked_sub(1)
                            .and_then(|p| self.bytes.get(p))
                            .is_some_and(|p| p.is_ascii_alphanumeric())
                }
                _ => false,
            };
            if !special {
                self.pos += self.input[self.pos..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                continue;
            }

            if text_start < self.pos {
                nodes.push(Node::Text(self.input[text_start..self.pos].to_string()));
            }
            match c {
                b'\n' => {
                    self.pos += 1;
                    nodes.push(Node::Newline);
                }
                b'{' => {
                    self.pos += 1;
                    let inner = self.parse_nodes(Some(b'}'))?;
                    if self.peek() != Some(b'}') {
                        return Err(EngineError::grammar(self.pos, "unclosed '{'"));
                    }
                    self.pos += 1;
                    nodes.push(Node::Collapsed(inner));
                }
                b'[' if self.starts_with("[[") => {
                    nodes.push(Node::Link(self.parse_link()?));
                }
                b'[' => {
                    nodes.push(self.parse_bare_hook(terminator)?);
                }
                b'(' | b'|' => {
                    nodes.push(self.parse_applied_hook(terminator)?);
                }
                b'$' | b'_' => {
                    if self.variable_heads_hook() {
                        nodes.push(self.parse_applied_hook(terminator)?);
                    } else {
                        nodes.push(Node::Inline(self.parse_variable()));
                    }
                }
                _ => unreachable!("special byte not handled"),
            }
            text_start = self.pos;
        }

        if text_start < self.pos {
            nodes.push(Node::Text(self.input[text_start..self.pos].to_string()));
        }
        Ok(nodes)
    }

    /// Is the `(` at the cursor the start of a `(name:` macro call?
    fn looks_like_macro(&self) -> bool {
        let mut i = self.pos + 1;
        let mut saw_name = false;
        while let Some(&c) = self.bytes.get(i) {
            if c.is_ascii_alphanumeric() || c == b'-' || c == b'_' {
                saw_name = true;
                i += 1;
            } else {
                return saw_name && c == b':';
            }
        }
        false
    }

    /// Length of a `|name>` / `|name)` form at the cursor, if present.
    fn front_name_len(&self) -> Option<usize> {
        let mut i = self.pos + 1;
        while self
            .bytes
            .get(i)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
        {
            i += 1;
        }
        if i == self.pos + 1 {
            return None;
        }
        match self.bytes.get(i) {
            Some(b'>') | Some(b')') => Some(i + 1 - self.pos),
            _ => None,
        }
    }

    /// Does the variable at the cursor head a changer chain (`$c[...]`,
    /// `$c+(macro: ...)[...]`)?
    fn variable_heads_hook(&self) -> bool {
        let mut i = self.pos + 1;
        while self
            .bytes
            .get(i)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
        {
            i += 1;
        }
        matches!(self.bytes.get(i), Some(b'[') | Some(b'+'))
    }

    fn parse_variable(&mut self) -> Expr {
        let global = self.bytes[self.pos] == b'$';
        self.pos += 1;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.pos += 1;
        }
        let name = self.input[start..self.pos].to_string();
        if global {
            Expr::Global(name)
        } else {
            Expr::Local(name)
        }
    }

    fn parse_link(&mut self) -> Result<Link, EngineError> {
        let start = self.pos;
        self.pos += 2; // [[
        let Some(close) = self.input[self.pos..].find("]]") else {
            return Err(EngineError::grammar(start, "unclosed '[['"));
        };
        let content = &self.input[self.pos..self.pos + close];
        self.pos += close + 2;

        let link = if let Some(arrow) = content.find("->") {
            Link {
                text: content[..arrow].to_string(),
                target: content[arrow + 2..].to_string(),
            }
        } else if let Some(arrow) = content.find("<-") {
            Link {
                text: content[arrow + 2..].to_string(),
                target: content[..arrow].to_string(),
            }
        } else {
            Link {
                text: content.to_string(),
                target: content.to_string(),
            }
        };
        Ok(link)
    }

    /// A `[...]` hook with no changer chain, optionally named from behind
    /// with `<name|` or `(name|`.
    fn parse_bare_hook(&mut self, terminator: Option<u8>) -> Result<Node, EngineError> {
        let body = self.parse_hook_body(terminator)?;
        let name = self.try_back_name();
        Ok(Node::Hook(AppliedHook {
            changers: Vec::new(),
            name,
            body,
        }))
    }

    /// `[==` open hook or `[...]` bracketed hook; the cursor is at `[`.
    fn parse_hook_body(&mut self, terminator: Option<u8>) -> Result<HookBody, EngineError> {
        let start = self.pos;
        if self.starts_with("[=") {
            self.pos += 1;
            while self.peek() == Some(b'=') {
                self.pos += 1;
            }
            // Runs to the end of the enclosing scope; the terminator is
            // left for the caller.
            let body = self.parse_nodes(terminator)?;
            return Ok(HookBody::Open(body));
        }
        self.pos += 1; // [
        let body = self.parse_nodes(Some(b']'))?;
        if self.peek() != Some(b']') {
            return Err(EngineError::grammar(start, "unclosed '['"));
        }
        self.pos += 1;
        Ok(HookBody::Hook(body))
    }

    /// `<name|` (visible) or `(name|` (hidden) directly after a hook body.
    fn try_back_name(&mut self) -> Option<InlineName> {
        let open = self.peek()?;
        let hidden = match open {
            b'<' => false,
            b'(' => true,
            _ => return None,
        };
        let mut i = self.pos + 1;
        while self
            .bytes
            .get(i)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
        {
            i += 1;
        }
        if i == self.pos + 1 || self.bytes.get(i) != Some(&b'|') {
            return None;
        }
        let name = self.input[self.pos + 1..i].to_string();
        self.pos = i + 1;
        Some(InlineName { name, hidden })
    }

    /// A changer chain (`(macro: ...)` / variable, joined by `+`), optional
    /// front name, and an attached body.
    fn parse_applied_hook(&mut self, terminator: Option<u8>) -> Result<Node, EngineError> {
        let mut changers = Vec::new();
        loop {
            if self.looks_like_macro() {
                changers.push(self.parse_macro_call()?);
            } else if matches!(self.peek(), Some(b'$') | Some(b'_'))
                && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic())
            {
                changers.push(self.parse_variable());
            } else {
                break;
            }
            // `+` joins the next chain element; otherwise the chain ends.
            let saved = self.pos;
            self.skip_spaces();
            if self.peek() == Some(b'+') {
                self.pos += 1;
                self.skip_spaces();
                if !self.looks_like_macro()
                    && !matches!(self.peek(), Some(b'$') | Some(b'_'))
                {
                    self.pos = saved;
                    break;
                }
            } else {
                self.pos = saved;
                break;
            }
        }

        let name = match self.front_name_len() {
            Some(len) => {
                let hidden = self.bytes[self.pos + len - 1] == b')';
                let name = self.input[self.pos + 1..self.pos + len - 1].to_string();
                self.pos += len;
                Some(InlineName { name, hidden })
            }
            None => None,
        };

        let body = if self.starts_with("[[") {
            HookBody::Link(self.parse_link()?)
        } else if self.peek() == Some(b'[') {
            self.parse_hook_body(terminator)?
        } else if changers.is_empty() && name.is_some() {
            return Err(EngineError::grammar(self.pos, "a named hook needs a body"));
        } else {
            HookBody::None
        };

        // A body can also be named from behind: `(if: true)[hi]<a|`.
        let name = match name {
            None if body != HookBody::None => self.try_back_name(),
            other => other,
        };

        Ok(Node::Hook(AppliedHook {
            changers,
            name,
            body,
        }))
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    /// `(name: args)` with balanced parentheses, honoring quoted strings.
    fn parse_macro_call(&mut self) -> Result<Expr, EngineError> {
        let start = self.pos;
        self.pos += 1; // (
        let name_start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
        {
            self.pos += 1;
        }
        let name = self.input[name_start..self.pos].to_string();
        self.pos += 1; // :

        let args_start = self.pos;
        let mut depth = 1usize;
        let mut quote: Option<u8> = None;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match quote {
                Some(q) => {
                    if c == b'\\' {
                        self.pos += 1;
                    } else if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    b'"' | b'\'' => quote = Some(c),
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            let args_src = &self.input[args_start..self.pos - 1];
                            let args = parse_call_args(args_src)?;
                            return Ok(Expr::MacroCall { name, args });
                        }
                    }
                    _ => {}
                },
            }
        }
        Err(EngineError::grammar(start, format!("unclosed ({name}:")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_and_newlines() {
        let nodes = parse_passage("one\ntwo").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("one".into()),
                Node::Newline,
                Node::Text("two".into()),
            ]
        );
    }

    #[test]
    fn link_forms() {
        let nodes = parse_passage("[[Cellar]]").unwrap();
        let [Node::Link(l)] = nodes.as_slice() else { panic!() };
        assert_eq!((l.text.as_str(), l.target.as_str()), ("Cellar", "Cellar"));

        let nodes = parse_passage("[[Go to the cellar->Cellar]]").unwrap();
        let [Node::Link(l)] = nodes.as_slice() else { panic!() };
        assert_eq!(
            (l.text.as_str(), l.target.as_str()),
            ("Go to the cellar", "Cellar")
        );

        let nodes = parse_passage("[[Cellar<-Go down]]").unwrap();
        let [Node::Link(l)] = nodes.as_slice() else { panic!() };
        assert_eq!((l.text.as_str(), l.target.as_str()), ("Go down", "Cellar"));
    }

    #[test]
    fn macro_without_body_has_no_hook() {
        let nodes = parse_passage("(print: 54)").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        assert_eq!(hook.changers.len(), 1);
        assert_eq!(hook.body, HookBody::None);
        assert!(hook.name.is_none());
    }

    #[test]
    fn macro_with_hook_body() {
        let nodes = parse_passage("(if: true)[yes]").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        let HookBody::Hook(body) = &hook.body else { panic!() };
        assert_eq!(body, &vec![Node::Text("yes".into())]);
    }

    #[test]
    fn chain_joins_with_plus() {
        let nodes = parse_passage("(text-style: \"bold\")+(hook: \"a\")[hi]").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        assert_eq!(hook.changers.len(), 2);
        assert!(matches!(hook.body, HookBody::Hook(_)));
    }

    #[test]
    fn named_hook_front_forms() {
        let nodes = parse_passage("|a>[hi]").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        let name = hook.name.as_ref().unwrap();
        assert_eq!(name.name, "a");
        assert!(!name.hidden);

        let nodes = parse_passage("|a)[hi]").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        assert!(hook.name.as_ref().unwrap().hidden);
    }

    #[test]
    fn named_hook_back_forms() {
        let nodes = parse_passage("[hi]<a|").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        let name = hook.name.as_ref().unwrap();
        assert_eq!(name.name, "a");
        assert!(!name.hidden);

        let nodes = parse_passage("[hi](a|").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        assert!(hook.name.as_ref().unwrap().hidden);
    }

    #[test]
    fn back_name_after_a_changer_chain() {
        let nodes = parse_passage("(if: true)[hi]<a|").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        assert_eq!(hook.changers.len(), 1);
        assert_eq!(hook.name.as_ref().unwrap().name, "a");

        // A plain parenthetical after a body is not a name.
        let nodes = parse_passage("(if: true)[yes](quiet) day").unwrap();
        let [Node::Hook(hook), Node::Text(rest)] = nodes.as_slice() else {
            panic!()
        };
        assert!(hook.name.is_none());
        assert_eq!(rest, "(quiet) day");
    }

    #[test]
    fn variable_heads_an_applied_hook() {
        let nodes = parse_passage("$c[hi]").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        assert_eq!(hook.changers, vec![Expr::Global("c".into())]);
        assert!(matches!(hook.body, HookBody::Hook(_)));

        let nodes = parse_passage("_c+(hook: \"a\")[hi]").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        assert_eq!(hook.changers.len(), 2);

        // Without an adjacent body or chain the variable stays inline.
        let nodes = parse_passage("$c wins").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Inline(Expr::Global("c".into())),
                Node::Text(" wins".into()),
            ]
        );
    }

    #[test]
    fn bare_variables_are_inline_nodes() {
        let nodes = parse_passage("hp: $hp and _tmp").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("hp: ".into()),
                Node::Inline(Expr::Global("hp".into())),
                Node::Text(" and ".into()),
                Node::Inline(Expr::Local("tmp".into())),
            ]
        );
    }

    #[test]
    fn underscore_inside_a_word_is_text() {
        let nodes = parse_passage("foo_bar").unwrap();
        assert_eq!(nodes, vec![Node::Text("foo_bar".into())]);
    }

    #[test]
    fn collapsed_span() {
        let nodes = parse_passage("{a\nb}").unwrap();
        let [Node::Collapsed(inner)] = nodes.as_slice() else { panic!() };
        assert_eq!(inner.len(), 3);
    }

    #[test]
    fn open_hook_swallows_the_rest() {
        let nodes = parse_passage("(if: true)[==rest of it").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        let HookBody::Open(body) = &hook.body else { panic!() };
        assert_eq!(body, &vec![Node::Text("rest of it".into())]);
    }

    #[test]
    fn link_as_changer_body() {
        let nodes = parse_passage("(if: true)[[Go->Cellar]]").unwrap();
        let [Node::Hook(hook)] = nodes.as_slice() else { panic!() };
        let HookBody::Link(link) = &hook.body else { panic!() };
        assert_eq!(link.target, "Cellar");
    }

    #[test]
    fn plain_parens_stay_text() {
        let nodes = parse_passage("a (quiet) day").unwrap();
        assert_eq!(nodes, vec![Node::Text("a (quiet) day".into())]);
    }

    #[test]
    fn unclosed_hook_is_a_grammar_error() {
        assert!(matches!(
            parse_passage("[oops"),
            Err(EngineError::Grammar { .. })
        ));
        assert!(matches!(
            parse_passage("(print: 1"),
            Err(EngineError::Grammar { .. })
        ));
    }

    #[test]
    fn set_sequence_parses_to_three_nodes() {
        let nodes = parse_passage("(set: $x to 1)(set: $x to it + 1)$x").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[2], Node::Inline(Expr::Global(_))));
    }
}
