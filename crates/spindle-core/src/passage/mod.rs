//! The passage grammar: source text into a tree of renderable nodes.

mod parser;

pub use parser::parse_passage;

use crate::expr::Expr;

/// One renderable node of passage content.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Greedy run of plain characters.
    Text(String),
    Newline,
    /// `{...}` — whitespace inside collapses to single spaces.
    Collapsed(Vec<Node>),
    /// A bare `$var` / `_var` reference printed in place.
    Inline(Expr),
    Link(Link),
    Hook(AppliedHook),
}

/// `[[plain]]`, `[[text->target]]`, or `[[target<-text]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub text: String,
    pub target: String,
}

/// A chain of changer expressions applied around a hook body, with
/// optional inline naming syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedHook {
    /// `+`-separated changer expressions; empty for a bare `[...]` hook or
    /// a purely name-prefixed one.
    pub changers: Vec<Expr>,
    pub name: Option<InlineName>,
    pub body: HookBody,
}

/// `|name>` / `<name|` (visible) or `|name)` / `(name|` (hidden by
/// default).
#[derive(Debug, Clone, PartialEq)]
pub struct InlineName {
    pub name: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookBody {
    /// No bracketed body: the final chain expression is the payload.
    None,
    /// `[...]`
    Hook(Vec<Node>),
    /// `[==` — everything to the end of the enclosing scope.
    Open(Vec<Node>),
    /// A link as the direct body of a changer chain.
    Link(Link),
}
