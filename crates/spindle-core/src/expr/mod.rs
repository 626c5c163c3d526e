//! The expression grammar and evaluator.
//!
//! Macro-argument text is lexed into tokens, parsed into a flat operator
//! sequence, and folded into a combinator tree by precedence order number.
//! The tree is built once at parse time; only values re-evaluate per render.

mod eval;
mod lexer;
mod parser;

pub use eval::{assign, delete, eval, lambda_admits, lambda_transform};
pub use lexer::{ExprLexer, Token, TokenKind};
pub use parser::{parse_call_args, parse_top_level};

use crate::value::Color;

/// A parsed expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Color(Color),
    /// Bare identifier, resolved at evaluation time against the builtin
    /// color table, the datatype table, the visit counter, or the member
    /// keyword set (`length`, `last`, `1st`, ...).
    Ident(String),
    /// `?name` hook reference.
    HookRef(String),
    /// `$name` story-wide variable.
    Global(String),
    /// `_name` passage-local variable.
    Local(String),
    /// The `it` back-reference, left for the context to resolve when no
    /// variable precedes it in the flat sequence.
    It,
    /// `each _name` lambda binder.
    Each(String),
    MacroCall {
        name: String,
        args: Vec<Arg>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `target to value` / `value into target`, normalized to (target, value).
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
}

/// One macro-call argument, optionally spread with `...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub spread: bool,
    pub expr: Expr,
}

/// Unary operators; `via` builds a transform lambda from its unevaluated
/// operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Negate,
    Via,
}

/// Binary operators, identified with their precedence order number.
/// Lower numbers bind tighter; equal numbers fold left-to-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `'s` — member access, left side is the container.
    Property,
    /// `of` — member access, right side is the container.
    OfProperty,
    Divide,
    Modulo,
    Multiply,
    Add,
    Subtract,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Contains,
    IsIn,
    IsNotIn,
    Is,
    IsNot,
    Matches,
    IsA,
    And,
    Or,
    Where,
}

impl BinOp {
    /// The precedence order number used by the fold: member access binds
    /// tightest, `where` loosest.
    pub fn order(self) -> u8 {
        match self {
            BinOp::Property => 0,
            BinOp::OfProperty => 10,
            BinOp::Divide | BinOp::Modulo => 20,
            BinOp::Multiply => 30,
            BinOp::Add => 40,
            BinOp::Subtract => 50,
            BinOp::Less | BinOp::Greater | BinOp::LessOrEqual | BinOp::GreaterOrEqual => 60,
            BinOp::Contains | BinOp::IsIn | BinOp::IsNotIn => 70,
            BinOp::Is | BinOp::IsNot | BinOp::Matches | BinOp::IsA => 80,
            BinOp::And | BinOp::Or => 90,
            BinOp::Where => 100,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BinOp::Property => "'s",
            BinOp::OfProperty => "of",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
            BinOp::Multiply => "*",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessOrEqual => "<=",
            BinOp::GreaterOrEqual => ">=",
            BinOp::Contains => "contains",
            BinOp::IsIn => "is in",
            BinOp::IsNotIn => "is not in",
            BinOp::Is => "is",
            BinOp::IsNot => "is not",
            BinOp::Matches => "matches",
            BinOp::IsA => "is a",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Where => "where",
        }
    }
}
