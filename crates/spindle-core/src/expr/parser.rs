//! Operator-sequence parser.
//!
//! An expression is parsed as a flat list: an optional leading unary
//! operator, an operand, then zero or more (binary operator, optional unary
//! operator, operand) groups. The list is then folded deterministically:
//! `it` substitution first, unary operators right-to-left, binary operators
//! in ascending precedence order number (equal numbers left-to-right), and
//! finally exactly one node must remain.

use super::lexer::{ExprLexer, TokenKind};
use super::{Arg, BinOp, Expr, UnOp};
use crate::error::EngineError;

/// One element of the flat operator sequence.
#[derive(Debug, Clone)]
enum SeqItem {
    Operand(Expr),
    Unary(UnOp),
    Binary(BinOp),
    /// `to` (false) or `into` (true).
    Assign(bool),
}

/// Parse a full top-level expression: either a `to`/`into` assignment form
/// or a plain operator sequence.
pub fn parse_top_level(src: &str) -> Result<Expr, EngineError> {
    let mut lexer = ExprLexer::new(src);
    let expr = parse_sequence(&mut lexer)?;
    expect_end(&mut lexer)?;
    Ok(expr)
}

/// Parse a comma-separated macro argument list, each argument optionally
/// prefixed with the `...` spread marker.
pub fn parse_call_args(src: &str) -> Result<Vec<Arg>, EngineError> {
    let mut lexer = ExprLexer::new(src);
    if lexer.peek_token().kind == TokenKind::Eof {
        return Ok(Vec::new());
    }
    let args = parse_args(&mut lexer)?;
    expect_end(&mut lexer)?;
    Ok(args)
}

fn expect_end(lexer: &mut ExprLexer) -> Result<(), EngineError> {
    let tok = lexer.peek_token();
    if tok.kind == TokenKind::Eof {
        Ok(())
    } else {
        Err(EngineError::grammar(
            tok.start,
            format!("unexpected trailing input: {:?}", tok.kind),
        ))
    }
}

fn parse_args(lexer: &mut ExprLexer) -> Result<Vec<Arg>, EngineError> {
    let mut args = Vec::new();
    loop {
        let spread = if lexer.peek_token().kind == TokenKind::Ellipsis {
            lexer.next_token();
            true
        } else {
            false
        };
        args.push(Arg {
            spread,
            expr: parse_sequence(lexer)?,
        });
        if lexer.peek_token().kind == TokenKind::Comma {
            lexer.next_token();
        } else {
            return Ok(args);
        }
    }
}

/// Parse one operator sequence (up to a comma, closing paren, or the end)
/// and fold it into a single expression node.
fn parse_sequence(lexer: &mut ExprLexer) -> Result<Expr, EngineError> {
    let items = parse_items(lexer)?;
    fold(items)
}

fn parse_items(lexer: &mut ExprLexer) -> Result<Vec<SeqItem>, EngineError> {
    let mut items = Vec::new();

    if let Some(op) = peek_unary(lexer) {
        lexer.next_token();
        items.push(SeqItem::Unary(op));
    }
    items.push(SeqItem::Operand(parse_operand(lexer)?));

    loop {
        let tok = lexer.peek_token();
        let item = match tok.kind {
            TokenKind::To => SeqItem::Assign(false),
            TokenKind::Into => SeqItem::Assign(true),
            TokenKind::Possessive => SeqItem::Binary(BinOp::Property),
            TokenKind::Of => SeqItem::Binary(BinOp::OfProperty),
            TokenKind::Slash => SeqItem::Binary(BinOp::Divide),
            TokenKind::Percent => SeqItem::Binary(BinOp::Modulo),
            TokenKind::Star => SeqItem::Binary(BinOp::Multiply),
            TokenKind::Plus => SeqItem::Binary(BinOp::Add),
            TokenKind::Minus => SeqItem::Binary(BinOp::Subtract),
            TokenKind::Lt => SeqItem::Binary(BinOp::Less),
            TokenKind::Gt => SeqItem::Binary(BinOp::Greater),
            TokenKind::Lte => SeqItem::Binary(BinOp::LessOrEqual),
            TokenKind::Gte => SeqItem::Binary(BinOp::GreaterOrEqual),
            TokenKind::Contains => SeqItem::Binary(BinOp::Contains),
            TokenKind::IsIn => SeqItem::Binary(BinOp::IsIn),
            TokenKind::IsNotIn => SeqItem::Binary(BinOp::IsNotIn),
            TokenKind::Is => SeqItem::Binary(BinOp::Is),
            TokenKind::IsNot => SeqItem::Binary(BinOp::IsNot),
            TokenKind::Matches => SeqItem::Binary(BinOp::Matches),
            TokenKind::IsA => SeqItem::Binary(BinOp::IsA),
            TokenKind::And => SeqItem::Binary(BinOp::And),
            TokenKind::Or => SeqItem::Binary(BinOp::Or),
            TokenKind::Where => SeqItem::Binary(BinOp::Where),
            _ => break,
        };
        lexer.next_token();
        items.push(item);

        if let Some(op) = peek_unary(lexer) {
            lexer.next_token();
            items.push(SeqItem::Unary(op));
        }
        items.push(SeqItem::Operand(parse_operand(lexer)?));
    }

    Ok(items)
}

fn peek_unary(lexer: &mut ExprLexer) -> Option<UnOp> {
    match lexer.peek_token().kind {
        TokenKind::Not => Some(UnOp::Not),
        TokenKind::Minus => Some(UnOp::Negate),
        TokenKind::Via => Some(UnOp::Via),
        _ => None,
    }
}

fn parse_operand(lexer: &mut ExprLexer) -> Result<Expr, EngineError> {
    let tok = lexer.next_token();
    match tok.kind {
        TokenKind::Number(n) => Ok(Expr::Num(n)),
        TokenKind::Str(s) => Ok(Expr::Str(s)),
        TokenKind::True => Ok(Expr::Bool(true)),
        TokenKind::False => Ok(Expr::Bool(false)),
        TokenKind::Color(c) => Ok(Expr::Color(c)),
        TokenKind::It => Ok(Expr::It),
        TokenKind::Global(name) => Ok(Expr::Global(name)),
        TokenKind::Local(name) => Ok(Expr::Local(name)),
        TokenKind::HookRef(name) => Ok(Expr::HookRef(name)),
        TokenKind::Ident(name) => Ok(Expr::Ident(name)),
        TokenKind::Each => {
            let next = lexer.next_token();
            match next.kind {
                TokenKind::Local(name) => Ok(Expr::Each(name)),
                _ => Err(EngineError::grammar(
                    next.start,
                    "'each' must be followed by a temporary variable",
                )),
            }
        }
        TokenKind::LParen => parse_paren(lexer, tok.start),
        TokenKind::Eof => Err(EngineError::grammar(
            tok.start,
            "expected a value, found the end of the expression",
        )),
        TokenKind::Error(message) => Err(EngineError::grammar(tok.start, message)),
        other => Err(EngineError::grammar(
            tok.start,
            format!("expected a value, found {other:?}"),
        )),
    }
}

/// After `(`: either a nested macro call `(name: args)` or a parenthesized
/// sub-expression.
fn parse_paren(lexer: &mut ExprLexer, start: usize) -> Result<Expr, EngineError> {
    let saved = lexer.save();
    let first = lexer.next_token();
    if let TokenKind::Ident(name) = first.kind {
        if lexer.peek_token().kind == TokenKind::Colon {
            lexer.next_token(); // `:`
            let args = if lexer.peek_token().kind == TokenKind::RParen {
                Vec::new()
            } else {
                parse_args(lexer)?
            };
            let close = lexer.next_token();
            if close.kind != TokenKind::RParen {
                return Err(EngineError::grammar(
                    close.start,
                    format!("unclosed macro call ({name}:"),
                ));
            }
            return Ok(Expr::MacroCall { name, args });
        }
    }
    lexer.restore(saved);

    let inner = parse_sequence(lexer)?;
    let close = lexer.next_token();
    if close.kind != TokenKind::RParen {
        return Err(EngineError::grammar(start, "unclosed parenthesis"));
    }
    Ok(inner)
}

/// The deterministic fold over the flat sequence.
fn fold(mut items: Vec<SeqItem>) -> Result<Expr, EngineError> {
    substitute_it(&mut items);
    fold_unary(&mut items)?;

    // An assignment splits the sequence; each side folds independently.
    if let Some(pos) = items
        .iter()
        .position(|i| matches!(i, SeqItem::Assign(_)))
    {
        let SeqItem::Assign(into) = items[pos] else { unreachable!() };
        let right: Vec<SeqItem> = items.split_off(pos + 1);
        items.pop(); // the assign marker
        let left = fold_binary(items)?;
        let right = fold_binary(right)?;
        let (target, value) = if into { (right, left) } else { (left, right) };
        return Ok(Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
        });
    }

    fold_binary(items)
}

/// Resolve each `it` to the nearest preceding variable operand in the flat
/// list. With no preceding variable the node is left for the context's
/// remembered `it` reference at evaluation time.
fn substitute_it(items: &mut [SeqItem]) {
    let mut last_var: Option<Expr> = None;
    for item in items.iter_mut() {
        if let SeqItem::Operand(expr) = item {
            match expr {
                Expr::Global(_) | Expr::Local(_) => last_var = Some(expr.clone()),
                Expr::It => {
                    if let Some(var) = &last_var {
                        *expr = var.clone();
                    }
                }
                _ => {}
            }
        }
    }
}

/// Fold unary operators right-to-left, each combining with the operand
/// immediately to its right.
fn fold_unary(items: &mut Vec<SeqItem>) -> Result<(), EngineError> {
    let mut i = items.len();
    while i > 0 {
        i -= 1;
        if let SeqItem::Unary(op) = items[i] {
            match items.get(i + 1) {
                Some(SeqItem::Operand(_)) => {
                    let SeqItem::Operand(operand) = items.remove(i + 1) else {
                        unreachable!()
                    };
                    items[i] = SeqItem::Operand(Expr::Unary {
                        op,
                        operand: Box::new(operand),
                    });
                }
                _ => {
                    return Err(EngineError::eval(format!(
                        "nothing for the unary operator {op:?} to apply to"
                    )))
                }
            }
        }
    }
    Ok(())
}

/// Fold binary operators in ascending precedence order number; operators of
/// equal order fold in left-to-right encounter order, each consuming its
/// immediate neighbors.
fn fold_binary(mut items: Vec<SeqItem>) -> Result<Expr, EngineError> {
    const ORDERS: [u8; 11] = [0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100];

    for order in ORDERS {
        let mut i = 0;
        while i < items.len() {
            let SeqItem::Binary(op) = items[i] else {
                i += 1;
                continue;
            };
            if op.order() != order {
                i += 1;
                continue;
            }
            if i == 0 || !matches!(items[i - 1], SeqItem::Operand(_)) {
                return Err(EngineError::eval(format!(
                    "the {} operator is missing its left side",
                    op.keyword()
                )));
            }
            if !matches!(items.get(i + 1), Some(SeqItem::Operand(_))) {
                return Err(EngineError::eval(format!(
                    "the {} operator is missing its right side",
                    op.keyword()
                )));
            }
            let SeqItem::Operand(right) = items.remove(i + 1) else { unreachable!() };
            let SeqItem::Operand(left) = items.remove(i - 1) else { unreachable!() };
            items[i - 1] = SeqItem::Operand(Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
            i -= 1;
        }
    }

    let mut nodes = items.into_iter().map(|item| match item {
        SeqItem::Operand(e) => e,
        other => unreachable!("non-operand survived the fold: {other:?}"),
    });
    let first = nodes
        .next()
        .ok_or_else(|| EngineError::eval("empty expression"))?;
    match nodes.next() {
        None => Ok(first),
        Some(second) => Err(EngineError::eval(format!(
            "missing operator between {first:?} and {second:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Expr {
        parse_top_level(src).unwrap()
    }

    #[test]
    fn multiply_binds_tighter_than_add() {
        // 2 + 3 * 4 → 2 + (3 * 4)
        let e = parse("2 + 3 * 4");
        let Expr::Binary { op: BinOp::Add, right, .. } = e else {
            panic!("expected +, got {e:?}");
        };
        assert!(matches!(*right, Expr::Binary { op: BinOp::Multiply, .. }));
    }

    #[test]
    fn equal_precedence_folds_left_to_right() {
        // 1 is not 2 is 2 → (1 is not 2) is 2
        let e = parse("1 is not 2 is 2");
        let Expr::Binary { op: BinOp::Is, left, right } = e else {
            panic!("expected is");
        };
        assert!(matches!(*left, Expr::Binary { op: BinOp::IsNot, .. }));
        assert!(matches!(*right, Expr::Num(n) if n == 2.0));
    }

    #[test]
    fn it_substitutes_nearest_preceding_variable() {
        let e = parse("$x is 5 or it is 6");
        // The `it` must have been rewritten to $x.
        fn contains_it(e: &Expr) -> bool {
            match e {
                Expr::It => true,
                Expr::Binary { left, right, .. } => contains_it(left) || contains_it(right),
                Expr::Unary { operand, .. } => contains_it(operand),
                _ => false,
            }
        }
        assert!(!contains_it(&e));
    }

    #[test]
    fn it_without_variable_is_left_for_the_context() {
        let e = parse("it + 1");
        assert!(matches!(e, Expr::Binary { op: BinOp::Add, ref left, .. }
            if matches!(**left, Expr::It)));
    }

    #[test]
    fn to_assignment_splits_the_sequence() {
        let e = parse("$x to it + 1");
        let Expr::Assign { target, value } = e else { panic!("expected assignment") };
        assert!(matches!(*target, Expr::Global(ref n) if n == "x"));
        // `it` resolved to $x across the assignment marker.
        assert!(matches!(*value, Expr::Binary { op: BinOp::Add, ref left, .. }
            if matches!(**left, Expr::Global(ref n) if n == "x")));
    }

    #[test]
    fn into_reverses_the_sides() {
        let e = parse("5 into $x");
        let Expr::Assign { target, value } = e else { panic!("expected assignment") };
        assert!(matches!(*target, Expr::Global(ref n) if n == "x"));
        assert!(matches!(*value, Expr::Num(n) if n == 5.0));
    }

    #[test]
    fn possessive_binds_tightest() {
        // $arr's 1st + 1 → ($arr's 1st) + 1
        let e = parse("$arr's 1st + 1");
        let Expr::Binary { op: BinOp::Add, left, .. } = e else { panic!("expected +") };
        assert!(matches!(*left, Expr::Binary { op: BinOp::Property, .. }));
    }

    #[test]
    fn unary_folds_right_to_left() {
        let e = parse("not not true");
        let Expr::Unary { op: UnOp::Not, operand } = e else { panic!("expected not") };
        assert!(matches!(*operand, Expr::Unary { op: UnOp::Not, .. }));
    }

    #[test]
    fn unary_after_binary() {
        let e = parse("2 * -3");
        let Expr::Binary { op: BinOp::Multiply, right, .. } = e else { panic!() };
        assert!(matches!(*right, Expr::Unary { op: UnOp::Negate, .. }));
    }

    #[test]
    fn missing_operator_is_reported() {
        // Two adjacent operands cannot appear in the sequence grammar; a
        // parenthesized operand after a number exercises the error path.
        assert!(parse_top_level("1 2").is_err());
    }

    #[test]
    fn nested_macro_call() {
        let e = parse("(a: 2, 3) contains 2");
        let Expr::Binary { op: BinOp::Contains, left, .. } = e else { panic!() };
        let Expr::MacroCall { name, args } = *left else { panic!("expected call") };
        assert_eq!(name, "a");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn spread_args() {
        let args = parse_call_args("...$arr, 5").unwrap();
        assert_eq!(args.len(), 2);
        assert!(args[0].spread);
        assert!(!args[1].spread);
    }

    #[test]
    fn where_builds_last() {
        let e = parse("each _x where _x > 2");
        let Expr::Binary { op: BinOp::Where, left, right } = e else { panic!() };
        assert!(matches!(*left, Expr::Each(ref n) if n == "x"));
        assert!(matches!(*right, Expr::Binary { op: BinOp::Greater, .. }));
    }

    #[test]
    fn empty_arg_list() {
        assert!(parse_call_args("").unwrap().is_empty());
    }

    #[test]
    fn grammar_error_carries_position() {
        let err = parse_top_level("1 + @").unwrap_err();
        assert!(matches!(err, EngineError::Grammar { pos: 4, .. }));
    }
}
