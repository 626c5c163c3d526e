//! Tree evaluation: folded expressions down to [`Data`] values.

use std::rc::Rc;

use crate::context::Context;
use crate::error::EngineError;
use crate::value::{Color, Data, Lambda, Op, TestOp, TypeName, UnaryOp};

use super::{Arg, BinOp, Expr, UnOp};

/// Evaluate an expression against the context.
pub fn eval(expr: &Expr, ctx: &mut Context) -> Result<Data, EngineError> {
    match expr {
        Expr::Num(n) => Ok(Data::Number(*n)),
        Expr::Str(s) => Ok(Data::Str(s.clone())),
        Expr::Bool(b) => Ok(Data::Bool(*b)),
        Expr::Color(c) => Ok(Data::Color(*c)),
        Expr::HookRef(name) => Ok(Data::HookRef(name.clone())),
        Expr::Ident(word) => resolve_word(word, ctx),
        Expr::Global(name) => {
            let value = ctx.global(name)?;
            ctx.set_it(value.clone());
            Ok(value)
        }
        Expr::Local(name) => {
            let value = ctx.local(name)?;
            ctx.set_it(value.clone());
            Ok(value)
        }
        Expr::It => ctx
            .it()
            .cloned()
            .ok_or_else(|| EngineError::eval("'it' has nothing to refer to here")),
        Expr::Each(var) => Ok(Data::Lambda(Lambda {
            var: Some(var.clone()),
            filter: None,
            via: None,
        })),
        Expr::MacroCall { name, args } => eval_macro_call(name, args, ctx),
        Expr::Unary {
            op: UnOp::Via,
            operand,
        } => Ok(Data::Lambda(Lambda {
            var: None,
            filter: None,
            via: Some(Rc::new((**operand).clone())),
        })),
        Expr::Unary { op, operand } => {
            let value = eval(operand, ctx)?;
            let op = match op {
                UnOp::Not => UnaryOp::Not,
                UnOp::Negate => UnaryOp::Negate,
                UnOp::Via => unreachable!(),
            };
            value.unary(op)
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, ctx),
        Expr::Assign { target, value } => {
            let value = eval(value, ctx)?;
            assign(target, value, ctx)?;
            Ok(Data::NoValue)
        }
    }
}

/// Resolve a bare word: builtin color, datatype keyword, or the visit
/// counter. Member keywords (`1st`, `length`, ...) never reach here; they
/// are consumed by the member-access operators.
fn resolve_word(word: &str, ctx: &mut Context) -> Result<Data, EngineError> {
    if let Some(color) = Color::named(word) {
        return Ok(Data::Color(color));
    }
    if let Some(t) = TypeName::named(word) {
        return Ok(Data::Type(t));
    }
    if word == "visit" || word == "visits" {
        let current = ctx.current_passage().unwrap_or_default().to_string();
        return Ok(Data::Number(ctx.visits(&current) as f64));
    }
    Err(EngineError::eval(format!("unrecognized word '{word}'")))
}

fn eval_binary(
    op: BinOp,
    left: &Expr,
    right: &Expr,
    ctx: &mut Context,
) -> Result<Data, EngineError> {
    // `where` keeps its right side unevaluated inside the lambda.
    if op == BinOp::Where {
        return build_where_lambda(left, right, ctx);
    }
    if op == BinOp::Property {
        let container = eval(left, ctx)?;
        let key = member_key(right, ctx)?;
        return container.member(&key);
    }
    if op == BinOp::OfProperty {
        let container = eval(right, ctx)?;
        let key = member_key(left, ctx)?;
        return container.member(&key);
    }

    let lhs = eval(left, ctx)?;
    let rhs = eval(right, ctx)?;
    match op {
        BinOp::Add => lhs.operate(Op::Add, &rhs),
        BinOp::Subtract => lhs.operate(Op::Subtract, &rhs),
        BinOp::Multiply => lhs.operate(Op::Multiply, &rhs),
        BinOp::Divide => lhs.operate(Op::Divide, &rhs),
        BinOp::Modulo => lhs.operate(Op::Modulo, &rhs),
        BinOp::And => lhs.operate(Op::And, &rhs),
        BinOp::Or => lhs.operate(Op::Or, &rhs),
        BinOp::Is => Ok(Data::Bool(lhs.test(TestOp::Is, &rhs)?)),
        BinOp::IsNot => Ok(Data::Bool(!lhs.test(TestOp::Is, &rhs)?)),
        BinOp::Matches => Ok(Data::Bool(lhs.test(TestOp::Matches, &rhs)?)),
        BinOp::IsA => Ok(Data::Bool(lhs.test(TestOp::IsOfType, &rhs)?)),
        BinOp::Contains => Ok(Data::Bool(lhs.test(TestOp::Contains, &rhs)?)),
        BinOp::IsIn => Ok(Data::Bool(rhs.test(TestOp::Contains, &lhs)?)),
        BinOp::IsNotIn => Ok(Data::Bool(!rhs.test(TestOp::Contains, &lhs)?)),
        BinOp::Less => Ok(Data::Bool(lhs.test(TestOp::Less, &rhs)?)),
        BinOp::Greater => Ok(Data::Bool(lhs.test(TestOp::Greater, &rhs)?)),
        BinOp::LessOrEqual => Ok(Data::Bool(lhs.test(TestOp::LessOrEqual, &rhs)?)),
        BinOp::GreaterOrEqual => Ok(Data::Bool(lhs.test(TestOp::GreaterOrEqual, &rhs)?)),
        BinOp::Property | BinOp::OfProperty | BinOp::Where => unreachable!(),
    }
}

/// `each _x where cond`, `_x where cond`, or `lambda where cond`.
fn build_where_lambda(
    left: &Expr,
    right: &Expr,
    ctx: &mut Context,
) -> Result<Data, EngineError> {
    let filter = Some(Rc::new(right.clone()));
    match left {
        Expr::Each(var) | Expr::Local(var) => Ok(Data::Lambda(Lambda {
            var: Some(var.clone()),
            filter,
            via: None,
        })),
        Expr::It => Ok(Data::Lambda(Lambda {
            var: None,
            filter,
            via: None,
        })),
        other => match eval(other, ctx)? {
            Data::Lambda(mut lambda) => {
                lambda.filter = filter;
                Ok(Data::Lambda(lambda))
            }
            value => Err(EngineError::eval(format!(
                "'where' needs a loop variable on its left, not a {}",
                value.type_name()
            ))),
        },
    }
}

/// Interpret the key side of a member access: bare words and literals are
/// keys, anything else evaluates.
fn member_key(expr: &Expr, ctx: &mut Context) -> Result<Data, EngineError> {
    match expr {
        Expr::Ident(word) => Ok(Data::Str(word.clone())),
        Expr::Str(s) => Ok(Data::Str(s.clone())),
        Expr::Num(n) => Ok(Data::Number(*n)),
        other => eval(other, ctx),
    }
}

/// Run a lambda's `where` filter against one element.
pub fn lambda_admits(
    lambda: &Lambda,
    item: &Data,
    ctx: &mut Context,
) -> Result<bool, EngineError> {
    let Some(filter) = &lambda.filter else {
        return Ok(true);
    };
    ctx.push_scope();
    if let Some(var) = &lambda.var {
        ctx.bind_local(var, item.clone());
    }
    ctx.set_it(item.clone());
    let result = eval(filter, ctx);
    ctx.pop_scope();
    match result? {
        Data::Bool(b) => Ok(b),
        other => Err(EngineError::eval(format!(
            "a 'where' clause must produce a boolean, not a {}",
            other.type_name()
        ))),
    }
}

/// Run a lambda's `via` transform against one element.
pub fn lambda_transform(
    lambda: &Lambda,
    item: &Data,
    ctx: &mut Context,
) -> Result<Data, EngineError> {
    let Some(via) = &lambda.via else {
        return Ok(item.clone());
    };
    ctx.push_scope();
    if let Some(var) = &lambda.var {
        ctx.bind_local(var, item.clone());
    }
    ctx.set_it(item.clone());
    let result = eval(via, ctx);
    ctx.pop_scope();
    result
}

fn eval_macro_call(name: &str, args: &[Arg], ctx: &mut Context) -> Result<Data, EngineError> {
    let norm = crate::macros::normalize(name);

    // The instant macros receive assignment forms, not values; they are
    // interpreted here rather than dispatched by shape.
    match norm.as_str() {
        "set" | "put" => {
            for arg in args {
                let (target, value) = assignment_arg(&norm, arg)?;
                let value = eval(value, ctx)?;
                assign(target, value, ctx)?;
            }
            return Ok(Data::NoValue);
        }
        "move" => {
            for arg in args {
                let (target, source) = assignment_arg(&norm, arg)?;
                let value = eval(source, ctx)?;
                assign(target, value, ctx)?;
                delete(source, ctx)?;
            }
            return Ok(Data::NoValue);
        }
        _ => {}
    }

    let mut values = Vec::new();
    for arg in args {
        let value = eval(&arg.expr, ctx)?;
        if arg.spread {
            values.extend(value.spread()?);
        } else {
            values.push(value);
        }
    }
    crate::macros::dispatch(&norm, &values, ctx)
}

fn assignment_arg<'a>(name: &str, arg: &'a Arg) -> Result<(&'a Expr, &'a Expr), EngineError> {
    if arg.spread {
        return Err(EngineError::eval(format!(
            "({name}:) cannot take spread arguments"
        )));
    }
    match &arg.expr {
        Expr::Assign { target, value } => Ok((target, value)),
        _ => Err(EngineError::eval(format!(
            "({name}:) expects 'to' or 'into' in each argument"
        ))),
    }
}

/// Assign a value to a variable or a member-access chain; member chains
/// rewrite the containing variable with an updated copy.
pub fn assign(target: &Expr, value: Data, ctx: &mut Context) -> Result<(), EngineError> {
    match target {
        Expr::Global(name) => {
            ctx.set_global(name, value);
            Ok(())
        }
        Expr::Local(name) => {
            ctx.set_local(name, value);
            Ok(())
        }
        Expr::Binary {
            op: BinOp::Property,
            left,
            right,
        } => {
            let container = eval(left, ctx)?;
            let key = member_key(right, ctx)?;
            let updated = container.set_member(&key, value)?;
            assign(left, updated, ctx)
        }
        Expr::Binary {
            op: BinOp::OfProperty,
            left,
            right,
        } => {
            let container = eval(right, ctx)?;
            let key = member_key(left, ctx)?;
            let updated = container.set_member(&key, value)?;
            assign(right, updated, ctx)
        }
        other => Err(EngineError::eval(format!(
            "cannot assign to {other:?}; only variables and their members are assignable"
        ))),
    }
}

/// Remove a variable or a member of one.
pub fn delete(target: &Expr, ctx: &mut Context) -> Result<(), EngineError> {
    match target {
        Expr::Global(name) => {
            ctx.unset_global(name);
            Ok(())
        }
        Expr::Local(name) => {
            ctx.unset_local(name);
            Ok(())
        }
        Expr::Binary {
            op: BinOp::Property,
            left,
            right,
        } => {
            let container = eval(left, ctx)?;
            let key = member_key(right, ctx)?;
            let updated = container.delete_member(&key)?;
            assign(left, updated, ctx)
        }
        Expr::Binary {
            op: BinOp::OfProperty,
            left,
            right,
        } => {
            let container = eval(right, ctx)?;
            let key = member_key(left, ctx)?;
            let updated = container.delete_member(&key)?;
            assign(right, updated, ctx)
        }
        other => Err(EngineError::eval(format!(
            "cannot move out of {other:?}; only variables and their members"
        ))),
    }
}
