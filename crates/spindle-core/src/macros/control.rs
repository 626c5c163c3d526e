//! Control-flow macros: conditional visibility, loops, passage display.

use crate::context::Context;
use crate::error::EngineError;
use crate::expr::lambda_admits;
use crate::value::{Changer, ChangerStep, Command, Data};

use super::{as_str, ParamKind, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add(&["if"], &[ParamKind::Bool], None, if_macro);
    reg.add(&["unless"], &[ParamKind::Bool], None, unless);
    reg.add(&["else-if"], &[ParamKind::Bool], None, else_if);
    reg.add(&["else"], &[], None, else_macro);
    reg.add(&["cond"], &[ParamKind::Bool, ParamKind::Any], Some(ParamKind::Any), cond);
    reg.add(&["for", "loop"], &[ParamKind::Lambda], Some(ParamKind::Any), for_macro);
    reg.add(&["display"], &[ParamKind::Str], None, display);
}

fn show(shown: bool) -> Data {
    Data::Changer(Changer::single(ChangerStep::Show(shown)))
}

fn if_macro(args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    let Data::Bool(condition) = args[0] else {
        unreachable!("binding admits booleans only")
    };
    ctx.set_last_condition(condition);
    Ok(show(condition))
}

fn unless(args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    let Data::Bool(condition) = args[0] else {
        unreachable!("binding admits booleans only")
    };
    ctx.set_last_condition(!condition);
    Ok(show(!condition))
}

/// Shown when no earlier branch of the chain was, and this condition holds.
fn else_if(args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    let Data::Bool(condition) = args[0] else {
        unreachable!("binding admits booleans only")
    };
    let Some(earlier) = ctx.last_condition() else {
        return Err(EngineError::eval(
            "(else-if:) must follow an (if:), (unless:) or (else-if:)",
        ));
    };
    let shown = !earlier && condition;
    ctx.set_last_condition(earlier || shown);
    Ok(show(shown))
}

fn else_macro(_args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    let Some(earlier) = ctx.last_condition() else {
        return Err(EngineError::eval(
            "(else:) must follow an (if:), (unless:) or (else-if:)",
        ));
    };
    // The chain is spent either way; a second (else:) stays hidden.
    ctx.set_last_condition(true);
    Ok(show(!earlier))
}

/// `(cond: b1, v1, b2, v2, ..., fallback)` — the first true condition's
/// value, or the trailing fallback.
fn cond(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let mut rest = args;
    while rest.len() >= 2 {
        let Data::Bool(condition) = rest[0] else {
            return Err(EngineError::eval(
                "(cond:) expects alternating booleans and values",
            ));
        };
        if condition {
            return Ok(rest[1].clone());
        }
        rest = &rest[2..];
    }
    match rest {
        [fallback] => Ok(fallback.clone()),
        _ => Err(EngineError::eval(
            "(cond:) found no true condition and has no fallback value",
        )),
    }
}

/// `(for: each _x where ..., ...items)[body]` — a changer rendering the
/// body once per admitted item.
fn for_macro(args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    let Data::Lambda(lambda) = &args[0] else {
        unreachable!("binding admits lambdas only")
    };
    let Some(var) = lambda.var.clone() else {
        return Err(EngineError::eval(
            "(for:) needs a lambda binding a temporary variable, like 'each _item'",
        ));
    };
    let mut items = Vec::new();
    for item in &args[1..] {
        if lambda_admits(lambda, item, ctx)? {
            items.push(item.clone());
        }
    }
    Ok(Data::Changer(Changer::single(ChangerStep::Repeat {
        var,
        items,
    })))
}

fn display(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Command(Command::Display(as_str(&args[0])?.to_string())))
}
