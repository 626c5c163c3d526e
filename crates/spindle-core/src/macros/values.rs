//! Value-producing macros: collection constructors, conversions, math.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::{Command, Data};

use super::{as_number, as_str, ParamKind, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add(&["print"], &[ParamKind::Any], None, print);
    reg.add(&["a", "array"], &[], Some(ParamKind::Any), array);
    reg.add(&["dm", "datamap"], &[], Some(ParamKind::Any), datamap);
    reg.add(&["ds", "dataset"], &[], Some(ParamKind::Any), dataset);
    reg.add(&["str", "string", "text"], &[], Some(ParamKind::Any), text);
    reg.add(&["num", "number"], &[ParamKind::Str], None, number);
    reg.add(&["range"], &[ParamKind::Number, ParamKind::Number], None, range);
    reg.add(&["count"], &[ParamKind::Any], Some(ParamKind::Any), count);
    reg.add(&["abs"], &[ParamKind::Number], None, abs);
    reg.add(&["min"], &[ParamKind::Number], Some(ParamKind::Number), min);
    reg.add(&["max"], &[ParamKind::Number], Some(ParamKind::Number), max);
    reg.add(&["round"], &[ParamKind::Number], None, round);
    reg.add(&["floor"], &[ParamKind::Number], None, floor);
    reg.add(&["ceil"], &[ParamKind::Number], None, ceil);
    reg.add(&["random"], &[ParamKind::Number, ParamKind::Number], None, random);
    reg.add(&["either"], &[ParamKind::Any], Some(ParamKind::Any), either);
    reg.add(&["lowercase"], &[ParamKind::Str], None, lowercase);
    reg.add(&["uppercase"], &[ParamKind::Str], None, uppercase);
    reg.add(&["words"], &[ParamKind::Str], None, words);
}

fn print(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Command(Command::Print(Box::new(args[0].clone()))))
}

fn array(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Array(args.to_vec()))
}

fn datamap(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    if args.len() % 2 != 0 {
        return Err(EngineError::eval(
            "(dm:) needs an even number of arguments: alternating keys and values",
        ));
    }
    let pairs = args
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    Ok(Data::map_from(pairs))
}

fn dataset(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::set_from(args.to_vec()))
}

fn text(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let mut out = String::new();
    for arg in args {
        out.push_str(&arg.to_string());
    }
    Ok(Data::Str(out))
}

fn number(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let s = as_str(&args[0])?;
    s.trim()
        .parse::<f64>()
        .map(Data::Number)
        .map_err(|_| EngineError::eval(format!("'{s}' cannot be read as a number")))
}

fn range(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let a = as_number(&args[0])? as i64;
    let b = as_number(&args[1])? as i64;
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Ok(Data::Array((lo..=hi).map(|n| Data::Number(n as f64)).collect()))
}

/// Occurrences of each sought value inside the first argument.
fn count(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let haystack = &args[0];
    let mut total = 0usize;
    for sought in &args[1..] {
        total += match haystack {
            Data::Array(items) | Data::Set(items) => {
                items.iter().filter(|item| *item == sought).count()
            }
            Data::Str(text) => match sought {
                Data::Str(needle) if !needle.is_empty() => text.matches(needle.as_str()).count(),
                _ => 0,
            },
            other => {
                return Err(EngineError::unsupported(format!(
                    "(count:) cannot search a {}",
                    other.type_name()
                )))
            }
        };
    }
    Ok(Data::Number(total as f64))
}

fn abs(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Number(as_number(&args[0])?.abs()))
}

fn min(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let mut best = as_number(&args[0])?;
    for arg in &args[1..] {
        best = best.min(as_number(arg)?);
    }
    Ok(Data::Number(best))
}

fn max(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let mut best = as_number(&args[0])?;
    for arg in &args[1..] {
        best = best.max(as_number(arg)?);
    }
    Ok(Data::Number(best))
}

fn round(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Number(as_number(&args[0])?.round()))
}

fn floor(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Number(as_number(&args[0])?.floor()))
}

fn ceil(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Number(as_number(&args[0])?.ceil()))
}

fn random(args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    let a = as_number(&args[0])? as i64;
    let b = as_number(&args[1])? as i64;
    Ok(Data::Number(ctx.random_range(a, b) as f64))
}

fn either(args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    let pick = ctx.random_below(args.len());
    Ok(args[pick].clone())
}

fn lowercase(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Str(as_str(&args[0])?.to_lowercase()))
}

fn uppercase(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Str(as_str(&args[0])?.to_uppercase()))
}

fn words(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Array(
        as_str(&args[0])?
            .split_whitespace()
            .map(|w| Data::Str(w.to_string()))
            .collect(),
    ))
}
