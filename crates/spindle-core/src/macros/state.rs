//! Story-state queries. The instant macros (`set`, `put`, `move`) are
//! interpreted in the evaluator, since they receive assignment forms rather
//! than values.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Data;

use super::{as_str, ParamKind, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add(&["history"], &[], None, history);
    reg.add(&["visited"], &[ParamKind::Str], None, visited);
}

fn history(_args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Array(
        ctx.history()
            .iter()
            .map(|name| Data::Str(name.clone()))
            .collect(),
    ))
}

fn visited(args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    let name = as_str(&args[0])?;
    Ok(Data::Bool(ctx.visits(name) > 0))
}
