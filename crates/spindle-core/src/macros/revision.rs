//! Revision macros: retarget a hook body at already-rendered content, or
//! reveal hidden hooks.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::{AdvanceType, Changer, ChangerStep, Command, Data, SelectorSpec};

use super::{ParamKind, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add(&["append"], &[ParamKind::Selector], Some(ParamKind::Selector), append);
    reg.add(&["prepend"], &[ParamKind::Selector], Some(ParamKind::Selector), prepend);
    reg.add(&["replace"], &[ParamKind::Selector], Some(ParamKind::Selector), replace);
    reg.add(&["show"], &[ParamKind::Selector], Some(ParamKind::Selector), show);
}

fn revise(args: &[Data], advance: AdvanceType) -> Result<Data, EngineError> {
    Ok(Data::Changer(Changer::single(ChangerStep::Revise {
        selector: SelectorSpec::from_values(args)?,
        advance,
    })))
}

fn append(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    revise(args, AdvanceType::Append)
}

fn prepend(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    revise(args, AdvanceType::Prepend)
}

fn replace(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    revise(args, AdvanceType::Replace)
}

fn show(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    Ok(Data::Command(Command::Show(SelectorSpec::from_values(args)?)))
}
