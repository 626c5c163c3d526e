//! Changer-producing macros: styling, visibility, naming, links.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::{Changer, ChangerStep, Color, Data};

use super::{as_str, ParamKind, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add(&["text-style"], &[ParamKind::Str], None, text_style);
    reg.add(
        &["text-colour", "text-color"],
        &[ParamKind::Color],
        None,
        text_color,
    );
    reg.add(
        &["text-colour", "text-color"],
        &[ParamKind::Str],
        None,
        text_color_named,
    );
    reg.add(&["background"], &[ParamKind::Color], None, background);
    reg.add(&["background"], &[ParamKind::Str], None, background_named);
    reg.add(&["align"], &[ParamKind::Str], None, align);
    reg.add(&["font"], &[ParamKind::Str], None, font);
    reg.add(&["css"], &[ParamKind::Str], None, css);
    reg.add(&["hidden"], &[], None, hidden);
    reg.add(&["hook"], &[ParamKind::Str], None, hook);
    reg.add(&["link", "link-reveal"], &[ParamKind::Str], None, link);
}

fn step(step: ChangerStep) -> Result<Data, EngineError> {
    Ok(Data::Changer(Changer::single(step)))
}

const STYLES: &[&str] = &[
    "bold",
    "italic",
    "underline",
    "strike",
    "superscript",
    "subscript",
    "mark",
    "outline",
    "shadow",
    "blur",
    "smear",
];

fn text_style(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let style = as_str(&args[0])?;
    if !STYLES.contains(&style) {
        return Err(EngineError::eval(format!(
            "'{style}' is not a recognized text style"
        )));
    }
    step(ChangerStep::Style(style.to_string()))
}

fn named_color(name: &str) -> Result<Color, EngineError> {
    Color::named(name)
        .or_else(|| Color::from_hex(name))
        .ok_or_else(|| EngineError::eval(format!("'{name}' is not a recognized colour")))
}

fn text_color(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let Data::Color(color) = args[0] else {
        unreachable!("binding admits colours only")
    };
    step(ChangerStep::TextColor(color))
}

fn text_color_named(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    step(ChangerStep::TextColor(named_color(as_str(&args[0])?)?))
}

fn background(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let Data::Color(color) = args[0] else {
        unreachable!("binding admits colours only")
    };
    step(ChangerStep::Background(color))
}

fn background_named(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    step(ChangerStep::Background(named_color(as_str(&args[0])?)?))
}

fn align(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    let arrow = as_str(&args[0])?;
    let side = match arrow {
        "<==" | "left" => "left",
        "==>" | "right" => "right",
        "=><=" | "center" | "centre" => "center",
        "<==>" | "justify" => "justify",
        other => {
            return Err(EngineError::eval(format!(
                "'{other}' is not a recognized alignment"
            )))
        }
    };
    step(ChangerStep::Align(side.to_string()))
}

fn font(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    step(ChangerStep::Font(as_str(&args[0])?.to_string()))
}

fn css(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    step(ChangerStep::Css(as_str(&args[0])?.to_string()))
}

fn hidden(_args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    step(ChangerStep::Hidden)
}

fn hook(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    step(ChangerStep::Name(as_str(&args[0])?.to_string()))
}

fn link(args: &[Data], _ctx: &mut Context) -> Result<Data, EngineError> {
    step(ChangerStep::Link {
        text: as_str(&args[0])?.to_string(),
    })
}
