//! Macro dispatch: normalized name to an ordered list of typed signatures.
//!
//! Binding is a pure check of a signature against the evaluated argument
//! list. A failed bind silently moves to the next candidate; an error from
//! a successfully bound body propagates untouched. Only when no candidate
//! binds does dispatch fail with a "no macro found" error.

mod changers;
mod control;
mod revision;
mod state;
mod values;

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Data;

/// Canonical macro-name form: hyphens/underscores stripped, lowercased, so
/// `(text-style:)`, `(textstyle:)` and `(TEXT_STYLE:)` coincide.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

pub type MacroFn = fn(&[Data], &mut Context) -> Result<Data, EngineError>;

/// What one parameter slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Any,
    Number,
    Str,
    Bool,
    Lambda,
    Color,
    /// A revision target: a `?hook` reference or a content string.
    Selector,
}

impl ParamKind {
    fn admits(self, value: &Data) -> bool {
        match self {
            ParamKind::Any => !matches!(value, Data::NoValue),
            ParamKind::Number => matches!(value, Data::Number(_)),
            ParamKind::Str => matches!(value, Data::Str(_)),
            ParamKind::Bool => matches!(value, Data::Bool(_)),
            ParamKind::Lambda => matches!(value, Data::Lambda(_)),
            ParamKind::Color => matches!(value, Data::Color(_)),
            ParamKind::Selector => matches!(value, Data::HookRef(_) | Data::Str(_)),
        }
    }
}

/// One callable overload of a macro.
struct Signature {
    params: Vec<ParamKind>,
    /// A trailing variadic slot absorbing all remaining arguments.
    rest: Option<ParamKind>,
    body: MacroFn,
}

impl Signature {
    fn binds(&self, args: &[Data]) -> bool {
        let arity_ok = match self.rest {
            Some(_) => args.len() >= self.params.len(),
            None => args.len() == self.params.len(),
        };
        if !arity_ok {
            return false;
        }
        for (kind, value) in self.params.iter().zip(args) {
            if !kind.admits(value) {
                return false;
            }
        }
        if let Some(rest) = self.rest {
            for value in &args[self.params.len()..] {
                if !rest.admits(value) {
                    return false;
                }
            }
        }
        true
    }
}

pub(crate) struct Registry {
    map: HashMap<String, Vec<Signature>>,
}

impl Registry {
    fn add(&mut self, names: &[&str], params: &[ParamKind], rest: Option<ParamKind>, body: MacroFn) {
        for name in names {
            self.map.entry(normalize(name)).or_default().push(Signature {
                params: params.to_vec(),
                rest,
                body,
            });
        }
    }
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let mut reg = Registry {
            map: HashMap::new(),
        };
        values::register(&mut reg);
        control::register(&mut reg);
        state::register(&mut reg);
        changers::register(&mut reg);
        revision::register(&mut reg);
        reg
    })
}

/// Resolve and run a macro call over already-evaluated (and spread)
/// arguments.
pub fn dispatch(name: &str, args: &[Data], ctx: &mut Context) -> Result<Data, EngineError> {
    let key = normalize(name);
    let not_found = || EngineError::NoSuchMacro {
        name: key.clone(),
        arg_count: args.len(),
    };
    let Some(candidates) = registry().map.get(&key) else {
        return Err(not_found());
    };
    for candidate in candidates {
        if candidate.binds(args) {
            return (candidate.body)(args, ctx);
        }
    }
    Err(not_found())
}

fn as_number(value: &Data) -> Result<f64, EngineError> {
    match value {
        Data::Number(n) => Ok(*n),
        other => Err(EngineError::eval(format!(
            "expected a number, got a {}",
            other.type_name()
        ))),
    }
}

fn as_str(value: &Data) -> Result<&str, EngineError> {
    match value {
        Data::Str(s) => Ok(s),
        other => Err(EngineError::eval(format!(
            "expected a string, got a {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::InMemoryStory;

    fn ctx() -> Context {
        Context::new(Box::new(InMemoryStory::single("")))
    }

    #[test]
    fn normalize_strips_separators_and_case() {
        assert_eq!(normalize("text-style"), "textstyle");
        assert_eq!(normalize("Text_Style"), "textstyle");
        assert_eq!(normalize("a"), "a");
    }

    #[test]
    fn unknown_macro_names_the_call() {
        let err = dispatch("nope", &[Data::Number(1.0)], &mut ctx()).unwrap_err();
        let EngineError::NoSuchMacro { name, arg_count } = err else {
            panic!("wrong error kind");
        };
        assert_eq!(name, "nope");
        assert_eq!(arg_count, 1);
    }

    #[test]
    fn arity_mismatch_is_a_binding_failure() {
        // (abs:) with two arguments binds nothing.
        let err = dispatch("abs", &[Data::Number(1.0), Data::Number(2.0)], &mut ctx());
        assert!(matches!(err, Err(EngineError::NoSuchMacro { .. })));
    }

    #[test]
    fn overloads_try_in_order() {
        // (text-colour:) has a color overload and a named-color overload.
        let by_value = dispatch(
            "text-colour",
            &[Data::Color(crate::value::Color::new(1, 2, 3))],
            &mut ctx(),
        );
        assert!(by_value.is_ok());
        let by_name = dispatch("text-colour", &[Data::Str("red".into())], &mut ctx());
        assert!(by_name.is_ok());
    }

    #[test]
    fn bound_body_errors_propagate() {
        // (num:) binds a string fine; the parse failure inside must surface.
        let err = dispatch("num", &[Data::Str("abc".into())], &mut ctx());
        assert!(matches!(err, Err(EngineError::Eval(_))));
    }
}
