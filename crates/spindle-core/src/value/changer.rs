//! Changer and command values.
//!
//! A changer wraps the rendering of a hook body (styling, visibility,
//! naming, link behavior, repetition, revision). A command performs an
//! immediate one-shot side effect against the document cursor. Both are
//! plain data here; the renderer interprets them.

use super::{Color, Data};
use crate::error::EngineError;

/// A composable changer: a list of steps applied around a hook body.
/// `+` between changers concatenates step lists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Changer {
    pub steps: Vec<ChangerStep>,
}

impl Changer {
    pub fn single(step: ChangerStep) -> Changer {
        Changer { steps: vec![step] }
    }

    pub fn compose(mut self, other: Changer) -> Changer {
        self.steps.extend(other.steps);
        self
    }

    /// Thread the tri-state hidden flag and the optional hook name through
    /// this changer's steps. Assigning a name twice is an error.
    pub fn apply(
        &self,
        hidden: &mut Option<bool>,
        name: &mut Option<String>,
    ) -> Result<(), EngineError> {
        for step in &self.steps {
            match step {
                ChangerStep::Hidden => *hidden = Some(true),
                ChangerStep::Show(false) => *hidden = Some(true),
                ChangerStep::Show(true) => {
                    if hidden.is_none() {
                        *hidden = Some(false);
                    }
                }
                ChangerStep::Name(n) => {
                    if name.is_some() {
                        return Err(EngineError::eval(format!(
                            "hook already has a name; cannot also name it '{n}'"
                        )));
                    }
                    *name = Some(n.clone());
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// One behavior a changer adds around its hook body.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangerStep {
    /// Wrap the body in a styling container (`bold`, `italic`, ...).
    Style(String),
    /// Wrap the body in a text-color container.
    TextColor(Color),
    /// Wrap the body in a background-color container.
    Background(Color),
    /// Wrap the body in an alignment container (`left`, `center`, ...).
    Align(String),
    /// Wrap the body in a font container.
    Font(String),
    /// Attach raw CSS to the body's container.
    Css(String),
    /// Mark the hook hidden-by-default; the body is not rendered until shown.
    Hidden,
    /// Conditional visibility from `(if:)` / `(unless:)` / `(else:)`.
    /// `Show(false)` behaves like [`ChangerStep::Hidden`].
    Show(bool),
    /// Assign a hook name so selectors can target the container.
    Name(String),
    /// Render the body as link text; the body re-renders in place on click.
    Link { text: String },
    /// Render the body once per item with a local variable bound.
    Repeat { var: String, items: Vec<Data> },
    /// Redirect the body into existing rendered content located by a
    /// selector, once per match.
    Revise {
        selector: SelectorSpec,
        advance: AdvanceType,
    },
}

/// A one-shot side effect executed by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Print a value as text at the cursor.
    Print(Box<Data>),
    /// Render the named passage's content at the cursor.
    Display(String),
    /// Reveal hidden hooks matched by the selector.
    Show(SelectorSpec),
}

/// A data-level description of a revision target; the document layer turns
/// it into a live selector.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorSpec {
    /// Match containers carrying this hook name.
    HookName(String),
    /// Match text nodes containing this substring.
    Content(String),
    /// First-match union of several selectors.
    Union(Vec<SelectorSpec>),
}

impl SelectorSpec {
    /// Build a selector from a macro argument: `?hook` refs select by name,
    /// strings select by content.
    pub fn from_value(value: &Data) -> Result<SelectorSpec, EngineError> {
        match value {
            Data::HookRef(name) => Ok(SelectorSpec::HookName(name.clone())),
            Data::Str(s) => Ok(SelectorSpec::Content(s.clone())),
            other => Err(EngineError::eval(format!(
                "a {} cannot be used as a revision target",
                other.type_name()
            ))),
        }
    }

    /// Combine several argument values into one selector.
    pub fn from_values(values: &[Data]) -> Result<SelectorSpec, EngineError> {
        if values.len() == 1 {
            return SelectorSpec::from_value(&values[0]);
        }
        let inner = values
            .iter()
            .map(SelectorSpec::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SelectorSpec::Union(inner))
    }

    /// Hook names this selector can match, used by `(show:)`.
    pub fn hook_names(&self) -> Vec<&str> {
        match self {
            SelectorSpec::HookName(n) => vec![n.as_str()],
            SelectorSpec::Content(_) => Vec::new(),
            SelectorSpec::Union(inner) => inner.iter().flat_map(|s| s.hook_names()).collect(),
        }
    }
}

/// Where a matched selector leaves the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceType {
    /// Immediately before the match: following writes insert before it.
    Prepend,
    /// Immediately after the match.
    Append,
    /// The matched span is deleted outright.
    Replace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_concatenates_steps() {
        let a = Changer::single(ChangerStep::Style("em".into()));
        let b = Changer::single(ChangerStep::Hidden);
        let c = a.compose(b);
        assert_eq!(c.steps.len(), 2);
    }

    #[test]
    fn apply_threads_hidden_and_name() {
        let c = Changer {
            steps: vec![ChangerStep::Hidden, ChangerStep::Name("a".into())],
        };
        let mut hidden = None;
        let mut name = None;
        c.apply(&mut hidden, &mut name).unwrap();
        assert_eq!(hidden, Some(true));
        assert_eq!(name.as_deref(), Some("a"));
    }

    #[test]
    fn apply_rejects_second_name() {
        let c = Changer {
            steps: vec![ChangerStep::Name("a".into()), ChangerStep::Name("b".into())],
        };
        let mut hidden = None;
        let mut name = None;
        assert!(c.apply(&mut hidden, &mut name).is_err());
    }

    #[test]
    fn selector_spec_from_values_builds_union() {
        let spec = SelectorSpec::from_values(&[
            Data::HookRef("a".into()),
            Data::Str("the cellar".into()),
        ])
        .unwrap();
        assert!(matches!(spec, SelectorSpec::Union(ref v) if v.len() == 2));
        assert_eq!(spec.hook_names(), vec!["a"]);
    }

    #[test]
    fn selector_spec_rejects_numbers() {
        assert!(SelectorSpec::from_value(&Data::Number(1.0)).is_err());
    }
}
