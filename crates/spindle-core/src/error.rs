//! Error types shared across the interpreter.

use thiserror::Error;

/// Errors produced while parsing or rendering a passage.
///
/// All variants are fatal to the current render pass: the renderer does not
/// attempt partial recovery. The driving application decides whether to show
/// a diagnostic or abort.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source text does not match the passage or expression grammar.
    #[error("syntax error at byte {pos}: {message}")]
    Grammar { pos: usize, message: String },

    /// Operator, member, or type mismatch during evaluation.
    #[error("evaluation error: {0}")]
    Eval(String),

    /// A variant/key or variant/operator combination that has no meaning.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// No built-in macro signature matched the given arguments.
    #[error("no macro found: ({name}:) with {arg_count} argument(s)")]
    NoSuchMacro { name: String, arg_count: usize },

    /// The story source has no passage by this name.
    #[error("no passage named {0:?}")]
    NoSuchPassage(String),
}

impl EngineError {
    pub fn eval(message: impl Into<String>) -> Self {
        EngineError::Eval(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        EngineError::UnsupportedOperation(message.into())
    }

    pub fn grammar(pos: usize, message: impl Into<String>) -> Self {
        EngineError::Grammar {
            pos,
            message: message.into(),
        }
    }
}
