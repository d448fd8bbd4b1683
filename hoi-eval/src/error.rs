//! Typed contract violations raised during evaluation.

use std::fmt;
use thiserror::Error;

/// Errors that abort an evaluation run.
///
/// They are carried inside [anyhow::Error] and can be recovered with
/// `downcast_ref::<EvalError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("shape mismatch on {what}: expected {expected}, but get {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },
    #[error("object class {class} is out of range 0..{num_classes}")]
    InvalidObjectClass { class: i64, num_classes: usize },
    #[error("invalid score range {start}..{end} for object class {class} on score width {width}")]
    InvalidRange {
        class: usize,
        start: usize,
        end: usize,
        width: usize,
    },
    #[error("the model does not emit the declared output '{field}'")]
    MissingOutput { field: &'static str },
    #[error("the model emits the undeclared output '{field}'")]
    UnexpectedOutput { field: &'static str },
}

impl EvalError {
    pub fn shape_mismatch(
        what: impl Into<String>,
        expected: impl fmt::Debug,
        actual: impl fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}
