//! Error types for logical planning
//!
//! Every failure in the front end is classified into one of four kinds.
//! Errors are surfaced immediately to the caller of the planner entry point;
//! there is no partial result and no internal recovery.

use thiserror::Error;

use super::ast::TokenKind;

/// Errors produced while converting a statement AST into a logical operator
#[derive(Debug, Error)]
pub enum PlanError {
    /// The AST shape violates the arity/child-kind contract for the current token
    #[error("malformed statement tree: {0}")]
    Structure(String),

    /// A token kind with no matching case at the current dispatch point
    #[error("unsupported token {kind:?} {context}")]
    UnsupportedToken { kind: TokenKind, context: String },

    /// A literal could not be parsed as the expected numeric or time value
    #[error("cannot parse value {text:?}: {reason}")]
    ValueParse { text: String, reason: String },

    /// Structurally valid but domain-invalid input
    #[error("{0}")]
    Semantic(String),
}

impl PlanError {
    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        PlanError::Structure(msg.into())
    }

    pub(crate) fn unsupported(kind: TokenKind, context: impl Into<String>) -> Self {
        PlanError::UnsupportedToken {
            kind,
            context: context.into(),
        }
    }

    pub(crate) fn value(text: impl Into<String>, reason: impl Into<String>) -> Self {
        PlanError::ValueParse {
            text: text.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn semantic(msg: impl Into<String>) -> Self {
        PlanError::Semantic(msg.into())
    }
}

/// Result type for planning operations
pub type PlanResult<T> = Result<T, PlanError>;
