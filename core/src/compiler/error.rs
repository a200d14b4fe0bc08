//! Code generation errors.

use std::io;

use thiserror::Error;

use crate::ast::{ArithOp, DeclId, Span};
use crate::diagnostics::{Diagnostic, Severity};

/// Errors that abort code generation.
///
/// Apart from `Sink`, every variant means an earlier pass handed over a tree
/// that breaks its contract. No partial output should be trusted after one of
/// these is returned.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A local was read before its declaration was generated.
    #[error("local variable '{name}' ({id}) is used before its frame offset is known")]
    UnassignedLocal { name: String, id: DeclId, span: Span },

    /// A local was read after its block ended, or from another method.
    #[error("local variable '{name}' ({id}) is not in scope here")]
    LocalOutOfScope { name: String, id: DeclId, span: Span },

    /// An upstream offset pushes a displacement out of the i32 range.
    #[error("displacement {base} + {offset} does not fit in 32 bits")]
    OffsetOverflow { base: i32, offset: i32, span: Span },

    /// The same local declaration was generated twice.
    #[error("local variable '{name}' ({id}) was already given frame offset {previous}")]
    OffsetReassigned {
        name: String,
        id: DeclId,
        previous: i32,
        span: Span,
    },

    #[error("operand of '{op}' must be an int, found {found}")]
    NonIntegerOperand {
        op: ArithOp,
        found: String,
        span: Span,
    },

    /// A value was required but the expression has type void.
    #[error("{what} has type void and produces no value")]
    VoidValue { what: &'static str, span: Span },

    #[error("failed to write assembly: {0}")]
    Sink(#[from] io::Error),
}

impl CodegenError {
    /// Span of the offending node, if the error has one.
    pub fn span(&self) -> Option<&Span> {
        match self {
            CodegenError::UnassignedLocal { span, .. }
            | CodegenError::LocalOutOfScope { span, .. }
            | CodegenError::OffsetOverflow { span, .. }
            | CodegenError::OffsetReassigned { span, .. }
            | CodegenError::NonIntegerOperand { span, .. }
            | CodegenError::VoidValue { span, .. } => Some(span),
            CodegenError::Sink(_) => None,
        }
    }

    /// Convert to a Diagnostic for API boundary.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, help) = match self {
            CodegenError::UnassignedLocal { .. } => (
                "G001",
                vec!["locals must be declared before they are referenced".to_string()],
            ),
            CodegenError::OffsetReassigned { .. } => (
                "G002",
                vec!["every local declaration needs its own id".to_string()],
            ),
            CodegenError::NonIntegerOperand { .. } => ("G003", vec![]),
            CodegenError::VoidValue { .. } => ("G004", vec![]),
            CodegenError::Sink(_) => ("G005", vec![]),
            CodegenError::LocalOutOfScope { .. } => (
                "G006",
                vec!["a local is visible only until the end of its block".to_string()],
            ),
            CodegenError::OffsetOverflow { .. } => ("G007", vec![]),
        };
        Diagnostic {
            severity: Severity::Error,
            message: self.to_string(),
            span: self.span().cloned().unwrap_or_default(),
            help,
            code: Some(code.to_string()),
        }
    }
}
