use pest::error::{ErrorVariant, InputLocation};
use thiserror::Error;

use crate::ast::{DeclId, Span};
use crate::diagnostics::{Diagnostic, Severity};

use super::reader::Rule;

/// Errors produced while reading a tree dump.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("syntax error: {message}")]
    Syntax { message: String, span: Span },

    #[error("invalid number '{text}'")]
    InvalidNumber { text: String, span: Span },

    #[error("declaration {id} is declared more than once")]
    DuplicateDeclaration { id: DeclId, span: Span, first: Span },

    #[error("'{name}{id}' does not refer to any declaration")]
    UnknownDeclaration { name: String, id: DeclId, span: Span },

    /// The id exists but was declared under another name.
    #[error("'{name}{id}' refers to a declaration named '{declared}'")]
    NameMismatch {
        name: String,
        id: DeclId,
        declared: String,
        span: Span,
    },

    #[error("'{keyword}' used outside of a method")]
    ReceiverOutsideMethod { keyword: &'static str, span: Span },

    #[error("only method calls can be used as statements")]
    ExpressionStatement { span: Span },

    /// The grammar accepted input the reader could not walk. Always a bug.
    #[error("unexpected tree shape under {rule}")]
    Malformed { rule: String, span: Span },
}

impl ReadError {
    pub(crate) fn from_pest(err: pest::error::Error<Rule>) -> Self {
        let span = match err.location {
            InputLocation::Pos(pos) => Span(pos..pos),
            InputLocation::Span((start, end)) => Span(start..end),
        };
        let message = match err.variant {
            ErrorVariant::ParsingError { positives, .. } => {
                format!("expected {}", describe_rules(&positives))
            }
            ErrorVariant::CustomError { message } => message,
        };
        ReadError::Syntax { message, span }
    }

    pub(crate) fn malformed(rule: Rule, span: &Span) -> Self {
        ReadError::Malformed {
            rule: format!("{:?}", rule),
            span: span.clone(),
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            ReadError::Syntax { span, .. }
            | ReadError::InvalidNumber { span, .. }
            | ReadError::DuplicateDeclaration { span, .. }
            | ReadError::UnknownDeclaration { span, .. }
            | ReadError::NameMismatch { span, .. }
            | ReadError::ReceiverOutsideMethod { span, .. }
            | ReadError::ExpressionStatement { span }
            | ReadError::Malformed { span, .. } => span,
        }
    }

    /// Convert to a Diagnostic for API boundary
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, help) = match self {
            ReadError::Syntax { .. } => ("R001", vec![]),
            ReadError::InvalidNumber { .. } => (
                "R002",
                vec!["numbers must fit in a signed 32-bit integer".to_string()],
            ),
            ReadError::DuplicateDeclaration { first, .. } => (
                "R003",
                vec![format!("first declared at {}", first)],
            ),
            ReadError::UnknownDeclaration { .. } => (
                "R004",
                vec!["every reference must use the id of a field, parameter or local".to_string()],
            ),
            ReadError::NameMismatch { declared, id, .. } => (
                "R005",
                vec![format!("did you mean '{}{}'?", declared, id)],
            ),
            ReadError::ReceiverOutsideMethod { .. } => ("R006", vec![]),
            ReadError::ExpressionStatement { .. } => ("R007", vec![]),
            ReadError::Malformed { .. } => ("R999", vec![]),
        };
        Diagnostic {
            severity: Severity::Error,
            message: self.to_string(),
            span: self.span().clone(),
            help,
            code: Some(code.to_string()),
        }
    }
}

/// Human-readable list of what the parser would have accepted.
fn describe_rules(rules: &[Rule]) -> String {
    let mut names: Vec<&'static str> = Vec::new();
    for rule in rules {
        let name = describe_rule(*rule);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    match names.as_slice() {
        [] => "valid input".to_string(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

fn describe_rule(rule: Rule) -> &'static str {
    match rule {
        Rule::expr | Rule::operand => "an expression",
        Rule::int_lit => "an integer",
        Rule::string_lit | Rule::string => "a string literal",
        Rule::this_kw => "`this`",
        Rule::super_kw => "`super`",
        Rule::new_object => "`new`",
        Rule::keyword => "a keyword",
        Rule::ident => "an identifier",
        Rule::decl_name | Rule::var_ref => "a `name#id` reference",
        Rule::runtime_ref => "a `$routine` name",
        Rule::ty | Rule::int_ty | Rule::boolean_ty | Rule::void_ty | Rule::class_ty => "a type",
        Rule::array_suffix => "`[]`",
        Rule::offset | Rule::uint => "a number",
        Rule::block => "a block",
        Rule::local_decl => "a local declaration",
        Rule::call_stmt => "a statement",
        Rule::main_clause => "`main`",
        Rule::class_decl => "a class declaration",
        Rule::extends_clause => "`extends`",
        Rule::field_decl | Rule::method_decl => "a class member",
        Rule::formal => "a parameter",
        Rule::call_suffix => "a method call",
        Rule::add | Rule::sub => "an arithmetic operator",
        Rule::EOI => "end of input",
        _ => "valid input",
    }
}
