use crate::syntax::{EffectiveRange, Locatable, NodeId};
use std::fmt;
use thiserror::Error;

/// A problem in the source. Reported, never fatal: the offending expression resolves to the
/// `Error` type and binding continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} at {range}")]
pub struct Diagnostic {
    pub range: EffectiveRange,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new<L: Locatable>(location: L, kind: DiagnosticKind) -> Self {
        Self {
            range: location.range(),
            kind,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    DuplicateSymbol,
    SymbolNotFound,
    MemberNotFound,
    ExpectedType,
    ExpectedValue,
    ExpectedTypeLiteral,
    NoMatchingSignature,
    NotCallable,
    /// Operand of a constant expression had the wrong type code.
    ExpectedTypeCode(String),
    TypeMismatch {
        expected: String,
        found: String,
    },
    DivideByZero,
    InvalidArraySize,
    CannotExtend(String),
    CannotInfer(String),
    UnresolvedType,
    UnknownNode,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::DuplicateSymbol => write!(f, "Duplicate symbol"),
            DiagnosticKind::SymbolNotFound => write!(f, "Symbol not found"),
            DiagnosticKind::MemberNotFound => write!(f, "Member not found"),
            DiagnosticKind::ExpectedType => write!(f, "Expected a type"),
            DiagnosticKind::ExpectedValue => write!(f, "Expected a value"),
            DiagnosticKind::ExpectedTypeLiteral => write!(f, "Expected a type literal"),
            DiagnosticKind::NoMatchingSignature => write!(f, "No matching signature"),
            DiagnosticKind::NotCallable => write!(f, "Type is not callable"),
            DiagnosticKind::ExpectedTypeCode(code) => write!(f, "Expected type {}", code),
            DiagnosticKind::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            DiagnosticKind::DivideByZero => write!(f, "Divide by zero"),
            DiagnosticKind::InvalidArraySize => write!(f, "Invalid array size"),
            DiagnosticKind::CannotExtend(name) => write!(f, "Cannot extend type {}", name),
            DiagnosticKind::CannotInfer(name) => write!(f, "Cannot infer type of {}", name),
            DiagnosticKind::UnresolvedType => write!(f, "Unresolved type"),
            DiagnosticKind::UnknownNode => write!(f, "Unknown node"),
        }
    }
}

/// Broken engine invariants. These are bugs in the binder, not in the source, so they are
/// returned to the caller instead of joining the diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InternalError {
    #[error("type symbol `{0}` is already bound")]
    SymbolRebound(String),
    #[error("node {0} already has a type")]
    NodeRetyped(NodeId),
    #[error("binding context is already entered")]
    AlreadyEntered,
    #[error("binding context is already built")]
    AlreadyBuilt,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Position;

    #[test]
    fn message_and_display() {
        let range = EffectiveRange::new(Position::new(1, 4), Position::new(1, 5), 1);
        let diagnostic = Diagnostic::new(range, DiagnosticKind::DuplicateSymbol);

        assert_eq!(diagnostic.message(), "Duplicate symbol");
        assert_eq!(diagnostic.to_string(), "Duplicate symbol at line:1:4");

        let diagnostic = Diagnostic::new(
            range,
            DiagnosticKind::TypeMismatch {
                expected: "Int".to_string(),
                found: "String".to_string(),
            },
        );
        assert_eq!(
            diagnostic.message(),
            "Type mismatch: expected Int, found String"
        );
    }
}
