//! The crate's single error currency. Every fallible phase of the pipeline
//! returns `Result<T>`; each variant carries enough context (a span, the
//! offending name, expected/actual type strings) to build a `Diagnostic`
//! without re-walking the source.

use thiserror::Error;

use crate::diagnostic::{Diagnostic, Label, Span};

pub type Result<T> = std::result::Result<T, CorvidError>;

#[derive(Debug, Error, PartialEq)]
pub enum CorvidError {
    // -- Syntactic -----------------------------------------------------
    #[error("unexpected token {found:?}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        span: Span,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String, span: Span },

    // -- Semantic --------------------------------------------------------
    #[error("undefined name '{name}'")]
    UndefinedName { name: String, span: Span },
    #[error("'{name}' is already defined in this scope")]
    DuplicateDefinition { name: String, span: Span },
    #[error("type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("'{name}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("tuple index {index} out of range for '{ty}'")]
    TupleIndexOutOfRange {
        index: i64,
        ty: String,
        span: Span,
    },
    #[error("tuple index must be a constant integer literal")]
    NonConstantTupleIndex { span: Span },
    #[error("condition must be 'bool', found '{found}'")]
    NonBoolCondition { found: String, span: Span },
    #[error("cannot assign into a tuple element; tuples are immutable")]
    TupleElementAssignment { span: Span },
    #[error("list literal must not be empty")]
    EmptyListLiteral { span: Span },
    #[error("'{name}' is not a function")]
    NotAFunction { name: String, span: Span },
    #[error("return outside of a function")]
    ReturnOutsideFunction { span: Span },
    #[error("'{name}' cannot be indexed; it has type '{ty}'")]
    NotIndexable { name: String, ty: String, span: Span },

    // -- IR generation -----------------------------------------------------
    #[error("'{keyword}' outside of a loop")]
    LoopControlOutsideLoop { keyword: String, span: Span },
    #[error("undefined variable '{name}' at code generation time")]
    UndefinedAtLowering { name: String, span: Span },

    // -- Runtime -------------------------------------------------------
    #[error("undefined variable '{name}'")]
    RuntimeUndefinedVariable { name: String },
    #[error("undefined label '{label}'")]
    UndefinedLabel { label: String },
    #[error("aggregate {id} does not exist")]
    AggregateNotFound { id: u64 },
    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("cannot overwrite tuple slot {index}; tuples are immutable")]
    TupleOverwrite { index: i64 },
    #[error("malformed instruction operand '{operand}'")]
    MalformedOperand { operand: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("call stack underflow")]
    CallStackUnderflow,
    #[error("io error: {0}")]
    Io(String),
}

impl CorvidError {
    pub fn span(&self) -> Option<Span> {
        match self {
            CorvidError::UnexpectedToken { span, .. }
            | CorvidError::UnexpectedEof { span, .. }
            | CorvidError::UndefinedName { span, .. }
            | CorvidError::DuplicateDefinition { span, .. }
            | CorvidError::TypeMismatch { span, .. }
            | CorvidError::ArityMismatch { span, .. }
            | CorvidError::TupleIndexOutOfRange { span, .. }
            | CorvidError::NonConstantTupleIndex { span }
            | CorvidError::NonBoolCondition { span, .. }
            | CorvidError::TupleElementAssignment { span }
            | CorvidError::EmptyListLiteral { span }
            | CorvidError::NotAFunction { span, .. }
            | CorvidError::ReturnOutsideFunction { span }
            | CorvidError::NotIndexable { span, .. }
            | CorvidError::LoopControlOutsideLoop { span, .. }
            | CorvidError::UndefinedAtLowering { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Renders this error, plus the original source text, as a `Diagnostic`.
    /// The single bridge from a typed error to the human-facing rendering
    /// layer; the CLI is the only caller that needs it, but it is public so
    /// library embedders can build their own error UI.
    pub fn to_diagnostic(&self, source: &str) -> Diagnostic {
        let message = self.to_string();
        let mut diag = Diagnostic::new(message).with_source(source);
        if let Some(span) = self.span() {
            diag = diag.with_label(Label::primary(span, "here"));
        }
        diag
    }
}
