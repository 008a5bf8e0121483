//! Structured verification diagnostics.

use core::fmt;
#[cfg(feature = "enable-serde")]
use serde_derive::{Deserialize, Serialize};

/// A byte range in a source file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct SourceSpan {
    /// Start offset, inclusive.
    pub start: u32,
    /// End offset, exclusive.
    pub end: u32,
}

impl SourceSpan {
    /// Create a span from offsets.
    pub fn new(start: u32, end: u32) -> Self {
        SourceSpan { start, end }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// The kinds of diagnostic the verifier reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum DiagnosticKind {
    /// An assertion (or implicit safety condition) could not be proved.
    UnverifiedAssertion,
    /// A name used by the procedure could not be resolved.
    ResolutionError,
    /// An engine invariant was violated; a compiler bug, not a user
    /// error.
    InternalFailure,
    /// A resource budget ran out, or a bytecode has no specified
    /// transformation; treated like an unverified assertion but tagged
    /// distinctly.
    Indeterminate,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiagnosticKind::UnverifiedAssertion => write!(f, "unverified assertion"),
            DiagnosticKind::ResolutionError => write!(f, "resolution error"),
            DiagnosticKind::InternalFailure => write!(f, "internal failure"),
            DiagnosticKind::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// One diagnostic: kind, message, and the source position copied from the
/// offending bytecode's attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    /// The kind.
    pub kind: DiagnosticKind,
    /// Human-readable message.
    pub message: String,
    /// The source file.
    pub filename: String,
    /// The source span.
    pub span: SourceSpan,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, filename: &str, span: SourceSpan) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            filename: filename.to_string(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.filename, self.span, self.kind, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendering() {
        let d = Diagnostic::new(
            DiagnosticKind::UnverifiedAssertion,
            "possible division by zero",
            "main.vd",
            SourceSpan::new(10, 15),
        );
        assert_eq!(
            d.to_string(),
            "main.vd:10..15: unverified assertion: possible division by zero"
        );
    }
}
