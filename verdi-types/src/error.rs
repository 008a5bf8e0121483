//! Errors surfaced by the type engine.

use crate::env::DeclKind;
use thiserror::Error;

/// A name could not be resolved to a declaration of the right kind.
///
/// Resolution errors are never swallowed: they propagate out of
/// `is_void`/`is_subtype` to the caller, which reports them at the span
/// that mentioned the name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The name is not bound at all.
    #[error("unknown name `{name}`")]
    Unknown {
        /// The unresolved qualified name.
        name: String,
    },

    /// The name is bound, but to a different kind of declaration.
    #[error("`{name}` resolves to a {found}, expected a {expected}")]
    WrongKind {
        /// The qualified name.
        name: String,
        /// What the caller asked for.
        expected: DeclKind,
        /// What the namespace actually holds.
        found: DeclKind,
    },
}
