//! Verdi term graph and rewriting library.
//!
//! This crate provides the shared substrate of the Verdi extended static
//! checker: a flat, hash-consed graph of terms (`TermGraph`), the closed
//! algebra of term kinds used for both semantic types and verification
//! condition formulas (`TermKind`), and a rewrite engine (`Rewriter`) that
//! reduces terms to a canonical normal form under the rule set in [`rules`].
//!
//! Terms are referenced by dense `u32` indices rather than Rust references:
//! this keeps the in-memory representation compact, permits the cycles
//! required by recursive types, and makes structural equality of canonical
//! terms a single index comparison.

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

#[macro_use]
mod entities;

mod graph;
mod rational;
mod rewrite;
mod term;

pub mod poly;
pub mod rules;

pub use crate::graph::{CompactResult, TermGraph};
pub use crate::rational::Rational;
pub use crate::rewrite::{RewriteLimits, RewriteOutcome, Rewriter, Rule};
pub use crate::term::{Payload, Term, TermData, TermKind};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
