//! Semantic subtype and emptiness engine.
//!
//! Types in Verdi denote sets of values, and subtyping is set inclusion:
//! `A` is a subtype of `B` exactly when no value inhabits `A & !B`. This
//! crate decides emptiness (`is_void`) and subtyping (`is_subtype`) over
//! the full type algebra of `verdi-ir` — unions, intersections,
//! differences, negations, recursive nominal types, arrays, records with
//! open/closed discipline, and references with lifetimes — and provides
//! the type extractors used by expression checking (`filter`).
//!
//! The engine is a sound semi-decision procedure: a `Yes` answer is a
//! proof, a `No` answer means "not proved", and budget exhaustion surfaces
//! as `Indeterminate` rather than a wrong answer. Collaborators (the name
//! resolver for nominal unfolding and the lifetime partial order) are
//! threaded through an explicit [`TypeEnv`] rather than global state.

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

mod contractive;
mod env;
mod error;
mod expr;
mod filter;
mod subtype;

pub mod testutil;

pub use crate::contractive::is_contractive;
pub use crate::env::{Budgets, DeclKind, LifetimeRelation, NameResolver, TrivialLifetimes, TypeEnv};
pub use crate::error::ResolutionError;
pub use crate::expr::TypeExpr;
pub use crate::filter::{filter, Filtered, Shape};
pub use crate::subtype::{is_subtype, is_unsatisfiable, is_void, Answer, AtomState, Polarity, Sign};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
