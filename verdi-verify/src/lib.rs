//! Branching bytecode verifier.
//!
//! This crate turns a procedure's bytecode into verification conditions
//! and discharges them with the `verdi-types` emptiness engine. The
//! verifier walks the bytecode symbolically — one [`Branch`] per control
//! path, forked at conditionals, joined at merge points — and at every
//! assertion point (explicit assertions, implicit safety conditions, and
//! postconditions at returns) asks whether the path constraint together
//! with the negated condition is unsatisfiable. Failures become
//! structured [`Diagnostic`]s carrying the offending bytecode's source
//! span; verification always continues past a failure so that one
//! unverified assertion does not mask the next.

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

mod branch;
mod bytecode;
mod diagnostic;
mod verifier;

pub mod translate;

pub use crate::branch::Branch;
pub use crate::bytecode::{
    BinOp, Bytecode, Cmp, CodeBlock, CodeReader, ConstValue, Label, LvalElem, MethodCase,
    Namespace, Param, Reg, SetOp, UnOp,
};
pub use crate::diagnostic::{Diagnostic, DiagnosticKind, SourceSpan};
pub use crate::verifier::{verify, VerifyError};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
