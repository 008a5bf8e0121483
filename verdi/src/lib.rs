//! Umbrella crate for the Verdi extended-static-checking core.
//!
//! The toolchain's two engines live in separate crates and are re-exported
//! here for convenience:
//!
//! - [`ir`]: the hash-consed term graph, the rewrite engine, and the
//!   normal-form rule set shared by types and verification conditions;
//! - [`types`]: the semantic subtype and emptiness engine plus the type
//!   extractors;
//! - [`verify`]: the branching bytecode verifier producing structured
//!   diagnostics.
//!
//! A subtype query end to end:
//!
//! ```
//! use verdi::types::{is_subtype, Answer, TrivialLifetimes, TypeEnv, TypeExpr};
//! use verdi::types::testutil::MapResolver;
//! use verdi::ir::TermGraph;
//!
//! let resolver = MapResolver::new();
//! let env = TypeEnv::new(&resolver, &TrivialLifetimes);
//! let mut graph = TermGraph::new();
//! let a = TypeExpr::Int.lower(&mut graph);
//! let b = TypeExpr::Int.or(TypeExpr::Null).lower(&mut graph);
//! assert_eq!(is_subtype(&mut graph, a, b, &env).unwrap(), Answer::Yes);
//! ```

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]

pub use verdi_ir as ir;
pub use verdi_types as types;
pub use verdi_verify as verify;
