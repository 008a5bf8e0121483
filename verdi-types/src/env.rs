//! The environment threaded through every public call: name resolution,
//! the lifetime partial order, and resource budgets.

use crate::error::ResolutionError;
use core::fmt;
use verdi_ir::{Term, TermGraph};

/// The kinds of declaration a namespace can hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    /// A named type declaration.
    Type,
    /// A method declaration with cases.
    Method,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeclKind::Type => write!(f, "type"),
            DeclKind::Method => write!(f, "method"),
        }
    }
}

/// Resolves nominal type names to their declared bodies.
///
/// The resolver materializes the declared body into the querying task's
/// term graph; graphs are per-task, so implementations must be usable from
/// several tasks at once (`Sync`) but need no interior mutability.
pub trait NameResolver: Sync {
    /// Resolve `name` to its declared type, built into `graph`.
    fn resolve_type(
        &self,
        name: &str,
        graph: &mut TermGraph,
    ) -> Result<Term, ResolutionError>;
}

/// The partial order on lifetime identifiers consulted by reference
/// subtyping. `outlives(a, b)` holds when a reference alive for `a` is
/// alive for all of `b`.
pub trait LifetimeRelation: Sync {
    /// Does lifetime `a` outlive lifetime `b`?
    fn outlives(&self, a: &str, b: &str) -> bool;
}

/// The degenerate lifetime relation: `*` (the static lifetime) outlives
/// everything, and every lifetime outlives itself.
pub struct TrivialLifetimes;

impl LifetimeRelation for TrivialLifetimes {
    fn outlives(&self, a: &str, b: &str) -> bool {
        a == "*" || a == b
    }
}

/// Resource budgets. Exhaustion never produces a wrong answer: the
/// affected query reports [`Answer::Indeterminate`](crate::Answer).
#[derive(Copy, Clone, Debug)]
pub struct Budgets {
    /// Maximum rewrite applications per normalization run.
    pub rewrite_steps: usize,
    /// Maximum nominal unfolding depth per emptiness query.
    pub unfold_depth: usize,
}

impl Default for Budgets {
    fn default() -> Self {
        Budgets {
            rewrite_steps: 10_000,
            unfold_depth: 64,
        }
    }
}

/// Everything a subtype or emptiness query needs beyond the graph itself.
pub struct TypeEnv<'a> {
    /// The namespace for nominal unfolding.
    pub resolver: &'a dyn NameResolver,
    /// The lifetime partial order.
    pub lifetimes: &'a dyn LifetimeRelation,
    /// Resource budgets.
    pub budgets: Budgets,
}

impl<'a> TypeEnv<'a> {
    /// Create an environment with default budgets.
    pub fn new(resolver: &'a dyn NameResolver, lifetimes: &'a dyn LifetimeRelation) -> Self {
        TypeEnv {
            resolver,
            lifetimes,
            budgets: Budgets::default(),
        }
    }

    /// Replace the budgets.
    pub fn with_budgets(mut self, budgets: Budgets) -> Self {
        self.budgets = budgets;
        self
    }
}
