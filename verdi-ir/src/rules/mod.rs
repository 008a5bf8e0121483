//! The normal-form rule set.
//!
//! These rules reduce any type term to disjunctive normal form over
//! literals (a union of intersections of positive or negative atomic
//! constructors) and canonicalize the arithmetic, set, list, record and
//! tuple constructions of the verification-condition algebra. The same
//! connective rules serve both the type algebra (with `Void`/`Any` as the
//! bounds) and the formula algebra (with `false`/`true`).
//!
//! Every rule strictly decreases the lexicographic measure (number of
//! `Not` nodes, non-canonical `Union`/`Intersect` nestings, term size), so
//! the engine's fixpoint loop terminates; the set is confluent on the
//! intended normal form, which the property tests check against permuted
//! rule orders.

mod aggregate;
mod arith;
mod connectives;
mod construct;

use crate::graph::TermGraph;
use crate::rewrite::{Rewriter, Rule};
use crate::term::{Term, TermKind};

pub use self::aggregate::AggregateFold;
pub use self::arith::{ArithNormalize, CompareFold};
pub use self::connectives::{
    Canonicalize, Complement, Distribute, IntersectAbsorb, UnionAbsorb,
};
pub use self::construct::{
    DifferenceElim, DisjointConstructor, NegativeLiteralPrune, SameConstructor,
};

/// The full normal-form rule set, in the default order.
pub fn normal_form_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(Complement),
        Box::new(UnionAbsorb),
        Box::new(IntersectAbsorb),
        Box::new(DifferenceElim),
        Box::new(SameConstructor),
        Box::new(DisjointConstructor),
        Box::new(NegativeLiteralPrune),
        Box::new(Distribute),
        Box::new(ArithNormalize),
        Box::new(CompareFold),
        Box::new(AggregateFold),
        Box::new(Canonicalize),
    ]
}

/// A rewriter loaded with [`normal_form_rules`].
pub fn normal_form_rewriter() -> Rewriter {
    Rewriter::new(normal_form_rules())
}

/// Is `t` a ground value: a value leaf, or an aggregate value all of whose
/// elements are ground? Ground values are hash-consed, so two ground terms
/// are equal exactly when they share an index.
pub(crate) fn is_ground(graph: &TermGraph, t: Term) -> bool {
    let t = graph.resolve(t);
    match graph.kind(t) {
        TermKind::NumVal | TermKind::StrVal | TermKind::BoolVal | TermKind::NullVal => true,
        TermKind::ListVal | TermKind::SetVal | TermKind::RecordVal | TermKind::TupleVal => graph
            .children(t)
            .to_vec()
            .into_iter()
            .all(|c| is_ground(graph, c)),
        _ => false,
    }
}
