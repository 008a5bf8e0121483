//! Arithmetic canonicalization and comparison folding.
//!
//! `Sum`/`Mul`/`Div` terms are re-emitted in canonical polynomial
//! sum-of-products form. `Equals` and `LessThan` over arithmetic terms are
//! normalized to compare zero against the canonical difference of their
//! sides, so that semantically equal atoms become one interned term; when
//! the difference is a constant the comparison folds to a boolean.

use crate::graph::TermGraph;
use crate::poly;
use crate::rational::Rational;
use crate::rewrite::Rule;
use crate::rules::is_ground;
use crate::term::{Term, TermKind};

/// Re-emit `Sum`/`Mul`/`Div` in canonical polynomial form.
pub struct ArithNormalize;

impl Rule for ArithNormalize {
    fn name(&self) -> &'static str {
        "arith-normalize"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        if !matches!(
            graph.kind(term),
            TermKind::Sum | TermKind::Mul | TermKind::Div
        ) {
            return None;
        }
        let p = poly::from_term(graph, term)?;
        let emitted = poly::to_term(graph, &p);
        if emitted == term {
            None
        } else {
            Some(emitted)
        }
    }
}

/// Is this term in the fragment the polynomial engine understands? Only
/// such operands are normalized through the difference representation;
/// anything else (strings, aggregates) is compared structurally.
fn arithmetic_operand(graph: &TermGraph, t: Term) -> bool {
    matches!(
        graph.kind(t),
        TermKind::NumVal
            | TermKind::Sum
            | TermKind::Mul
            | TermKind::Div
            | TermKind::Var
            | TermKind::FieldOf
            | TermKind::IndexOf
            | TermKind::LengthOf
            | TermKind::TupleLoad
    )
}

/// Fold and canonicalize `Equals` and `LessThan`.
pub struct CompareFold;

impl Rule for CompareFold {
    fn name(&self) -> &'static str {
        "compare-fold"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        let kind = graph.kind(term);
        if !matches!(kind, TermKind::Equals | TermKind::LessThan) {
            return None;
        }
        let kids = graph.children(term).to_vec();
        let a = graph.resolve(kids[0]);
        let b = graph.resolve(kids[1]);
        if a == b {
            // Reflexive: equal terms are equal, and never strictly less.
            return Some(graph.bool_val(kind == TermKind::Equals));
        }
        if kind == TermKind::Equals && is_ground(graph, a) && is_ground(graph, b) {
            // Ground values are hash-consed, so distinct indices mean
            // distinct values.
            return Some(graph.bool_val(false));
        }
        if !arithmetic_operand(graph, a) || !arithmetic_operand(graph, b) {
            // Symmetric operator: order the children canonically.
            if kind == TermKind::Equals && a > b {
                return Some(graph.node(TermKind::Equals, [b, a]));
            }
            return None;
        }
        let diff = poly::sub_terms(graph, b, a)?;
        if let Some(c) = diff.as_constant() {
            return Some(match kind {
                TermKind::Equals => graph.bool_val(c.is_zero()),
                _ => graph.bool_val(!c.is_negative() && !c.is_zero()),
            });
        }
        // Canonical form: compare zero against the difference. For
        // equality the overall sign is irrelevant, so pick the one whose
        // leading coefficient is positive.
        let diff = if kind == TermKind::Equals && diff.monos[0].coeff.is_negative() {
            diff.checked_neg()?
        } else {
            diff
        };
        let zero = graph.num(Rational::ZERO);
        let rhs = poly::to_term(graph, &diff);
        let canonical = graph.node(kind, [zero, rhs]);
        if canonical == term {
            None
        } else {
            Some(canonical)
        }
    }
}
