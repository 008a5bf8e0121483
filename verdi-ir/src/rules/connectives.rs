//! Rules over the logical connectives: negation, absorption, flattening,
//! distribution and canonical ordering.
//!
//! The connectives are shared between the type algebra and the formula
//! algebra. `Void`/`Any` and `false`/`true` play interchangeable roles as
//! the bounds of the two lattices; consumers of normal forms accept either
//! spelling of the bounds.

use crate::graph::TermGraph;
use crate::rewrite::Rule;
use crate::term::{Term, TermData, TermKind};
use smallvec::SmallVec;

fn resolved_children(graph: &TermGraph, t: Term) -> SmallVec<[Term; 4]> {
    graph.children(t).iter().map(|&c| graph.resolve(c)).collect()
}

/// Is `t` the boolean constant `b`?
fn is_bool(graph: &TermGraph, t: Term, b: bool) -> bool {
    graph.kind(t) == TermKind::BoolVal && graph.data(t).bool_val() == Some(b)
}

/// The top of the lattice `t` lives in: `true` for formulas, `Any` for
/// types. Either bound is accepted by consumers, so this only needs to be
/// a best effort.
fn top_for(graph: &mut TermGraph, sample: Term) -> Term {
    if graph.kind(sample).is_predicate() {
        graph.bool_val(true)
    } else {
        graph.leaf(TermKind::Any)
    }
}

/// The bottom of the lattice `t` lives in.
fn bottom_for(graph: &mut TermGraph, sample: Term) -> Term {
    if graph.kind(sample).is_predicate() {
        graph.bool_val(false)
    } else {
        graph.leaf(TermKind::Void)
    }
}

/// Negation: double negation, bound complements, and De Morgan.
pub struct Complement;

impl Rule for Complement {
    fn name(&self) -> &'static str {
        "complement"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        if graph.kind(term) != TermKind::Not {
            return None;
        }
        let inner = graph.resolve(graph.children(term)[0]);
        match graph.kind(inner) {
            TermKind::Not => Some(graph.resolve(graph.children(inner)[0])),
            TermKind::Any => Some(graph.leaf(TermKind::Void)),
            TermKind::Void => Some(graph.leaf(TermKind::Any)),
            TermKind::BoolVal => {
                let b = graph.data(inner).bool_val()?;
                Some(graph.bool_val(!b))
            }
            TermKind::Union => {
                let negated: Vec<Term> = resolved_children(graph, inner)
                    .into_iter()
                    .map(|c| graph.not(c))
                    .collect();
                Some(graph.node(TermKind::Intersect, negated))
            }
            TermKind::Intersect => {
                let negated: Vec<Term> = resolved_children(graph, inner)
                    .into_iter()
                    .map(|c| graph.not(c))
                    .collect();
                Some(graph.node(TermKind::Union, negated))
            }
            _ => None,
        }
    }
}

/// Union absorption: identity and absorbing elements, flattening, the
/// contractive self-cycle, and the excluded-middle tautology.
pub struct UnionAbsorb;

impl Rule for UnionAbsorb {
    fn name(&self) -> &'static str {
        "union-absorb"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        if graph.kind(term) != TermKind::Union {
            return None;
        }
        let kids = resolved_children(graph, term);
        let mut out: Vec<Term> = Vec::with_capacity(kids.len());
        let mut changed = false;
        let mut dropped_bool = false;
        for c in kids {
            // A recursive binding `X = T | X` contracts to `T`. This must
            // come before flattening: the self-reference has kind `Union`
            // too.
            if c == term {
                changed = true;
                continue;
            }
            match graph.kind(c) {
                TermKind::Void => changed = true,
                TermKind::BoolVal if is_bool(graph, c, false) => {
                    changed = true;
                    dropped_bool = true;
                }
                TermKind::BoolVal => return Some(graph.bool_val(true)),
                TermKind::Any => return Some(graph.leaf(TermKind::Any)),
                TermKind::Union => {
                    changed = true;
                    out.extend(resolved_children(graph, c));
                }
                _ => out.push(c),
            }
        }
        // Excluded middle: `T | !T` covers everything.
        for &c in &out {
            if graph.kind(c) == TermKind::Not {
                let inner = graph.resolve(graph.children(c)[0]);
                if out.contains(&inner) {
                    return Some(top_for(graph, inner));
                }
            }
        }
        if !changed {
            return None;
        }
        match out.len() {
            0 => Some(if dropped_bool {
                graph.bool_val(false)
            } else {
                graph.leaf(TermKind::Void)
            }),
            1 => Some(out[0]),
            _ => Some(graph.node(TermKind::Union, out)),
        }
    }
}

/// Intersection absorption: the dual of [`UnionAbsorb`], plus the
/// contradiction rule `T & !T`.
pub struct IntersectAbsorb;

impl Rule for IntersectAbsorb {
    fn name(&self) -> &'static str {
        "intersect-absorb"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        if graph.kind(term) != TermKind::Intersect {
            return None;
        }
        let kids = resolved_children(graph, term);
        let mut out: Vec<Term> = Vec::with_capacity(kids.len());
        let mut changed = false;
        let mut dropped_bool = false;
        for c in kids {
            // A recursive binding `X = T & X` is uninhabited. Checked
            // before flattening: the self-reference has kind `Intersect`
            // too.
            if c == term {
                return Some(graph.leaf(TermKind::Void));
            }
            match graph.kind(c) {
                TermKind::Any => changed = true,
                TermKind::BoolVal if is_bool(graph, c, true) => {
                    changed = true;
                    dropped_bool = true;
                }
                TermKind::BoolVal => return Some(graph.bool_val(false)),
                TermKind::Void => return Some(graph.leaf(TermKind::Void)),
                TermKind::Intersect => {
                    changed = true;
                    out.extend(resolved_children(graph, c));
                }
                _ => out.push(c),
            }
        }
        // Contradiction: `T & !T` is empty.
        for &c in &out {
            if graph.kind(c) == TermKind::Not {
                let inner = graph.resolve(graph.children(c)[0]);
                if out.contains(&inner) {
                    return Some(bottom_for(graph, inner));
                }
            }
        }
        if !changed {
            return None;
        }
        match out.len() {
            0 => Some(if dropped_bool {
                graph.bool_val(true)
            } else {
                graph.leaf(TermKind::Any)
            }),
            1 => Some(out[0]),
            _ => Some(graph.node(TermKind::Intersect, out)),
        }
    }
}

/// Distribution of intersection over union, pushing the term toward
/// disjunctive normal form.
pub struct Distribute;

impl Rule for Distribute {
    fn name(&self) -> &'static str {
        "distribute"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        if graph.kind(term) != TermKind::Intersect {
            return None;
        }
        let kids = resolved_children(graph, term);
        if kids.contains(&term) {
            // Contractive cycles belong to the absorption rules.
            return None;
        }
        let union_at = kids
            .iter()
            .position(|&c| graph.kind(c) == TermKind::Union)?;
        let arms = resolved_children(graph, kids[union_at]);
        let rest: Vec<Term> = kids
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != union_at)
            .map(|(_, &c)| c)
            .collect();
        let mut out = Vec::with_capacity(arms.len());
        for arm in arms {
            let mut conj = Vec::with_capacity(rest.len() + 1);
            conj.push(arm);
            conj.extend_from_slice(&rest);
            out.push(graph.node(TermKind::Intersect, conj));
        }
        Some(graph.node(TermKind::Union, out))
    }
}

/// Canonical ordering: sort the children of order-insensitive kinds by
/// index, deduplicate where the kind is set-like, and mark the result
/// deterministic so it participates in hash-consing.
pub struct Canonicalize;

impl Rule for Canonicalize {
    fn name(&self) -> &'static str {
        "canonicalize"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        let data = graph.data(term).clone();
        if !data.kind.is_unordered() {
            return None;
        }
        let mut kids: Vec<Term> = data.children.iter().map(|&c| graph.resolve(c)).collect();
        if kids.contains(&term) {
            // Contractive cycles belong to the absorption rules.
            return None;
        }
        kids.sort();
        if data.kind != TermKind::Bag {
            kids.dedup();
        }
        let already = data.deterministic
            && kids.len() == data.children.len()
            && kids.iter().zip(data.children.iter()).all(|(a, b)| a == b);
        if already {
            return None;
        }
        if kids.len() == 1 && data.kind != TermKind::Bag && data.kind != TermKind::SetVal {
            return Some(kids[0]);
        }
        Some(graph.add(TermData {
            kind: data.kind,
            children: kids.into_iter().collect(),
            payload: data.payload,
            deterministic: true,
        }))
    }
}
