//! Rules over structural type constructors: conjunction of same-shaped
//! constructors, disjointness of different shapes, and elimination of the
//! difference connective.

use crate::graph::TermGraph;
use crate::rewrite::Rule;
use crate::term::{Term, TermKind};

fn resolved_children(graph: &TermGraph, t: Term) -> Vec<Term> {
    graph.children(t).iter().map(|&c| graph.resolve(c)).collect()
}

fn record_fields(graph: &TermGraph, t: Term) -> Option<(Vec<String>, Vec<Term>, bool)> {
    let data = graph.data(t);
    let (names, open) = data.fields()?;
    let names = names.to_vec();
    let children = data.children.iter().map(|&c| graph.resolve(c)).collect();
    Some((names, children, open))
}

/// Combine two record types appearing in one intersection, honouring the
/// open/closed discipline. Returns the replacement term.
fn combine_records(graph: &mut TermGraph, a: Term, b: Term) -> Term {
    let (an, ac, ao) = match record_fields(graph, a) {
        Some(f) => f,
        None => return graph.leaf(TermKind::Void),
    };
    let (bn, bc, bo) = match record_fields(graph, b) {
        Some(f) => f,
        None => return graph.leaf(TermKind::Void),
    };
    let field = |names: &[String], children: &[Term], n: &str| -> Option<Term> {
        names.iter().position(|x| x == n).map(|i| children[i])
    };
    match (ao, bo) {
        (false, false) => {
            // Closed records must agree on their field sets exactly.
            if an != bn {
                return graph.leaf(TermKind::Void);
            }
            let fields = an
                .iter()
                .zip(ac.iter().zip(bc.iter()))
                .map(|(n, (&x, &y))| (n.clone(), graph.intersect2(x, y)))
                .collect::<Vec<_>>();
            graph.record(TermKind::Record, fields, false)
        }
        (false, true) | (true, false) => {
            // One side closed: the open side's required fields must all be
            // present in the closed side.
            let (cn, cc, on, oc) = if ao { (bn, bc, an, ac) } else { (an, ac, bn, bc) };
            if on.iter().any(|n| !cn.contains(n)) {
                return graph.leaf(TermKind::Void);
            }
            let fields = cn
                .iter()
                .zip(cc.iter())
                .map(|(n, &x)| {
                    let ty = match field(&on, &oc, n) {
                        Some(y) => graph.intersect2(x, y),
                        None => x,
                    };
                    (n.clone(), ty)
                })
                .collect::<Vec<_>>();
            graph.record(TermKind::Record, fields, false)
        }
        (true, true) => {
            // Both open: union of the required fields, shared ones
            // intersected.
            let mut fields: Vec<(String, Term)> = Vec::new();
            for (n, &x) in an.iter().zip(ac.iter()) {
                let ty = match field(&bn, &bc, n) {
                    Some(y) => graph.intersect2(x, y),
                    None => x,
                };
                fields.push((n.clone(), ty));
            }
            for (n, &y) in bn.iter().zip(bc.iter()) {
                if !an.contains(n) {
                    fields.push((n.clone(), y));
                }
            }
            graph.record(TermKind::Record, fields, true)
        }
    }
}

/// Conjunction of two constructors of the same shape inside an
/// intersection: `[T1] & [T2]` becomes `[T1 & T2]`, `!{T1} & !{T2}`
/// becomes `!{T1 | T2}`, tuples combine component-wise, records combine by
/// field, and the numeric tower collapses `int & real` to `int`.
pub struct SameConstructor;

impl SameConstructor {
    fn combine(graph: &mut TermGraph, a: Term, b: Term) -> Option<Term> {
        use TermKind::*;
        let (ka, kb) = (graph.kind(a), graph.kind(b));
        match (ka, kb) {
            (Array, Array) | (Set, Set) | (List, List) => {
                let ea = graph.resolve(graph.children(a)[0]);
                let eb = graph.resolve(graph.children(b)[0]);
                let e = graph.intersect2(ea, eb);
                Some(graph.node(ka, [e]))
            }
            (Tuple, Tuple) => {
                let ca = resolved_children(graph, a);
                let cb = resolved_children(graph, b);
                if ca.len() != cb.len() {
                    return Some(graph.leaf(Void));
                }
                let elems: Vec<Term> = ca
                    .iter()
                    .zip(cb.iter())
                    .map(|(&x, &y)| graph.intersect2(x, y))
                    .collect();
                Some(graph.node(Tuple, elems))
            }
            (Record, Record) => Some(combine_records(graph, a, b)),
            (Int, Real) => Some(graph.leaf(Int)),
            (Real, Int) => Some(graph.leaf(Int)),
            (Not, Not) => {
                let ia = graph.resolve(graph.children(a)[0]);
                let ib = graph.resolve(graph.children(b)[0]);
                let (kia, kib) = (graph.kind(ia), graph.kind(ib));
                if kia != kib || !matches!(kia, Array | Set | List) {
                    return None;
                }
                let ea = graph.resolve(graph.children(ia)[0]);
                let eb = graph.resolve(graph.children(ib)[0]);
                let e = graph.union2(ea, eb);
                let inner = graph.node(kia, [e]);
                Some(graph.not(inner))
            }
            _ => None,
        }
    }
}

impl Rule for SameConstructor {
    fn name(&self) -> &'static str {
        "same-constructor"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        if graph.kind(term) != TermKind::Intersect {
            return None;
        }
        let kids = resolved_children(graph, term);
        for i in 0..kids.len() {
            for j in (i + 1)..kids.len() {
                if kids[i] == kids[j] {
                    continue;
                }
                if let Some(combined) = Self::combine(graph, kids[i], kids[j]) {
                    let mut out: Vec<Term> = Vec::with_capacity(kids.len() - 1);
                    out.push(combined);
                    for (k, &c) in kids.iter().enumerate() {
                        if k != i && k != j {
                            out.push(c);
                        }
                    }
                    return Some(if out.len() == 1 {
                        out[0]
                    } else {
                        graph.node(TermKind::Intersect, out)
                    });
                }
            }
        }
        None
    }
}

/// The structural tag of a type kind, used for disjointness: two positive
/// types with different tags have no value in common. The numeric leaves
/// share a tag (`int` is included in `real`), and `Any`/`Void` never get
/// one (the absorption rules own those).
fn structural_tag(kind: TermKind) -> Option<u32> {
    use TermKind::*;
    let tag = match kind {
        Null => 0,
        Bool => 1,
        Int | Real => 2,
        Str => 3,
        Array => 4,
        Set => 5,
        List => 6,
        Record => 7,
        Tuple => 8,
        Ref => 9,
        Func => 10,
        Method => 11,
        Property => 12,
        _ => return None,
    };
    Some(tag)
}

/// Conjunction of two constructors of different shapes is uninhabited:
/// `[T] & {U}` is `void`, and likewise for every pair of distinct
/// structural kinds.
pub struct DisjointConstructor;

impl Rule for DisjointConstructor {
    fn name(&self) -> &'static str {
        "disjoint-constructor"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        if graph.kind(term) != TermKind::Intersect {
            return None;
        }
        let kids = resolved_children(graph, term);
        for i in 0..kids.len() {
            let ti = match structural_tag(graph.kind(kids[i])) {
                Some(t) => t,
                None => continue,
            };
            for &other in &kids[i + 1..] {
                if let Some(tj) = structural_tag(graph.kind(other)) {
                    if ti != tj {
                        return Some(graph.leaf(TermKind::Void));
                    }
                }
            }
        }
        None
    }
}

/// Prune redundant negative literals in an intersection: a positive
/// constructor is already disjoint from every other shape, so `int & !null`
/// is just `int`. Dually, a negative literal that covers a positive one
/// empties the intersection: `int & !real` is `void`.
pub struct NegativeLiteralPrune;

impl Rule for NegativeLiteralPrune {
    fn name(&self) -> &'static str {
        "negative-literal-prune"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        if graph.kind(term) != TermKind::Intersect {
            return None;
        }
        let kids = resolved_children(graph, term);
        let positives: Vec<(u32, TermKind)> = kids
            .iter()
            .filter_map(|&c| structural_tag(graph.kind(c)).map(|t| (t, graph.kind(c))))
            .collect();
        if positives.is_empty() {
            return None;
        }
        let mut out: Vec<Term> = Vec::with_capacity(kids.len());
        let mut changed = false;
        for &c in &kids {
            if graph.kind(c) == TermKind::Not {
                let inner = graph.resolve(graph.children(c)[0]);
                if let Some(ti) = structural_tag(graph.kind(inner)) {
                    // `int & !real` has no inhabitants.
                    if graph.kind(inner) == TermKind::Real
                        && positives.iter().any(|&(_, k)| k == TermKind::Int)
                    {
                        return Some(graph.leaf(TermKind::Void));
                    }
                    if positives.iter().all(|&(tp, _)| tp != ti) {
                        changed = true;
                        continue;
                    }
                }
            }
            out.push(c);
        }
        if !changed {
            return None;
        }
        Some(match out.len() {
            0 => graph.leaf(TermKind::Any),
            1 => out[0],
            _ => graph.node(TermKind::Intersect, out),
        })
    }
}

/// Difference elimination: `A \ B` is `A & !B` for types. Ground set
/// values subtract directly.
pub struct DifferenceElim;

impl Rule for DifferenceElim {
    fn name(&self) -> &'static str {
        "difference-elim"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        if graph.kind(term) != TermKind::Difference {
            return None;
        }
        let kids = resolved_children(graph, term);
        if kids.len() != 2 {
            return None;
        }
        let (a, b) = (kids[0], kids[1]);
        if graph.kind(a) == TermKind::SetVal
            && graph.kind(b) == TermKind::SetVal
            && super::is_ground(graph, a)
            && super::is_ground(graph, b)
        {
            let bs = resolved_children(graph, b);
            let elems: Vec<Term> = resolved_children(graph, a)
                .into_iter()
                .filter(|e| !bs.contains(e))
                .collect();
            return Some(graph.node(TermKind::SetVal, elems));
        }
        let type_like = |g: &TermGraph, t: Term| {
            let k = g.kind(t);
            k.is_type() || k.is_connective()
        };
        if type_like(graph, a) && type_like(graph, b) {
            let nb = graph.not(b);
            return Some(graph.intersect2(a, nb));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::RewriteLimits;
    use crate::rules::normal_form_rewriter;

    fn normalize(graph: &mut TermGraph, t: Term) -> Term {
        let engine = normal_form_rewriter();
        assert!(engine.run(graph, RewriteLimits::default()).converged());
        graph.resolve(t)
    }

    #[test]
    fn array_conjunction_combines_elements() {
        let mut g = TermGraph::new();
        let int = g.leaf(TermKind::Int);
        let bool_ = g.leaf(TermKind::Bool);
        let conj = {
            let a1 = g.array(int);
            let a2 = g.array(bool_);
            g.intersect2(a1, a2)
        };
        // [int] & [bool] -> [int & bool] -> [void]
        let norm = normalize(&mut g, conj);
        assert_eq!(g.kind(norm), TermKind::Array);
        assert_eq!(g.kind(g.resolve(g.children(norm)[0])), TermKind::Void);
    }

    #[test]
    fn disjoint_constructors_collapse() {
        let mut g = TermGraph::new();
        let int = g.leaf(TermKind::Int);
        let conj = {
            let arr = g.array(int);
            let set = g.node(TermKind::Set, [int]);
            g.intersect2(arr, set)
        };
        let __n13 = normalize(&mut g, conj);
        assert_eq!(g.kind(__n13), TermKind::Void);
        let prim = {
            let b = g.leaf(TermKind::Bool);
            g.intersect2(int, b)
        };
        let __n14 = normalize(&mut g, prim);
        assert_eq!(g.kind(__n14), TermKind::Void);
    }

    #[test]
    fn numeric_tower_is_not_disjoint() {
        let mut g = TermGraph::new();
        let conj = {
            let int = g.leaf(TermKind::Int);
            let real = g.leaf(TermKind::Real);
            g.intersect2(int, real)
        };
        let __n15 = normalize(&mut g, conj);
        assert_eq!(g.kind(__n15), TermKind::Int);
    }

    #[test]
    fn closed_records_require_equal_fields() {
        let mut g = TermGraph::new();
        let int = g.leaf(TermKind::Int);
        let r1 = g.record(TermKind::Record, vec![("f".to_string(), int)], false);
        let r2 = g.record(TermKind::Record, vec![("g".to_string(), int)], false);
        let conj = g.intersect2(r1, r2);
        let __n16 = normalize(&mut g, conj);
        assert_eq!(g.kind(__n16), TermKind::Void);
    }

    #[test]
    fn open_records_merge_fields() {
        let mut g = TermGraph::new();
        let int = g.leaf(TermKind::Int);
        let b = g.leaf(TermKind::Bool);
        let r1 = g.record(TermKind::Record, vec![("f".to_string(), int)], true);
        let r2 = g.record(TermKind::Record, vec![("g".to_string(), b)], true);
        let conj = g.intersect2(r1, r2);
        let norm = normalize(&mut g, conj);
        assert_eq!(g.kind(norm), TermKind::Record);
        let (names, open) = g.data(norm).fields().map(|(n, o)| (n.to_vec(), o)).unwrap();
        assert_eq!(names, vec!["f".to_string(), "g".to_string()]);
        assert!(open);
    }

    #[test]
    fn difference_becomes_negated_conjunction() {
        let mut g = TermGraph::new();
        let int = g.leaf(TermKind::Int);
        let null = g.leaf(TermKind::Null);
        let diff = {
            let u = g.union2(int, null);
            g.node(TermKind::Difference, [u, null])
        };
        // (int | null) \ null leaves exactly int.
        let norm = normalize(&mut g, diff);
        assert_eq!(norm, g.resolve(int));
    }

    #[test]
    fn ground_set_difference_folds() {
        let mut g = TermGraph::new();
        let one = g.int(1);
        let two = g.int(2);
        let s1 = g.node(TermKind::SetVal, [one, two]);
        let s2 = g.node(TermKind::SetVal, [two]);
        let diff = g.node(TermKind::Difference, [s1, s2]);
        let norm = normalize(&mut g, diff);
        assert_eq!(g.kind(norm), TermKind::SetVal);
        let kids = g.children(norm);
        assert_eq!(kids.len(), 1);
        assert_eq!(g.resolve(kids[0]), one);
    }
}
