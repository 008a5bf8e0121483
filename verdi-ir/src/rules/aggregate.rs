//! Folding of aggregate projections, functional updates, membership and
//! set operations over value terms.

use crate::graph::TermGraph;
use crate::rational::Rational;
use crate::rewrite::Rule;
use crate::rules::is_ground;
use crate::term::{Payload, Term, TermData, TermKind};

fn resolved_children(graph: &TermGraph, t: Term) -> Vec<Term> {
    graph.children(t).iter().map(|&c| graph.resolve(c)).collect()
}

fn field_index(graph: &TermGraph, record: Term, name: &str) -> Option<usize> {
    let (names, _) = graph.data(record).fields()?;
    names.iter().position(|n| n == name)
}

fn const_index(graph: &TermGraph, t: Term) -> Option<usize> {
    let v = graph.data(t).num()?;
    let i = v.as_i64()?;
    usize::try_from(i).ok()
}

/// Does the ground value `v` inhabit the primitive type `ty`?
fn value_in_primitive(graph: &TermGraph, v: Term, ty: TermKind) -> Option<bool> {
    let vk = graph.kind(v);
    let answer = match ty {
        TermKind::Any => true,
        TermKind::Void => false,
        TermKind::Null => vk == TermKind::NullVal,
        TermKind::Bool => vk == TermKind::BoolVal,
        TermKind::Str => vk == TermKind::StrVal,
        TermKind::Int => {
            vk == TermKind::NumVal && graph.data(v).num().map_or(false, |r| r.is_integer())
        }
        TermKind::Real => vk == TermKind::NumVal,
        _ => return None,
    };
    Some(answer)
}

/// Fold projections, updates, membership and ground set operations.
pub struct AggregateFold;

impl AggregateFold {
    fn fold(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        use TermKind::*;
        let kids = resolved_children(graph, term);
        match graph.kind(term) {
            FieldOf => {
                let src = kids[0];
                let name = match graph.payload(term) {
                    Some(Payload::Name(n)) => n.clone(),
                    _ => return None,
                };
                match graph.kind(src) {
                    RecordVal => {
                        let i = field_index(graph, src, &name)?;
                        Some(resolved_children(graph, src)[i])
                    }
                    // Select over store: reading the updated field yields
                    // the stored value, reading any other field reads
                    // through the update.
                    FieldUpdate => {
                        let updated = match graph.payload(src) {
                            Some(Payload::Name(n)) => n.clone(),
                            _ => return None,
                        };
                        let inner = resolved_children(graph, src);
                        if updated == name {
                            Some(inner[1])
                        } else {
                            Some(graph.add(TermData::with_payload(
                                FieldOf,
                                [inner[0]],
                                Payload::Name(name),
                            )))
                        }
                    }
                    _ => None,
                }
            }
            FieldUpdate => {
                let src = kids[0];
                let value = kids[1];
                if graph.kind(src) != RecordVal {
                    return None;
                }
                let name = match graph.payload(term) {
                    Some(Payload::Name(n)) => n.clone(),
                    _ => return None,
                };
                let i = field_index(graph, src, &name)?;
                let mut children = resolved_children(graph, src);
                children[i] = value;
                let payload = graph.payload(src)?.clone();
                Some(graph.add(TermData {
                    kind: RecordVal,
                    children: children.into_iter().collect(),
                    payload: Some(payload),
                    deterministic: true,
                }))
            }
            IndexOf => {
                let (src, idx) = (kids[0], kids[1]);
                match graph.kind(src) {
                    ListVal => {
                        let i = const_index(graph, idx)?;
                        let elems = resolved_children(graph, src);
                        elems.get(i).copied()
                    }
                    ListUpdate => {
                        let inner = resolved_children(graph, src);
                        let (list, at, value) = (inner[0], inner[1], inner[2]);
                        if at == idx {
                            return Some(value);
                        }
                        // Distinct constant indices cannot alias.
                        if const_index(graph, at).is_some() && const_index(graph, idx).is_some() {
                            return Some(graph.node(IndexOf, [list, idx]));
                        }
                        None
                    }
                    _ => None,
                }
            }
            LengthOf => {
                let src = kids[0];
                match graph.kind(src) {
                    ListVal => {
                        let n = graph.children(src).len() as i64;
                        Some(graph.num(Rational::from_i64(n)))
                    }
                    // An update never changes the length.
                    ListUpdate => {
                        let inner = resolved_children(graph, src);
                        Some(graph.node(LengthOf, [inner[0]]))
                    }
                    _ => None,
                }
            }
            ListUpdate => {
                let (src, idx, value) = (kids[0], kids[1], kids[2]);
                if graph.kind(src) != ListVal {
                    return None;
                }
                let i = const_index(graph, idx)?;
                let mut elems = resolved_children(graph, src);
                if i >= elems.len() {
                    return None;
                }
                elems[i] = value;
                Some(graph.node(ListVal, elems))
            }
            TupleLoad => {
                let src = kids[0];
                if graph.kind(src) != TupleVal {
                    return None;
                }
                let i = match graph.payload(term) {
                    Some(Payload::Num(r)) => usize::try_from(r.as_i64()?).ok()?,
                    _ => return None,
                };
                resolved_children(graph, src).get(i).copied()
            }
            ElementOf => {
                let (x, coll) = (kids[0], kids[1]);
                match graph.kind(coll) {
                    SetVal | ListVal => {
                        if !is_ground(graph, x) || !is_ground(graph, coll) {
                            return None;
                        }
                        let elems = resolved_children(graph, coll);
                        Some(graph.bool_val(elems.contains(&x)))
                    }
                    k if k.is_type_leaf() => {
                        if !is_ground(graph, x) {
                            return None;
                        }
                        let b = value_in_primitive(graph, x, k)?;
                        Some(graph.bool_val(b))
                    }
                    _ => None,
                }
            }
            SubsetOf => {
                let (a, b) = (kids[0], kids[1]);
                if graph.kind(a) != SetVal || graph.kind(b) != SetVal {
                    return None;
                }
                if !is_ground(graph, a) || !is_ground(graph, b) {
                    return None;
                }
                let bs = resolved_children(graph, b);
                let a_in_b = resolved_children(graph, a)
                    .into_iter()
                    .all(|e| bs.contains(&e));
                Some(graph.bool_val(a_in_b))
            }
            // Set-value union folds unconditionally: duplicates in a set
            // value are harmless. Intersection needs ground elements,
            // since distinct indices only prove distinctness for ground
            // values.
            Union => {
                if kids.len() < 2 || kids.iter().any(|&c| graph.kind(c) != SetVal) {
                    return None;
                }
                let mut elems = Vec::new();
                for c in kids {
                    elems.extend(resolved_children(graph, c));
                }
                Some(graph.node(SetVal, elems))
            }
            Intersect => {
                if kids.len() < 2
                    || kids
                        .iter()
                        .any(|&c| graph.kind(c) != SetVal || !is_ground(graph, c))
                {
                    return None;
                }
                let mut elems = resolved_children(graph, kids[0]);
                for &c in &kids[1..] {
                    let cs = resolved_children(graph, c);
                    elems.retain(|e| cs.contains(e));
                }
                Some(graph.node(SetVal, elems))
            }
            _ => None,
        }
    }
}

impl Rule for AggregateFold {
    fn name(&self) -> &'static str {
        "aggregate-fold"
    }

    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term> {
        let folded = self.fold(graph, term)?;
        if graph.resolve(folded) == term {
            None
        } else {
            Some(folded)
        }
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
    fn field_projection_folds() {
        let mut g = TermGraph::new();
        let one = g.int(1);
        let two = g.int(2);
        let rec = g.record(
            TermKind::RecordVal,
            vec![("x".to_string(), one), ("y".to_string(), two)],
            false,
        );
        let load = g.add(TermData::with_payload(
            TermKind::FieldOf,
            [rec],
            Payload::Name("y".to_string()),
        ));
        assert_eq!(normalize(&mut g, load), two);
    }

    #[test]
    fn select_over_store() {
        let mut g = TermGraph::new();
        let r = g.var("r");
        let v = g.int(9);
        let upd = g.add(TermData::with_payload(
            TermKind::FieldUpdate,
            [r, v],
            Payload::Name("f".to_string()),
        ));
        let same = g.add(TermData::with_payload(
            TermKind::FieldOf,
            [upd],
            Payload::Name("f".to_string()),
        ));
        assert_eq!(normalize(&mut g, same), v);
        let other = g.add(TermData::with_payload(
            TermKind::FieldOf,
            [upd],
            Payload::Name("g".to_string()),
        ));
        let folded = normalize(&mut g, other);
        assert_eq!(g.kind(folded), TermKind::FieldOf);
        assert_eq!(g.resolve(g.children(folded)[0]), g.resolve(r));
    }

    #[test]
    fn list_indexing_and_length() {
        let mut g = TermGraph::new();
        let a = g.int(10);
        let b = g.int(20);
        let list = g.node(TermKind::ListVal, [a, b]);
        let i1 = g.int(1);
        let load = g.node(TermKind::IndexOf, [list, i1]);
        assert_eq!(normalize(&mut g, load), b);
        let len = g.node(TermKind::LengthOf, [list]);
        let n = normalize(&mut g, len);
        assert_eq!(g.data(n).num(), Some(Rational::from_i64(2)));
        // Out-of-range indexing does not fold.
        let i9 = g.int(9);
        let oob = g.node(TermKind::IndexOf, [list, i9]);
        let __n1 = normalize(&mut g, oob);
        assert_eq!(g.kind(__n1), TermKind::IndexOf);
    }

    #[test]
    fn membership_decides_on_ground_terms() {
        let mut g = TermGraph::new();
        let one = g.int(1);
        let two = g.int(2);
        let three = g.int(3);
        let set = g.node(TermKind::SetVal, [one, two]);
        let yes = g.node(TermKind::ElementOf, [one, set]);
        let no = g.node(TermKind::ElementOf, [three, set]);
        let __n2 = normalize(&mut g, yes);
        assert_eq!(g.data(__n2).bool_val(), Some(true));
        let __n3 = normalize(&mut g, no);
        assert_eq!(g.data(__n3).bool_val(), Some(false));
    }

    #[test]
    fn membership_in_primitive_types() {
        let mut g = TermGraph::new();
        let one = g.int(1);
        let half = {
            let r = Rational::new(1, 2).unwrap();
            g.num(r)
        };
        let int = g.leaf(TermKind::Int);
        let real = g.leaf(TermKind::Real);
        let a = g.node(TermKind::ElementOf, [one, int]);
        let b = g.node(TermKind::ElementOf, [half, int]);
        let c = g.node(TermKind::ElementOf, [half, real]);
        let __n4 = normalize(&mut g, a);
        assert_eq!(g.data(__n4).bool_val(), Some(true));
        let __n5 = normalize(&mut g, b);
        assert_eq!(g.data(__n5).bool_val(), Some(false));
        let __n6 = normalize(&mut g, c);
        assert_eq!(g.data(__n6).bool_val(), Some(true));
    }

    #[test]
    fn ground_set_algebra() {
        let mut g = TermGraph::new();
        let one = g.int(1);
        let two = g.int(2);
        let three = g.int(3);
        let s12 = g.node(TermKind::SetVal, [one, two]);
        let s23 = g.node(TermKind::SetVal, [two, three]);
        let u = g.union2(s12, s23);
        let nu = normalize(&mut g, u);
        assert_eq!(g.kind(nu), TermKind::SetVal);
        assert_eq!(g.children(nu).len(), 3);
        let i = g.intersect2(s12, s23);
        let ni = normalize(&mut g, i);
        assert_eq!(g.kind(ni), TermKind::SetVal);
        assert_eq!(g.children(ni).len(), 1);
        let sub = g.node(TermKind::SubsetOf, [s12, s23]);
        let __n7 = normalize(&mut g, sub);
        assert_eq!(g.data(__n7).bool_val(), Some(false));
    }
}
