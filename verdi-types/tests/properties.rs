//! Algebraic properties of the subtype engine and the rewrite system,
//! checked over randomly generated types.

use proptest::prelude::*;
use verdi_ir::rules::{normal_form_rules, normal_form_rewriter};
use verdi_ir::{Rewriter, RewriteLimits, Term, TermGraph};
use verdi_types::testutil::MapResolver;
use verdi_types::{is_subtype, is_void, Answer, TrivialLifetimes, TypeEnv, TypeExpr};

fn leaf() -> impl Strategy<Value = TypeExpr> {
    prop_oneof![
        Just(TypeExpr::Void),
        Just(TypeExpr::Any),
        Just(TypeExpr::Null),
        Just(TypeExpr::Bool),
        Just(TypeExpr::Int),
        Just(TypeExpr::Real),
        Just(TypeExpr::Str),
    ]
}

/// The general type generator: connectives, arrays, records, tuples.
fn arb_type() -> impl Strategy<Value = TypeExpr> {
    leaf().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| TypeExpr::Array(Box::new(e))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| TypeExpr::Union(vec![a, b])),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| TypeExpr::Intersect(vec![a, b])),
            inner.clone().prop_map(|e| TypeExpr::Not(Box::new(e))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| TypeExpr::Difference(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| {
                TypeExpr::Record(vec![("x".to_string(), a), ("y".to_string(), b)], false)
            }),
            inner
                .clone()
                .prop_map(|e| TypeExpr::Record(vec![("x".to_string(), e)], true)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| TypeExpr::Tuple(vec![a, b])),
        ]
    })
}

/// A shallow generator used where the assertion depends on the engine
/// being complete, which it is on this small fragment.
fn shallow_type() -> impl Strategy<Value = TypeExpr> {
    leaf().prop_recursive(1, 8, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| TypeExpr::Array(Box::new(e))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| TypeExpr::Union(vec![a, b])),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| {
                TypeExpr::Record(vec![("x".to_string(), a), ("y".to_string(), b)], false)
            }),
        ]
    })
}

fn subtype(a: &TypeExpr, b: &TypeExpr) -> Answer {
    let resolver = MapResolver::new();
    let env = TypeEnv::new(&resolver, &TrivialLifetimes);
    let mut g = TermGraph::new();
    let ta = a.lower(&mut g);
    let tb = b.lower(&mut g);
    is_subtype(&mut g, ta, tb, &env).expect("no nominals in generated types")
}

fn void(t: &TypeExpr) -> Answer {
    let resolver = MapResolver::new();
    let env = TypeEnv::new(&resolver, &TrivialLifetimes);
    let mut g = TermGraph::new();
    let tt = t.lower(&mut g);
    is_void(&mut g, tt, &env).expect("no nominals in generated types")
}

/// A graph-independent canonical rendering: children of order-insensitive
/// kinds are compared as multisets, so normal forms from different graphs
/// (and different rule orders) can be compared structurally.
fn canonical_string(graph: &TermGraph, t: Term, on_path: &mut Vec<Term>) -> String {
    let t = graph.resolve(t);
    if on_path.contains(&t) {
        return "<cycle>".to_string();
    }
    on_path.push(t);
    let data = graph.data(t).clone();
    let mut kids: Vec<String> = data
        .children
        .iter()
        .map(|&c| canonical_string(graph, c, on_path))
        .collect();
    if data.kind.is_unordered() {
        kids.sort();
    }
    on_path.pop();
    format!("{:?}[{:?}]({})", data.kind, data.payload, kids.join(","))
}

/// Deterministic permutation of the rule set from a seed.
fn permuted_rules(seed: u64) -> Rewriter {
    let mut rules = normal_form_rules();
    let mut state = seed | 1;
    for i in (1..rules.len()).rev() {
        // Plain xorshift; only the permutation needs to be reproducible.
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state as usize) % (i + 1);
        rules.swap(i, j);
    }
    Rewriter::new(rules)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn reflexivity(t in arb_type()) {
        prop_assert_eq!(subtype(&t, &t), Answer::Yes);
    }

    #[test]
    fn void_absorption(t in arb_type()) {
        prop_assert_eq!(subtype(&TypeExpr::Void, &t), Answer::Yes);
        prop_assert_eq!(subtype(&t, &TypeExpr::Any), Answer::Yes);
    }

    #[test]
    fn intersection_is_a_lower_bound(a in arb_type(), b in arb_type()) {
        let conj = a.clone().and(b);
        prop_assert_eq!(subtype(&conj, &a), Answer::Yes);
    }

    #[test]
    fn double_negation(t in arb_type()) {
        let nn = TypeExpr::Not(Box::new(TypeExpr::Not(Box::new(t.clone()))));
        prop_assert_eq!(subtype(&nn, &t), Answer::Yes);
        prop_assert_eq!(subtype(&t, &nn), Answer::Yes);
    }

    #[test]
    fn union_voidness_is_conjunctive(a in arb_type(), b in arb_type()) {
        let u = a.clone().or(b.clone());
        let lhs = void(&u);
        let rhs = void(&a).and(void(&b));
        // Budget exhaustion cannot arise without nominal types.
        prop_assert_ne!(lhs, Answer::Indeterminate);
        // A proof that the union is empty proves both arms empty, and a
        // refuted arm refutes the union. (The engine may fail to prove
        // the union empty even when it proves both arms empty; a proof is
        // never wrong, but "no" only means "not proved".)
        prop_assert!(lhs != Answer::Yes || rhs == Answer::Yes);
        if rhs == Answer::No {
            prop_assert_eq!(lhs, Answer::No);
        }
    }

    #[test]
    fn transitivity_on_the_shallow_fragment(
        a in shallow_type(),
        b in shallow_type(),
        c in shallow_type(),
    ) {
        if subtype(&a, &b) == Answer::Yes && subtype(&b, &c) == Answer::Yes {
            prop_assert_eq!(subtype(&a, &c), Answer::Yes);
        }
    }

    #[test]
    fn rewriting_terminates_within_budget(t in arb_type()) {
        let mut g = TermGraph::new();
        let root = t.lower(&mut g);
        let engine = normal_form_rewriter();
        let outcome = engine.run(&mut g, RewriteLimits::default());
        prop_assert!(outcome.converged());
        let _ = root;
    }

    #[test]
    fn rewriting_is_confluent_modulo_rule_order(t in arb_type(), seed in any::<u64>()) {
        let mut g1 = TermGraph::new();
        let r1 = t.lower(&mut g1);
        let default_order = normal_form_rewriter();
        prop_assert!(default_order.run(&mut g1, RewriteLimits::default()).converged());

        let mut g2 = TermGraph::new();
        let r2 = t.lower(&mut g2);
        let shuffled = permuted_rules(seed);
        prop_assert!(shuffled.run(&mut g2, RewriteLimits::default()).converged());

        let s1 = canonical_string(&g1, r1, &mut Vec::new());
        let s2 = canonical_string(&g2, r2, &mut Vec::new());
        prop_assert_eq!(s1, s2);
    }
}

/// Filter soundness on the fragment where the engine is complete: a
/// non-bottom filter result is a subtype of the filtered type.
mod filter_soundness {
    use super::*;
    use verdi_types::{filter, Filtered, Shape};

    fn array_type() -> impl Strategy<Value = TypeExpr> {
        let arr = leaf().prop_map(|e| TypeExpr::Array(Box::new(e))).boxed();
        prop_oneof![
            arr.clone(),
            (arr.clone(), arr.clone()).prop_map(|(a, b)| TypeExpr::Intersect(vec![a, b])),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn filtered_arrays_are_subtypes(t in array_type()) {
            let resolver = MapResolver::new();
            let env = TypeEnv::new(&resolver, &TrivialLifetimes);
            let mut g = TermGraph::new();
            let term = t.lower(&mut g);
            match filter(&mut g, Shape::Array, term, &env).unwrap() {
                Filtered::Type(k) => {
                    prop_assert_eq!(is_subtype(&mut g, k, term, &env).unwrap(), Answer::Yes);
                }
                Filtered::Bottom => {}
                Filtered::Ambiguous => prop_assert!(false, "unexpected ambiguity"),
            }
        }
    }
}
