//! Type extraction: the tightest type of a requested shape contained in
//! an arbitrary semantic type.
//!
//! Expression checking often knows the shape it needs — an array to index,
//! a record to project, a reference to dereference — and has some
//! arbitrary semantic type in hand. The filter produces the greatest type
//! of that shape below the given type: unions of the shape merge, nominal
//! types unfold, intersections tighten, and anything without a component
//! of the shape is `Bottom`. When the components are incomparable (say,
//! records with different field sets under one union) the filter answers
//! `Ambiguous`, which callers report as "insufficient expected type".

use crate::env::TypeEnv;
use crate::error::ResolutionError;
use verdi_ir::{Term, TermGraph, TermKind};

/// The shapes a filter can target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Array types.
    Array,
    /// Record types.
    Record,
    /// Reference types.
    Reference,
}

impl Shape {
    fn kind(self) -> TermKind {
        match self {
            Shape::Array => TermKind::Array,
            Shape::Record => TermKind::Record,
            Shape::Reference => TermKind::Ref,
        }
    }
}

/// The result of a filter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Filtered {
    /// The tightest type of the requested shape below the input.
    Type(Term),
    /// The input has no component of the requested shape.
    Bottom,
    /// The input has incomparable components of the requested shape.
    Ambiguous,
}

/// Extract the greatest `shape`-shaped type below `t`.
///
/// The walk works on the type as written (differences are dispatched as
/// differences, not as negated intersections), so this runs before
/// normalization.
pub fn filter(
    graph: &mut TermGraph,
    shape: Shape,
    t: Term,
    env: &TypeEnv,
) -> Result<Filtered, ResolutionError> {
    walk(graph, shape, t, env, env.budgets.unfold_depth)
}

fn walk(
    graph: &mut TermGraph,
    shape: Shape,
    t: Term,
    env: &TypeEnv,
    depth: usize,
) -> Result<Filtered, ResolutionError> {
    let t = graph.resolve(t);
    let kind = graph.kind(t);
    if kind == shape.kind() {
        return Ok(Filtered::Type(t));
    }
    match kind {
        TermKind::Nominal => {
            if depth == 0 {
                return Ok(Filtered::Ambiguous);
            }
            let name = graph.data(t).name().unwrap_or_default().to_string();
            let body = env.resolver.resolve_type(&name, graph)?;
            walk(graph, shape, body, env, depth - 1)
        }
        TermKind::Union => {
            let kids: Vec<Term> = graph.children(t).to_vec();
            let mut parts = Vec::new();
            for c in kids {
                match walk(graph, shape, c, env, depth)? {
                    Filtered::Type(p) => parts.push(p),
                    // Arms without the shape contribute nothing.
                    Filtered::Bottom => {}
                    Filtered::Ambiguous => return Ok(Filtered::Ambiguous),
                }
            }
            if parts.is_empty() {
                return Ok(Filtered::Bottom);
            }
            combine(graph, shape, &parts, TermKind::Union)
        }
        TermKind::Intersect => {
            let kids: Vec<Term> = graph.children(t).to_vec();
            let mut parts = Vec::new();
            for c in kids {
                let c = graph.resolve(c);
                match graph.kind(c) {
                    // `any` tightens nothing.
                    TermKind::Any => continue,
                    // A negative conjunct can carve arbitrary values out
                    // of the shape; the result would over-approximate.
                    TermKind::Not => return Ok(Filtered::Bottom),
                    _ => {}
                }
                match walk(graph, shape, c, env, depth)? {
                    Filtered::Type(p) => parts.push(p),
                    Filtered::Bottom => return Ok(Filtered::Bottom),
                    Filtered::Ambiguous => return Ok(Filtered::Ambiguous),
                }
            }
            if parts.is_empty() {
                return Ok(Filtered::Bottom);
            }
            combine(graph, shape, &parts, TermKind::Intersect)
        }
        TermKind::Difference => {
            let kids: Vec<Term> = graph.children(t).to_vec();
            let left = walk(graph, shape, kids[0], env, depth)?;
            let right = walk(graph, shape, kids[1], env, depth)?;
            match (left, right) {
                (Filtered::Type(a), Filtered::Type(b)) => difference(graph, shape, a, b),
                (Filtered::Type(a), Filtered::Bottom) => Ok(Filtered::Type(a)),
                (Filtered::Bottom, _) => Ok(Filtered::Bottom),
                _ => Ok(Filtered::Ambiguous),
            }
        }
        _ => Ok(Filtered::Bottom),
    }
}

/// Merge several components of the requested shape under a connective.
fn combine(
    graph: &mut TermGraph,
    shape: Shape,
    parts: &[Term],
    connective: TermKind,
) -> Result<Filtered, ResolutionError> {
    if parts.len() == 1 {
        return Ok(Filtered::Type(parts[0]));
    }
    match shape {
        Shape::Array => {
            let elems: Vec<Term> = parts
                .iter()
                .map(|&p| graph.resolve(graph.children(p)[0]))
                .collect();
            let elem = graph.node(connective, elems);
            Ok(Filtered::Type(graph.array(elem)))
        }
        Shape::Record => {
            let first = graph.data(parts[0]).clone();
            let (names, open) = match first.fields() {
                Some((n, o)) => (n.to_vec(), o),
                None => return Ok(Filtered::Ambiguous),
            };
            for &p in &parts[1..] {
                match graph.data(p).fields() {
                    Some((n, o)) if n == names.as_slice() && o == open => {}
                    _ => return Ok(Filtered::Ambiguous),
                }
            }
            let width = names.len();
            let mut fields = Vec::with_capacity(width);
            for (i, name) in names.iter().enumerate() {
                let column: Vec<Term> = parts
                    .iter()
                    .map(|&p| graph.resolve(graph.children(p)[i]))
                    .collect();
                let merged = graph.node(connective, column);
                fields.push((name.clone(), merged));
            }
            Ok(Filtered::Type(graph.record(
                TermKind::Record,
                fields,
                open,
            )))
        }
        Shape::Reference => {
            // References are invariant, so merging distinct components is
            // never exact.
            let first = parts[0];
            if parts[1..].iter().all(|&p| p == first) {
                Ok(Filtered::Type(first))
            } else {
                Ok(Filtered::Ambiguous)
            }
        }
    }
}

/// The shape-wise difference of two components.
fn difference(
    graph: &mut TermGraph,
    shape: Shape,
    a: Term,
    b: Term,
) -> Result<Filtered, ResolutionError> {
    match shape {
        Shape::Array => {
            let ea = graph.resolve(graph.children(a)[0]);
            let eb = graph.resolve(graph.children(b)[0]);
            let elem = graph.node(TermKind::Difference, [ea, eb]);
            Ok(Filtered::Type(graph.array(elem)))
        }
        _ => Ok(Filtered::Ambiguous),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{TrivialLifetimes, TypeEnv};
    use crate::expr::TypeExpr;
    use crate::testutil::MapResolver;

    fn run(shape: Shape, t: &TypeExpr, resolver: &MapResolver) -> (TermGraph, Filtered) {
        let mut g = TermGraph::new();
        let term = t.lower(&mut g);
        let env = TypeEnv::new(resolver, &TrivialLifetimes);
        let f = filter(&mut g, shape, term, &env).unwrap();
        (g, f)
    }

    #[test]
    fn exact_shape_passes_through() {
        use TypeExpr::*;
        let r = MapResolver::new();
        let (g, f) = run(Shape::Array, &Array(Box::new(Int)), &r);
        match f {
            Filtered::Type(t) => assert_eq!(g.kind(t), TermKind::Array),
            other => panic!("expected a type, got {:?}", other),
        }
    }

    #[test]
    fn leaves_are_bottom() {
        use TypeExpr::*;
        let r = MapResolver::new();
        let (_, f) = run(Shape::Array, &Int, &r);
        assert_eq!(f, Filtered::Bottom);
        let (_, f) = run(Shape::Record, &Any, &r);
        assert_eq!(f, Filtered::Bottom);
    }

    #[test]
    fn union_merges_array_elements() {
        use TypeExpr::*;
        let r = MapResolver::new();
        let t = Array(Box::new(Int)).or(Array(Box::new(Null)));
        let (g, f) = run(Shape::Array, &t, &r);
        match f {
            Filtered::Type(t) => {
                assert_eq!(g.kind(t), TermKind::Array);
                let e = g.resolve(g.children(t)[0]);
                assert_eq!(g.kind(e), TermKind::Union);
            }
            other => panic!("expected a type, got {:?}", other),
        }
    }

    #[test]
    fn union_with_non_shape_arm_drops_the_arm() {
        use TypeExpr::*;
        let r = MapResolver::new();
        let t = Array(Box::new(Int)).or(Null);
        let (g, f) = run(Shape::Array, &t, &r);
        match f {
            Filtered::Type(t) => {
                assert_eq!(g.kind(t), TermKind::Array);
                let e = g.resolve(g.children(t)[0]);
                assert_eq!(g.kind(e), TermKind::Int);
            }
            other => panic!("expected a type, got {:?}", other),
        }
    }

    #[test]
    fn incomparable_records_are_ambiguous() {
        use TypeExpr::*;
        let r = MapResolver::new();
        let t = Record(vec![("x".to_string(), Int)], false)
            .or(Record(vec![("y".to_string(), Int)], false));
        let (_, f) = run(Shape::Record, &t, &r);
        assert_eq!(f, Filtered::Ambiguous);
    }

    #[test]
    fn nominal_unfolds_to_shape() {
        use TypeExpr::*;
        let mut r = MapResolver::new();
        r.define_type("Ints", Array(Box::new(Int)));
        let (g, f) = run(Shape::Array, &Nominal("Ints".to_string()), &r);
        match f {
            Filtered::Type(t) => assert_eq!(g.kind(t), TermKind::Array),
            other => panic!("expected a type, got {:?}", other),
        }
    }
}
