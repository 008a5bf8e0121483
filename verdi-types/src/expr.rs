//! Graph-independent type descriptions.
//!
//! A [`TypeExpr`] describes a semantic type without committing to a term
//! graph, so the same description can be lowered into the independent
//! graph of each verification task. Name resolvers hold declared bodies in
//! this form, and method signatures use it for parameter types.

use verdi_ir::{Term, TermGraph, TermKind};

/// A semantic type as an abstract description, lowered on demand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeExpr {
    /// The uninhabited type.
    Void,
    /// The type of all values.
    Any,
    /// The null type.
    Null,
    /// The boolean type.
    Bool,
    /// The integer type.
    Int,
    /// The rational type.
    Real,
    /// The string type.
    Str,
    /// A reference to a named type declaration.
    Nominal(String),
    /// An array type.
    Array(Box<TypeExpr>),
    /// A set type.
    Set(Box<TypeExpr>),
    /// A list type.
    List(Box<TypeExpr>),
    /// A record type with its open/closed flag.
    Record(Vec<(String, TypeExpr)>, bool),
    /// A tuple type.
    Tuple(Vec<TypeExpr>),
    /// A reference type with a lifetime identifier.
    Ref(Box<TypeExpr>, String),
    /// A function type: parameters and return.
    Func(Vec<TypeExpr>, Box<TypeExpr>),
    /// A union of alternatives.
    Union(Vec<TypeExpr>),
    /// An intersection of conjuncts.
    Intersect(Vec<TypeExpr>),
    /// A difference `A \ B`.
    Difference(Box<TypeExpr>, Box<TypeExpr>),
    /// A complement.
    Not(Box<TypeExpr>),
}

impl TypeExpr {
    /// Lower this description into `graph`, returning the resulting term.
    pub fn lower(&self, graph: &mut TermGraph) -> Term {
        match self {
            TypeExpr::Void => graph.leaf(TermKind::Void),
            TypeExpr::Any => graph.leaf(TermKind::Any),
            TypeExpr::Null => graph.leaf(TermKind::Null),
            TypeExpr::Bool => graph.leaf(TermKind::Bool),
            TypeExpr::Int => graph.leaf(TermKind::Int),
            TypeExpr::Real => graph.leaf(TermKind::Real),
            TypeExpr::Str => graph.leaf(TermKind::Str),
            TypeExpr::Nominal(name) => graph.nominal(name),
            TypeExpr::Array(e) => {
                let e = e.lower(graph);
                graph.array(e)
            }
            TypeExpr::Set(e) => {
                let e = e.lower(graph);
                graph.node(TermKind::Set, [e])
            }
            TypeExpr::List(e) => {
                let e = e.lower(graph);
                graph.node(TermKind::List, [e])
            }
            TypeExpr::Record(fields, open) => {
                let lowered: Vec<(String, Term)> = fields
                    .iter()
                    .map(|(n, e)| (n.clone(), e.lower(graph)))
                    .collect();
                graph.record(TermKind::Record, lowered, *open)
            }
            TypeExpr::Tuple(elems) => {
                let lowered: Vec<Term> = elems.iter().map(|e| e.lower(graph)).collect();
                graph.node(TermKind::Tuple, lowered)
            }
            TypeExpr::Ref(e, lifetime) => {
                let e = e.lower(graph);
                graph.reference(e, lifetime)
            }
            TypeExpr::Func(params, ret) => {
                let mut children: Vec<Term> = params.iter().map(|e| e.lower(graph)).collect();
                children.push(ret.lower(graph));
                graph.node(TermKind::Func, children)
            }
            TypeExpr::Union(alts) => {
                let lowered: Vec<Term> = alts.iter().map(|e| e.lower(graph)).collect();
                graph.node(TermKind::Union, lowered)
            }
            TypeExpr::Intersect(alts) => {
                let lowered: Vec<Term> = alts.iter().map(|e| e.lower(graph)).collect();
                graph.node(TermKind::Intersect, lowered)
            }
            TypeExpr::Difference(a, b) => {
                let a = a.lower(graph);
                let b = b.lower(graph);
                graph.node(TermKind::Difference, [a, b])
            }
            TypeExpr::Not(e) => {
                let e = e.lower(graph);
                graph.not(e)
            }
        }
    }

    /// Shorthand for a union of two alternatives.
    pub fn or(self, other: TypeExpr) -> TypeExpr {
        TypeExpr::Union(vec![self, other])
    }

    /// Shorthand for an intersection of two conjuncts.
    pub fn and(self, other: TypeExpr) -> TypeExpr {
        TypeExpr::Intersect(vec![self, other])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowering_is_deterministic() {
        let mut g = TermGraph::new();
        let e = TypeExpr::Int.or(TypeExpr::Null);
        let t1 = e.lower(&mut g);
        let t2 = e.lower(&mut g);
        // Same graph, same description: unions are built child-for-child
        // identically, so the unordered node is still index-equal.
        assert_eq!(g.children(t1).to_vec(), g.children(t2).to_vec());
    }

    #[test]
    fn record_fields_are_sorted() {
        let mut g = TermGraph::new();
        let e = TypeExpr::Record(
            vec![
                ("b".to_string(), TypeExpr::Int),
                ("a".to_string(), TypeExpr::Bool),
            ],
            false,
        );
        let t = e.lower(&mut g);
        let (names, _) = g.data(t).fields().unwrap();
        assert_eq!(names, &["a".to_string(), "b".to_string()]);
    }
}
