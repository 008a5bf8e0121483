//! Bytecode-to-term construction.
//!
//! Each bytecode maps to a term of the constraint algebra. Arithmetic is
//! built directly in polynomial sum-of-products form through the
//! `verdi_ir::poly` helpers, so the rewrite engine's arithmetic pass is a
//! pure canonicalization. Aggregates carry their children in emission
//! order, with record fields sorted by name. Coercions are identity at
//! the term level.

use crate::bytecode::{BinOp, Cmp, ConstValue, SetOp, UnOp};
use verdi_ir::{poly, Payload, Rational, Term, TermData, TermGraph, TermKind};

/// The term for a constant operand.
pub fn const_term(graph: &mut TermGraph, value: &ConstValue) -> Term {
    match value {
        ConstValue::Null => graph.null_val(),
        ConstValue::Bool(b) => graph.bool_val(*b),
        ConstValue::Int(i) => graph.int(*i),
        ConstValue::Real(r) => graph.num(*r),
        ConstValue::Str(s) => graph.str_val(s),
    }
}

/// The predicate term for a comparison. Only `Equals` and `LessThan` are
/// primitive; the remaining orderings are spelled with negation and
/// argument order.
pub fn cmp_term(graph: &mut TermGraph, op: Cmp, lhs: Term, rhs: Term) -> Term {
    match op {
        Cmp::Eq => graph.node(TermKind::Equals, [lhs, rhs]),
        Cmp::Ne => {
            let eq = graph.node(TermKind::Equals, [lhs, rhs]);
            graph.not(eq)
        }
        Cmp::Lt => graph.node(TermKind::LessThan, [lhs, rhs]),
        Cmp::Le => {
            let gt = graph.node(TermKind::LessThan, [rhs, lhs]);
            graph.not(gt)
        }
        Cmp::Gt => graph.node(TermKind::LessThan, [rhs, lhs]),
        Cmp::Ge => {
            let lt = graph.node(TermKind::LessThan, [lhs, rhs]);
            graph.not(lt)
        }
        Cmp::ElemOf => graph.node(TermKind::ElementOf, [lhs, rhs]),
        Cmp::Subset => graph.node(TermKind::SubsetOf, [lhs, rhs]),
    }
}

/// The term for a binary arithmetic op.
pub fn binop_term(graph: &mut TermGraph, op: BinOp, lhs: Term, rhs: Term) -> Term {
    match op {
        BinOp::Add => poly::add_terms(graph, lhs, rhs),
        BinOp::Sub => {
            let neg = poly::neg_term(graph, rhs);
            poly::add_terms(graph, lhs, neg)
        }
        BinOp::Mul => poly::mul_terms(graph, lhs, rhs),
        BinOp::Div => graph.node(TermKind::Div, [lhs, rhs]),
    }
}

/// The term for a unary arithmetic op.
pub fn unop_term(graph: &mut TermGraph, op: UnOp, src: Term) -> Term {
    match op {
        UnOp::Neg => poly::neg_term(graph, src),
    }
}

/// The term for a binary set op. Set operations reuse the connective
/// kinds; the aggregate rules fold them over ground set values.
pub fn setop_term(graph: &mut TermGraph, op: SetOp, lhs: Term, rhs: Term) -> Term {
    match op {
        SetOp::Union => graph.union2(lhs, rhs),
        SetOp::Intersect => graph.intersect2(lhs, rhs),
        SetOp::Difference => graph.node(TermKind::Difference, [lhs, rhs]),
    }
}

/// A record field projection.
pub fn field_load(graph: &mut TermGraph, src: Term, field: &str) -> Term {
    graph.add(TermData::with_payload(
        TermKind::FieldOf,
        [src],
        Payload::Name(field.to_string()),
    ))
}

/// A tuple component projection.
pub fn tuple_load(graph: &mut TermGraph, src: Term, index: u32) -> Term {
    graph.add(TermData::with_payload(
        TermKind::TupleLoad,
        [src],
        Payload::Num(Rational::from_i64(i64::from(index))),
    ))
}

/// One resolved step of an lvalue path.
pub enum PathElem {
    /// Descend into a record field.
    Field(String),
    /// Descend into a list element at a symbolic index.
    Index(Term),
}

/// Build the nested functional update for an lvalue path: each `Field`
/// step becomes a `FieldUpdate`, each `Index` step a `ListUpdate`, with
/// the untouched part of the aggregate read through projections.
pub fn update_term(graph: &mut TermGraph, root: Term, path: &[PathElem], value: Term) -> Term {
    match path.first() {
        None => value,
        Some(PathElem::Field(f)) => {
            let sub = field_load(graph, root, f);
            let updated = update_term(graph, sub, &path[1..], value);
            graph.add(TermData::with_payload(
                TermKind::FieldUpdate,
                [root, updated],
                Payload::Name(f.clone()),
            ))
        }
        Some(PathElem::Index(i)) => {
            let sub = graph.node(TermKind::IndexOf, [root, *i]);
            let updated = update_term(graph, sub, &path[1..], value);
            graph.node(TermKind::ListUpdate, [root, *i, updated])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdi_ir::rules::normal_form_rewriter;
    use verdi_ir::RewriteLimits;

    #[test]
    fn arithmetic_is_sum_of_products() {
        let mut g = TermGraph::new();
        let x = g.var("x");
        let y = g.var("y");
        let sum = binop_term(&mut g, BinOp::Add, x, y);
        assert_eq!(g.kind(sum), TermKind::Sum);
        let three = g.int(3);
        let scaled = binop_term(&mut g, BinOp::Mul, three, x);
        assert_eq!(g.kind(scaled), TermKind::Mul);
        // x - x cancels at construction time.
        let zero = binop_term(&mut g, BinOp::Sub, x, x);
        assert_eq!(g.data(zero).num(), Some(Rational::ZERO));
    }

    #[test]
    fn comparisons_desugar() {
        let mut g = TermGraph::new();
        let x = g.var("x");
        let y = g.var("y");
        let le = cmp_term(&mut g, Cmp::Le, x, y);
        // x <= y is !(y < x).
        assert_eq!(g.kind(le), TermKind::Not);
        let inner = g.resolve(g.children(le)[0]);
        assert_eq!(g.kind(inner), TermKind::LessThan);
        assert_eq!(g.resolve(g.children(inner)[0]), y);
    }

    #[test]
    fn update_path_builds_nested_stores() {
        let mut g = TermGraph::new();
        let r = g.var("r");
        let i = g.var("i");
        let v = g.int(7);
        // r.xs[i] := 7
        let path = [
            PathElem::Field("xs".to_string()),
            PathElem::Index(i),
        ];
        let updated = update_term(&mut g, r, &path, v);
        assert_eq!(g.kind(updated), TermKind::FieldUpdate);
        let inner = g.resolve(g.children(updated)[1]);
        assert_eq!(g.kind(inner), TermKind::ListUpdate);
    }

    #[test]
    fn update_then_load_folds_back() {
        let mut g = TermGraph::new();
        let r = g.var("r");
        let v = g.int(7);
        let path = [PathElem::Field("f".to_string())];
        let updated = update_term(&mut g, r, &path, v);
        let load = field_load(&mut g, updated, "f");
        let engine = normal_form_rewriter();
        assert!(engine.run(&mut g, RewriteLimits::default()).converged());
        assert_eq!(g.resolve(load), g.resolve(v));
    }
}
