//! The emptiness and subtype decision procedure.
//!
//! Subtyping is semantic: `is_subtype(A, B)` asks whether `A & !B` is
//! uninhabited, and `is_void(T)` asks whether `T` itself is. Both reduce
//! to one recursive query over *pairs* of positions, each carrying an
//! [`AtomState`]: a sign (interpret the position normally, or as its
//! complement) and a polarity (whether open records and nominal
//! approximations are maximised or minimised). The four canonical states
//! are the sign/polarity combinations; `is_subtype` starts with the left
//! side positive and the right side negative, both at `Max`.
//!
//! Queries are memoized on `(lhs, lhs_state, rhs, rhs_state)`. A pending
//! entry encountered again on the same path is a recursive type cycle and
//! is read as "void" (the inductive interpretation); the entry is
//! confirmed or replaced when the outer call completes. Nominal unfolding
//! consults the name resolver and is bounded by the unfolding budget;
//! exhaustion yields `Answer::Indeterminate`, which propagates as "cannot
//! prove" and never as a proof.

use crate::env::TypeEnv;
use crate::error::ResolutionError;
use log::trace;
use rustc_hash::FxHashMap;
use verdi_ir::rules::normal_form_rewriter;
use verdi_ir::{RewriteLimits, Term, TermGraph, TermKind};

/// A three-valued answer: `Yes` is a proof, `No` means "not proved", and
/// `Indeterminate` means a budget ran out first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Answer {
    /// Proved.
    Yes,
    /// Not proved.
    No,
    /// A resource budget was exhausted before an answer was reached.
    Indeterminate,
}

impl Answer {
    /// Three-valued conjunction.
    pub fn and(self, other: Answer) -> Answer {
        use Answer::*;
        match (self, other) {
            (No, _) | (_, No) => No,
            (Yes, Yes) => Yes,
            _ => Indeterminate,
        }
    }

    /// Three-valued disjunction.
    pub fn or(self, other: Answer) -> Answer {
        use Answer::*;
        match (self, other) {
            (Yes, _) | (_, Yes) => Yes,
            (No, No) => No,
            _ => Indeterminate,
        }
    }

    /// Is this a definite `Yes`?
    pub fn is_yes(self) -> bool {
        self == Answer::Yes
    }
}

/// The sign of a query position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    /// Interpret the type as itself.
    Positive,
    /// Interpret the type as its complement.
    Negative,
}

/// Whether approximations (open record fields, nominal bounds) are
/// maximised or minimised at this position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Approximate towards the largest denotation.
    Max,
    /// Approximate towards the smallest denotation.
    Min,
}

/// The interpretation state of one side of an emptiness query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AtomState {
    /// The sign bit.
    pub sign: Sign,
    /// The polarity bit.
    pub polarity: Polarity,
}

impl AtomState {
    /// Positive, maximising: the state of an ordinary type position.
    pub const POS_MAX: AtomState = AtomState {
        sign: Sign::Positive,
        polarity: Polarity::Max,
    };

    /// Negative, maximising: the state of the supertype side of a
    /// subtyping query.
    pub const NEG_MAX: AtomState = AtomState {
        sign: Sign::Negative,
        polarity: Polarity::Max,
    };

    /// The state reached by crossing a complement.
    pub fn complement(self) -> AtomState {
        AtomState {
            sign: match self.sign {
                Sign::Positive => Sign::Negative,
                Sign::Negative => Sign::Positive,
            },
            polarity: self.polarity,
        }
    }

    fn positive(self) -> bool {
        self.sign == Sign::Positive
    }
}

/// Is `A` a subtype of `B`?
pub fn is_subtype(
    graph: &mut TermGraph,
    a: Term,
    b: Term,
    env: &TypeEnv,
) -> Result<Answer, ResolutionError> {
    let depth = env.budgets.unfold_depth;
    let ans = {
        let mut query = match Query::begin(graph, env) {
            Some(q) => q,
            None => return Ok(Answer::Indeterminate),
        };
        query.pair(a, AtomState::POS_MAX, b, AtomState::NEG_MAX, depth)?
    };
    trace!(
        "is_subtype({}, {}) = {:?}",
        graph.display(a),
        graph.display(b),
        ans
    );
    Ok(ans)
}

/// Is `T` uninhabited?
pub fn is_void(graph: &mut TermGraph, t: Term, env: &TypeEnv) -> Result<Answer, ResolutionError> {
    let depth = env.budgets.unfold_depth;
    let ans = {
        let mut query = match Query::begin(graph, env) {
            Some(q) => q,
            None => return Ok(Answer::Indeterminate),
        };
        query.pair(t, AtomState::POS_MAX, t, AtomState::POS_MAX, depth)?
    };
    trace!("is_void({}) = {:?}", graph.display(t), ans);
    Ok(ans)
}

/// Is the formula `f` unsatisfiable?
///
/// This is the entry point the verifier hands each verification condition
/// to: the formula is normalized by the rewrite system, and any surviving
/// disjunct is further examined for type-membership atoms whose type is
/// empty. `Yes` means proved unsatisfiable.
pub fn is_unsatisfiable(
    graph: &mut TermGraph,
    f: Term,
    env: &TypeEnv,
) -> Result<Answer, ResolutionError> {
    if !normalize(graph, env) {
        return Ok(Answer::Indeterminate);
    }
    let f = graph.resolve(f);
    match graph.kind(f) {
        // Either spelling of the bounds can come out of normalization.
        TermKind::BoolVal => {
            let b = graph.data(f).bool_val().unwrap_or(true);
            return Ok(if b { Answer::No } else { Answer::Yes });
        }
        TermKind::Void => return Ok(Answer::Yes),
        TermKind::Any => return Ok(Answer::No),
        _ => {}
    }
    let arms: Vec<Term> = if graph.kind(f) == TermKind::Union {
        graph.children(f).iter().map(|&c| graph.resolve(c)).collect()
    } else {
        vec![f]
    };
    let mut out = Answer::Yes;
    for arm in arms {
        out = out.and(arm_unsatisfiable(graph, arm, env)?);
        if out == Answer::No {
            return Ok(Answer::No);
        }
    }
    Ok(out)
}

/// Can one disjunct be shown unsatisfiable? The rewrite system has already
/// folded everything propositional, so what is left is consulting the
/// emptiness engine for `ElementOf(x, T)` conjuncts with an empty `T`.
fn arm_unsatisfiable(
    graph: &mut TermGraph,
    arm: Term,
    env: &TypeEnv,
) -> Result<Answer, ResolutionError> {
    match graph.kind(arm) {
        TermKind::BoolVal => {
            let b = graph.data(arm).bool_val().unwrap_or(true);
            return Ok(if b { Answer::No } else { Answer::Yes });
        }
        TermKind::Void => return Ok(Answer::Yes),
        _ => {}
    }
    let conjuncts: Vec<Term> = if graph.kind(arm) == TermKind::Intersect {
        graph.children(arm).iter().map(|&c| graph.resolve(c)).collect()
    } else {
        vec![arm]
    };
    let mut saw_indeterminate = false;
    for c in conjuncts {
        if graph.kind(c) == TermKind::ElementOf {
            let ty = graph.resolve(graph.children(c)[1]);
            let k = graph.kind(ty);
            if k.is_type() || k.is_connective() {
                match void_query(graph, ty, env)? {
                    Answer::Yes => return Ok(Answer::Yes),
                    Answer::Indeterminate => saw_indeterminate = true,
                    Answer::No => {}
                }
            }
        }
    }
    Ok(if saw_indeterminate {
        Answer::Indeterminate
    } else {
        Answer::No
    })
}

/// An emptiness query without the leading normalization (the caller has
/// already normalized the graph).
fn void_query(graph: &mut TermGraph, t: Term, env: &TypeEnv) -> Result<Answer, ResolutionError> {
    let mut query = Query {
        graph,
        env,
        memo: FxHashMap::default(),
    };
    let depth = env.budgets.unfold_depth;
    query.pair(t, AtomState::POS_MAX, t, AtomState::POS_MAX, depth)
}

/// Normalize the whole graph; false when the rewrite budget ran out.
fn normalize(graph: &mut TermGraph, env: &TypeEnv) -> bool {
    let engine = normal_form_rewriter();
    let limits = RewriteLimits {
        max_steps: env.budgets.rewrite_steps,
    };
    engine.run(graph, limits).converged()
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Memo {
    Pending,
    Done(Answer),
}

struct Query<'a, 'e> {
    graph: &'a mut TermGraph,
    env: &'a TypeEnv<'e>,
    memo: FxHashMap<(Term, AtomState, Term, AtomState), Memo>,
}

impl<'a, 'e> Query<'a, 'e> {
    /// Normalize and build a query context. `None` when normalization ran
    /// out of budget.
    fn begin(graph: &'a mut TermGraph, env: &'a TypeEnv<'e>) -> Option<Self> {
        if !normalize(graph, env) {
            return None;
        }
        Some(Query {
            graph,
            env,
            memo: FxHashMap::default(),
        })
    }

    /// Is the intersection of the two interpreted sides empty?
    fn pair(
        &mut self,
        l: Term,
        ls: AtomState,
        r: Term,
        rs: AtomState,
        depth: usize,
    ) -> Result<Answer, ResolutionError> {
        let l = self.graph.resolve(l);
        let r = self.graph.resolve(r);
        if depth == 0 {
            return Ok(Answer::Indeterminate);
        }
        let key = (l, ls, r, rs);
        match self.memo.get(&key) {
            // A cycle through a recursive type: the inductive reading is
            // that the unrolling adds no inhabitants.
            Some(Memo::Pending) => return Ok(Answer::Yes),
            Some(Memo::Done(a)) => return Ok(*a),
            None => {}
        }
        self.memo.insert(key, Memo::Pending);
        let ans = self.dispatch(l, ls, r, rs, depth)?;
        self.memo.insert(key, Memo::Done(ans));
        Ok(ans)
    }

    /// The emptiness of a single side: `T` intersected with itself.
    fn single(&mut self, t: Term, s: AtomState, depth: usize) -> Result<Answer, ResolutionError> {
        self.pair(t, s, t, s, depth)
    }

    fn children_of(&self, t: Term) -> Vec<Term> {
        self.graph
            .children(t)
            .iter()
            .map(|&c| self.graph.resolve(c))
            .collect()
    }

    fn dispatch(
        &mut self,
        l: Term,
        ls: AtomState,
        r: Term,
        rs: AtomState,
        depth: usize,
    ) -> Result<Answer, ResolutionError> {
        use TermKind::*;
        let lk = self.graph.kind(l);
        let rk = self.graph.kind(r);

        // Complements and differences eliminate unconditionally.
        if lk == Not {
            let inner = self.graph.resolve(self.graph.children(l)[0]);
            return self.pair(inner, ls.complement(), r, rs, depth);
        }
        if rk == Not {
            let inner = self.graph.resolve(self.graph.children(r)[0]);
            return self.pair(inner, rs.complement(), l, ls, depth);
        }
        if lk == Difference {
            return self.difference(l, ls, r, rs, depth);
        }
        if rk == Difference {
            return self.difference(r, rs, l, ls, depth);
        }

        // Universal expansions come before choice expansions: a positive
        // union (or negative intersection) obliges every arm, and
        // postponing a choice until the obligations are split keeps the
        // procedure complete on reflexive queries.
        let alpha = |k: TermKind, s: AtomState| {
            (k == Union && s.positive()) || (k == Intersect && !s.positive())
        };
        let beta = |k: TermKind, s: AtomState| {
            (k == Intersect && s.positive()) || (k == Union && !s.positive())
        };
        if alpha(lk, ls) {
            let mut out = Answer::Yes;
            for c in self.children_of(l) {
                out = out.and(self.pair(c, ls, r, rs, depth)?);
                if out == Answer::No {
                    break;
                }
            }
            return Ok(out);
        }
        if alpha(rk, rs) {
            return self.pair(r, rs, l, ls, depth);
        }
        if lk == Nominal {
            let name = self.graph.data(l).name().unwrap_or_default().to_string();
            let body = self.env.resolver.resolve_type(&name, self.graph)?;
            return self.pair(body, ls, r, rs, depth - 1);
        }
        if rk == Nominal {
            return self.pair(r, rs, l, ls, depth);
        }
        if beta(lk, ls) {
            // One empty conjunct suffices.
            let mut out = Answer::No;
            for c in self.children_of(l) {
                out = out.or(self.pair(c, ls, r, rs, depth)?);
                if out == Answer::Yes {
                    break;
                }
            }
            return Ok(out);
        }
        if beta(rk, rs) {
            return self.pair(r, rs, l, ls, depth);
        }
        self.atoms(l, ls, r, rs, depth)
    }

    /// `A \ B` in either position, per the fixed dispatch contract.
    fn difference(
        &mut self,
        d: Term,
        ds: AtomState,
        other: Term,
        os: AtomState,
        depth: usize,
    ) -> Result<Answer, ResolutionError> {
        let kids = self.children_of(d);
        let (a, b) = (kids[0], kids[1]);
        let first = self.pair(a, ds, other, os, depth)?;
        let second = self.pair(b, ds.complement(), other, os, depth)?;
        // Positively, `(A \ B) & X` is contained in both `A & X` and
        // `!B & X`. Negatively, `!(A \ B) & X` splits into the disjuncts
        // `!A & X` and `B & X`, and both must be empty.
        Ok(first.and(second))
    }

    /// Both sides are atomic (leaves or structural constructors).
    fn atoms(
        &mut self,
        l: Term,
        ls: AtomState,
        r: Term,
        rs: AtomState,
        depth: usize,
    ) -> Result<Answer, ResolutionError> {
        use TermKind::*;
        let lk = self.graph.kind(l);
        let rk = self.graph.kind(r);

        // A side that denotes the empty set empties the intersection.
        let l_empty = (lk == Void && ls.positive()) || (lk == Any && !ls.positive());
        let r_empty = (rk == Void && rs.positive()) || (rk == Any && !rs.positive());
        if l_empty || r_empty {
            return Ok(Answer::Yes);
        }
        // A side that denotes every value disappears from the
        // intersection.
        let l_universe = (lk == Any && ls.positive()) || (lk == Void && !ls.positive());
        let r_universe = (rk == Any && rs.positive()) || (rk == Void && !rs.positive());
        match (l_universe, r_universe) {
            (true, true) => return Ok(Answer::No),
            (true, false) => return self.single(r, rs, depth),
            (false, true) => return self.single(l, ls, depth),
            (false, false) => {}
        }

        // Canonical sign order: positive on the left.
        if !ls.positive() && rs.positive() {
            return self.pair(r, rs, l, ls, depth);
        }
        // Two complements cover too much to be empty.
        if !ls.positive() && !rs.positive() {
            return Ok(Answer::No);
        }

        let subtype_query = !rs.positive();
        let (tl, tr) = match (structural_tag(lk), structural_tag(rk)) {
            (Some(a), Some(b)) => (a, b),
            // Value or formula terms carry no type denotation to decide
            // about; never claim emptiness for them.
            _ => return Ok(Answer::No),
        };
        if tl != tr {
            // Different shapes share no values. Positively, the
            // intersection is empty; against a complement, everything of
            // the left shape remains, so only an empty left side helps.
            return if subtype_query {
                self.single(l, ls, depth)
            } else {
                Ok(Answer::Yes)
            };
        }

        // Same shape on both sides.
        match (lk, rk) {
            (Null, Null) | (Bool, Bool) | (Str, Str) | (Int, Int) | (Real, Real) => {
                Ok(if subtype_query { Answer::Yes } else { Answer::No })
            }
            (Int, Real) => Ok(if subtype_query { Answer::Yes } else { Answer::No }),
            (Real, Int) => {
                // real & int is int; real <= int does not hold.
                Ok(Answer::No)
            }
            (Array, Array) | (Set, Set) | (List, List) => {
                let e1 = self.children_of(l)[0];
                let e2 = self.children_of(r)[0];
                if subtype_query {
                    // Covariant elements: the pair states pass through.
                    self.pair(e1, ls, e2, rs, depth)
                } else if l == r {
                    // One aggregate type against itself: empty exactly
                    // when its element type is.
                    self.single(e1, ls, depth)
                } else {
                    // Across two aggregate types the contract is: empty
                    // when the element intersection is empty and neither
                    // element alone is (the `[void]` degenerate case).
                    let both = self.pair(e1, ls, e2, rs, depth)?;
                    let left = self.single(e1, ls, depth)?;
                    let right = self.single(e2, rs, depth)?;
                    Ok(match (both, left, right) {
                        (Answer::No, _, _) => Answer::No,
                        (Answer::Yes, Answer::No, Answer::No) => Answer::Yes,
                        (Answer::Yes, Answer::Yes, _) | (Answer::Yes, _, Answer::Yes) => Answer::No,
                        _ => Answer::Indeterminate,
                    })
                }
            }
            (Tuple, Tuple) => self.tuples(l, ls, r, rs, depth),
            (Record, Record) => self.records(l, ls, r, rs, depth),
            (Ref, Ref) => self.references(l, ls, r, rs, depth),
            (Func, Func) | (Method, Method) => self.functions(l, ls, r, rs, depth),
            (Property, Property) => {
                let c1 = self.children_of(l)[0];
                let c2 = self.children_of(r)[0];
                self.pair(c1, ls, c2, rs, depth)
            }
            _ => Ok(Answer::No),
        }
    }

    fn tuples(
        &mut self,
        l: Term,
        ls: AtomState,
        r: Term,
        rs: AtomState,
        depth: usize,
    ) -> Result<Answer, ResolutionError> {
        let ck1 = self.children_of(l);
        let ck2 = self.children_of(r);
        let subtype_query = !rs.positive();
        if ck1.len() != ck2.len() {
            return if subtype_query {
                self.single(l, ls, depth)
            } else {
                Ok(Answer::Yes)
            };
        }
        if subtype_query {
            let mut out = Answer::Yes;
            for (&a, &b) in ck1.iter().zip(ck2.iter()) {
                out = out.and(self.pair(a, ls, b, rs, depth)?);
            }
            if out != Answer::Yes {
                // A tuple with an empty component is itself empty, and the
                // empty type is a subtype of anything.
                out = out.or(self.single(l, ls, depth)?);
            }
            Ok(out)
        } else {
            // The intersection is component-wise; one empty component
            // empties the whole tuple.
            let mut out = Answer::No;
            for (&a, &b) in ck1.iter().zip(ck2.iter()) {
                out = out.or(self.pair(a, ls, b, rs, depth)?);
                if out == Answer::Yes {
                    break;
                }
            }
            Ok(out)
        }
    }

    fn records(
        &mut self,
        l: Term,
        ls: AtomState,
        r: Term,
        rs: AtomState,
        depth: usize,
    ) -> Result<Answer, ResolutionError> {
        let (ln, lc, lo) = self.record_parts(l, ls);
        let (rn, rc, ro) = self.record_parts(r, rs);
        let subtype_query = !rs.positive();
        let field = |names: &[String], children: &[Term], n: &str| -> Option<Term> {
            names.iter().position(|x| x == n).map(|i| children[i])
        };
        if subtype_query {
            if ro {
                // Supertype is open: it constrains only its own fields,
                // each of which the subtype must pin down.
                let mut out = Answer::Yes;
                for (n, &want) in rn.iter().zip(rc.iter()) {
                    match field(&ln, &lc, n) {
                        Some(have) => out = out.and(self.pair(have, ls, want, rs, depth)?),
                        None => {
                            out = Answer::No;
                            break;
                        }
                    }
                }
                if out != Answer::Yes {
                    out = out.or(self.single(l, ls, depth)?);
                }
                Ok(out)
            } else {
                // Supertype is closed: the field sets must agree exactly
                // and the subtype must be closed too.
                if lo || ln != rn {
                    return self.single(l, ls, depth);
                }
                let mut out = Answer::Yes;
                for (&a, &b) in lc.iter().zip(rc.iter()) {
                    out = out.and(self.pair(a, ls, b, rs, depth)?);
                }
                if out != Answer::Yes {
                    out = out.or(self.single(l, ls, depth)?);
                }
                Ok(out)
            }
        } else {
            // Inhabited-intersection check. Closed sides fix the exact
            // field set.
            match (lo, ro) {
                (false, false) => {
                    if ln != rn {
                        return Ok(Answer::Yes);
                    }
                }
                (false, true) => {
                    if rn.iter().any(|n| !ln.contains(n)) {
                        return Ok(Answer::Yes);
                    }
                }
                (true, false) => {
                    if ln.iter().any(|n| !rn.contains(n)) {
                        return Ok(Answer::Yes);
                    }
                }
                (true, true) => {}
            }
            // One field with an empty intersection empties the record.
            let mut out = Answer::No;
            for (n, &a) in ln.iter().zip(lc.iter()) {
                if let Some(b) = field(&rn, &rc, n) {
                    out = out.or(self.pair(a, ls, b, rs, depth)?);
                } else {
                    out = out.or(self.single(a, ls, depth)?);
                }
                if out == Answer::Yes {
                    return Ok(out);
                }
            }
            for (n, &b) in rn.iter().zip(rc.iter()) {
                if field(&ln, &lc, n).is_none() {
                    out = out.or(self.single(b, rs, depth)?);
                    if out == Answer::Yes {
                        return Ok(out);
                    }
                }
            }
            Ok(out)
        }
    }

    /// Field names, field types and *effective* openness of a record: at
    /// `Min` polarity an open record is approximated by its closed
    /// variant.
    fn record_parts(&self, t: Term, s: AtomState) -> (Vec<String>, Vec<Term>, bool) {
        let data = self.graph.data(t);
        let (names, open) = data.fields().unwrap_or((&[], false));
        let names = names.to_vec();
        let children = data
            .children
            .iter()
            .map(|&c| self.graph.resolve(c))
            .collect();
        let open = open && s.polarity == Polarity::Max;
        (names, children, open)
    }

    fn references(
        &mut self,
        l: Term,
        ls: AtomState,
        r: Term,
        rs: AtomState,
        depth: usize,
    ) -> Result<Answer, ResolutionError> {
        let e1 = self.children_of(l)[0];
        let e2 = self.children_of(r)[0];
        let l1 = self.lifetime_of(l);
        let l2 = self.lifetime_of(r);
        // References are invariant: the element types must coincide.
        let forward = self.pair(
            e1,
            AtomState {
                sign: Sign::Positive,
                polarity: ls.polarity,
            },
            e2,
            AtomState {
                sign: Sign::Negative,
                polarity: rs.polarity,
            },
            depth,
        )?;
        let backward = self.pair(
            e2,
            AtomState {
                sign: Sign::Positive,
                polarity: rs.polarity,
            },
            e1,
            AtomState {
                sign: Sign::Negative,
                polarity: ls.polarity,
            },
            depth,
        )?;
        let equal = forward.and(backward);
        let subtype_query = !rs.positive();
        if subtype_query {
            if equal == Answer::Yes && self.env.lifetimes.outlives(&l1, &l2) {
                Ok(Answer::Yes)
            } else if equal == Answer::Indeterminate {
                Ok(Answer::Indeterminate)
            } else {
                Ok(Answer::No)
            }
        } else {
            // Cells of distinct exact type are disjoint.
            match equal {
                Answer::Yes => Ok(Answer::No),
                Answer::No => Ok(Answer::Yes),
                Answer::Indeterminate => Ok(Answer::Indeterminate),
            }
        }
    }

    fn lifetime_of(&self, t: Term) -> String {
        self.graph
            .data(t)
            .name()
            .unwrap_or("*")
            .to_string()
    }

    fn functions(
        &mut self,
        l: Term,
        ls: AtomState,
        r: Term,
        rs: AtomState,
        depth: usize,
    ) -> Result<Answer, ResolutionError> {
        let ck1 = self.children_of(l);
        let ck2 = self.children_of(r);
        let subtype_query = !rs.positive();
        if ck1.len() != ck2.len() {
            // Different arity, disjoint value sets.
            return Ok(if subtype_query { Answer::No } else { Answer::Yes });
        }
        if !subtype_query || ck1.is_empty() {
            return Ok(Answer::No);
        }
        let (params1, ret1) = ck1.split_at(ck1.len() - 1);
        let (params2, ret2) = ck2.split_at(ck2.len() - 1);
        let mut out = Answer::Yes;
        // Contravariant parameters: the supertype's parameter must flow
        // into the subtype's.
        for (&p1, &p2) in params1.iter().zip(params2.iter()) {
            out = out.and(self.pair(p2, ls, p1, rs, depth)?);
        }
        // Covariant return.
        out = out.and(self.pair(ret1[0], ls, ret2[0], rs, depth)?);
        Ok(out)
    }
}

/// The structural family of a type kind; `None` for the bounds and for
/// anything that is not a type atom. Numeric leaves share a family.
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
