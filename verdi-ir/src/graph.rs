//! The term graph arena.
//!
//! A `TermGraph` owns a flat, append-only table of [`TermData`] referenced
//! by [`Term`] indices. Structurally identical deterministic terms share an
//! index (hash-consing), so equality of canonical terms is index equality.
//! Rewrites never mutate a slot in place: they install a *redirect* from the
//! old index to the replacement, and `resolve` chases redirects to the
//! representative. Cycles are permitted (recursive types) through
//! `reserve`/`fill`; cyclic terms are never hash-consed.
//!
//! The arena only grows during a rewrite pass; `compact` rebuilds it
//! between passes, dropping slots unreachable from the given roots.

use crate::rational::Rational;
use crate::term::{Payload, Term, TermData, TermKind};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::fmt;

/// Sentinel for "no redirect".
const NO_REDIRECT: u32 = u32::MAX;

/// A flat, indexed, hash-consed graph of terms.
#[derive(Clone, Default)]
pub struct TermGraph {
    data: Vec<TermData>,
    /// Forwarding index per slot; `NO_REDIRECT` when the slot is live.
    redirect: Vec<u32>,
    /// Intern table for deterministic terms.
    interned: FxHashMap<TermData, Term>,
}

impl TermGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots in the arena, redirected slots included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Is the arena empty?
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Chase redirects to the representative index for `t`.
    pub fn resolve(&self, mut t: Term) -> Term {
        loop {
            let r = self.redirect[t.index()];
            if r == NO_REDIRECT {
                return t;
            }
            t = Term::from_u32(r);
        }
    }

    /// Has this slot been redirected by a rewrite?
    pub fn is_redirected(&self, t: Term) -> bool {
        self.redirect[t.index()] != NO_REDIRECT
    }

    /// Install a redirect from `from` to `to`. The caller must ensure the
    /// two terms denote the same set/value; this is how rewrites commit.
    pub fn redirect(&mut self, from: Term, to: Term) {
        let from = self.resolve(from);
        let to = self.resolve(to);
        if from != to {
            self.redirect[from.index()] = to.as_u32();
        }
    }

    /// Append a term, hash-consing deterministic data. Children are
    /// resolved to their representatives first.
    pub fn add(&mut self, mut data: TermData) -> Term {
        for c in data.children.iter_mut() {
            *c = self.resolve(*c);
        }
        if data.deterministic {
            if let Some(&t) = self.interned.get(&data) {
                return t;
            }
        }
        let t = Term::new(self.data.len());
        if data.deterministic {
            self.interned.insert(data.clone(), t);
        }
        self.data.push(data);
        self.redirect.push(NO_REDIRECT);
        t
    }

    /// Reserve an unfilled slot of the given kind, for building cyclic
    /// terms. The result is never hash-consed.
    pub fn reserve(&mut self, kind: TermKind) -> Term {
        let t = Term::new(self.data.len());
        self.data.push(TermData {
            kind,
            children: SmallVec::new(),
            payload: None,
            deterministic: false,
        });
        self.redirect.push(NO_REDIRECT);
        t
    }

    /// Complete a slot previously created with [`reserve`](Self::reserve).
    pub fn fill(
        &mut self,
        t: Term,
        children: impl IntoIterator<Item = Term>,
        payload: Option<Payload>,
    ) {
        let children: SmallVec<[Term; 4]> = children.into_iter().collect();
        let slot = &mut self.data[t.index()];
        debug_assert!(slot.children.is_empty() && slot.payload.is_none());
        slot.children = children;
        slot.payload = payload;
    }

    /// The data for the representative of `t`.
    pub fn data(&self, t: Term) -> &TermData {
        &self.data[self.resolve(t).index()]
    }

    /// The kind of the representative of `t`.
    pub fn kind(&self, t: Term) -> TermKind {
        self.data(t).kind
    }

    /// The children of the representative of `t`.
    ///
    /// Note that child entries may themselves have been redirected since
    /// this term was built; resolve them before structural comparisons.
    pub fn children(&self, t: Term) -> &[Term] {
        &self.data(t).children
    }

    /// The payload of the representative of `t`.
    pub fn payload(&self, t: Term) -> Option<&Payload> {
        self.data(t).payload.as_ref()
    }

    // ------------------------------------------------------------------
    // Convenience constructors.

    /// A childless, payload-free term.
    pub fn leaf(&mut self, kind: TermKind) -> Term {
        self.add(TermData::leaf(kind))
    }

    /// A term with children and no payload.
    pub fn node(&mut self, kind: TermKind, children: impl IntoIterator<Item = Term>) -> Term {
        self.add(TermData::node(kind, children))
    }

    /// A numeric constant.
    pub fn num(&mut self, value: Rational) -> Term {
        self.add(TermData::with_payload(
            TermKind::NumVal,
            [],
            Payload::Num(value),
        ))
    }

    /// An integer constant.
    pub fn int(&mut self, value: i64) -> Term {
        self.num(Rational::from_i64(value))
    }

    /// A boolean constant.
    pub fn bool_val(&mut self, value: bool) -> Term {
        self.add(TermData::with_payload(
            TermKind::BoolVal,
            [],
            Payload::Bool(value),
        ))
    }

    /// A string constant.
    pub fn str_val(&mut self, value: &str) -> Term {
        self.add(TermData::with_payload(
            TermKind::StrVal,
            [],
            Payload::Str(value.to_string()),
        ))
    }

    /// The null constant.
    pub fn null_val(&mut self) -> Term {
        self.leaf(TermKind::NullVal)
    }

    /// A symbolic variable.
    pub fn var(&mut self, name: &str) -> Term {
        self.add(TermData::with_payload(
            TermKind::Var,
            [],
            Payload::Name(name.to_string()),
        ))
    }

    /// A nominal type reference.
    pub fn nominal(&mut self, name: &str) -> Term {
        self.add(TermData::with_payload(
            TermKind::Nominal,
            [],
            Payload::Nominal(name.to_string()),
        ))
    }

    /// The complement/negation of `t`.
    pub fn not(&mut self, t: Term) -> Term {
        self.node(TermKind::Not, [t])
    }

    /// The union of two terms.
    pub fn union2(&mut self, a: Term, b: Term) -> Term {
        self.node(TermKind::Union, [a, b])
    }

    /// The intersection of two terms.
    pub fn intersect2(&mut self, a: Term, b: Term) -> Term {
        self.node(TermKind::Intersect, [a, b])
    }

    /// An array type with the given element type.
    pub fn array(&mut self, elem: Term) -> Term {
        self.node(TermKind::Array, [elem])
    }

    /// A record type or value. Fields are sorted by name here, so callers
    /// may pass them in any order.
    pub fn record(
        &mut self,
        kind: TermKind,
        fields: impl IntoIterator<Item = (String, Term)>,
        open: bool,
    ) -> Term {
        debug_assert!(matches!(kind, TermKind::Record | TermKind::RecordVal));
        let mut fields: Vec<(String, Term)> = fields.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        let names = fields.iter().map(|(n, _)| n.clone()).collect();
        let children: SmallVec<[Term; 4]> = fields.into_iter().map(|(_, t)| t).collect();
        self.add(TermData::with_payload(
            kind,
            children,
            Payload::Fields { names, open },
        ))
    }

    /// A reference type with the given referent and lifetime.
    pub fn reference(&mut self, elem: Term, lifetime: &str) -> Term {
        self.add(TermData::with_payload(
            TermKind::Ref,
            [elem],
            Payload::Name(lifetime.to_string()),
        ))
    }

    // ------------------------------------------------------------------
    // Structural operations.

    /// The set of terms reachable from `root`, representatives only.
    pub fn reachable_from(&self, root: Term) -> FxHashSet<Term> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![self.resolve(root)];
        while let Some(t) = stack.pop() {
            if !seen.insert(t) {
                continue;
            }
            for &c in self.children(t) {
                stack.push(self.resolve(c));
            }
        }
        seen
    }

    /// The subset of terms reachable from `root` that contain `from` as a
    /// (transitive) subterm. Computed as a fixpoint so that cycles are
    /// handled without special cases.
    fn terms_containing(&self, root: Term, from: Term) -> FxHashSet<Term> {
        let reachable = self.reachable_from(root);
        let mut containing = FxHashSet::default();
        if !reachable.contains(&from) {
            return containing;
        }
        containing.insert(from);
        loop {
            let mut grew = false;
            for &t in &reachable {
                if containing.contains(&t) {
                    continue;
                }
                if self
                    .children(t)
                    .iter()
                    .any(|&c| containing.contains(&self.resolve(c)))
                {
                    containing.insert(t);
                    grew = true;
                }
            }
            if !grew {
                return containing;
            }
        }
    }

    /// Structural substitution: a new root equal to `root` with every
    /// occurrence of `from` replaced by `to`. Subterms not containing
    /// `from` are shared unchanged, so the cost is proportional to the
    /// number of distinct subterms containing `from`.
    pub fn substitute(&mut self, root: Term, from: Term, to: Term) -> Term {
        let root = self.resolve(root);
        let from = self.resolve(from);
        let to = self.resolve(to);
        if root == from {
            return to;
        }
        let affected = self.terms_containing(root, from);
        if !affected.contains(&root) {
            return root;
        }
        let mut map: FxHashMap<Term, Term> = FxHashMap::default();
        map.insert(from, to);
        self.subst_rec(root, &affected, &mut map)
    }

    fn subst_rec(
        &mut self,
        t: Term,
        affected: &FxHashSet<Term>,
        map: &mut FxHashMap<Term, Term>,
    ) -> Term {
        let t = self.resolve(t);
        if let Some(&r) = map.get(&t) {
            return r;
        }
        if !affected.contains(&t) {
            return t;
        }
        let data = self.data(t).clone();
        if data.deterministic {
            // Deterministic terms are acyclic by construction, so the
            // children can be rebuilt before the parent.
            let children: SmallVec<[Term; 4]> = data
                .children
                .iter()
                .map(|&c| self.subst_rec(c, affected, map))
                .collect();
            let new = self.add(TermData {
                kind: data.kind,
                children,
                payload: data.payload,
                deterministic: data.deterministic,
            });
            map.insert(t, new);
            new
        } else {
            // Possibly on a cycle: reserve the replacement first so that
            // back-edges into `t` land on the new slot.
            let placeholder = self.reserve(data.kind);
            map.insert(t, placeholder);
            let children: Vec<Term> = data
                .children
                .iter()
                .map(|&c| self.subst_rec(c, affected, map))
                .collect();
            self.fill(placeholder, children, data.payload);
            placeholder
        }
    }

    /// Rebuild the arena keeping only terms reachable from `roots`.
    /// Returns the old-to-new index mapping; indices not in the mapping
    /// were unreachable and are gone.
    pub fn compact(&mut self, roots: &[Term]) -> CompactResult {
        let mut live: Vec<Term> = Vec::new();
        let mut seen = FxHashSet::default();
        for &r in roots {
            let mut stack = vec![self.resolve(r)];
            while let Some(t) = stack.pop() {
                if !seen.insert(t) {
                    continue;
                }
                live.push(t);
                for &c in self.children(t) {
                    stack.push(self.resolve(c));
                }
            }
        }
        // Preserve discovery order for the new indices; the order itself
        // is irrelevant as long as the mapping is consistent.
        let mut map: FxHashMap<Term, Term> = FxHashMap::default();
        for (i, &t) in live.iter().enumerate() {
            map.insert(t, Term::new(i));
        }
        let mut data = Vec::with_capacity(live.len());
        for &t in &live {
            let mut d = self.data(t).clone();
            for c in d.children.iter_mut() {
                *c = map[&self.resolve(*c)];
            }
            data.push(d);
        }
        let redirect = vec![NO_REDIRECT; data.len()];
        let mut interned = FxHashMap::default();
        for (i, d) in data.iter().enumerate() {
            if d.deterministic {
                interned.entry(d.clone()).or_insert_with(|| Term::new(i));
            }
        }
        self.data = data;
        self.redirect = redirect;
        self.interned = interned;
        CompactResult { map }
    }

    /// A displayable wrapper rendering the term in a compact textual form.
    pub fn display(&self, t: Term) -> DisplayTerm<'_> {
        DisplayTerm { graph: self, term: t }
    }

    fn fmt_term(
        &self,
        t: Term,
        f: &mut fmt::Formatter,
        on_path: &mut Vec<Term>,
    ) -> fmt::Result {
        let t = self.resolve(t);
        if on_path.contains(&t) {
            // Back-edge of a recursive type.
            return write!(f, "<{}>", t);
        }
        on_path.push(t);
        let data = self.data(t).clone();
        let result = self.fmt_data(&data, f, on_path);
        on_path.pop();
        result
    }

    fn fmt_data(
        &self,
        data: &TermData,
        f: &mut fmt::Formatter,
        on_path: &mut Vec<Term>,
    ) -> fmt::Result {
        use TermKind::*;
        let kids = &data.children;
        match data.kind {
            Void => write!(f, "void"),
            Any => write!(f, "any"),
            Null => write!(f, "null"),
            Bool => write!(f, "bool"),
            Int => write!(f, "int"),
            Real => write!(f, "real"),
            Str => write!(f, "string"),
            NullVal => write!(f, "null"),
            NumVal => write!(f, "{}", data.num().unwrap_or(Rational::ZERO)),
            BoolVal => write!(f, "{}", data.bool_val().unwrap_or(false)),
            StrVal => match data.payload {
                Some(Payload::Str(ref s)) => write!(f, "{:?}", s),
                _ => write!(f, "\"\""),
            },
            Var => write!(f, "{}", data.name().unwrap_or("?")),
            Nominal => write!(f, "{}", data.name().unwrap_or("?")),
            Array | Set | List => {
                let open = match data.kind {
                    Array => "[",
                    Set => "{",
                    _ => "<",
                };
                let close = match data.kind {
                    Array => "]",
                    Set => "}",
                    _ => ">",
                };
                write!(f, "{}", open)?;
                if let Some(&e) = kids.first() {
                    self.fmt_term(e, f, on_path)?;
                }
                write!(f, "{}", close)
            }
            Record | RecordVal => {
                write!(f, "{{")?;
                if let Some((names, open)) = data.fields() {
                    for (i, (n, &c)) in names.iter().zip(kids.iter()).enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}: ", n)?;
                        self.fmt_term(c, f, on_path)?;
                    }
                    if open {
                        write!(f, ", ...")?;
                    }
                }
                write!(f, "}}")
            }
            Tuple | TupleVal => {
                write!(f, "(")?;
                for (i, &c) in kids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.fmt_term(c, f, on_path)?;
                }
                write!(f, ")")
            }
            Ref => {
                write!(f, "&{} ", data.name().unwrap_or("*"))?;
                self.fmt_term(kids[0], f, on_path)
            }
            Not => {
                write!(f, "!")?;
                self.fmt_term(kids[0], f, on_path)
            }
            Union | Intersect | Difference => {
                let sep = match data.kind {
                    Union => " | ",
                    Intersect => " & ",
                    _ => " \\ ",
                };
                write!(f, "(")?;
                for (i, &c) in kids.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    self.fmt_term(c, f, on_path)?;
                }
                write!(f, ")")
            }
            _ => {
                // VC constructors and the rest print in functional form.
                write!(f, "{:?}", data.kind)?;
                if let Some(p) = &data.payload {
                    write!(f, "[{:?}]", p)?;
                }
                write!(f, "(")?;
                for (i, &c) in kids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.fmt_term(c, f, on_path)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Displays a term within its graph.
pub struct DisplayTerm<'a> {
    graph: &'a TermGraph,
    term: Term,
}

impl fmt::Display for DisplayTerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.graph.fmt_term(self.term, f, &mut Vec::new())
    }
}

/// The result of a compaction pass: the old-to-new index mapping.
pub struct CompactResult {
    /// Mapping from pre-compaction representatives to new indices.
    pub map: FxHashMap<Term, Term>,
}
