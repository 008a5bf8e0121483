//! Polynomial sum-of-products construction.
//!
//! Arithmetic in the verification-condition algebra is kept in a canonical
//! polynomial form: `Sum(bias, Bag(monomials))` where each monomial is
//! either an atom, or `Mul(coefficient, Bag(atoms))`. This module converts
//! between that term form and an explicit [`Poly`] value, which makes the
//! rewrite engine's arithmetic canonicalization a pure parse/merge/emit
//! cycle and lets the bytecode transformer build sums and products directly
//! in normal form.
//!
//! All coefficient arithmetic is checked: a conversion that would overflow
//! the rational components returns `None` and the caller leaves the term
//! unfolded.

use crate::graph::TermGraph;
use crate::rational::Rational;
use crate::term::{Term, TermData, TermKind};
use smallvec::SmallVec;

/// One monomial: a non-zero coefficient and a non-empty, sorted multiset of
/// atoms (terms opaque to arithmetic, e.g. variables or projections).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Monomial {
    /// The coefficient.
    pub coeff: Rational,
    /// The atoms, sorted by term index.
    pub atoms: Vec<Term>,
}

/// A polynomial: a constant bias plus a sum of monomials, kept sorted by
/// atom vector and merged (no two monomials share an atom vector).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Poly {
    /// The constant part.
    pub bias: Rational,
    /// The monomials, sorted by atoms.
    pub monos: Vec<Monomial>,
}

impl Poly {
    /// The constant polynomial.
    pub fn constant(value: Rational) -> Self {
        Poly {
            bias: value,
            monos: Vec::new(),
        }
    }

    /// The polynomial consisting of a single atom.
    pub fn atom(t: Term) -> Self {
        Poly {
            bias: Rational::ZERO,
            monos: vec![Monomial {
                coeff: Rational::ONE,
                atoms: vec![t],
            }],
        }
    }

    /// Is this polynomial a constant? Returns it if so.
    pub fn as_constant(&self) -> Option<Rational> {
        if self.monos.is_empty() {
            Some(self.bias)
        } else {
            None
        }
    }

    /// Checked addition.
    pub fn checked_add(&self, rhs: &Poly) -> Option<Poly> {
        let mut monos = self.monos.clone();
        for m in &rhs.monos {
            merge_mono(&mut monos, m.clone())?;
        }
        Some(Poly {
            bias: self.bias.checked_add(rhs.bias)?,
            monos,
        })
    }

    /// Checked negation.
    pub fn checked_neg(&self) -> Option<Poly> {
        let mut monos = Vec::with_capacity(self.monos.len());
        for m in &self.monos {
            monos.push(Monomial {
                coeff: m.coeff.checked_neg()?,
                atoms: m.atoms.clone(),
            });
        }
        Some(Poly {
            bias: self.bias.checked_neg()?,
            monos,
        })
    }

    /// Checked subtraction.
    pub fn checked_sub(&self, rhs: &Poly) -> Option<Poly> {
        self.checked_add(&rhs.checked_neg()?)
    }

    /// Checked multiplication (cross products of all monomials).
    pub fn checked_mul(&self, rhs: &Poly) -> Option<Poly> {
        let mut out = Poly::constant(self.bias.checked_mul(rhs.bias)?);
        for m in &rhs.monos {
            if !self.bias.is_zero() {
                merge_mono(
                    &mut out.monos,
                    Monomial {
                        coeff: self.bias.checked_mul(m.coeff)?,
                        atoms: m.atoms.clone(),
                    },
                )?;
            }
        }
        for m in &self.monos {
            if !rhs.bias.is_zero() {
                merge_mono(
                    &mut out.monos,
                    Monomial {
                        coeff: m.coeff.checked_mul(rhs.bias)?,
                        atoms: m.atoms.clone(),
                    },
                )?;
            }
            for n in &rhs.monos {
                let mut atoms = m.atoms.clone();
                atoms.extend_from_slice(&n.atoms);
                atoms.sort();
                merge_mono(
                    &mut out.monos,
                    Monomial {
                        coeff: m.coeff.checked_mul(n.coeff)?,
                        atoms,
                    },
                )?;
            }
        }
        Some(out)
    }

    /// Checked scaling by a constant.
    pub fn checked_scale(&self, k: Rational) -> Option<Poly> {
        self.checked_mul(&Poly::constant(k))
    }
}

/// Merge one monomial into a sorted monomial list, combining coefficients
/// of equal atom vectors and dropping zeros.
fn merge_mono(monos: &mut Vec<Monomial>, m: Monomial) -> Option<()> {
    if m.coeff.is_zero() {
        return Some(());
    }
    match monos.binary_search_by(|probe| probe.atoms.cmp(&m.atoms)) {
        Ok(i) => {
            let combined = monos[i].coeff.checked_add(m.coeff)?;
            if combined.is_zero() {
                monos.remove(i);
            } else {
                monos[i].coeff = combined;
            }
        }
        Err(i) => monos.insert(i, m),
    }
    Some(())
}

/// Parse a term into a polynomial. Terms outside the arithmetic fragment
/// become atoms; `None` is returned only when coefficient arithmetic would
/// overflow (the caller must then leave the term alone).
pub fn from_term(graph: &TermGraph, t: Term) -> Option<Poly> {
    let t = graph.resolve(t);
    match graph.kind(t) {
        TermKind::NumVal => {
            let v = graph.data(t).num()?;
            Some(Poly::constant(v))
        }
        TermKind::Sum => {
            let mut acc = Poly::default();
            for &c in &graph.data(t).children.clone() {
                acc = acc.checked_add(&from_operand(graph, c, true)?)?;
            }
            Some(acc)
        }
        TermKind::Mul => {
            let mut acc = Poly::constant(Rational::ONE);
            for &c in &graph.data(t).children.clone() {
                acc = acc.checked_mul(&from_operand(graph, c, false)?)?;
            }
            Some(acc)
        }
        TermKind::Div => {
            let kids = graph.data(t).children.clone();
            let num = from_term(graph, kids[0])?;
            let den = from_term(graph, kids[1])?;
            match den.as_constant() {
                Some(k) if !k.is_zero() => num.checked_scale(k.checked_recip()?),
                _ => Some(Poly::atom(t)),
            }
        }
        _ => Some(Poly::atom(t)),
    }
}

/// Parse a direct operand of `Sum`/`Mul`, expanding a `Bag` child into the
/// sum or product of its elements.
fn from_operand(graph: &TermGraph, t: Term, additive: bool) -> Option<Poly> {
    let t = graph.resolve(t);
    if graph.kind(t) != TermKind::Bag {
        return from_term(graph, t);
    }
    let kids = graph.data(t).children.clone();
    if additive {
        let mut acc = Poly::default();
        for &c in &kids {
            acc = acc.checked_add(&from_term(graph, c)?)?;
        }
        Some(acc)
    } else {
        let mut acc = Poly::constant(Rational::ONE);
        for &c in &kids {
            acc = acc.checked_mul(&from_term(graph, c)?)?;
        }
        Some(acc)
    }
}

/// Emit the canonical term form of a polynomial.
///
/// The emitted shape is stable: emitting the parse of an already-canonical
/// term reproduces the same index, which is what makes the arithmetic
/// rules terminate.
pub fn to_term(graph: &mut TermGraph, p: &Poly) -> Term {
    if p.monos.is_empty() {
        return graph.num(p.bias);
    }
    if p.bias.is_zero() && p.monos.len() == 1 {
        return mono_to_term(graph, &p.monos[0]);
    }
    let mono_terms: Vec<Term> = p.monos.iter().map(|m| mono_to_term(graph, m)).collect();
    let bias = graph.num(p.bias);
    let bag = bag(graph, mono_terms);
    graph.node(TermKind::Sum, [bias, bag])
}

fn mono_to_term(graph: &mut TermGraph, m: &Monomial) -> Term {
    debug_assert!(!m.atoms.is_empty());
    if m.coeff == Rational::ONE && m.atoms.len() == 1 {
        return m.atoms[0];
    }
    let coeff = graph.num(m.coeff);
    let atoms = bag(graph, m.atoms.clone());
    graph.node(TermKind::Mul, [coeff, atoms])
}

/// Build a canonical (sorted, deterministic) `Bag`.
fn bag(graph: &mut TermGraph, mut children: Vec<Term>) -> Term {
    for c in children.iter_mut() {
        *c = graph.resolve(*c);
    }
    children.sort();
    graph.add(TermData {
        kind: TermKind::Bag,
        children: SmallVec::from_vec(children),
        payload: None,
        deterministic: true,
    })
}

/// Convenience: the canonical difference `a - b` of two terms, when it can
/// be computed without overflow.
pub fn sub_terms(graph: &mut TermGraph, a: Term, b: Term) -> Option<Poly> {
    let pa = from_term(graph, a)?;
    let pb = from_term(graph, b)?;
    pa.checked_sub(&pb)
}

/// Convenience: emit `a + b` in canonical form, falling back to a raw
/// `Sum` node when coefficient arithmetic overflows.
pub fn add_terms(graph: &mut TermGraph, a: Term, b: Term) -> Term {
    match (from_term(graph, a), from_term(graph, b)) {
        (Some(pa), Some(pb)) => match pa.checked_add(&pb) {
            Some(p) => to_term(graph, &p),
            None => raw_binary(graph, TermKind::Sum, a, b),
        },
        _ => raw_binary(graph, TermKind::Sum, a, b),
    }
}

/// Convenience: emit `a * b` in canonical form, falling back to a raw
/// `Mul` node when coefficient arithmetic overflows.
pub fn mul_terms(graph: &mut TermGraph, a: Term, b: Term) -> Term {
    match (from_term(graph, a), from_term(graph, b)) {
        (Some(pa), Some(pb)) => match pa.checked_mul(&pb) {
            Some(p) => to_term(graph, &p),
            None => raw_binary(graph, TermKind::Mul, a, b),
        },
        _ => raw_binary(graph, TermKind::Mul, a, b),
    }
}

/// Convenience: emit `-a` in canonical form.
pub fn neg_term(graph: &mut TermGraph, a: Term) -> Term {
    match from_term(graph, a).and_then(|p| p.checked_neg()) {
        Some(p) => to_term(graph, &p),
        None => {
            let minus_one = graph.num(Rational::MINUS_ONE);
            raw_binary(graph, TermKind::Mul, minus_one, a)
        }
    }
}

fn raw_binary(graph: &mut TermGraph, kind: TermKind, a: Term, b: Term) -> Term {
    let b2 = bag(graph, vec![a, b]);
    let zero_or_one = match kind {
        TermKind::Sum => graph.num(Rational::ZERO),
        _ => graph.num(Rational::ONE),
    };
    graph.node(kind, [zero_or_one, b2])
}
