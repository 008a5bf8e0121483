//! Per-path symbolic state.
//!
//! A branch is one symbolic execution thread: a program counter, the
//! current term for each register, and the running path constraint (the
//! conjunction of facts assumed along the way). Branches are cloned at
//! control-flow splits; when two branches meet at the same program
//! counter they are joined by taking the union of their constraints, with
//! disagreeing registers rebound through a fresh variable equated to each
//! side's value under that side's constraint.
//!
//! Branches never share mutable state; the term graph they build into is
//! append-only for the duration of a verification task.

use crate::bytecode::Reg;
use verdi_ir::{Term, TermGraph};

/// One symbolic execution thread.
#[derive(Clone, Debug)]
pub struct Branch {
    /// The program counter into the body.
    pub pc: usize,
    /// The path constraint.
    pub constraint: Term,
    regs: Vec<Option<Term>>,
}

impl Branch {
    /// A branch at pc 0 with the given initial constraint.
    pub fn new(constraint: Term) -> Self {
        Branch {
            pc: 0,
            constraint,
            regs: Vec::new(),
        }
    }

    /// The current term for a register, if assigned.
    pub fn get(&self, r: Reg) -> Option<Term> {
        self.regs.get(r.index()).copied().flatten()
    }

    /// Bind a register.
    pub fn set(&mut self, r: Reg, t: Term) {
        if r.index() >= self.regs.len() {
            self.regs.resize(r.index() + 1, None);
        }
        self.regs[r.index()] = Some(t);
    }

    /// Conjoin a fact onto the path constraint.
    pub fn assume(&mut self, graph: &mut TermGraph, fact: Term) {
        self.constraint = graph.intersect2(self.constraint, fact);
    }

    /// Join two branches parked at the same program counter. Registers
    /// that agree are kept; registers that differ are rebound to a fresh
    /// variable equated with each side's value under that side's
    /// constraint, and the constraints union.
    pub fn merge(
        mut self,
        mut other: Branch,
        graph: &mut TermGraph,
        mut fresh: impl FnMut(&mut TermGraph) -> Term,
    ) -> Branch {
        debug_assert_eq!(self.pc, other.pc);
        let width = self.regs.len().max(other.regs.len());
        let mut regs = Vec::with_capacity(width);
        for i in 0..width {
            let a = self.regs.get(i).copied().flatten();
            let b = other.regs.get(i).copied().flatten();
            regs.push(match (a, b) {
                (Some(x), Some(y)) if graph.resolve(x) == graph.resolve(y) => Some(x),
                (Some(x), Some(y)) => {
                    let v = fresh(graph);
                    let ex = graph.node(verdi_ir::TermKind::Equals, [v, x]);
                    let ey = graph.node(verdi_ir::TermKind::Equals, [v, y]);
                    self.constraint = graph.intersect2(self.constraint, ex);
                    other.constraint = graph.intersect2(other.constraint, ey);
                    Some(v)
                }
                // Assigned along one path only: dead after the join.
                _ => None,
            });
        }
        let constraint = graph.union2(self.constraint, other.constraint);
        Branch {
            pc: self.pc,
            constraint,
            regs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdi_ir::TermKind;

    #[test]
    fn registers_grow_on_demand() {
        let mut g = TermGraph::new();
        let t = g.bool_val(true);
        let mut b = Branch::new(t);
        assert_eq!(b.get(Reg::new(2)), None);
        let x = g.var("x");
        b.set(Reg::new(2), x);
        assert_eq!(b.get(Reg::new(2)), Some(x));
        assert_eq!(b.get(Reg::new(0)), None);
    }

    #[test]
    fn merge_rebinds_disagreements() {
        let mut g = TermGraph::new();
        let top = g.bool_val(true);
        let mut a = Branch::new(top);
        let mut b = Branch::new(top);
        let one = g.int(1);
        let two = g.int(2);
        let x = g.var("x");
        a.set(Reg::new(0), one);
        a.set(Reg::new(1), x);
        b.set(Reg::new(0), two);
        b.set(Reg::new(1), x);
        let mut counter = 0;
        let merged = a.merge(b, &mut g, |g| {
            counter += 1;
            g.var(&format!("m{}", counter))
        });
        // r1 agreed and is kept; r0 disagreed and was rebound.
        assert_eq!(merged.get(Reg::new(1)), Some(x));
        let v = merged.get(Reg::new(0)).unwrap();
        assert_eq!(g.kind(v), TermKind::Var);
        assert_eq!(g.kind(merged.constraint), TermKind::Union);
    }
}
