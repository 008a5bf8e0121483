//! The branching verifier.
//!
//! A method case is verified by walking its body symbolically: each
//! branch carries a register file of terms and a path constraint, forks at
//! conditionals, and is joined with any branch that reaches the same
//! program counter. At every assertion point — explicit `Assert` ops,
//! implicit safety conditions (division by zero, index bounds), and the
//! postcondition at `Return` — the negated condition is conjoined with the
//! path constraint and handed to the emptiness engine; if the conjunction
//! is not provably unsatisfiable, a diagnostic is recorded at the
//! bytecode's source span and verification continues, so one unverified
//! assertion does not mask later ones.
//!
//! Loops are not unrolled: entering a loop havocs the registers the body
//! modifies, assumes the invariant when one is provided, and explores the
//! body once (the back edge ends that branch) alongside a branch that
//! skips past the loop in the same havocked state.

use crate::branch::Branch;
use crate::bytecode::{
    Bytecode, Cmp, CodeBlock, CodeReader, Label, MethodCase, Namespace, Reg,
};
use crate::diagnostic::{Diagnostic, DiagnosticKind, SourceSpan};
use crate::translate;
use log::debug;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;
use verdi_ir::{Term, TermGraph, TermKind};
use verdi_types::{
    is_unsatisfiable, Answer, Budgets, LifetimeRelation, ResolutionError, TypeEnv,
};

/// An internal inconsistency in the procedure being verified. These are
/// compiler bugs (malformed bytecode reaching the verifier), reported as
/// internal-failure diagnostics, never panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// A register was read before any assignment.
    #[error("register {0} read before assignment")]
    UnassignedRegister(Reg),
    /// A branch target does not exist in the body.
    #[error("label {0} is not defined")]
    UndefinedLabel(Label),
    /// A specification block used control flow.
    #[error("control flow is not permitted in specification blocks")]
    ControlInSpec,
    /// A call's argument count does not match the callee.
    #[error("`{callee}` expects {expected} arguments, got {got}")]
    ArityMismatch {
        /// The callee's name.
        callee: String,
        /// The callee's parameter count.
        expected: usize,
        /// The number of arguments at the call site.
        got: usize,
    },
}

/// Whether a specification block's assertions are checked or assumed.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Mode {
    /// Prove each assertion against the path constraint.
    Check,
    /// Conjoin each assertion without checking (importing a
    /// postcondition, or trusting a declared precondition).
    Assume,
}

/// Verify one method case, returning its diagnostics.
///
/// The term graph is owned by this call: independent verification tasks
/// build independent graphs and share only the namespace and the lifetime
/// relation.
pub fn verify<N: Namespace>(
    case: &MethodCase,
    namespace: &N,
    lifetimes: &dyn LifetimeRelation,
    budgets: Budgets,
) -> Vec<Diagnostic> {
    let mut v = Verifier {
        graph: TermGraph::new(),
        namespace,
        lifetimes,
        budgets,
        diagnostics: Vec::new(),
        fresh: 0,
    };
    v.run(case);
    v.diagnostics
}

/// A queued branch, ordered by program counter so that branches meeting
/// at a merge point are joined before either steps past it.
struct Pending {
    seq: u64,
    branch: Branch,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.branch.pc == other.branch.pc && self.seq == other.seq
    }
}
impl Eq for Pending {}
impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and we want the smallest pc.
        other
            .branch
            .pc
            .cmp(&self.branch.pc)
            .then(other.seq.cmp(&self.seq))
    }
}

struct Verifier<'a, N: Namespace> {
    graph: TermGraph,
    namespace: &'a N,
    lifetimes: &'a dyn LifetimeRelation,
    budgets: Budgets,
    diagnostics: Vec<Diagnostic>,
    fresh: u32,
}

impl<'a, N: Namespace> Verifier<'a, N> {
    fn fresh_var(&mut self) -> Term {
        self.fresh += 1;
        let name = format!("v{}", self.fresh);
        self.graph.var(&name)
    }

    fn prove_unsat(&mut self, f: Term) -> Result<Answer, ResolutionError> {
        let env = TypeEnv {
            resolver: self.namespace,
            lifetimes: self.lifetimes,
            budgets: self.budgets,
        };
        is_unsatisfiable(&mut self.graph, f, &env)
    }

    fn reg(&self, branch: &Branch, r: Reg) -> Result<Term, VerifyError> {
        branch.get(r).ok_or(VerifyError::UnassignedRegister(r))
    }

    fn diag(&mut self, kind: DiagnosticKind, message: String, filename: &str, span: SourceSpan) {
        debug!("{}: {}", kind, message);
        self.diagnostics
            .push(Diagnostic::new(kind, message, filename, span));
    }

    /// Prove `goal` under the branch's constraint, reporting a diagnostic
    /// when the proof fails, then assume it for the code downstream.
    fn check_condition(
        &mut self,
        branch: &mut Branch,
        goal: Term,
        message: &str,
        filename: &str,
        span: SourceSpan,
    ) {
        let negated = self.graph.not(goal);
        let vc = self.graph.intersect2(branch.constraint, negated);
        match self.prove_unsat(vc) {
            Ok(Answer::Yes) => {}
            Ok(Answer::No) => {
                self.diag(
                    DiagnosticKind::UnverifiedAssertion,
                    message.to_string(),
                    filename,
                    span,
                );
            }
            Ok(Answer::Indeterminate) => {
                self.diag(
                    DiagnosticKind::Indeterminate,
                    format!("{} (budget exhausted)", message),
                    filename,
                    span,
                );
            }
            Err(e) => {
                self.diag(DiagnosticKind::ResolutionError, e.to_string(), filename, span);
            }
        }
        branch.assume(&mut self.graph, goal);
    }

    fn run(&mut self, case: &MethodCase) {
        let body = &case.body;
        let filename = body.filename().to_string();

        // Parameters start as fresh symbolic variables constrained to
        // their declared types.
        let top = self.graph.bool_val(true);
        let mut entry = Branch::new(top);
        for (i, param) in case.params.iter().enumerate() {
            let var = self.graph.var(&param.name);
            entry.set(Reg::new(i), var);
            let ty = param.ty.lower(&mut self.graph);
            let member = self.graph.node(TermKind::ElementOf, [var, ty]);
            entry.assume(&mut self.graph, member);
        }
        if let Some(pre) = &case.precondition {
            if let Err(e) = self.spec_block(pre, &mut entry, Mode::Assume, None) {
                self.diag(
                    DiagnosticKind::InternalFailure,
                    e.to_string(),
                    pre.filename(),
                    SourceSpan::default(),
                );
                return;
            }
        }

        // Label positions in the body.
        let mut labels: FxHashMap<Label, usize> = FxHashMap::default();
        for pc in 0..body.len() {
            if let Bytecode::Label { label } = body.op(pc) {
                labels.insert(*label, pc);
            }
        }

        let mut heap: BinaryHeap<Pending> = BinaryHeap::new();
        let mut seq = 0u64;
        heap.push(Pending {
            seq,
            branch: entry,
        });

        while let Some(first) = heap.pop() {
            // Join every branch parked at this program counter before
            // stepping; union of constraints, fresh variables where the
            // register files disagree.
            let mut branch = first.branch;
            loop {
                match heap.peek() {
                    Some(p) if p.branch.pc == branch.pc => {}
                    _ => break,
                }
                if let Some(other) = heap.pop() {
                    let fresh = &mut self.fresh;
                    branch = branch.merge(other.branch, &mut self.graph, |g| {
                        *fresh += 1;
                        g.var(&format!("v{}", *fresh))
                    });
                }
            }

            if branch.pc >= body.len() {
                // Exhaustion ends the branch like a value-less return.
                self.finish_branch(case, &mut branch, &filename, SourceSpan::default(), None);
                continue;
            }

            let pc = branch.pc;
            let span = body.span(pc);
            let op = body.op(pc).clone();
            match self.step(case, &labels, branch, &op, &filename, span) {
                Ok(successors) => {
                    for b in successors {
                        seq += 1;
                        heap.push(Pending { seq, branch: b });
                    }
                }
                Err(e) => {
                    self.diag(DiagnosticKind::InternalFailure, e.to_string(), &filename, span);
                    // The branch is abandoned; others continue.
                }
            }
        }
    }

    /// Execute one bytecode, returning the successor branches.
    #[allow(clippy::too_many_arguments)]
    fn step(
        &mut self,
        case: &MethodCase,
        labels: &FxHashMap<Label, usize>,
        mut branch: Branch,
        op: &Bytecode,
        filename: &str,
        span: SourceSpan,
    ) -> Result<Vec<Branch>, VerifyError> {
        let target_pc = |labels: &FxHashMap<Label, usize>, l: Label| {
            labels.get(&l).copied().ok_or(VerifyError::UndefinedLabel(l))
        };
        match op {
            Bytecode::If {
                op: cmp,
                lhs,
                rhs,
                target,
            } => {
                let l = self.reg(&branch, *lhs)?;
                let r = self.reg(&branch, *rhs)?;
                let cond = translate::cmp_term(&mut self.graph, *cmp, l, r);
                let mut taken = branch.clone();
                taken.pc = target_pc(labels, *target)?;
                taken.assume(&mut self.graph, cond);
                let negated = self.graph.not(cond);
                branch.pc += 1;
                branch.assume(&mut self.graph, negated);
                Ok(vec![taken, branch])
            }
            Bytecode::IfIs { src, ty, target } => {
                let v = self.reg(&branch, *src)?;
                let ty = ty.lower(&mut self.graph);
                let cond = self.graph.node(TermKind::ElementOf, [v, ty]);
                let mut taken = branch.clone();
                taken.pc = target_pc(labels, *target)?;
                taken.assume(&mut self.graph, cond);
                let negated = self.graph.not(cond);
                branch.pc += 1;
                branch.assume(&mut self.graph, negated);
                Ok(vec![taken, branch])
            }
            Bytecode::Goto { target } => {
                branch.pc = target_pc(labels, *target)?;
                Ok(vec![branch])
            }
            Bytecode::Label { .. } => {
                branch.pc += 1;
                Ok(vec![branch])
            }
            Bytecode::Loop {
                modified,
                invariant,
                exit,
            } => {
                for &r in modified {
                    let v = self.fresh_var();
                    branch.set(r, v);
                }
                if let Some(inv) = invariant {
                    self.spec_block(inv, &mut branch, Mode::Assume, None)?;
                }
                let mut inner = branch.clone();
                inner.pc += 1;
                branch.pc = target_pc(labels, *exit)?;
                Ok(vec![inner, branch])
            }
            Bytecode::ForAll {
                var,
                source,
                modified,
                invariant,
                exit,
            } => {
                let coll = self.reg(&branch, *source)?;
                for &r in modified {
                    let v = self.fresh_var();
                    branch.set(r, v);
                }
                let iter = self.fresh_var();
                if let Some(inv) = invariant {
                    self.spec_block(inv, &mut branch, Mode::Assume, None)?;
                }
                let mut inner = branch.clone();
                inner.set(*var, iter);
                let member = self.graph.node(TermKind::ElementOf, [iter, coll]);
                inner.assume(&mut self.graph, member);
                inner.pc += 1;
                branch.pc = target_pc(labels, *exit)?;
                Ok(vec![inner, branch])
            }
            Bytecode::LoopEnd => {
                // The back edge: this exploration of the body is done.
                Ok(vec![])
            }
            Bytecode::Assert { op: cmp, lhs, rhs, msg } => {
                let l = self.reg(&branch, *lhs)?;
                let r = self.reg(&branch, *rhs)?;
                let goal = translate::cmp_term(&mut self.graph, *cmp, l, r);
                self.check_condition(&mut branch, goal, msg, filename, span);
                branch.pc += 1;
                Ok(vec![branch])
            }
            Bytecode::Return { value } => {
                let result = match value {
                    Some(r) => Some(self.reg(&branch, *r)?),
                    None => None,
                };
                self.finish_branch(case, &mut branch, filename, span, result);
                Ok(vec![])
            }
            Bytecode::Throw { .. } => Ok(vec![]),
            Bytecode::Invoke { dst, name, args } => {
                self.invoke(&mut branch, *dst, name, args, filename, span)?;
                branch.pc += 1;
                Ok(vec![branch])
            }
            Bytecode::Nop | Bytecode::Debug { .. } => {
                branch.pc += 1;
                Ok(vec![branch])
            }
            _ => {
                // Everything else is a value computation.
                self.eval_value_op(op, &mut branch, filename, span)?;
                branch.pc += 1;
                Ok(vec![branch])
            }
        }
    }

    /// A branch reached `Return` (or ran off the end): check the
    /// postcondition with the result bound to the register after the last
    /// parameter, reporting failures at the returning op's span.
    fn finish_branch(
        &mut self,
        case: &MethodCase,
        branch: &mut Branch,
        filename: &str,
        span: SourceSpan,
        result: Option<Term>,
    ) {
        let post = match &case.postcondition {
            Some(p) => p.clone(),
            None => return,
        };
        let result = match result {
            Some(t) => t,
            None => self.graph.null_val(),
        };
        branch.set(Reg::new(case.params.len()), result);
        if let Err(e) = self.spec_block(&post, branch, Mode::Check, Some((filename, span))) {
            self.diag(DiagnosticKind::InternalFailure, e.to_string(), filename, span);
        }
    }

    /// Import a callee's postcondition at a call site: havoc the result,
    /// substitute formals with actuals by running the postcondition block
    /// over the argument terms, and assume the accumulated constraint.
    fn invoke(
        &mut self,
        branch: &mut Branch,
        dst: Option<Reg>,
        name: &str,
        args: &[Reg],
        filename: &str,
        span: SourceSpan,
    ) -> Result<(), VerifyError> {
        let callee = match self.namespace.resolve_method(name) {
            Ok(c) => c,
            Err(e) => {
                self.diag(DiagnosticKind::ResolutionError, e.to_string(), filename, span);
                if let Some(d) = dst {
                    let v = self.fresh_var();
                    branch.set(d, v);
                }
                return Ok(());
            }
        };
        if callee.params.len() != args.len() {
            return Err(VerifyError::ArityMismatch {
                callee: name.to_string(),
                expected: callee.params.len(),
                got: args.len(),
            });
        }
        let result = self.fresh_var();
        if let Some(post) = &callee.postcondition {
            let mut frame = Branch::new(branch.constraint);
            for (i, &a) in args.iter().enumerate() {
                let t = self.reg(branch, a)?;
                frame.set(Reg::new(i), t);
            }
            frame.set(Reg::new(callee.params.len()), result);
            self.spec_block(post, &mut frame, Mode::Assume, None)?;
            branch.constraint = frame.constraint;
        }
        if let Some(d) = dst {
            branch.set(d, result);
        }
        Ok(())
    }

    /// Run a specification block (precondition, postcondition, loop
    /// invariant) over a branch. Specification blocks are straight-line:
    /// value computations plus `Assert`. In check mode each assertion is
    /// proved (reported at `report_at` when given, e.g. the `Return` that
    /// triggered a postcondition check); in assume mode assertions
    /// conjoin unchecked.
    fn spec_block(
        &mut self,
        block: &CodeBlock,
        branch: &mut Branch,
        mode: Mode,
        report_at: Option<(&str, SourceSpan)>,
    ) -> Result<(), VerifyError> {
        for pc in 0..block.len() {
            let op = block.op(pc).clone();
            let span = block.span(pc);
            match &op {
                Bytecode::Assert { op: cmp, lhs, rhs, msg } => {
                    let l = self.reg(branch, *lhs)?;
                    let r = self.reg(branch, *rhs)?;
                    let goal = translate::cmp_term(&mut self.graph, *cmp, l, r);
                    match mode {
                        Mode::Assume => branch.assume(&mut self.graph, goal),
                        Mode::Check => {
                            let (file, at) = report_at.unwrap_or((block.filename(), span));
                            self.check_condition(branch, goal, msg, file, at);
                        }
                    }
                }
                Bytecode::Nop | Bytecode::Debug { .. } => {}
                Bytecode::If { .. }
                | Bytecode::IfIs { .. }
                | Bytecode::Goto { .. }
                | Bytecode::Label { .. }
                | Bytecode::Loop { .. }
                | Bytecode::ForAll { .. }
                | Bytecode::LoopEnd
                | Bytecode::Return { .. }
                | Bytecode::Throw { .. }
                | Bytecode::Invoke { .. } => return Err(VerifyError::ControlInSpec),
                _ => {
                    self.eval_value_op(&op, branch, block.filename(), span)?;
                }
            }
        }
        Ok(())
    }

    /// Execute one value-producing bytecode on a branch, emitting the
    /// implicit safety conditions where they arise.
    fn eval_value_op(
        &mut self,
        op: &Bytecode,
        branch: &mut Branch,
        filename: &str,
        span: SourceSpan,
    ) -> Result<(), VerifyError> {
        match op {
            Bytecode::Const { dst, value } => {
                let t = translate::const_term(&mut self.graph, value);
                branch.set(*dst, t);
            }
            Bytecode::Assign { dst, src } | Bytecode::Move { dst, src } => {
                let t = self.reg(branch, *src)?;
                branch.set(*dst, t);
            }
            Bytecode::Convert { dst, src } => {
                // Identity at the term level.
                let t = self.reg(branch, *src)?;
                branch.set(*dst, t);
            }
            Bytecode::UnOp { op, dst, src } => {
                let s = self.reg(branch, *src)?;
                let t = translate::unop_term(&mut self.graph, *op, s);
                branch.set(*dst, t);
            }
            Bytecode::BinOp { op, dst, lhs, rhs } => {
                let l = self.reg(branch, *lhs)?;
                let r = self.reg(branch, *rhs)?;
                if *op == crate::bytecode::BinOp::Div {
                    // Implicit safety condition: the divisor is non-zero.
                    let zero = self.graph.int(0);
                    let nonzero = translate::cmp_term(&mut self.graph, Cmp::Ne, r, zero);
                    self.check_condition(
                        branch,
                        nonzero,
                        "possible division by zero",
                        filename,
                        span,
                    );
                }
                let t = translate::binop_term(&mut self.graph, *op, l, r);
                branch.set(*dst, t);
            }
            Bytecode::SetOp { op, dst, lhs, rhs } => {
                let l = self.reg(branch, *lhs)?;
                let r = self.reg(branch, *rhs)?;
                let t = translate::setop_term(&mut self.graph, *op, l, r);
                branch.set(*dst, t);
            }
            Bytecode::NewList { dst, args } => {
                let elems = self.reg_list(branch, args)?;
                let t = self.graph.node(TermKind::ListVal, elems);
                branch.set(*dst, t);
            }
            Bytecode::NewSet { dst, args } => {
                let elems = self.reg_list(branch, args)?;
                let t = self.graph.node(TermKind::SetVal, elems);
                branch.set(*dst, t);
            }
            Bytecode::NewTuple { dst, args } => {
                let elems = self.reg_list(branch, args)?;
                let t = self.graph.node(TermKind::TupleVal, elems);
                branch.set(*dst, t);
            }
            Bytecode::NewRecord { dst, fields } => {
                let mut named = Vec::with_capacity(fields.len());
                for (n, r) in fields {
                    named.push((n.clone(), self.reg(branch, *r)?));
                }
                let t = self.graph.record(TermKind::RecordVal, named, false);
                branch.set(*dst, t);
            }
            Bytecode::FieldLoad { dst, src, field } => {
                let s = self.reg(branch, *src)?;
                let t = translate::field_load(&mut self.graph, s, field);
                branch.set(*dst, t);
            }
            Bytecode::TupleLoad { dst, src, index } => {
                let s = self.reg(branch, *src)?;
                let t = translate::tuple_load(&mut self.graph, s, *index);
                branch.set(*dst, t);
            }
            Bytecode::IndexOf { dst, src, index } => {
                let s = self.reg(branch, *src)?;
                let i = self.reg(branch, *index)?;
                // Implicit safety conditions: 0 <= index < |src|.
                let zero = self.graph.int(0);
                let lower = translate::cmp_term(&mut self.graph, Cmp::Ge, i, zero);
                self.check_condition(branch, lower, "possible negative index", filename, span);
                let len = self.graph.node(TermKind::LengthOf, [s]);
                let upper = translate::cmp_term(&mut self.graph, Cmp::Lt, i, len);
                self.check_condition(
                    branch,
                    upper,
                    "possible index out of bounds",
                    filename,
                    span,
                );
                let t = self.graph.node(TermKind::IndexOf, [s, i]);
                branch.set(*dst, t);
            }
            Bytecode::LengthOf { dst, src } => {
                let s = self.reg(branch, *src)?;
                let t = self.graph.node(TermKind::LengthOf, [s]);
                branch.set(*dst, t);
            }
            Bytecode::Update { dst, path, value } => {
                let root = self.reg(branch, *dst)?;
                let v = self.reg(branch, *value)?;
                let mut elems = Vec::with_capacity(path.len());
                for e in path {
                    elems.push(match e {
                        crate::bytecode::LvalElem::Field(f) => {
                            translate::PathElem::Field(f.clone())
                        }
                        crate::bytecode::LvalElem::Index(r) => {
                            translate::PathElem::Index(self.reg(branch, *r)?)
                        }
                    });
                }
                let t = translate::update_term(&mut self.graph, root, &elems, v);
                branch.set(*dst, t);
            }
            Bytecode::Dereference { dst, .. }
            | Bytecode::Invert { dst, .. }
            | Bytecode::SubList { dst, .. }
            | Bytecode::SubString { dst, .. }
            | Bytecode::MapLoad { dst, .. }
            | Bytecode::MapStore { dst, .. } => {
                // The transformation for these bytecodes is unspecified
                // upstream; havoc the destination rather than guess.
                self.diag(
                    DiagnosticKind::Indeterminate,
                    "bytecode has no specified transformation; treating result as unknown"
                        .to_string(),
                    filename,
                    span,
                );
                let v = self.fresh_var();
                branch.set(*dst, v);
            }
            Bytecode::IndirectInvoke { dst, .. } => {
                self.diag(
                    DiagnosticKind::Indeterminate,
                    "indirect calls have no specified transformation; treating result as unknown"
                        .to_string(),
                    filename,
                    span,
                );
                if let Some(d) = dst {
                    let v = self.fresh_var();
                    branch.set(*d, v);
                }
            }
            _ => {
                debug_assert!(false, "non-value op in eval_value_op: {:?}", op);
            }
        }
        Ok(())
    }

    fn reg_list(&self, branch: &Branch, regs: &[Reg]) -> Result<Vec<Term>, VerifyError> {
        regs.iter().map(|&r| self.reg(branch, r)).collect()
    }
}
