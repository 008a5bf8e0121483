//! The fixpoint rewrite engine.
//!
//! A [`Rule`] inspects one term and either proposes a replacement or
//! declines. The [`Rewriter`] sweeps the arena applying every rule to every
//! live slot until a full pass makes no change. Replacements are committed
//! as redirects, so the arena only grows during a pass; the caller compacts
//! between passes if required.
//!
//! Every rule in the provided sets is locally terminating: each successful
//! application strictly decreases the lexicographic measure (number of
//! `Not` nodes, number of non-canonical `Union`/`Intersect` nestings, term
//! size), so a fixpoint is always reached. The engine additionally honours
//! a caller-supplied step budget and reports exhaustion instead of looping,
//! which the callers surface as an indeterminate answer.

use crate::graph::TermGraph;
use crate::term::{Term, TermData};
use log::trace;
use smallvec::SmallVec;

/// A single rewrite rule.
pub trait Rule {
    /// A short name used in trace output.
    fn name(&self) -> &'static str;

    /// Attempt to rewrite `term`. Returns the replacement, or `None` when
    /// the rule does not apply. The replacement may be a fresh term or any
    /// existing one; the engine commits it as a redirect.
    fn apply(&self, graph: &mut TermGraph, term: Term) -> Option<Term>;
}

/// Caller-supplied resource limits for a rewrite run.
#[derive(Copy, Clone, Debug)]
pub struct RewriteLimits {
    /// Maximum number of successful rule applications before the engine
    /// gives up and reports `OutOfBudget`.
    pub max_steps: usize,
}

impl Default for RewriteLimits {
    fn default() -> Self {
        RewriteLimits { max_steps: 10_000 }
    }
}

/// The outcome of a rewrite run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// A fixpoint was reached after the given number of applications.
    Converged {
        /// Number of successful rule applications.
        steps: usize,
    },
    /// The step budget ran out before a fixpoint was reached. Any result
    /// computed from the graph in this state is unreliable and must be
    /// reported as indeterminate, never as proved.
    OutOfBudget {
        /// Number of successful rule applications.
        steps: usize,
    },
}

impl RewriteOutcome {
    /// Did the run reach a fixpoint?
    pub fn converged(self) -> bool {
        matches!(self, RewriteOutcome::Converged { .. })
    }
}

/// A rewrite engine: an ordered collection of rules applied to fixpoint.
///
/// The rule sets shipped in [`rules`](crate::rules) are confluent, so the
/// normal form does not depend on rule order or visitation order; the
/// property tests exercise this with permuted rule vectors.
pub struct Rewriter {
    rules: Vec<Box<dyn Rule>>,
}

impl Rewriter {
    /// Create an engine over the given rules.
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Rewriter { rules }
    }

    /// The names of the installed rules, in application order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run all rules to fixpoint over the whole graph.
    pub fn run(&self, graph: &mut TermGraph, limits: RewriteLimits) -> RewriteOutcome {
        let mut steps = 0;
        loop {
            let mut changed = false;
            // The arena can grow while we sweep; newly appended terms are
            // picked up in the same pass.
            let mut i = 0;
            while i < graph.len() {
                let t = Term::new(i);
                i += 1;
                if graph.is_redirected(t) {
                    continue;
                }
                if self.refresh(graph, t) {
                    changed = true;
                    continue;
                }
                for rule in &self.rules {
                    if steps >= limits.max_steps {
                        return RewriteOutcome::OutOfBudget { steps };
                    }
                    if let Some(replacement) = rule.apply(graph, t) {
                        let replacement = graph.resolve(replacement);
                        if replacement != t {
                            trace!(
                                "rewrite {}: {} -> {}",
                                rule.name(),
                                t,
                                graph.display(replacement)
                            );
                            graph.redirect(t, replacement);
                            steps += 1;
                            changed = true;
                            break;
                        }
                    }
                }
            }
            if !changed {
                return RewriteOutcome::Converged { steps };
            }
        }
    }

    /// Rebuild `t` if any of its children has been redirected, so that
    /// hash-consing sees through earlier rewrites. Returns true on change.
    fn refresh(&self, graph: &mut TermGraph, t: Term) -> bool {
        let stale = graph
            .children(t)
            .iter()
            .any(|&c| graph.is_redirected(c));
        if !stale {
            return false;
        }
        let data = graph.data(t).clone();
        let children: SmallVec<[Term; 4]> =
            data.children.iter().map(|&c| graph.resolve(c)).collect();
        if children.contains(&t) {
            // A recursive term: rebuilding would chase its own redirect
            // forever. The rules resolve children themselves and own the
            // contractive-cycle reductions.
            return false;
        }
        let new = graph.add(TermData {
            kind: data.kind,
            children,
            payload: data.payload,
            deterministic: data.deterministic,
        });
        if new != t {
            graph.redirect(t, new);
            true
        } else {
            false
        }
    }
}
