//! Contractivity of recursive nominal definitions.
//!
//! A nominal definition is *contractive* when unfolding it reaches a
//! structural constructor in finitely many steps — `type X is X` (or a
//! definition that reaches itself again through connectives alone) is not.
//! Only contractive nominals may be used with the emptiness engine; the
//! front end checks this once per declaration.

use crate::env::TypeEnv;
use crate::error::ResolutionError;
use rustc_hash::FxHashSet;
use verdi_ir::{Term, TermGraph, TermKind};

/// Does the recursive unfolding of `name`, with declared body `t`,
/// terminate in constructors? Connectives (`Union`, `Intersect`,
/// `Difference`, `Not`) do not guard recursion; every other kind does.
pub fn is_contractive(
    graph: &mut TermGraph,
    name: &str,
    t: Term,
    env: &TypeEnv,
) -> Result<bool, ResolutionError> {
    let mut visited = FxHashSet::default();
    visited.insert(name.to_string());
    walk(graph, name, t, &mut visited, env)
}

fn walk(
    graph: &mut TermGraph,
    name: &str,
    t: Term,
    visited: &mut FxHashSet<String>,
    env: &TypeEnv,
) -> Result<bool, ResolutionError> {
    let t = graph.resolve(t);
    match graph.kind(t) {
        TermKind::Union | TermKind::Intersect | TermKind::Difference | TermKind::Not => {
            let kids: Vec<Term> = graph.children(t).to_vec();
            for c in kids {
                if !walk(graph, name, c, visited, env)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        TermKind::Nominal => {
            let n = graph.data(t).name().unwrap_or_default().to_string();
            if n == name {
                return Ok(false);
            }
            if !visited.insert(n.clone()) {
                // Reached some other definition twice without passing a
                // constructor; its own contractivity is checked
                // separately, so the cycle here is not ours to reject.
                return Ok(true);
            }
            let body = env.resolver.resolve_type(&n, graph)?;
            walk(graph, name, body, visited, env)
        }
        _ => Ok(true),
    }
}
