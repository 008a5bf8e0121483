//! Map-backed collaborator implementations, for tests and for downstream
//! consumers' tests.

use crate::env::{LifetimeRelation, NameResolver};
use crate::error::ResolutionError;
use crate::expr::TypeExpr;
use rustc_hash::FxHashMap;
use verdi_ir::{Term, TermGraph};

/// A name resolver backed by a map of [`TypeExpr`] declarations.
#[derive(Default)]
pub struct MapResolver {
    types: FxHashMap<String, TypeExpr>,
}

impl MapResolver {
    /// An empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or replace) a named type.
    pub fn define_type(&mut self, name: &str, body: TypeExpr) -> &mut Self {
        self.types.insert(name.to_string(), body);
        self
    }
}

impl NameResolver for MapResolver {
    fn resolve_type(
        &self,
        name: &str,
        graph: &mut TermGraph,
    ) -> Result<Term, ResolutionError> {
        match self.types.get(name) {
            Some(body) => Ok(body.lower(graph)),
            None => Err(ResolutionError::Unknown {
                name: name.to_string(),
            }),
        }
    }
}

/// A totally ordered lifetime relation: lifetimes earlier in the chain
/// outlive everything after them, `*` outlives everything, and every
/// lifetime outlives itself.
pub struct ChainLifetimes {
    chain: Vec<String>,
}

impl ChainLifetimes {
    /// Build a chain, outermost lifetime first.
    pub fn new(chain: &[&str]) -> Self {
        ChainLifetimes {
            chain: chain.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LifetimeRelation for ChainLifetimes {
    fn outlives(&self, a: &str, b: &str) -> bool {
        if a == b || a == "*" {
            return true;
        }
        let pa = self.chain.iter().position(|x| x == a);
        let pb = self.chain.iter().position(|x| x == b);
        match (pa, pb) {
            (Some(pa), Some(pb)) => pa <= pb,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_order() {
        let l = ChainLifetimes::new(&["a", "b", "c"]);
        assert!(l.outlives("a", "b"));
        assert!(l.outlives("a", "c"));
        assert!(!l.outlives("c", "a"));
        assert!(l.outlives("b", "b"));
        assert!(l.outlives("*", "a"));
        assert!(!l.outlives("d", "a"));
    }
}
