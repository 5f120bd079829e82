//! Quad store collaborator interface
//!
//! The engine consumes storage through the narrow [`QuadStore::find`]
//! contract; indexing strategy is the store's concern. A simple in-memory
//! implementation is provided for embedding and tests.

use crate::term::{GraphName, Quad, Term};
use std::collections::HashSet;

/// Narrow lookup interface over a quad store
///
/// Any argument may be `None` meaning "unconstrained". Implementations must
/// return quads in a stable enumeration order for a given store state; BGP
/// and join result ordering is defined in terms of it.
pub trait QuadStore {
    /// Find quads matching the given constraints
    ///
    /// A `None` graph matches quads in *any* graph (default and named).
    /// `Some(GraphName::DefaultGraph)` matches only the store's intrinsic
    /// default graph.
    fn find<'a>(
        &'a self,
        g: Option<&'a GraphName>,
        s: Option<&'a Term>,
        p: Option<&'a Term>,
        o: Option<&'a Term>,
    ) -> Box<dyn Iterator<Item = &'a Quad> + 'a>;

    /// The named graphs present in the store
    fn graph_names(&self) -> Vec<GraphName>;
}

/// In-memory quad store with insertion-order enumeration
///
/// Insertion order is the enumeration order, which keeps result ordering
/// deterministic in tests. Duplicate quads are ignored.
#[derive(Debug, Default)]
pub struct MemoryQuadStore {
    quads: Vec<Quad>,
    present: HashSet<Quad>,
}

impl MemoryQuadStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quad; returns false if it was already present
    pub fn insert(&mut self, quad: Quad) -> bool {
        if self.present.contains(&quad) {
            return false;
        }
        self.present.insert(quad.clone());
        self.quads.push(quad);
        true
    }

    /// Insert a triple into the default graph
    pub fn insert_triple(&mut self, s: Term, p: Term, o: Term) -> bool {
        self.insert(Quad::triple(s, p, o))
    }

    /// Number of quads in the store
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }
}

impl QuadStore for MemoryQuadStore {
    fn find<'a>(
        &'a self,
        g: Option<&'a GraphName>,
        s: Option<&'a Term>,
        p: Option<&'a Term>,
        o: Option<&'a Term>,
    ) -> Box<dyn Iterator<Item = &'a Quad> + 'a> {
        Box::new(self.quads.iter().filter(move |q| {
            g.is_none_or(|g| &q.g == g)
                && s.is_none_or(|s| &q.s == s)
                && p.is_none_or(|p| &q.p == p)
                && o.is_none_or(|o| &q.o == o)
        }))
    }

    fn graph_names(&self) -> Vec<GraphName> {
        let mut seen = HashSet::new();
        self.quads
            .iter()
            .filter_map(|q| match &q.g {
                GraphName::Named(_) if seen.insert(q.g.clone()) => Some(q.g.clone()),
                _ => None,
            })
            .collect()
    }
}
