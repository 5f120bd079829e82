//! BGP pattern matching against the quad store
//!
//! `BgpExecutor` matches a single quad pattern against the store under the
//! graph scope of an execution context, optionally specialized by a
//! partial solution. `ScanOperator` wraps it in the operator lifecycle so
//! scans can feed joins and group-by in a pipeline.

use crate::context::ExecutionContext;
use crate::error::{QueryError, Result};
use crate::operator::{Operator, OperatorState};
use crate::pattern::{GraphPattern, QuadPattern};
use crate::solution::Solution;
use crate::store::QuadStore;
use crate::term::{GraphName, Quad};
use crate::var_registry::VarId;
use std::collections::HashSet;
use std::sync::Arc;

/// Executes a single quad pattern against a store
///
/// Matching never errors for data absence: an empty graph scope or a
/// non-matching pattern produces an empty result set.
pub struct BgpExecutor;

impl BgpExecutor {
    /// Match a pattern, returning one solution per matching quad
    ///
    /// Variables already bound in `partial` act as constants for the store
    /// lookup (pattern specialization); each result extends `partial` with
    /// the pattern's remaining variables. A variable repeated within the
    /// pattern only matches quads carrying the same term in both slots.
    pub fn match_pattern(
        store: &dyn QuadStore,
        pattern: &QuadPattern,
        partial: Option<&Solution>,
        ctx: &ExecutionContext,
    ) -> Result<Vec<Solution>> {
        let scope = Self::resolve_scope(store, pattern, partial, ctx)?;

        let s = pattern.s.specialize(partial);
        let p = pattern.p.specialize(partial);
        let o = pattern.o.specialize(partial);

        let seed = partial.cloned().unwrap_or_default();
        let mut results = Vec::new();
        // Merging several graphs can surface the same bindings more than
        // once; graph merge is set union, so dedupe across graphs.
        let mut seen: HashSet<Solution> = HashSet::new();
        let dedupe = scope.len() > 1;

        for graph in &scope {
            for quad in store.find(Some(graph), s, p, o) {
                if let Some(solution) = Self::bind_quad(pattern, &seed, quad) {
                    if !dedupe || seen.insert(solution.clone()) {
                        results.push(solution);
                    }
                }
            }
        }
        Ok(results)
    }

    /// Resolve the concrete graphs this pattern scans
    fn resolve_scope(
        store: &dyn QuadStore,
        pattern: &QuadPattern,
        partial: Option<&Solution>,
        ctx: &ExecutionContext,
    ) -> Result<Vec<GraphName>> {
        match &pattern.g {
            GraphPattern::Bound(g) => Ok(vec![g.clone()]),
            GraphPattern::Var(v) => {
                // A bound graph variable pins the scope to that graph
                if let Some(term) = partial.and_then(|s| s.get(*v)) {
                    return Ok(vec![GraphName::named(term.clone())]);
                }
                let candidates = if ctx.named_graphs.is_empty() {
                    store.graph_names()
                } else {
                    ctx.named_graphs.clone()
                };
                // The default graph has no name to bind
                if candidates.iter().any(GraphName::is_default) {
                    return Err(QueryError::InvalidQuery(
                        "graph variable cannot range over the default graph".into(),
                    ));
                }
                Ok(candidates)
            }
            GraphPattern::Scoped => match &ctx.active_graph {
                GraphName::Named(_) => Ok(vec![ctx.active_graph.clone()]),
                GraphName::DefaultGraph => {
                    // Sentinel entries in the default list mean the store's
                    // intrinsic default graph; an empty list is an empty
                    // (valid) scope.
                    Ok(ctx.default_graphs.clone())
                }
            },
        }
    }

    /// Extend `seed` with the bindings a quad induces under `pattern`
    ///
    /// Returns `None` when the quad conflicts with existing bindings or
    /// with a variable repeated within the pattern.
    fn bind_quad(pattern: &QuadPattern, seed: &Solution, quad: &Quad) -> Option<Solution> {
        let mut solution = seed.clone();
        for (slot, term) in [
            (&pattern.s, &quad.s),
            (&pattern.p, &quad.p),
            (&pattern.o, &quad.o),
        ] {
            if let Some(v) = slot.as_var() {
                solution = solution.bind(v, term.clone())?;
            }
        }
        if let GraphPattern::Var(v) = &pattern.g {
            let name = quad.g.as_named()?;
            solution = solution.bind(*v, name.clone())?;
        }
        Some(solution)
    }
}

/// Pattern scan as a pipeline operator
///
/// Materializes matches at `open()` (the store lookup per graph is cheap
/// to drain and scope merging needs the full set for deduplication), then
/// streams them through `next()`.
pub struct ScanOperator {
    store: Arc<dyn QuadStore + Send + Sync>,
    pattern: QuadPattern,
    /// Optional seed solution specializing the pattern
    seed: Option<Solution>,
    schema: Vec<VarId>,
    state: OperatorState,
    results: std::vec::IntoIter<Solution>,
}

impl ScanOperator {
    /// Create a scan over a pattern
    pub fn new(store: Arc<dyn QuadStore + Send + Sync>, pattern: QuadPattern) -> Self {
        let schema = pattern.variables();
        Self {
            store,
            pattern,
            seed: None,
            schema,
            state: OperatorState::Created,
            results: Vec::new().into_iter(),
        }
    }

    /// Seed the scan with a partial solution
    ///
    /// Seed bindings specialize the pattern and are carried into every
    /// produced solution.
    pub fn with_seed(mut self, seed: Solution) -> Self {
        for var in seed.variables() {
            if !self.schema.contains(&var) {
                self.schema.push(var);
            }
        }
        self.seed = Some(seed);
        self
    }
}

impl Operator for ScanOperator {
    fn schema(&self) -> &[VarId] {
        &self.schema
    }

    fn open(&mut self, ctx: &ExecutionContext) -> Result<()> {
        match self.state {
            OperatorState::Open => return Err(QueryError::OperatorAlreadyOpened),
            OperatorState::Closed => return Err(QueryError::OperatorClosed),
            OperatorState::Created | OperatorState::Exhausted => {}
        }
        let matches =
            BgpExecutor::match_pattern(self.store.as_ref(), &self.pattern, self.seed.as_ref(), ctx)?;
        self.results = matches.into_iter();
        self.state = OperatorState::Open;
        Ok(())
    }

    fn next(&mut self, _ctx: &ExecutionContext) -> Result<Option<Solution>> {
        match self.state {
            OperatorState::Created => return Err(QueryError::OperatorNotOpened),
            OperatorState::Closed => return Err(QueryError::OperatorClosed),
            OperatorState::Exhausted => return Ok(None),
            OperatorState::Open => {}
        }
        match self.results.next() {
            Some(solution) => Ok(Some(solution)),
            None => {
                self.state = OperatorState::Exhausted;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.results = Vec::new().into_iter();
        self.state = OperatorState::Closed;
    }
}
