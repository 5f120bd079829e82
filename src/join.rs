//! Null-aware hash join
//!
//! `HashJoinWorker` indexes a materialized right-hand solution set by its
//! join variables and answers probe requests for left solutions.
//! "Null-aware" means an unbound join variable constrains nothing: a
//! solution leaving a join variable unbound is compatible with every value
//! on the other side, so hash lookup alone cannot drive the match - each
//! per-variable index keeps a separate list of rows unbound in that
//! variable, and probes union it into the candidate set.
//!
//! `HashJoinOperator` wraps the worker in the operator lifecycle:
//! materialize right child at `open()`, stream the left child through the
//! worker.

use crate::context::ExecutionContext;
use crate::error::{QueryError, Result};
use crate::operator::{BoxedOperator, Operator, OperatorState};
use crate::solution::Solution;
use crate::term::Term;
use crate::var_registry::VarId;
use std::collections::{HashMap, VecDeque};

/// Per-variable index over the right solution set
#[derive(Debug, Default)]
struct VarIndex {
    /// Row indices per bound value, each list in ascending row order
    bound: HashMap<Term, Vec<usize>>,
    /// Rows unbound in this variable, ascending
    unbound: Vec<usize>,
}

/// Reusable probe index over a materialized right-hand solution set
///
/// Build once, probe many times. Probing never mutates the worker, so one
/// worker serves an entire left-side stream.
pub struct HashJoinWorker {
    right: Vec<Solution>,
    join_vars: Vec<VarId>,
    indexes: Vec<VarIndex>,
}

impl std::fmt::Debug for HashJoinWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashJoinWorker")
            .field("rows", &self.right.len())
            .field("join_vars", &self.join_vars)
            .finish_non_exhaustive()
    }
}

impl HashJoinWorker {
    /// Build the probe index over `right` for the given join variables
    ///
    /// Errors with [`QueryError::ZeroJoinVariables`]: a join with no shared
    /// variables is a cross product and must be modeled explicitly.
    pub fn build(right: Vec<Solution>, join_vars: &[VarId]) -> Result<Self> {
        if join_vars.is_empty() {
            return Err(QueryError::ZeroJoinVariables);
        }

        let mut indexes: Vec<VarIndex> = join_vars.iter().map(|_| VarIndex::default()).collect();
        for (row, solution) in right.iter().enumerate() {
            for (var, index) in join_vars.iter().zip(indexes.iter_mut()) {
                match solution.get(*var) {
                    Some(value) => index.bound.entry(value.clone()).or_default().push(row),
                    None => index.unbound.push(row),
                }
            }
        }

        tracing::debug!(
            rows = right.len(),
            join_vars = join_vars.len(),
            buckets = indexes.iter().map(|i| i.bound.len()).sum::<usize>(),
            "hash join index built"
        );

        Ok(Self {
            right,
            join_vars: join_vars.to_vec(),
            indexes,
        })
    }

    /// The indexed right-hand solutions
    pub fn right_len(&self) -> usize {
        self.right.len()
    }

    /// Find all merged solutions for a left probe
    ///
    /// Results follow the right set's insertion order. Candidates are
    /// narrowed per join variable (value bucket plus unbound rows; an
    /// unbound left variable narrows nothing), intersected, then run
    /// through the full compatibility check - the index is a filter, the
    /// check is the contract.
    pub fn find(&self, left: &Solution) -> Vec<Solution> {
        if self.right.is_empty() {
            return Vec::new();
        }

        // None = unconstrained so far
        let mut candidates: Option<Vec<usize>> = None;
        for (var, index) in self.join_vars.iter().zip(self.indexes.iter()) {
            let Some(value) = left.get(*var) else {
                continue;
            };
            let bucket = index.bound.get(value).map(Vec::as_slice).unwrap_or(&[]);
            let narrowed = merge_sorted(bucket, &index.unbound);
            candidates = Some(match candidates {
                None => narrowed,
                Some(current) => intersect_sorted(&current, &narrowed),
            });
            if matches!(candidates.as_deref(), Some([])) {
                return Vec::new();
            }
        }

        let rows: Vec<usize> = match candidates {
            Some(rows) => rows,
            // Left binds none of the join variables: everything matches
            None => (0..self.right.len()).collect(),
        };

        rows.into_iter()
            .filter_map(|row| {
                let right = &self.right[row];
                if left.compatible(right) {
                    left.merge(right)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Union of two ascending index lists
fn merge_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Intersection of two ascending index lists
fn intersect_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Hash join as a pipeline operator
///
/// The right child is the build side: fully materialized at `open()`, then
/// the left child streams through the worker. Join variables are the
/// variables shared by both schemas.
pub struct HashJoinOperator {
    left: BoxedOperator,
    right: BoxedOperator,
    join_vars: Vec<VarId>,
    schema: Vec<VarId>,
    state: OperatorState,
    worker: Option<HashJoinWorker>,
    /// Matches for the current left row, drained before pulling the next
    pending: VecDeque<Solution>,
}

impl std::fmt::Debug for HashJoinOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashJoinOperator")
            .field("join_vars", &self.join_vars)
            .field("schema", &self.schema)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl HashJoinOperator {
    /// Create a hash join over two children
    ///
    /// Join variables are the intersection of the child schemas; disjoint
    /// schemas are rejected as [`QueryError::InvalidQuery`] (that join is
    /// a cross product, model it explicitly).
    pub fn new(left: BoxedOperator, right: BoxedOperator) -> Result<Self> {
        let join_vars: Vec<VarId> = left
            .schema()
            .iter()
            .filter(|v| right.schema().contains(v))
            .copied()
            .collect();
        if join_vars.is_empty() {
            return Err(QueryError::InvalidQuery(
                "hash join children share no variables".into(),
            ));
        }

        let mut schema = left.schema().to_vec();
        for var in right.schema() {
            if !schema.contains(var) {
                schema.push(*var);
            }
        }

        Ok(Self {
            left,
            right,
            join_vars,
            schema,
            state: OperatorState::Created,
            worker: None,
            pending: VecDeque::new(),
        })
    }
}

impl Operator for HashJoinOperator {
    fn schema(&self) -> &[VarId] {
        &self.schema
    }

    fn open(&mut self, ctx: &ExecutionContext) -> Result<()> {
        match self.state {
            OperatorState::Open => return Err(QueryError::OperatorAlreadyOpened),
            OperatorState::Closed => return Err(QueryError::OperatorClosed),
            OperatorState::Created | OperatorState::Exhausted => {}
        }

        // Materialize the build side
        self.right.open(ctx)?;
        let mut rows = Vec::new();
        while let Some(solution) = self.right.next(ctx)? {
            rows.push(solution);
        }
        self.worker = Some(HashJoinWorker::build(rows, &self.join_vars)?);

        self.left.open(ctx)?;
        self.pending.clear();
        self.state = OperatorState::Open;
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext) -> Result<Option<Solution>> {
        match self.state {
            OperatorState::Created => return Err(QueryError::OperatorNotOpened),
            OperatorState::Closed => return Err(QueryError::OperatorClosed),
            OperatorState::Exhausted => return Ok(None),
            OperatorState::Open => {}
        }
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| QueryError::Internal("hash join open without worker".into()))?;

        loop {
            if let Some(solution) = self.pending.pop_front() {
                return Ok(Some(solution));
            }
            // Empty build side can never match
            if worker.right_len() == 0 {
                self.state = OperatorState::Exhausted;
                return Ok(None);
            }
            match self.left.next(ctx)? {
                Some(left) => self.pending.extend(worker.find(&left)),
                None => {
                    self.state = OperatorState::Exhausted;
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.worker = None;
        self.pending.clear();
        self.state = OperatorState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sol(pairs: &[(u16, &str)]) -> Solution {
        pairs
            .iter()
            .map(|(v, t)| (VarId(*v), Term::literal(*t)))
            .collect()
    }

    #[test]
    fn test_build_requires_join_vars() {
        let err = HashJoinWorker::build(vec![Solution::new()], &[]).unwrap_err();
        assert!(matches!(err, QueryError::ZeroJoinVariables));
    }

    #[test]
    fn test_find_matches_on_value() {
        let right = vec![
            sol(&[(0, "a"), (1, "r1")]),
            sol(&[(0, "b"), (1, "r2")]),
            sol(&[(0, "a"), (1, "r3")]),
        ];
        let worker = HashJoinWorker::build(right, &[VarId(0)]).unwrap();

        let matches = worker.find(&sol(&[(0, "a"), (2, "left")]));
        assert_eq!(matches.len(), 2);
        // Right insertion order preserved
        assert_eq!(matches[0].get(VarId(1)), Some(&Term::literal("r1")));
        assert_eq!(matches[1].get(VarId(1)), Some(&Term::literal("r3")));
        // Merge carries both sides
        assert_eq!(matches[0].get(VarId(2)), Some(&Term::literal("left")));

        assert!(worker.find(&sol(&[(0, "zzz")])).is_empty());
    }

    #[test]
    fn test_unbound_right_rows_match_everything() {
        let right = vec![
            sol(&[(0, "a"), (1, "bound-a")]),
            sol(&[(1, "no-key")]), // unbound in the join variable
        ];
        let worker = HashJoinWorker::build(right, &[VarId(0)]).unwrap();

        let matches = worker.find(&sol(&[(0, "a")]));
        assert_eq!(matches.len(), 2);
        // The unbound row merged with the left binding: var 0 is now "a"
        assert_eq!(matches[1].get(VarId(0)), Some(&Term::literal("a")));
        assert_eq!(matches[1].get(VarId(1)), Some(&Term::literal("no-key")));

        // A value with no bucket still matches the unbound row
        let matches = worker.find(&sol(&[(0, "other")]));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].get(VarId(1)), Some(&Term::literal("no-key")));
    }

    #[test]
    fn test_unbound_left_matches_everything() {
        let right = vec![sol(&[(0, "a")]), sol(&[(0, "b")])];
        let worker = HashJoinWorker::build(right, &[VarId(0)]).unwrap();

        // Left leaves the join variable unbound: all right rows match
        let matches = worker.find(&sol(&[(5, "unrelated")]));
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_multi_variable_intersection() {
        let right = vec![
            sol(&[(0, "a"), (1, "x")]),
            sol(&[(0, "a"), (1, "y")]),
            sol(&[(0, "b"), (1, "x")]),
            sol(&[(1, "x")]), // unbound in var 0
        ];
        let worker = HashJoinWorker::build(right, &[VarId(0), VarId(1)]).unwrap();

        // Must match on both variables; the var-0-unbound row matches via
        // its null list
        let matches = worker.find(&sol(&[(0, "a"), (1, "x")]));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0], sol(&[(0, "a"), (1, "x")]));
        assert_eq!(matches[1], sol(&[(0, "a"), (1, "x")]));
    }

    #[test]
    fn test_compatibility_filter_on_non_join_vars() {
        // Shared variable 2 is not a join variable; the safety-net
        // compatibility check still rejects the conflict.
        let right = vec![sol(&[(0, "a"), (2, "right-only")])];
        let worker = HashJoinWorker::build(right, &[VarId(0)]).unwrap();

        let matches = worker.find(&sol(&[(0, "a"), (2, "left-only")]));
        assert!(matches.is_empty());
    }

    #[test]
    fn test_empty_right_short_circuits() {
        let worker = HashJoinWorker::build(Vec::new(), &[VarId(0)]).unwrap();
        assert!(worker.find(&sol(&[(0, "a")])).is_empty());
        assert!(worker.find(&Solution::new()).is_empty());
    }

    #[test]
    fn test_worker_reusable_across_probes() {
        let right = vec![sol(&[(0, "a")]), sol(&[(0, "b")])];
        let worker = HashJoinWorker::build(right, &[VarId(0)]).unwrap();

        for _ in 0..3 {
            assert_eq!(worker.find(&sol(&[(0, "a")])).len(), 1);
            assert_eq!(worker.find(&sol(&[(0, "b")])).len(), 1);
        }
    }

    mod operator {
        use super::*;
        use crate::operator::collect;
        use crate::scan::ScanOperator;
        use crate::pattern::QuadPattern;
        use crate::store::MemoryQuadStore;
        use crate::var_registry::VarRegistry;
        use std::sync::Arc;

        fn ex(name: &str) -> Term {
            Term::iri(format!("http://example.org/{name}"))
        }

        #[test]
        fn test_hash_join_operator_over_scans() {
            let mut store = MemoryQuadStore::new();
            store.insert_triple(ex("alice"), ex("name"), Term::literal("Alice"));
            store.insert_triple(ex("bob"), ex("name"), Term::literal("Bob"));
            store.insert_triple(ex("alice"), ex("age"), Term::integer(30));
            let store = Arc::new(store);

            let mut reg = VarRegistry::new();
            let person = reg.get_or_insert("?person");
            let name = reg.get_or_insert("?name");
            let age = reg.get_or_insert("?age");

            let left = ScanOperator::new(
                Arc::clone(&store) as _,
                QuadPattern::new(person, ex("name"), name),
            );
            let right = ScanOperator::new(
                Arc::clone(&store) as _,
                QuadPattern::new(person, ex("age"), age),
            );

            let mut join = HashJoinOperator::new(Box::new(left), Box::new(right)).unwrap();
            assert_eq!(join.schema(), &[person, name, age]);

            let ctx = ExecutionContext::new();
            let results = collect(&mut join, &ctx).unwrap();
            // Only alice has an age
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].get(name), Some(&Term::literal("Alice")));
            assert_eq!(results[0].get(age), Some(&Term::integer(30)));
        }

        #[test]
        fn test_disjoint_schemas_rejected() {
            let store = Arc::new(MemoryQuadStore::new());
            let mut reg = VarRegistry::new();
            let a = reg.get_or_insert("?a");
            let b = reg.get_or_insert("?b");

            let left = ScanOperator::new(
                Arc::clone(&store) as _,
                QuadPattern::new(a, ex("p"), ex("o")),
            );
            let right = ScanOperator::new(
                Arc::clone(&store) as _,
                QuadPattern::new(b, ex("q"), ex("o")),
            );

            let err = HashJoinOperator::new(Box::new(left), Box::new(right)).unwrap_err();
            assert!(matches!(err, QueryError::InvalidQuery(_)));
        }
    }
}
