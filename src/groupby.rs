//! Group-by engine: multi-key grouping with accumulation
//!
//! `GroupByOperator` partitions its child's solutions into groups keyed by
//! evaluated grouping expressions and feeds each group's items through
//! fresh accumulator instances, one per aggregate.
//!
//! This is a **blocking operator**: the first `next()` drains the child
//! completely before yielding anything, since any later input may belong
//! to an earlier-seen group. Memory is proportional to the number of
//! distinct keys plus accumulator state.

use crate::accumulator::{AggregateSpec, BoxedAccumulator};
use crate::context::ExecutionContext;
use crate::error::{QueryError, Result};
use crate::expression::BoxedExpression;
use crate::operator::{BoxedOperator, Operator, OperatorState};
use crate::solution::Solution;
use crate::term::Term;
use crate::var_registry::{VarId, VarRegistry};
use std::collections::HashMap;

/// Group key: evaluated grouping-expression values in declared order
///
/// `None` marks a key part whose expression failed to evaluate for this
/// item. It is a distinguishing value, not a wildcard: two items group
/// together iff their key parts are pairwise equal, unbound-at-the-same-
/// position included.
type GroupKey = Vec<Option<Term>>;

/// One group under construction
struct SolutionGroup {
    key: GroupKey,
    accumulators: Vec<BoxedAccumulator>,
}

/// Grouping + aggregation as a pipeline operator
pub struct GroupByOperator {
    child: BoxedOperator,
    /// (key variable, expression) per grouping position
    group_exprs: Vec<(VarId, BoxedExpression)>,
    aggregates: Vec<AggregateSpec>,
    schema: Vec<VarId>,
    state: OperatorState,
    /// Finalized per-group results; `None` until the collection pass ran
    results: Option<std::vec::IntoIter<Solution>>,
}

impl std::fmt::Debug for GroupByOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupByOperator")
            .field("keys", &self.group_exprs.len())
            .field("aggregates", &self.aggregates)
            .field("schema", &self.schema)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl GroupByOperator {
    /// Create a group-by over a child operator
    ///
    /// Each grouping expression carries an optional alias; unaliased
    /// positions get a synthesized `.key<i>` variable through the
    /// registry. Zero grouping expressions with at least one aggregate is
    /// the implicit single group; zero of both is a contract violation.
    pub fn new(
        child: BoxedOperator,
        group_exprs: Vec<(Option<VarId>, BoxedExpression)>,
        aggregates: Vec<AggregateSpec>,
        registry: &mut VarRegistry,
    ) -> Result<Self> {
        if group_exprs.is_empty() && aggregates.is_empty() {
            return Err(QueryError::EmptyGroupBy);
        }

        let group_exprs: Vec<(VarId, BoxedExpression)> = group_exprs
            .into_iter()
            .enumerate()
            .map(|(i, (alias, expr))| {
                let var = alias.unwrap_or_else(|| registry.get_or_insert(&format!(".key{i}")));
                (var, expr)
            })
            .collect();

        let mut schema: Vec<VarId> = group_exprs.iter().map(|(v, _)| *v).collect();
        for spec in &aggregates {
            if !schema.contains(&spec.alias) {
                schema.push(spec.alias);
            }
        }

        Ok(Self {
            child,
            group_exprs,
            aggregates,
            schema,
            state: OperatorState::Created,
            results: None,
        })
    }

    /// Drain the child, partition into groups, finalize
    fn collect(&mut self, ctx: &ExecutionContext) -> Result<Vec<Solution>> {
        let span = tracing::debug_span!("groupby_collect", keys = self.group_exprs.len());
        let _g = span.enter();

        let mut key_to_group: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<SolutionGroup> = Vec::new();
        let mut input_rows = 0usize;

        while let Some(solution) = self.child.next(ctx)? {
            input_rows += 1;
            let expr_ctx = ctx.create_expression_context();

            // Evaluate key parts in declared order; a failure stops binding
            // the remaining parts for this item.
            let mut key: GroupKey = vec![None; self.group_exprs.len()];
            for (i, (_, expr)) in self.group_exprs.iter().enumerate() {
                match expr.evaluate(&solution, &expr_ctx) {
                    Ok(value) => key[i] = Some(value),
                    Err(_) => break,
                }
            }

            let group_idx = match key_to_group.get(&key) {
                Some(&idx) => idx,
                None => {
                    let idx = groups.len();
                    key_to_group.insert(key.clone(), idx);
                    groups.push(SolutionGroup {
                        key,
                        accumulators: self
                            .aggregates
                            .iter()
                            .map(|spec| spec.fresh(&expr_ctx))
                            .collect(),
                    });
                    idx
                }
            };

            let group = &mut groups[group_idx];
            for (spec, acc) in self.aggregates.iter().zip(group.accumulators.iter_mut()) {
                acc.accumulate(spec.expr.evaluate(&solution, &expr_ctx));
            }
        }

        // Aggregating over nothing still produces the implicit single
        // group (COUNT over an empty input is 0, not an empty result)
        if self.group_exprs.is_empty() && groups.is_empty() {
            let expr_ctx = ctx.create_expression_context();
            groups.push(SolutionGroup {
                key: Vec::new(),
                accumulators: self
                    .aggregates
                    .iter()
                    .map(|spec| spec.fresh(&expr_ctx))
                    .collect(),
            });
        }

        tracing::debug!(input_rows, groups = groups.len(), "group collection complete");

        // Finalize each group exactly once: key bindings (bound parts
        // only) plus aggregate results
        let mut output = Vec::with_capacity(groups.len());
        for group in groups {
            let mut solution = Solution::new();
            for ((var, _), part) in self.group_exprs.iter().zip(group.key) {
                if let Some(value) = part {
                    solution = solution.bind(*var, value).ok_or_else(|| {
                        QueryError::Internal("duplicate group key variable".into())
                    })?;
                }
            }
            for (spec, acc) in self.aggregates.iter().zip(&group.accumulators) {
                if let Some(value) = acc.result() {
                    solution = solution.bind(spec.alias, value).ok_or_else(|| {
                        QueryError::Internal("aggregate alias collides with group key".into())
                    })?;
                }
            }
            output.push(solution);
        }
        Ok(output)
    }
}

impl Operator for GroupByOperator {
    fn schema(&self) -> &[VarId] {
        &self.schema
    }

    fn open(&mut self, ctx: &ExecutionContext) -> Result<()> {
        match self.state {
            OperatorState::Open => return Err(QueryError::OperatorAlreadyOpened),
            OperatorState::Closed => return Err(QueryError::OperatorClosed),
            OperatorState::Created | OperatorState::Exhausted => {}
        }
        // Re-opening discards collected groups and forces re-collection
        self.results = None;
        self.child.open(ctx)?;
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
        if self.results.is_none() {
            let collected = self.collect(ctx)?;
            self.results = Some(collected.into_iter());
        }
        match self.results.as_mut().and_then(|it| it.next()) {
            Some(solution) => Ok(Some(solution)),
            None => {
                self.state = OperatorState::Exhausted;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.child.close();
        self.results = None;
        self.state = OperatorState::Closed;
    }
}
