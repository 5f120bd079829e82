//! Accumulators for aggregate functions
//!
//! Each accumulator reduces a stream of evaluated expression values to one
//! result. Items arrive as `Result<Term, EvalError>` - an `Err` is a
//! recoverable per-item evaluation failure, and each accumulator type
//! declares how it reacts:
//!
//! - **Skip**: COUNT, MIN/MAX, SAMPLE ignore the failed item.
//! - **Short-circuit**: SUM and GROUP_CONCAT flag the failure (or an
//!   ill-typed value) permanently; once flagged, the result reverts to the
//!   aggregate's default and stays there regardless of later input.
//!
//! Composition (DISTINCT) is a decorator holding an inner boxed
//! accumulator, not a subclass hierarchy.

use crate::context::ExpressionContext;
use crate::error::EvalError;
use crate::expression::BoxedExpression;
use crate::solution::Solution;
use crate::sort::compare_terms;
use crate::term::Term;
use crate::var_registry::VarId;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// One evaluated input item
pub type AccumulatorInput = std::result::Result<Term, EvalError>;

/// Stateful reducer over a stream of evaluated values
pub trait Accumulator: Send {
    /// Consume one evaluated item (or its evaluation failure)
    fn accumulate(&mut self, value: AccumulatorInput);

    /// The current reduced value; `None` means unbound
    ///
    /// Stable once the owning group is finalized: no further `accumulate`
    /// calls happen after that point.
    fn result(&self) -> Option<Term>;
}

/// Boxed accumulator for per-group instantiation
pub type BoxedAccumulator = Box<dyn Accumulator>;

/// COUNT - counts items
///
/// With `count_all`, every item counts (row counting); otherwise only
/// successfully evaluated values count and failures skip.
#[derive(Debug, Default)]
pub struct CountAccumulator {
    count_all: bool,
    count: i64,
}

impl CountAccumulator {
    /// Count successfully evaluated values
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every item regardless of evaluation outcome (COUNT(*))
    pub fn all() -> Self {
        Self {
            count_all: true,
            count: 0,
        }
    }
}

impl Accumulator for CountAccumulator {
    fn accumulate(&mut self, value: AccumulatorInput) {
        if self.count_all || value.is_ok() {
            self.count += 1;
        }
    }

    fn result(&self) -> Option<Term> {
        Some(Term::integer(self.count))
    }
}

/// SUM - numeric sum with integer/double promotion
///
/// An evaluation failure or a successful non-numeric value short-circuits:
/// the result becomes unbound permanently. Summing nothing yields 0.
#[derive(Debug, Default)]
pub struct SumAccumulator {
    int_sum: i64,
    double_sum: f64,
    /// Whether every accumulated value so far was an integer
    all_integers: bool,
    started: bool,
    failed: bool,
}

impl SumAccumulator {
    /// Create an empty sum
    pub fn new() -> Self {
        Self {
            all_integers: true,
            ..Self::default()
        }
    }
}

impl Accumulator for SumAccumulator {
    fn accumulate(&mut self, value: AccumulatorInput) {
        if self.failed {
            return;
        }
        let term = match value {
            Ok(term) => term,
            Err(_) => {
                self.failed = true;
                return;
            }
        };
        let Some(n) = term.as_f64() else {
            self.failed = true;
            return;
        };
        self.started = true;
        self.double_sum += n;
        if self.all_integers {
            match term.as_i64().and_then(|i| self.int_sum.checked_add(i)) {
                Some(sum) => self.int_sum = sum,
                // Non-integer value or i64 overflow: promote to double
                None => self.all_integers = false,
            }
        }
    }

    fn result(&self) -> Option<Term> {
        if self.failed {
            return None;
        }
        if !self.started {
            return Some(Term::integer(0));
        }
        if self.all_integers {
            Some(Term::integer(self.int_sum))
        } else {
            Some(Term::double(self.double_sum))
        }
    }
}

/// Comparator over terms, as used by the extremal accumulator
pub type TermComparator = fn(&Term, &Term) -> Ordering;

/// MIN/MAX - keeps the single best value under a comparator
///
/// A candidate replaces the current value exactly when
/// `compare(current, candidate) == Greater`. Passing [`compare_terms`]
/// yields MIN; the reversed comparator yields MAX. Evaluation failures
/// skip.
pub struct ExtremalAccumulator {
    compare: TermComparator,
    best: Option<Term>,
}

impl ExtremalAccumulator {
    /// Create with an explicit comparator
    pub fn new(compare: TermComparator) -> Self {
        Self {
            compare,
            best: None,
        }
    }

    /// Minimum under the engine's term order
    pub fn min() -> Self {
        Self::new(compare_terms)
    }

    /// Maximum under the engine's term order
    pub fn max() -> Self {
        Self::new(|a, b| compare_terms(b, a))
    }
}

impl Accumulator for ExtremalAccumulator {
    fn accumulate(&mut self, value: AccumulatorInput) {
        let Ok(candidate) = value else {
            return;
        };
        match &self.best {
            None => self.best = Some(candidate),
            Some(current) => {
                if (self.compare)(current, &candidate) == Ordering::Greater {
                    self.best = Some(candidate);
                }
            }
        }
    }

    fn result(&self) -> Option<Term> {
        self.best.clone()
    }
}

/// GROUP_CONCAT - joins the lexical forms of literal values
///
/// The separator is fixed at construction. A non-literal value or an
/// evaluation failure short-circuits: the result reverts to the default
/// (empty string) permanently. The joined string is computed on demand
/// from the buffered parts.
pub struct GroupConcatAccumulator {
    separator: String,
    parts: Vec<String>,
    /// Items accumulated, including the one that tripped the short-circuit
    count: usize,
    failed: bool,
}

impl GroupConcatAccumulator {
    /// Create with an explicit separator
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            parts: Vec::new(),
            count: 0,
            failed: false,
        }
    }

    /// Items accumulated so far
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Accumulator for GroupConcatAccumulator {
    fn accumulate(&mut self, value: AccumulatorInput) {
        if self.failed {
            return;
        }
        self.count += 1;
        match value {
            Ok(term) => match term.lexical_form() {
                Some(lexical) => self.parts.push(lexical.to_string()),
                None => self.failed = true,
            },
            Err(_) => self.failed = true,
        }
    }

    fn result(&self) -> Option<Term> {
        if self.failed {
            return Some(Term::literal(""));
        }
        Some(Term::literal(self.parts.join(&self.separator)))
    }
}

/// SAMPLE - first successfully evaluated value
#[derive(Debug, Default)]
pub struct SampleAccumulator {
    value: Option<Term>,
}

impl SampleAccumulator {
    /// Create an empty sample
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulator for SampleAccumulator {
    fn accumulate(&mut self, value: AccumulatorInput) {
        if self.value.is_none() {
            if let Ok(term) = value {
                self.value = Some(term);
            }
        }
    }

    fn result(&self) -> Option<Term> {
        self.value.clone()
    }
}

/// DISTINCT decorator - suppresses duplicate values
///
/// Delegates only first-seen successful values to the inner accumulator;
/// evaluation failures pass through so the inner type's failure policy
/// applies.
pub struct DistinctAccumulator {
    inner: BoxedAccumulator,
    seen: HashSet<Term>,
}

impl DistinctAccumulator {
    /// Wrap an inner accumulator with duplicate suppression
    pub fn new(inner: BoxedAccumulator) -> Self {
        Self {
            inner,
            seen: HashSet::new(),
        }
    }
}

impl Accumulator for DistinctAccumulator {
    fn accumulate(&mut self, value: AccumulatorInput) {
        match value {
            Ok(term) => {
                if self.seen.insert(term.clone()) {
                    self.inner.accumulate(Ok(term));
                }
            }
            Err(e) => self.inner.accumulate(Err(e)),
        }
    }

    fn result(&self) -> Option<Term> {
        self.inner.result()
    }
}

/// Aggregate function selector for [`AggregateSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateKind {
    /// COUNT over the input expression
    Count,
    /// COUNT(*) - counts rows, the input expression is ignored
    CountAll,
    /// SUM
    Sum,
    /// MIN under the engine's term order
    Min,
    /// MAX under the engine's term order
    Max,
    /// GROUP_CONCAT with the given separator source
    GroupConcat(Separator),
    /// SAMPLE
    Sample,
}

/// How a GROUP_CONCAT separator is obtained
#[derive(Debug, Clone)]
pub enum Separator {
    /// A single space
    Default,
    /// An explicit string
    Literal(String),
    /// An expression evaluated once against the empty solution when the
    /// accumulator is created; a failure falls back to a single space
    Expr(BoxedExpression),
}

impl Separator {
    fn resolve(&self, ctx: &ExpressionContext) -> String {
        match self {
            Separator::Default => " ".to_string(),
            Separator::Literal(s) => s.clone(),
            Separator::Expr(expr) => expr
                .evaluate(&Solution::new(), ctx)
                .ok()
                .and_then(|t| t.lexical_form().map(str::to_string))
                .unwrap_or_else(|| " ".to_string()),
        }
    }
}

impl PartialEq for Separator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Separator::Default, Separator::Default) => true,
            (Separator::Literal(a), Separator::Literal(b)) => a == b,
            (Separator::Expr(a), Separator::Expr(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Separator {}

/// Per-query aggregate configuration
///
/// The group-by engine instantiates one fresh accumulator per group from
/// each spec. Two specs compare equal when their configuration matches
/// (same alias, kind, distinct flag, and input expression).
#[derive(Clone)]
pub struct AggregateSpec {
    /// Output variable for the aggregate result
    pub alias: VarId,
    /// Input expression, evaluated once per item
    pub expr: BoxedExpression,
    /// Which aggregate function to apply
    pub kind: AggregateKind,
    /// Whether duplicate values are suppressed (e.g. COUNT(DISTINCT ?x))
    pub distinct: bool,
}

impl AggregateSpec {
    /// Create a non-distinct aggregate
    pub fn new(alias: VarId, expr: BoxedExpression, kind: AggregateKind) -> Self {
        Self {
            alias,
            expr,
            kind,
            distinct: false,
        }
    }

    /// Enable duplicate suppression
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Instantiate a fresh accumulator for one group
    pub fn fresh(&self, ctx: &ExpressionContext) -> BoxedAccumulator {
        let inner: BoxedAccumulator = match &self.kind {
            AggregateKind::Count => Box::new(CountAccumulator::new()),
            AggregateKind::CountAll => Box::new(CountAccumulator::all()),
            AggregateKind::Sum => Box::new(SumAccumulator::new()),
            AggregateKind::Min => Box::new(ExtremalAccumulator::min()),
            AggregateKind::Max => Box::new(ExtremalAccumulator::max()),
            AggregateKind::GroupConcat(sep) => {
                Box::new(GroupConcatAccumulator::new(sep.resolve(ctx)))
            }
            AggregateKind::Sample => Box::new(SampleAccumulator::new()),
        };
        if self.distinct {
            Box::new(DistinctAccumulator::new(inner))
        } else {
            inner
        }
    }
}

impl PartialEq for AggregateSpec {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias
            && self.kind == other.kind
            && self.distinct == other.distinct
            && Arc::ptr_eq(&self.expr, &other.expr)
    }
}

impl std::fmt::Debug for AggregateSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateSpec")
            .field("alias", &self.alias)
            .field("kind", &self.kind)
            .field("distinct", &self.distinct)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::expression::{const_expr, var_expr};

    fn fail() -> AccumulatorInput {
        Err(EvalError::new("boom"))
    }

    #[test]
    fn test_count_skips_failures() {
        let mut acc = CountAccumulator::new();
        acc.accumulate(Ok(Term::integer(1)));
        acc.accumulate(fail());
        acc.accumulate(Ok(Term::integer(2)));
        assert_eq!(acc.result(), Some(Term::integer(2)));
    }

    #[test]
    fn test_count_all_counts_failures() {
        let mut acc = CountAccumulator::all();
        acc.accumulate(Ok(Term::integer(1)));
        acc.accumulate(fail());
        assert_eq!(acc.result(), Some(Term::integer(2)));
    }

    #[test]
    fn test_sum_integers() {
        let mut acc = SumAccumulator::new();
        assert_eq!(acc.result(), Some(Term::integer(0)));
        acc.accumulate(Ok(Term::integer(1)));
        acc.accumulate(Ok(Term::integer(2)));
        assert_eq!(acc.result(), Some(Term::integer(3)));
    }

    #[test]
    fn test_sum_promotes_to_double() {
        let mut acc = SumAccumulator::new();
        acc.accumulate(Ok(Term::integer(1)));
        acc.accumulate(Ok(Term::double(0.5)));
        assert_eq!(acc.result(), Some(Term::double(1.5)));
    }

    #[test]
    fn test_sum_short_circuits_permanently() {
        let mut acc = SumAccumulator::new();
        acc.accumulate(Ok(Term::integer(1)));
        acc.accumulate(Ok(Term::literal("not a number")));
        assert_eq!(acc.result(), None);
        // Later valid input does not resurrect the sum
        acc.accumulate(Ok(Term::integer(5)));
        assert_eq!(acc.result(), None);

        let mut acc = SumAccumulator::new();
        acc.accumulate(fail());
        assert_eq!(acc.result(), None);
    }

    #[test]
    fn test_extremal_replacement_convention() {
        // compare(current, candidate) == Greater triggers replacement
        let mut min = ExtremalAccumulator::min();
        min.accumulate(Ok(Term::integer(5)));
        min.accumulate(Ok(Term::integer(3)));
        min.accumulate(Ok(Term::integer(9)));
        min.accumulate(fail()); // skipped
        assert_eq!(min.result(), Some(Term::integer(3)));

        let mut max = ExtremalAccumulator::max();
        max.accumulate(Ok(Term::integer(5)));
        max.accumulate(Ok(Term::integer(3)));
        max.accumulate(Ok(Term::integer(9)));
        assert_eq!(max.result(), Some(Term::integer(9)));

        assert_eq!(ExtremalAccumulator::min().result(), None);
    }

    #[test]
    fn test_extremal_result_independent_of_input_order() {
        // Mixed numeric and non-numeric literals: the comparator is a
        // total order, so the extremum cannot depend on arrival order
        let values = [
            Term::integer(10),
            Term::literal("5x"),
            Term::integer(9),
        ];
        let orders: [[usize; 3]; 3] = [[0, 1, 2], [1, 2, 0], [2, 0, 1]];

        for order in orders {
            let mut min = ExtremalAccumulator::min();
            let mut max = ExtremalAccumulator::max();
            for i in order {
                min.accumulate(Ok(values[i].clone()));
                max.accumulate(Ok(values[i].clone()));
            }
            assert_eq!(min.result(), Some(Term::integer(9)));
            assert_eq!(max.result(), Some(Term::literal("5x")));
        }
    }

    #[test]
    fn test_group_concat_joins() {
        let mut acc = GroupConcatAccumulator::new(" ");
        for v in ["a", "b", "c"] {
            acc.accumulate(Ok(Term::literal(v)));
        }
        assert_eq!(acc.result(), Some(Term::literal("a b c")));
        assert_eq!(acc.count(), 3);

        let mut acc = GroupConcatAccumulator::new(",");
        for v in ["a", "b", "c"] {
            acc.accumulate(Ok(Term::literal(v)));
        }
        assert_eq!(acc.result(), Some(Term::literal("a,b,c")));

        // Zero items: empty string, not unbound
        assert_eq!(
            GroupConcatAccumulator::new(" ").result(),
            Some(Term::literal(""))
        );
    }

    #[test]
    fn test_group_concat_non_literal_short_circuits() {
        let mut acc = GroupConcatAccumulator::new(" ");
        acc.accumulate(Ok(Term::literal("a")));
        acc.accumulate(Ok(Term::iri("http://e/x")));
        acc.accumulate(Ok(Term::literal("b")));
        // Reverts to the default, not a partial string
        assert_eq!(acc.result(), Some(Term::literal("")));
    }

    #[test]
    fn test_sample_takes_first_success() {
        let mut acc = SampleAccumulator::new();
        acc.accumulate(fail());
        acc.accumulate(Ok(Term::literal("first")));
        acc.accumulate(Ok(Term::literal("second")));
        assert_eq!(acc.result(), Some(Term::literal("first")));
    }

    #[test]
    fn test_distinct_idempotence() {
        // Feeding the same value twice equals feeding it once
        let mut twice = DistinctAccumulator::new(Box::new(CountAccumulator::new()));
        twice.accumulate(Ok(Term::literal("a")));
        twice.accumulate(Ok(Term::literal("a")));

        let mut once = DistinctAccumulator::new(Box::new(CountAccumulator::new()));
        once.accumulate(Ok(Term::literal("a")));

        assert_eq!(twice.result(), once.result());
        assert_eq!(twice.result(), Some(Term::integer(1)));
    }

    #[test]
    fn test_distinct_passes_failures_to_inner() {
        // SUM short-circuits on failure even behind DISTINCT
        let mut acc = DistinctAccumulator::new(Box::new(SumAccumulator::new()));
        acc.accumulate(Ok(Term::integer(1)));
        acc.accumulate(fail());
        assert_eq!(acc.result(), None);
    }

    #[test]
    fn test_separator_expr_resolved_once_with_fallback() {
        let ctx = ExecutionContext::new().create_expression_context();

        let sep = Separator::Expr(const_expr(Term::literal("|")));
        assert_eq!(sep.resolve(&ctx), "|");

        // Evaluation failure (unbound variable against the empty solution)
        // falls back to a single space
        let sep = Separator::Expr(var_expr(VarId(0)));
        assert_eq!(sep.resolve(&ctx), " ");
    }

    #[test]
    fn test_spec_equality_is_configuration() {
        let expr = var_expr(VarId(1));
        let a = AggregateSpec::new(VarId(0), Arc::clone(&expr), AggregateKind::Count);
        let b = AggregateSpec::new(VarId(0), Arc::clone(&expr), AggregateKind::Count);
        assert_eq!(a, b);

        assert_ne!(a, b.clone().distinct());
        let c = AggregateSpec::new(VarId(0), Arc::clone(&expr), AggregateKind::Sum);
        assert_ne!(a, c);
        // Different expression instance: not equal
        let d = AggregateSpec::new(VarId(0), var_expr(VarId(1)), AggregateKind::Count);
        assert_ne!(a, d);
    }

    #[test]
    fn test_fresh_applies_distinct_decorator() {
        let ctx = ExecutionContext::new().create_expression_context();
        let spec =
            AggregateSpec::new(VarId(0), var_expr(VarId(1)), AggregateKind::Count).distinct();
        let mut acc = spec.fresh(&ctx);
        acc.accumulate(Ok(Term::literal("a")));
        acc.accumulate(Ok(Term::literal("a")));
        assert_eq!(acc.result(), Some(Term::integer(1)));
    }
}
