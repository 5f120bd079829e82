//! Graph-pattern query execution core
//!
//! Evaluates SPARQL-style graph-pattern queries against an RDF quad store:
//! basic graph pattern (BGP) matching, null-aware hash joins, and solution
//! grouping with an accumulator-driven aggregate framework (COUNT, SUM,
//! MIN/MAX, GROUP_CONCAT, SAMPLE, DISTINCT).
//!
//! # Architecture
//!
//! Operators form a tree evaluated bottom-up as lazy solution sequences
//! through the `open/next/close` lifecycle ([`operator::Operator`]):
//!
//! ```text
//! ScanOperator (BGP matching)
//!       |
//! HashJoinOperator (null-aware hash join)
//!       |
//! GroupByOperator (blocking: grouping + accumulation)
//! ```
//!
//! The unit flowing through every operator is a [`solution::Solution`]: an
//! immutable variable-to-term mapping with copy-on-extend semantics. A
//! variable is bound or absent; there is no null-valued entry, and an
//! unbound join variable matches everything ("no constraint").
//!
//! Storage is an external collaborator behind [`store::QuadStore`]; scalar
//! expression evaluation is an external collaborator behind
//! [`expression::Expression`]. Graph scoping (active graph, default-graph
//! merge, named graphs) travels in the [`context::ExecutionContext`].
//!
//! # Example
//!
//! ```
//! use rdf_query::prelude::*;
//! use std::sync::Arc;
//!
//! let mut store = MemoryQuadStore::new();
//! let name = Term::iri("http://example.org/name");
//! store.insert_triple(Term::iri("http://example.org/alice"), name.clone(), Term::literal("Alice"));
//! store.insert_triple(Term::iri("http://example.org/bob"), name.clone(), Term::literal("Bob"));
//!
//! let mut registry = VarRegistry::new();
//! let person = registry.get_or_insert("?person");
//! let n = registry.get_or_insert("?name");
//!
//! let mut scan = ScanOperator::new(Arc::new(store), QuadPattern::new(person, name, n));
//! let ctx = ExecutionContext::new();
//! let results = rdf_query::operator::collect(&mut scan, &ctx).unwrap();
//! assert_eq!(results.len(), 2);
//! ```

pub mod accumulator;
pub mod context;
pub mod error;
pub mod expression;
pub mod groupby;
pub mod join;
pub mod operator;
pub mod pattern;
pub mod scan;
pub mod solution;
pub mod sort;
pub mod store;
pub mod term;
pub mod var_registry;

pub use error::{EvalError, QueryError, Result};

/// Common imports for embedding the engine
pub mod prelude {
    pub use crate::accumulator::{AggregateKind, AggregateSpec, Separator};
    pub use crate::context::ExecutionContext;
    pub use crate::error::{EvalError, QueryError, Result};
    pub use crate::expression::{const_expr, var_expr, Expression};
    pub use crate::groupby::GroupByOperator;
    pub use crate::join::{HashJoinOperator, HashJoinWorker};
    pub use crate::operator::{BoxedOperator, Operator, OperatorState};
    pub use crate::pattern::{GraphPattern, PatternTerm, QuadPattern};
    pub use crate::scan::{BgpExecutor, ScanOperator};
    pub use crate::solution::Solution;
    pub use crate::store::{MemoryQuadStore, QuadStore};
    pub use crate::term::{GraphName, Quad, Term};
    pub use crate::var_registry::{VarId, VarRegistry};
}
