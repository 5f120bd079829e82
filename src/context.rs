//! Execution context for query operators
//!
//! The `ExecutionContext` carries the graph scope (active/default/named
//! graphs), a stable per-execution clock, and a typed shared-state bag
//! through the operator pipeline. It is immutable during execution;
//! `push_active_graph` derives a new context rather than mutating.

use crate::term::GraphName;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// Typed shared-state bag for cross-operator coordination
///
/// Keyed by type: at most one value per type, scoped to one query
/// execution. Cloning a context shares the same bag.
#[derive(Default)]
pub struct Extensions {
    map: Mutex<HashMap<TypeId, Box<dyn Any + Send>>>,
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.map.lock().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("Extensions").field("len", &len).finish()
    }
}

impl Extensions {
    /// Store a value, replacing any previous value of the same type
    pub fn insert<T: Send + 'static>(&self, value: T) {
        self.map
            .lock()
            .expect("extensions lock poisoned")
            .insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a clone of the stored value of type `T`, if any
    pub fn get<T: Clone + Send + 'static>(&self) -> Option<T> {
        self.map
            .lock()
            .expect("extensions lock poisoned")
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
            .cloned()
    }

    /// Remove and return the stored value of type `T`, if any
    pub fn remove<T: Send + 'static>(&self) -> Option<T> {
        self.map
            .lock()
            .expect("extensions lock poisoned")
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }
}

/// Execution context providing graph scope and per-execution state
///
/// # Graph Scoping
///
/// - `active_graph` is the graph currently being matched against. When it
///   is the default-graph sentinel, BGP matching scans the *merge* of
///   `default_graphs`; when it names a specific graph, only that graph
///   matches.
/// - If the only listed default graph is itself the sentinel, the store's
///   intrinsic default graph is used.
/// - An empty `default_graphs` list with the sentinel active is a valid,
///   silent state: BGP matching produces zero results.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Graph currently being matched
    pub active_graph: GraphName,
    /// Default graphs - merged for default-graph matching
    pub default_graphs: Vec<GraphName>,
    /// Named graphs visible to GRAPH-style patterns
    pub named_graphs: Vec<GraphName>,
    /// Stable per-execution timestamp (e.g. for NOW()-style expressions)
    pub effective_now: DateTime<Utc>,
    /// Typed shared-state bag, scoped to this execution
    pub shared: Arc<Extensions>,
}

impl ExecutionContext {
    /// Create a context scoped to the store's intrinsic default graph
    pub fn new() -> Self {
        Self {
            active_graph: GraphName::DefaultGraph,
            default_graphs: vec![GraphName::DefaultGraph],
            named_graphs: Vec::new(),
            effective_now: Utc::now(),
            shared: Arc::new(Extensions::default()),
        }
    }

    /// Set the default graphs for this execution
    pub fn with_default_graphs(mut self, graphs: Vec<GraphName>) -> Self {
        self.default_graphs = graphs;
        self
    }

    /// Set the named graphs visible to this execution
    pub fn with_named_graphs(mut self, graphs: Vec<GraphName>) -> Self {
        self.named_graphs = graphs;
        self
    }

    /// Pin the effective time of this execution
    pub fn with_effective_now(mut self, now: DateTime<Utc>) -> Self {
        self.effective_now = now;
        self
    }

    /// Derive a context with a different active graph
    ///
    /// Cheap: shares the graph lists and the shared bag with the parent.
    /// Used when evaluating GRAPH-style patterns against a named graph.
    pub fn push_active_graph(&self, graph: GraphName) -> Self {
        Self {
            active_graph: graph,
            ..self.clone()
        }
    }

    /// Check if the default-graph sentinel is the active graph
    pub fn active_is_default(&self) -> bool {
        self.active_graph.is_default()
    }

    /// Create a per-item expression evaluation context
    pub fn create_expression_context(&self) -> ExpressionContext {
        ExpressionContext {
            now: self.effective_now,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Context handed to `Expression::evaluate`
///
/// Derived per item from the execution context; carries the stable
/// execution clock and the shared bag.
#[derive(Debug, Clone)]
pub struct ExpressionContext {
    /// Stable per-execution timestamp
    pub now: DateTime<Utc>,
    /// Typed shared-state bag (same bag as the execution context)
    pub shared: Arc<Extensions>,
}
