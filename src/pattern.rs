//! Pattern types for query representation
//!
//! Patterns represent the logical query structure. Each slot of a quad
//! pattern is either a bound term or a variable.

use crate::solution::Solution;
use crate::term::{GraphName, Term};
use crate::var_registry::VarId;

/// A slot in a quad pattern - variable or bound term
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternTerm {
    /// Variable binding
    Var(VarId),
    /// Constant term
    Bound(Term),
}

impl PatternTerm {
    /// Check if this slot is a variable
    pub fn is_var(&self) -> bool {
        matches!(self, PatternTerm::Var(_))
    }

    /// Check if this slot is bound (not a variable)
    pub fn is_bound(&self) -> bool {
        !self.is_var()
    }

    /// Get the variable if this is a Var slot
    pub fn as_var(&self) -> Option<VarId> {
        match self {
            PatternTerm::Var(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the term if this is a Bound slot
    pub fn as_term(&self) -> Option<&Term> {
        match self {
            PatternTerm::Bound(t) => Some(t),
            _ => None,
        }
    }

    /// Resolve this slot against a partial solution (pattern specialization)
    ///
    /// A variable already bound in the solution behaves like a bound term
    /// for the purposes of the store lookup.
    pub fn specialize<'a>(&'a self, partial: Option<&'a Solution>) -> Option<&'a Term> {
        match self {
            PatternTerm::Bound(t) => Some(t),
            PatternTerm::Var(v) => partial.and_then(|s| s.get(*v)),
        }
    }
}

impl From<Term> for PatternTerm {
    fn from(term: Term) -> Self {
        PatternTerm::Bound(term)
    }
}

impl From<VarId> for PatternTerm {
    fn from(var: VarId) -> Self {
        PatternTerm::Var(var)
    }
}

/// Graph slot of a quad pattern
///
/// `Scoped` defers to the execution context's active graph; a bound graph
/// or graph variable overrides the scope for this pattern only.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum GraphPattern {
    /// Match within the graph scope of the execution context
    #[default]
    Scoped,
    /// Match only within a specific graph
    Bound(GraphName),
    /// Bind the matched quad's named graph to a variable
    Var(VarId),
}

/// A quad pattern for matching against the store
///
/// Subject, predicate, and object slots are each either a bound term or a
/// variable; the graph slot additionally supports "use the context scope".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuadPattern {
    /// Subject slot
    pub s: PatternTerm,
    /// Predicate slot
    pub p: PatternTerm,
    /// Object slot
    pub o: PatternTerm,
    /// Graph slot
    pub g: GraphPattern,
}

impl QuadPattern {
    /// Create a triple pattern scoped to the context's active graph
    pub fn new(
        s: impl Into<PatternTerm>,
        p: impl Into<PatternTerm>,
        o: impl Into<PatternTerm>,
    ) -> Self {
        Self {
            s: s.into(),
            p: p.into(),
            o: o.into(),
            g: GraphPattern::Scoped,
        }
    }

    /// Restrict this pattern to a specific graph
    pub fn in_graph(mut self, graph: GraphName) -> Self {
        self.g = GraphPattern::Bound(graph);
        self
    }

    /// Bind the matched named graph to a variable
    pub fn with_graph_var(mut self, var: VarId) -> Self {
        self.g = GraphPattern::Var(var);
        self
    }

    /// The variables in this pattern, in (s, p, o, g) order, deduplicated
    pub fn variables(&self) -> Vec<VarId> {
        let mut vars = Vec::with_capacity(4);
        for slot in [&self.s, &self.p, &self.o] {
            if let PatternTerm::Var(v) = slot {
                if !vars.contains(v) {
                    vars.push(*v);
                }
            }
        }
        if let GraphPattern::Var(v) = &self.g {
            if !vars.contains(v) {
                vars.push(*v);
            }
        }
        vars
    }
}
