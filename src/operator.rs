//! Operator trait and base types for query execution
//!
//! Operators form a tree that produces solutions one at a time through
//! the `open/next/close` lifecycle pattern.

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::solution::Solution;
use crate::var_registry::VarId;

/// Query execution operator
///
/// Operators follow a lifecycle pattern for resource control:
/// 1. `open()` - Initialize state, open children, build indexes
/// 2. `next()` - Pull solutions until exhausted (returns None)
/// 3. `close()` - Release resources
///
/// # Schema Contract
///
/// - `schema()` returns the variables this operator may bind, fixed at
///   construction; it contains no duplicate VarIds
/// - A produced solution binds a subset of the schema (a variable can be
///   absent for any individual solution)
///
/// Call `open`, then loop on `next` until `None`, then `close`. Calling
/// `next` before `open`, or `open` twice without a `close`, is a contract
/// violation reported as an error.
pub trait Operator: Send {
    /// Output schema - which variables this operator may bind
    fn schema(&self) -> &[VarId];

    /// Initialize operator state
    ///
    /// Called once before `next()`. Opens child operators, materializes
    /// build sides, etc. Calling `open` on an exhausted operator resets it
    /// for a fresh pass.
    fn open(&mut self, ctx: &ExecutionContext) -> Result<()>;

    /// Pull the next solution
    ///
    /// Returns `Ok(Some(solution))` with a result, or `Ok(None)` when
    /// exhausted. Continues returning `Ok(None)` if called again after
    /// exhaustion.
    fn next(&mut self, ctx: &ExecutionContext) -> Result<Option<Solution>>;

    /// Release resources
    ///
    /// Called when the operator is no longer needed. Closes child
    /// operators, drops buffers. Idempotent.
    fn close(&mut self);
}

/// Boxed operator for dynamic dispatch
pub type BoxedOperator = Box<dyn Operator>;

/// Operator state for lifecycle tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    /// Not yet opened
    Created,
    /// Opened and ready to produce solutions
    Open,
    /// Exhausted (next returned None)
    Exhausted,
    /// Closed
    Closed,
}

impl OperatorState {
    /// Check if operator can be opened
    pub fn can_open(&self) -> bool {
        matches!(self, OperatorState::Created | OperatorState::Exhausted)
    }

    /// Check if operator can produce solutions
    pub fn can_next(&self) -> bool {
        matches!(self, OperatorState::Open)
    }

    /// Check if operator is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, OperatorState::Closed)
    }
}

/// Drain an operator through its full lifecycle and collect the results
///
/// Convenience for tests and embedders: opens, pulls until exhaustion,
/// closes, and returns all produced solutions.
pub fn collect(op: &mut dyn Operator, ctx: &ExecutionContext) -> Result<Vec<Solution>> {
    op.open(ctx)?;
    let mut out = Vec::new();
    while let Some(solution) = op.next(ctx)? {
        out.push(solution);
    }
    op.close();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let state = OperatorState::Created;
        assert!(state.can_open());
        assert!(!state.can_next());
        assert!(!state.is_closed());

        let state = OperatorState::Open;
        assert!(!state.can_open());
        assert!(state.can_next());

        // Exhausted operators may be re-opened for a fresh pass
        let state = OperatorState::Exhausted;
        assert!(state.can_open());
        assert!(!state.can_next());

        let state = OperatorState::Closed;
        assert!(!state.can_open());
        assert!(!state.can_next());
        assert!(state.is_closed());
    }
}
