//! Expression evaluation contract
//!
//! Expressions compute a term from a solution. Evaluation is per-item and
//! side-effect free; failures are recoverable [`EvalError`]s, never query
//! aborts - the caller (group-by keys, aggregate inputs) decides how to
//! recover.

use crate::context::ExpressionContext;
use crate::error::EvalError;
use crate::solution::Solution;
use crate::term::Term;
use crate::var_registry::VarId;
use std::fmt;
use std::sync::Arc;

/// Result of a single expression evaluation
pub type EvalResult = std::result::Result<Term, EvalError>;

/// An expression evaluated against individual solutions
///
/// Implementations must be deterministic for a given (solution, context)
/// pair within one execution; `ctx.now` is stable for that purpose.
pub trait Expression: fmt::Debug + Send + Sync {
    /// Evaluate this expression for one solution
    fn evaluate(&self, solution: &Solution, ctx: &ExpressionContext) -> EvalResult;
}

/// Boxed expression for dynamic dispatch
pub type BoxedExpression = Arc<dyn Expression>;

/// Expression returning the value bound to a variable
///
/// Fails (recoverably) when the variable is unbound in the solution.
#[derive(Debug, Clone)]
pub struct VariableExpr {
    var: VarId,
}

impl VariableExpr {
    /// Create a variable-reference expression
    pub fn new(var: VarId) -> Self {
        Self { var }
    }

    /// The referenced variable
    pub fn var(&self) -> VarId {
        self.var
    }
}

impl Expression for VariableExpr {
    fn evaluate(&self, solution: &Solution, _ctx: &ExpressionContext) -> EvalResult {
        solution
            .get(self.var)
            .cloned()
            .ok_or_else(|| EvalError::new(format!("unbound variable #{}", self.var.0)))
    }
}

/// Expression returning a constant term
#[derive(Debug, Clone)]
pub struct ConstantExpr {
    value: Term,
}

impl ConstantExpr {
    /// Create a constant expression
    pub fn new(value: Term) -> Self {
        Self { value }
    }
}

impl Expression for ConstantExpr {
    fn evaluate(&self, _solution: &Solution, _ctx: &ExpressionContext) -> EvalResult {
        Ok(self.value.clone())
    }
}

/// Convenience constructor for a boxed variable reference
pub fn var_expr(var: VarId) -> BoxedExpression {
    Arc::new(VariableExpr::new(var))
}

/// Convenience constructor for a boxed constant
pub fn const_expr(value: Term) -> BoxedExpression {
    Arc::new(ConstantExpr::new(value))
}
