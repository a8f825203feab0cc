//! The interface the master problem and the MIP pricer need from an LP/MIP solver.

use std::time::Duration;

use crate::error::Error;

pub mod scip;

/// Handle of a variable inside one engine. Handles are dense and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

/// Handle of a linear constraint inside one engine. Handles are dense and never reused, also
/// after the constraint was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsId(pub usize);

/// Domain of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Real valued within its bounds.
    Continuous,
    /// Integer valued within its bounds.
    Integer,
    /// Restricted to `{0, 1}`; bounds passed alongside are clamped to `[0, 1]`.
    Binary,
}

/// Objective direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjSense {
    Minimize,
    Maximize,
}

/// An LP/MIP engine that models can be built in incrementally.
///
/// The model can be changed after a solve; results read after such a change refer to the
/// previous solve only until the next call to [`SolverEngine::solve`], implementations are free
/// to discard them. Callers are expected to read everything they need before mutating.
pub trait SolverEngine {
    /// Adds a variable with bounds `[lb, ub]` and objective coefficient `obj`.
    fn add_var(&mut self, name: &str, lb: f64, ub: f64, obj: f64, kind: VarKind)
    -> Result<VarId, Error>;

    /// Adds `lhs <= sum(coef * var) <= rhs`. Infinite sides are passed as `f64::INFINITY` or
    /// `f64::NEG_INFINITY`.
    fn add_linear_cons(
        &mut self,
        name: &str,
        terms: &[(VarId, f64)],
        lhs: f64,
        rhs: f64,
    ) -> Result<ConsId, Error>;

    /// Appends `coef * var` to an existing linear constraint without rebuilding it.
    fn add_coefficient(&mut self, cons: ConsId, var: VarId, coef: f64) -> Result<(), Error>;

    /// Removes a constraint. Its handle becomes invalid.
    fn remove_cons(&mut self, cons: ConsId) -> Result<(), Error>;

    /// Changes the domain of a variable, keeping `[lb, ub]` as its bounds.
    fn set_var_kind(&mut self, var: VarId, kind: VarKind, lb: f64, ub: f64) -> Result<(), Error>;

    /// Replaces the objective: variables in `terms` get the given coefficient, all others zero.
    fn set_objective(&mut self, terms: &[(VarId, f64)], sense: ObjSense) -> Result<(), Error>;

    /// Zeroes every objective coefficient.
    fn clear_objective(&mut self) -> Result<(), Error> {
        self.set_objective(&[], ObjSense::Minimize)
    }

    /// Limits the wall-clock time of every following solve. `None` removes the limit.
    fn set_time_limit(&mut self, limit: Option<Duration>) -> Result<(), Error>;

    /// Solves the current model to optimality, blocking until done.
    ///
    /// Fails with [`Error::SolverTimeout`] when the time limit fires and with
    /// [`Error::Solver`] for infeasible, unbounded or otherwise non-optimal outcomes.
    fn solve(&mut self) -> Result<(), Error>;

    /// Objective value of the last solve.
    fn objective_value(&self) -> Result<f64, Error>;

    /// Value of `var` in the last solve.
    fn var_value(&self, var: VarId) -> Result<f64, Error>;

    /// Dual value of `cons` in the last solve. Only meaningful for pure LPs.
    fn dual_value(&self, cons: ConsId) -> Result<f64, Error>;
}
