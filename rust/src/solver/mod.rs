//! Solver adapter: hands a `LinearProgram` to an optimizer backend and
//! classifies the outcome.
//!
//! Infeasibility is an ordinary outcome (`SolveOutcome::Infeasible`); only a
//! backend that could not reach a verdict produces a `SolverError`.

mod branch_and_bound;
mod milp;

pub use branch_and_bound::BranchAndBoundOptimizer;
pub use milp::MilpOptimizer;

use std::time::Duration;
use thiserror::Error;

use crate::config::{Backend, SolveSettings};
use crate::model::{LinearProgram, VarId};

/// The backend could not produce a definitive answer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Solver exceeded its time limit of {0:?}")]
    TimedOut(Duration),
    #[error("Solver gave up after exploring {0} nodes")]
    NodeLimit(u64),
    #[error("Solver reported an unbounded program")]
    Unbounded,
    #[error("Solver failed: {0}")]
    Backend(String),
    #[error("Solver thread exited without reporting a result")]
    WorkerLost,
}

/// Variable values of an optimal solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Raw values, one per variable; may be fractional within solver tolerance.
    pub values: Vec<f64>,
    pub objective_value: f64,
}

impl Solution {
    pub fn new(values: Vec<f64>, program: &LinearProgram) -> Self {
        let objective_value = program.objective_value(&values);
        Self {
            values,
            objective_value,
        }
    }

    /// Binarized value of `var`.
    #[inline]
    pub fn is_set(&self, var: VarId) -> bool {
        self.values[var] > 0.5
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal(Solution),
    Infeasible,
}

/// A backend that minimises a binary program.
pub trait Optimizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, program: &LinearProgram) -> Result<SolveOutcome, SolverError>;
}

/// Answer programs that need no search: constant rows that can never hold,
/// or no variables at all.
pub fn presolve(program: &LinearProgram) -> Option<SolveOutcome> {
    if program.trivially_infeasible().is_some() {
        return Some(SolveOutcome::Infeasible);
    }
    if program.num_vars() == 0 {
        return Some(SolveOutcome::Optimal(Solution::new(Vec::new(), program)));
    }
    None
}

/// Construct the backend selected in `settings`.
pub fn optimizer_for(settings: &SolveSettings) -> Box<dyn Optimizer> {
    match settings.backend {
        Backend::Milp => Box::new(MilpOptimizer::new(settings.time_limit, settings.verbosity)),
        Backend::BranchAndBound => Box::new(BranchAndBoundOptimizer::new(
            settings.node_limit,
            settings.time_limit,
            settings.verbosity,
        )),
    }
}
