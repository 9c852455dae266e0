//! MILP backend on top of `good_lp`.
//!
//! Each solve runs on its own named thread so a wall-clock limit can be
//! enforced from the calling side. A solve that overruns is abandoned:
//! the thread finishes in the background and its answer is dropped.

use good_lp::{
    default_solver, variable, variables, Expression, ResolutionError, Solution as _,
    SolverModel, Variable,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::model::{LinearProgram, Sense};
use crate::{log_checks, log_debug};

use super::{presolve, Optimizer, SolveOutcome, Solution, SolverError};

/// Binds the program to the `good_lp` default solver.
#[derive(Debug, Clone, Default)]
pub struct MilpOptimizer {
    time_limit: Option<Duration>,
    verbosity: u8,
}

impl MilpOptimizer {
    pub fn new(time_limit: Option<Duration>, verbosity: u8) -> Self {
        Self {
            time_limit,
            verbosity,
        }
    }
}

impl Optimizer for MilpOptimizer {
    fn name(&self) -> &'static str {
        "milp"
    }

    fn solve(&self, program: &LinearProgram) -> Result<SolveOutcome, SolverError> {
        if let Some(outcome) = presolve(program) {
            return Ok(outcome);
        }
        log_checks!(
            self.verbosity,
            "milp: {} variables, {} rows",
            program.num_vars(),
            program.constraints().len()
        );

        let job = program.clone();
        let (tx, rx) = channel();
        thread::Builder::new()
            .name("milp-solve".into())
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| run_program(&job)))
                    .unwrap_or_else(|payload| Err(SolverError::Backend(panic_message(payload))));
                // The receiver is gone if the caller already timed out
                let _ = tx.send(result);
            })
            .map_err(|e| SolverError::Backend(format!("could not start solver thread: {}", e)))?;

        let result = match self.time_limit {
            Some(limit) => match rx.recv_timeout(limit) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        limit_ms = limit.as_millis() as u64,
                        "milp solve timed out, abandoning solver thread"
                    );
                    Err(SolverError::TimedOut(limit))
                }
                Err(RecvTimeoutError::Disconnected) => Err(SolverError::WorkerLost),
            },
            None => rx.recv().unwrap_or(Err(SolverError::WorkerLost)),
        };
        if let Ok(SolveOutcome::Optimal(solution)) = &result {
            log_debug!(self.verbosity, "milp objective {:.6}", solution.objective_value);
        }
        result
    }
}

fn run_program(program: &LinearProgram) -> Result<SolveOutcome, SolverError> {
    let mut vars = variables!();
    let xs: Vec<Variable> = (0..program.num_vars())
        .map(|_| vars.add(variable().binary()))
        .collect();

    let mut objective = Expression::with_capacity(program.num_vars());
    for (&x, &coeff) in xs.iter().zip(program.objective()) {
        if coeff != 0.0 {
            objective.add_mul(coeff, x);
        }
    }

    let mut problem = vars.minimise(objective).using(default_solver);
    for row in program.constraints() {
        let mut lhs = Expression::with_capacity(row.terms.len());
        for &(var, coeff) in &row.terms {
            lhs.add_mul(coeff, xs[var]);
        }
        let constraint = match row.sense {
            Sense::Leq => lhs.leq(row.rhs),
            Sense::Geq => lhs.geq(row.rhs),
            Sense::Eq => lhs.eq(row.rhs),
        };
        problem.add_constraint(constraint);
    }

    match problem.solve() {
        Ok(solution) => {
            let values: Vec<f64> = xs.iter().map(|&x| solution.value(x)).collect();
            Ok(SolveOutcome::Optimal(Solution::new(values, program)))
        }
        Err(ResolutionError::Infeasible) => Ok(SolveOutcome::Infeasible),
        Err(ResolutionError::Unbounded) => Err(SolverError::Unbounded),
        Err(other) => Err(SolverError::Backend(other.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("solver panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("solver panicked: {}", message)
    } else {
        "solver panicked".to_string()
    }
}
