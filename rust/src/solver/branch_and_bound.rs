//! Depth-first branch and bound over binary variables.
//!
//! Exact for any `LinearProgram`, but exponential; meant for small
//! instances and for cross-checking the MILP backend. The search keeps an
//! explicit frame stack, so depth is bounded by memory rather than by the
//! thread's call stack. Each row tracks the
//! activity of its fixed variables plus the most negative and most positive
//! contribution the free ones could still make, so a branch is cut as soon
//! as some row can no longer be satisfied or the objective bound cannot beat
//! the incumbent.

use std::time::{Duration, Instant};

use crate::model::{LinearProgram, Sense, FEASIBILITY_TOLERANCE};
use crate::{log_checks, log_debug};

use super::{presolve, Optimizer, SolveOutcome, Solution, SolverError};

/// Objective improvements smaller than this do not replace the incumbent.
const IMPROVEMENT_TOLERANCE: f64 = 1e-9;

/// Deadline is checked once per this many nodes.
const DEADLINE_CHECK_INTERVAL: u64 = 64;

#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundOptimizer {
    node_limit: Option<u64>,
    time_limit: Option<Duration>,
    verbosity: u8,
}

impl BranchAndBoundOptimizer {
    pub fn new(node_limit: Option<u64>, time_limit: Option<Duration>, verbosity: u8) -> Self {
        Self {
            node_limit,
            time_limit,
            verbosity,
        }
    }
}

impl Optimizer for BranchAndBoundOptimizer {
    fn name(&self) -> &'static str {
        "branch_and_bound"
    }

    fn solve(&self, program: &LinearProgram) -> Result<SolveOutcome, SolverError> {
        if let Some(outcome) = presolve(program) {
            return Ok(outcome);
        }

        let mut search = Search::new(program, self);
        let order = search.branching_order();
        search.run(&order)?;

        log_checks!(
            self.verbosity,
            "branch and bound: {} nodes explored",
            search.nodes
        );
        Ok(match search.incumbent {
            Some((_, assignment)) => {
                let values = assignment
                    .into_iter()
                    .map(|set| if set { 1.0 } else { 0.0 })
                    .collect();
                SolveOutcome::Optimal(Solution::new(values, program))
            }
            None => SolveOutcome::Infeasible,
        })
    }
}

/// One branching level: `order[depth]` and how many of its values were tried.
#[derive(Debug, Clone, Copy)]
struct Frame {
    depth: usize,
    tried: usize,
    /// Value currently fixed at this level, released before the next try.
    fixed: Option<bool>,
}

/// Bound bookkeeping for one row.
#[derive(Debug, Clone, Copy)]
struct RowState {
    fixed: f64,
    free_negative: f64,
    free_positive: f64,
}

impl RowState {
    fn still_possible(&self, sense: Sense, rhs: f64) -> bool {
        let lowest = self.fixed + self.free_negative;
        let highest = self.fixed + self.free_positive;
        let can_stay_low = lowest <= rhs + FEASIBILITY_TOLERANCE;
        let can_reach = highest >= rhs - FEASIBILITY_TOLERANCE;
        match sense {
            Sense::Leq => can_stay_low,
            Sense::Geq => can_reach,
            Sense::Eq => can_stay_low && can_reach,
        }
    }
}

struct Search<'a> {
    program: &'a LinearProgram,
    /// var -> (row, coefficient)
    occurrences: Vec<Vec<(usize, f64)>>,
    rows: Vec<RowState>,
    assignment: Vec<bool>,
    objective_fixed: f64,
    objective_free_negative: f64,
    incumbent: Option<(f64, Vec<bool>)>,
    nodes: u64,
    node_limit: Option<u64>,
    deadline: Option<(Instant, Duration)>,
    verbosity: u8,
}

impl<'a> Search<'a> {
    fn new(program: &'a LinearProgram, config: &BranchAndBoundOptimizer) -> Self {
        let mut occurrences = vec![Vec::new(); program.num_vars()];
        let mut rows = Vec::with_capacity(program.constraints().len());
        for (index, row) in program.constraints().iter().enumerate() {
            let mut state = RowState {
                fixed: 0.0,
                free_negative: 0.0,
                free_positive: 0.0,
            };
            for &(var, coeff) in &row.terms {
                occurrences[var].push((index, coeff));
                if coeff < 0.0 {
                    state.free_negative += coeff;
                } else {
                    state.free_positive += coeff;
                }
            }
            rows.push(state);
        }
        let objective_free_negative: f64 = program.objective().iter().filter(|&&c| c < 0.0).sum();

        Self {
            program,
            occurrences,
            rows,
            assignment: vec![false; program.num_vars()],
            objective_fixed: 0.0,
            objective_free_negative,
            incumbent: None,
            nodes: 0,
            node_limit: config.node_limit,
            deadline: config.time_limit.map(|limit| (Instant::now(), limit)),
            verbosity: config.verbosity,
        }
    }

    /// Variables with the largest objective weight first, so worker choices
    /// are settled before the assignments that depend on them.
    fn branching_order(&self) -> Vec<usize> {
        let objective = self.program.objective();
        let mut order: Vec<usize> = (0..self.program.num_vars()).collect();
        order.sort_by(|&a, &b| {
            objective[b]
                .abs()
                .partial_cmp(&objective[a].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        order
    }

    fn lower_bound(&self) -> f64 {
        self.objective_fixed + self.objective_free_negative
    }

    fn check_budget(&self) -> Result<(), SolverError> {
        if let Some(limit) = self.node_limit {
            if self.nodes > limit {
                return Err(SolverError::NodeLimit(limit));
            }
        }
        if let Some((started, limit)) = self.deadline {
            if self.nodes % DEADLINE_CHECK_INTERVAL == 0 && started.elapsed() >= limit {
                return Err(SolverError::TimedOut(limit));
            }
        }
        Ok(())
    }

    /// Depth-first over `order`, trying the cheaper value of each variable first.
    fn run(&mut self, order: &[usize]) -> Result<(), SolverError> {
        let mut stack: Vec<Frame> = Vec::with_capacity(order.len() + 1);
        if self.enter(order, 0)? {
            stack.push(Frame {
                depth: 0,
                tried: 0,
                fixed: None,
            });
        }

        while let Some(frame) = stack.last_mut() {
            let var = order[frame.depth];
            if let Some(value) = frame.fixed.take() {
                self.release(var, value);
            }
            if frame.tried == 2 {
                stack.pop();
                continue;
            }

            let coeff = self.program.objective()[var];
            let value = if coeff < 0.0 {
                frame.tried == 0
            } else {
                frame.tried == 1
            };
            frame.tried += 1;
            frame.fixed = Some(value);
            let child = frame.depth + 1;

            if self.fix(var, value) && self.enter(order, child)? {
                stack.push(Frame {
                    depth: child,
                    tried: 0,
                    fixed: None,
                });
            }
        }
        Ok(())
    }

    /// Count a node at `depth` and decide whether it needs branching.
    ///
    /// Returns `false` for pruned nodes and for leaves, which become the
    /// new incumbent.
    fn enter(&mut self, order: &[usize], depth: usize) -> Result<bool, SolverError> {
        self.check_budget()?;
        self.nodes += 1;

        if let Some((best, _)) = &self.incumbent {
            if self.lower_bound() >= *best - IMPROVEMENT_TOLERANCE {
                return Ok(false);
            }
        }

        if depth == order.len() {
            // Every row was still possible with nothing free, so all hold
            let value = self.objective_fixed;
            log_debug!(self.verbosity, "branch and bound: incumbent {:.6}", value);
            self.incumbent = Some((value, self.assignment.clone()));
            return Ok(false);
        }
        Ok(true)
    }

    /// Fix `var`, returning whether every touched row stays satisfiable.
    fn fix(&mut self, var: usize, value: bool) -> bool {
        self.assignment[var] = value;
        let coeff = self.program.objective()[var];
        if coeff < 0.0 {
            self.objective_free_negative -= coeff;
        }
        if value {
            self.objective_fixed += coeff;
        }

        let mut possible = true;
        for &(row, a) in &self.occurrences[var] {
            let state = &mut self.rows[row];
            if a < 0.0 {
                state.free_negative -= a;
            } else {
                state.free_positive -= a;
            }
            if value {
                state.fixed += a;
            }
            let constraint = &self.program.constraints()[row];
            possible &= state.still_possible(constraint.sense, constraint.rhs);
        }
        possible
    }

    fn release(&mut self, var: usize, value: bool) {
        let coeff = self.program.objective()[var];
        if coeff < 0.0 {
            self.objective_free_negative += coeff;
        }
        if value {
            self.objective_fixed -= coeff;
        }
        for &(row, a) in &self.occurrences[var] {
            let state = &mut self.rows[row];
            if a < 0.0 {
                state.free_negative += a;
            } else {
                state.free_positive += a;
            }
            if value {
                state.fixed -= a;
            }
        }
        self.assignment[var] = false;
    }
}
