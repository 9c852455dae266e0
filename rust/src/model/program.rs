//! Solver-neutral 0/1 linear program.

use chrono::Weekday;

use super::builder::SkillId;

/// Index of a binary decision variable.
pub type VarId = usize;

/// Tolerance used when checking rows against (possibly fractional) values.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Leq,
    Geq,
    Eq,
}

/// Which family a constraint row belongs to. Indices refer to input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    SkillCoverage { task: usize, skill: SkillId },
    UtilizationLink { task: usize, worker: usize },
    DayCapacity { worker: usize, day: Weekday },
    DayAvailability { task: usize, worker: usize, day: Weekday },
    DaylessSlot { worker: usize },
    /// Fixes the worker count during the second lexicographic phase.
    WorkerCount,
}

/// `sum(coeff * var) <sense> rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coeff)| coeff * values[var])
            .sum()
    }

    pub fn holds_at(&self, activity: f64) -> bool {
        match self.sense {
            Sense::Leq => activity <= self.rhs + FEASIBILITY_TOLERANCE,
            Sense::Geq => activity >= self.rhs - FEASIBILITY_TOLERANCE,
            Sense::Eq => (activity - self.rhs).abs() <= FEASIBILITY_TOLERANCE,
        }
    }

    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        self.holds_at(self.activity(values))
    }

    /// A row without terms that no assignment can satisfy.
    pub fn is_constant_violation(&self) -> bool {
        self.terms.is_empty() && !self.holds_at(0.0)
    }
}

/// Binary program: minimise `objective · x` subject to `constraints`, `x ∈ {0,1}^n`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    num_vars: usize,
    constraints: Vec<LinearConstraint>,
    objective: Vec<f64>,
}

impl LinearProgram {
    pub fn new(num_vars: usize) -> Self {
        Self {
            num_vars,
            constraints: Vec::new(),
            objective: vec![0.0; num_vars],
        }
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn add_constraint(
        &mut self,
        kind: ConstraintKind,
        terms: Vec<(VarId, f64)>,
        sense: Sense,
        rhs: f64,
    ) {
        debug_assert!(terms.iter().all(|&(var, _)| var < self.num_vars));
        self.constraints.push(LinearConstraint {
            kind,
            terms,
            sense,
            rhs,
        });
    }

    /// Replace the objective. Coefficients beyond `num_vars` are ignored.
    pub fn set_objective(&mut self, coefficients: Vec<f64>) {
        let mut objective = coefficients;
        objective.resize(self.num_vars, 0.0);
        self.objective = objective;
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .zip(values)
            .map(|(coeff, value)| coeff * value)
            .sum()
    }

    /// First row that fails regardless of the variable values, if any.
    pub fn trivially_infeasible(&self) -> Option<&LinearConstraint> {
        self.constraints.iter().find(|c| c.is_constant_violation())
    }

    /// Rows violated by `values`.
    pub fn violated<'a>(&'a self, values: &'a [f64]) -> impl Iterator<Item = &'a LinearConstraint> {
        self.constraints
            .iter()
            .filter(move |c| !c.is_satisfied(values))
    }

    pub fn count_kind(&self, matches: impl Fn(&ConstraintKind) -> bool) -> usize {
        self.constraints.iter().filter(|c| matches(&c.kind)).count()
    }
}
