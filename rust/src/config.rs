//! Configuration types for the allocation optimizer.

use pyo3::prelude::*;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while validating an `OptimizerConfig`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown objective mode: {0}")]
    UnknownObjective(String),
    #[error("Unknown day-less task policy: {0}")]
    UnknownDaylessPolicy(String),
    #[error("Unknown solver backend: {0}")]
    UnknownBackend(String),
    #[error("Time limit must be a positive number of seconds, got {0}")]
    InvalidTimeLimit(f64),
}

/// How the two objective criteria are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveMode {
    /// Minimise worker count, fix it, then maximise total score.
    Lexicographic,
    /// Single pass over `count - eps * score` with eps below the tie-breaking bound.
    Weighted,
}

/// How tasks without scheduled days interact with per-day capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaylessPolicy {
    /// Day-less tasks join no capacity row; a worker may take any number of them.
    Unrestricted,
    /// Day-less tasks share one slot per worker.
    SharedSlot,
}

/// Which optimizer backend answers the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `good_lp` with the bundled MILP solver.
    Milp,
    /// Built-in depth-first branch and bound, for small instances.
    BranchAndBound,
}

impl std::str::FromStr for ObjectiveMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lexicographic" => Ok(Self::Lexicographic),
            "weighted" => Ok(Self::Weighted),
            other => Err(ConfigError::UnknownObjective(other.to_string())),
        }
    }
}

impl std::str::FromStr for DaylessPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unrestricted" => Ok(Self::Unrestricted),
            "shared_slot" => Ok(Self::SharedSlot),
            other => Err(ConfigError::UnknownDaylessPolicy(other.to_string())),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "milp" => Ok(Self::Milp),
            "branch_and_bound" => Ok(Self::BranchAndBound),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Configuration for objective composition, solver selection and logging.
#[pyclass]
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    /// Objective mode: "lexicographic" or "weighted"
    #[pyo3(get, set)]
    pub objective: String,
    /// Day-less task policy: "unrestricted" or "shared_slot"
    #[pyo3(get, set)]
    pub dayless_policy: String,
    /// Solver backend: "milp" or "branch_and_bound"
    #[pyo3(get, set)]
    pub backend: String,
    /// Wall-clock limit per solve; None waits indefinitely
    #[pyo3(get, set)]
    pub time_limit_seconds: Option<f64>,
    /// Node budget for the branch-and-bound backend
    #[pyo3(get, set)]
    pub node_limit: Option<u64>,
    /// Logging verbosity (0-3)
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            objective: "lexicographic".to_string(),
            dayless_policy: "unrestricted".to_string(),
            backend: "milp".to_string(),
            time_limit_seconds: None,
            node_limit: None,
            verbosity: 0,
        }
    }
}

impl OptimizerConfig {
    /// Validate the string options into typed settings.
    pub fn settings(&self) -> Result<SolveSettings, ConfigError> {
        let time_limit = match self.time_limit_seconds {
            Some(secs) if !(secs.is_finite() && secs > 0.0) => {
                return Err(ConfigError::InvalidTimeLimit(secs));
            }
            Some(secs) => Some(
                Duration::try_from_secs_f64(secs)
                    .map_err(|_| ConfigError::InvalidTimeLimit(secs))?,
            ),
            None => None,
        };
        Ok(SolveSettings {
            objective: self.objective.parse()?,
            dayless_policy: self.dayless_policy.parse()?,
            backend: self.backend.parse()?,
            time_limit,
            node_limit: self.node_limit,
            verbosity: self.verbosity,
        })
    }
}

#[pymethods]
impl OptimizerConfig {
    #[new]
    #[pyo3(signature = (
        objective=None,
        dayless_policy=None,
        backend=None,
        time_limit_seconds=None,
        node_limit=None,
        verbosity=None
    ))]
    fn new(
        objective: Option<String>,
        dayless_policy: Option<String>,
        backend: Option<String>,
        time_limit_seconds: Option<f64>,
        node_limit: Option<u64>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            objective: objective.unwrap_or(defaults.objective),
            dayless_policy: dayless_policy.unwrap_or(defaults.dayless_policy),
            backend: backend.unwrap_or(defaults.backend),
            time_limit_seconds,
            node_limit,
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "OptimizerConfig(objective={:?}, dayless_policy={:?}, backend={:?}, time_limit_seconds={:?})",
            self.objective, self.dayless_policy, self.backend, self.time_limit_seconds
        )
    }
}

/// Validated, typed form of `OptimizerConfig`.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveSettings {
    pub objective: ObjectiveMode,
    pub dayless_policy: DaylessPolicy,
    pub backend: Backend,
    pub time_limit: Option<Duration>,
    pub node_limit: Option<u64>,
    pub verbosity: u8,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            objective: ObjectiveMode::Lexicographic,
            dayless_policy: DaylessPolicy::Unrestricted,
            backend: Backend::Milp,
            time_limit: None,
            node_limit: None,
            verbosity: 0,
        }
    }
}
