//! Rust implementation of the task allocation optimizer.
//!
//! Assigns teams of workers to tasks so that every task's skills are covered,
//! nobody works two tasks on the same day, and as few workers as possible are
//! used (ties broken toward higher worker scores).

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::create_exception;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

pub mod allocator;
mod config;
pub mod days;
pub mod extract;
pub mod logging;
pub mod model;
mod models;
pub mod solver;
pub mod validation;

pub use allocator::{allocate_tasks, AllocationError, TaskAllocator};
pub use config::{
    Backend, ConfigError, DaylessPolicy, ObjectiveMode, OptimizerConfig, SolveSettings,
};
pub use days::{DayParseError, WeekdaySet};
pub use models::{AllocationResult, Task, Worker, DEFAULT_SCORE, MAX_SCORE};
pub use solver::{
    BranchAndBoundOptimizer, MilpOptimizer, Optimizer, SolveOutcome, Solution, SolverError,
};
pub use validation::{ValidationIssue, Violation};

create_exception!(
    rust,
    SolverFailure,
    PyRuntimeError,
    "The solver stopped without proving optimality or infeasibility."
);

/// Accept a list of `Task` objects or of plain dicts.
fn extract_tasks(items: &Bound<'_, PyAny>) -> PyResult<Vec<Task>> {
    let mut tasks = Vec::new();
    for item in items.iter()? {
        let item = item?;
        let task = match item.downcast::<PyDict>() {
            Ok(record) => Task::from_dict(record)?,
            Err(_) => item.extract::<Task>()?,
        };
        tasks.push(task);
    }
    Ok(tasks)
}

/// Accept a list of `Worker` objects or of plain dicts.
fn extract_workers(items: &Bound<'_, PyAny>) -> PyResult<Vec<Worker>> {
    let mut workers = Vec::new();
    for item in items.iter()? {
        let item = item?;
        let worker = match item.downcast::<PyDict>() {
            Ok(record) => Worker::from_dict(record)?,
            Err(_) => item.extract::<Worker>()?,
        };
        workers.push(worker);
    }
    Ok(workers)
}

fn settings_from(config: Option<&OptimizerConfig>) -> PyResult<SolveSettings> {
    match config {
        Some(config) => config
            .settings()
            .map_err(|e| PyValueError::new_err(e.to_string())),
        None => Ok(SolveSettings::default()),
    }
}

/// Compute the minimum-size allocation of workers to tasks.
///
/// # Arguments
/// * `tasks` - Tasks (objects or dicts with name/required_skills/scheduled_days)
/// * `workers` - Workers (objects or dicts with name/available_skills/available_days/score)
/// * `config` - Optional OptimizerConfig; defaults to lexicographic MILP
///
/// # Returns
/// * AllocationResult, or None if no allocation satisfies the constraints
///
/// # Raises
/// * ValueError for unknown day names or invalid configuration
/// * SolverFailure if the solver timed out or failed
#[pyfunction]
#[pyo3(signature = (tasks, workers, config=None))]
fn solve_task_allocation(
    py: Python<'_>,
    tasks: &Bound<'_, PyAny>,
    workers: &Bound<'_, PyAny>,
    config: Option<OptimizerConfig>,
) -> PyResult<Option<AllocationResult>> {
    let tasks = extract_tasks(tasks)?;
    let workers = extract_workers(workers)?;
    let allocator = TaskAllocator::from_settings(settings_from(config.as_ref())?);

    py.allow_threads(|| allocator.allocate(&tasks, &workers))
        .map_err(|e| SolverFailure::new_err(e.to_string()))
}

/// Check task and worker records before solving.
///
/// Returns one message per problem found; an empty list means the records are usable.
#[pyfunction]
#[pyo3(name = "validate_records")]
fn py_validate_records(
    tasks: &Bound<'_, PyAny>,
    workers: &Bound<'_, PyAny>,
) -> PyResult<Vec<String>> {
    let tasks = extract_tasks(tasks)?;
    let workers = extract_workers(workers)?;
    Ok(validation::validate_records(&tasks, &workers)
        .iter()
        .map(ToString::to_string)
        .collect())
}

/// Audit an allocation against the hard constraints.
///
/// Returns one message per violated rule; an empty list means the allocation holds.
#[pyfunction]
#[pyo3(name = "verify_allocation", signature = (tasks, workers, result, config=None))]
fn py_verify_allocation(
    tasks: &Bound<'_, PyAny>,
    workers: &Bound<'_, PyAny>,
    result: AllocationResult,
    config: Option<OptimizerConfig>,
) -> PyResult<Vec<String>> {
    let tasks = extract_tasks(tasks)?;
    let workers = extract_workers(workers)?;
    let settings = settings_from(config.as_ref())?;
    Ok(
        validation::verify_allocation(&tasks, &workers, &result, settings.dayless_policy)
            .iter()
            .map(ToString::to_string)
            .collect(),
    )
}

/// The taskalloc.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<Task>()?;
    m.add_class::<Worker>()?;
    m.add_class::<AllocationResult>()?;

    // Config types
    m.add_class::<OptimizerConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(solve_task_allocation, m)?)?;
    m.add_function(wrap_pyfunction!(py_validate_records, m)?)?;
    m.add_function(wrap_pyfunction!(py_verify_allocation, m)?)?;

    // Errors
    m.add("SolverFailure", m.py().get_type_bound::<SolverFailure>())?;

    Ok(())
}
