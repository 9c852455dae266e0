//! Core data types for the allocation system.

use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyString};
use std::collections::HashMap;

use crate::days::WeekdaySet;

// Note: We use std HashMap here for PyO3 interface compatibility

/// Score given to workers whose record carries none.
pub const DEFAULT_SCORE: i32 = 5;
/// Upper end of the worker score range (the lower end is 0).
pub const MAX_SCORE: i32 = 10;

/// A production task that needs a team covering its skills.
#[pyclass]
#[derive(Clone, Debug)]
pub struct Task {
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub required_skills: Vec<String>,
    /// Empty means the task is not tied to any day.
    #[pyo3(get, set)]
    pub scheduled_days: WeekdaySet,
}

#[pymethods]
impl Task {
    #[new]
    #[pyo3(signature = (name, required_skills=None, scheduled_days=None))]
    fn new(
        name: String,
        required_skills: Option<Vec<String>>,
        scheduled_days: Option<WeekdaySet>,
    ) -> Self {
        Self {
            name,
            required_skills: required_skills.unwrap_or_default(),
            scheduled_days: scheduled_days.unwrap_or_default(),
        }
    }

    /// Build a task from the store's dict shape, defaulting missing fields.
    #[staticmethod]
    pub fn from_dict(record: &Bound<'_, PyDict>) -> PyResult<Self> {
        Ok(Self {
            name: required_name(record)?,
            required_skills: optional_labels(record, "required_skills")?,
            scheduled_days: optional_days(record, "scheduled_days")?,
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(name={:?}, skills={}, days={:?})",
            self.name,
            self.required_skills.len(),
            self.scheduled_days
        )
    }
}

/// A worker who can be placed on task teams.
#[pyclass]
#[derive(Clone, Debug)]
pub struct Worker {
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub available_skills: Vec<String>,
    /// Empty means never available for day-bound tasks.
    #[pyo3(get, set)]
    pub available_days: WeekdaySet,
    /// Preference score in 0..=10; higher is preferred among equal-sized teams.
    #[pyo3(get, set)]
    pub score: i32,
}

#[pymethods]
impl Worker {
    #[new]
    #[pyo3(signature = (name, available_skills=None, available_days=None, score=DEFAULT_SCORE))]
    fn new(
        name: String,
        available_skills: Option<Vec<String>>,
        available_days: Option<WeekdaySet>,
        score: i32,
    ) -> Self {
        Self {
            name,
            available_skills: available_skills.unwrap_or_default(),
            available_days: available_days.unwrap_or_default(),
            score,
        }
    }

    /// Build a worker from the store's dict shape, defaulting missing fields.
    #[staticmethod]
    pub fn from_dict(record: &Bound<'_, PyDict>) -> PyResult<Self> {
        let score = match record.get_item("score")? {
            Some(value) if !value.is_none() => value.extract()?,
            _ => DEFAULT_SCORE,
        };
        Ok(Self {
            name: required_name(record)?,
            available_skills: optional_labels(record, "available_skills")?,
            available_days: optional_days(record, "available_days")?,
            score,
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "Worker(name={:?}, skills={}, days={:?}, score={})",
            self.name,
            self.available_skills.len(),
            self.available_days,
            self.score
        )
    }
}

/// Outcome of a successful allocation.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AllocationResult {
    /// Task name -> names of the workers on its team. Every task is a key.
    #[pyo3(get, set)]
    pub assignments: HashMap<String, Vec<String>>,
    #[pyo3(get, set)]
    pub workers_used: Vec<String>,
    #[pyo3(get, set)]
    pub minimum_workers_count: usize,
    /// Worker count minus the weighted score bonus; diagnostic only.
    #[pyo3(get, set)]
    pub objective_value: f64,
    #[pyo3(get, set)]
    pub total_score: i64,
}

impl AllocationResult {
    /// Workers assigned to `task`, empty if the task is unknown.
    pub fn team(&self, task: &str) -> &[String] {
        self.assignments
            .get(task)
            .map(|workers| workers.as_slice())
            .unwrap_or(&[])
    }
}

#[pymethods]
impl AllocationResult {
    /// The plain-dict shape the presentation layer renders.
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new_bound(py);
        dict.set_item("assignments", self.assignments.clone())?;
        dict.set_item("workers_used", self.workers_used.clone())?;
        dict.set_item("minimum_workers_count", self.minimum_workers_count)?;
        dict.set_item("objective_value", self.objective_value)?;
        dict.set_item("total_score", self.total_score)?;
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        format!(
            "AllocationResult(workers={}, tasks={}, objective={:.4})",
            self.minimum_workers_count,
            self.assignments.len(),
            self.objective_value
        )
    }
}

fn required_name(record: &Bound<'_, PyDict>) -> PyResult<String> {
    match record.get_item("name")? {
        Some(value) if !value.is_none() => value.extract(),
        _ => Err(PyValueError::new_err("record is missing a 'name'")),
    }
}

fn optional_labels(record: &Bound<'_, PyDict>, key: &str) -> PyResult<Vec<String>> {
    let Some(value) = record.get_item(key)? else {
        return Ok(Vec::new());
    };
    if value.is_none() {
        return Ok(Vec::new());
    }
    if value.is_instance_of::<PyString>() {
        return Err(PyTypeError::new_err(format!(
            "'{}' must be a collection of labels, not a str",
            key
        )));
    }
    // Accept any iterable so sets from the store work as well as lists
    let mut labels = Vec::new();
    for item in value.iter()? {
        labels.push(item?.extract()?);
    }
    Ok(labels)
}

fn optional_days(record: &Bound<'_, PyDict>, key: &str) -> PyResult<WeekdaySet> {
    match record.get_item(key)? {
        Some(value) if !value.is_none() => value.extract(),
        _ => Ok(WeekdaySet::EMPTY),
    }
}
