//! Pre-flight record checks and post-solve allocation audits.
//!
//! The optimizer itself accepts any records; these checks let the caller
//! reject bad input before optimizing and confirm a returned allocation
//! honors every hard rule.

use chrono::Weekday;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::config::DaylessPolicy;
use crate::days::day_name;
use crate::models::{AllocationResult, Task, Worker, MAX_SCORE};

/// Problems with the records themselves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("No tasks have been defined")]
    NoTasks,
    #[error("No workers have been defined")]
    NoWorkers,
    #[error("Task at position {0} has a blank name")]
    BlankTaskName(usize),
    #[error("Worker at position {0} has a blank name")]
    BlankWorkerName(usize),
    #[error("Duplicate task name: {0}")]
    DuplicateTask(String),
    #[error("Duplicate worker name: {0}")]
    DuplicateWorker(String),
    #[error("Worker {name} has score {score}, outside 0..={max}", max = MAX_SCORE)]
    ScoreOutOfRange { name: String, score: i32 },
}

/// Broken rules in an allocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("Assignment refers to unknown task {0}")]
    UnknownTask(String),
    #[error("Task {task} is assigned unknown worker {worker}")]
    UnknownWorker { task: String, worker: String },
    #[error("Task {task} has nobody with skill {skill}")]
    MissingSkill { task: String, skill: String },
    #[error("Worker {worker} is booked on {} for {tasks:?}", day_name(*day))]
    DoubleBooked {
        worker: String,
        day: Weekday,
        tasks: Vec<String>,
    },
    #[error("Worker {worker} is not available on {} for task {task}", day_name(*day))]
    Unavailable {
        task: String,
        worker: String,
        day: Weekday,
    },
    #[error("Worker {worker} holds more than one day-less task: {tasks:?}")]
    DaylessOverbooked { worker: String, tasks: Vec<String> },
    #[error("Worker {0} is assigned but not listed as used")]
    UnlistedWorker(String),
    #[error("Worker {0} is listed as used but has no assignment")]
    IdleWorker(String),
    #[error("Reported worker count {reported} differs from the {actual} distinct assigned workers")]
    CountMismatch { reported: usize, actual: usize },
}

/// Check records for problems the optimizer leaves to the caller.
pub fn validate_records(tasks: &[Task], workers: &[Worker]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if tasks.is_empty() {
        issues.push(ValidationIssue::NoTasks);
    }
    if workers.is_empty() {
        issues.push(ValidationIssue::NoWorkers);
    }

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for (position, task) in tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            issues.push(ValidationIssue::BlankTaskName(position));
        } else if !seen.insert(task.name.as_str()) {
            issues.push(ValidationIssue::DuplicateTask(task.name.clone()));
        }
    }

    seen.clear();
    for (position, worker) in workers.iter().enumerate() {
        if worker.name.trim().is_empty() {
            issues.push(ValidationIssue::BlankWorkerName(position));
        } else if !seen.insert(worker.name.as_str()) {
            issues.push(ValidationIssue::DuplicateWorker(worker.name.clone()));
        }
        if !(0..=MAX_SCORE).contains(&worker.score) {
            issues.push(ValidationIssue::ScoreOutOfRange {
                name: worker.name.clone(),
                score: worker.score,
            });
        }
    }
    issues
}

/// Re-check an allocation against the records it was computed from.
pub fn verify_allocation(
    tasks: &[Task],
    workers: &[Worker],
    result: &AllocationResult,
    policy: DaylessPolicy,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let task_by_name: FxHashMap<&str, &Task> =
        tasks.iter().map(|t| (t.name.as_str(), t)).collect();
    let worker_by_name: FxHashMap<&str, &Worker> =
        workers.iter().map(|w| (w.name.as_str(), w)).collect();

    for name in result.assignments.keys() {
        if !task_by_name.contains_key(name.as_str()) {
            violations.push(Violation::UnknownTask(name.clone()));
        }
    }

    // worker -> tasks they hold, in task input order
    let mut bookings: FxHashMap<&str, Vec<&Task>> = FxHashMap::default();
    for task in tasks {
        let team = result.team(&task.name);
        for member in team {
            match worker_by_name.get(member.as_str()) {
                Some(worker) => bookings.entry(worker.name.as_str()).or_default().push(task),
                None => violations.push(Violation::UnknownWorker {
                    task: task.name.clone(),
                    worker: member.clone(),
                }),
            }
        }

        for skill in &task.required_skills {
            let covered = team.iter().any(|member| {
                worker_by_name
                    .get(member.as_str())
                    .is_some_and(|w| w.available_skills.contains(skill))
            });
            if !covered {
                violations.push(Violation::MissingSkill {
                    task: task.name.clone(),
                    skill: skill.clone(),
                });
            }
        }

        for day in task.scheduled_days.iter() {
            for member in team {
                if let Some(worker) = worker_by_name.get(member.as_str()) {
                    if !worker.available_days.contains(day) {
                        violations.push(Violation::Unavailable {
                            task: task.name.clone(),
                            worker: member.clone(),
                            day,
                        });
                    }
                }
            }
        }
    }

    for worker in workers {
        let Some(held) = bookings.get(worker.name.as_str()) else {
            continue;
        };
        for day in crate::days::WEEK {
            let on_day: Vec<String> = held
                .iter()
                .filter(|t| t.scheduled_days.contains(day))
                .map(|t| t.name.clone())
                .collect();
            if on_day.len() > 1 {
                violations.push(Violation::DoubleBooked {
                    worker: worker.name.clone(),
                    day,
                    tasks: on_day,
                });
            }
        }
        if policy == DaylessPolicy::SharedSlot {
            let dayless: Vec<String> = held
                .iter()
                .filter(|t| t.scheduled_days.is_empty())
                .map(|t| t.name.clone())
                .collect();
            if dayless.len() > 1 {
                violations.push(Violation::DaylessOverbooked {
                    worker: worker.name.clone(),
                    tasks: dayless,
                });
            }
        }
    }

    let listed: FxHashSet<&str> = result.workers_used.iter().map(|w| w.as_str()).collect();
    let assigned: FxHashSet<&str> = result
        .assignments
        .values()
        .flatten()
        .map(|w| w.as_str())
        .collect();
    for worker in workers {
        let name = worker.name.as_str();
        if assigned.contains(name) && !listed.contains(name) {
            violations.push(Violation::UnlistedWorker(worker.name.clone()));
        }
        if listed.contains(name) && !assigned.contains(name) {
            violations.push(Violation::IdleWorker(worker.name.clone()));
        }
    }
    if result.minimum_workers_count != assigned.len() {
        violations.push(Violation::CountMismatch {
            reported: result.minimum_workers_count,
            actual: assigned.len(),
        });
    }

    violations
}
