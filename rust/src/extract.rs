//! Conversion of solved variable values into an `AllocationResult`.

use std::collections::HashMap;

use crate::model::{reported_objective, AllocationModel};
use crate::models::AllocationResult;
use crate::solver::Solution;

/// Read the binarized `assign` and `used` values back into names.
///
/// Every task is present in `assignments`, possibly with an empty team.
/// Team members and `workers_used` follow worker input order. The worker
/// count comes from the `used` flags, never from the objective value.
pub fn extract_result(model: &AllocationModel, solution: &Solution) -> AllocationResult {
    let mut assignments: HashMap<String, Vec<String>> = HashMap::with_capacity(model.task_count());
    for task in 0..model.task_count() {
        let team = (0..model.worker_count())
            .filter(|&worker| solution.is_set(model.assign_var(task, worker)))
            .map(|worker| model.worker_name(worker).to_string())
            .collect();
        assignments.insert(model.task_name(task).to_string(), team);
    }

    let used: Vec<bool> = (0..model.worker_count())
        .map(|worker| solution.is_set(model.used_var(worker)))
        .collect();
    let workers_used: Vec<String> = used
        .iter()
        .enumerate()
        .filter(|(_, &is_used)| is_used)
        .map(|(worker, _)| model.worker_name(worker).to_string())
        .collect();
    let total_score: i64 = used
        .iter()
        .enumerate()
        .filter(|(_, &is_used)| is_used)
        .map(|(worker, _)| model.score(worker) as i64)
        .sum();

    AllocationResult {
        minimum_workers_count: workers_used.len(),
        workers_used,
        assignments,
        objective_value: reported_objective(model, &used),
        total_score,
    }
}
