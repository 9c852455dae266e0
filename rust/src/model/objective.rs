//! Objective composition: fewest workers first, highest total score second.

use super::builder::AllocationModel;
use super::program::{ConstraintKind, LinearProgram, Sense};

/// Weight of the score term in the single-pass objective.
///
/// Must stay below `1 / (workers * max_score)` so the whole score term can
/// never outweigh a one-worker change; the `+ 1` keeps it strictly below.
/// Zero when no worker has a positive score.
pub fn score_weight(model: &AllocationModel) -> f64 {
    let max_score = model.max_score();
    if max_score <= 0 || model.worker_count() == 0 {
        return 0.0;
    }
    1.0 / (model.worker_count() as f64 * max_score as f64 + 1.0)
}

/// `sum(used[w])`
pub fn worker_count_objective(model: &AllocationModel) -> Vec<f64> {
    let mut coefficients = vec![0.0; model.num_vars()];
    for worker in 0..model.worker_count() {
        coefficients[model.used_var(worker)] = 1.0;
    }
    coefficients
}

/// `-sum(score[w] * used[w])`, i.e. maximise total score.
pub fn score_objective(model: &AllocationModel) -> Vec<f64> {
    let mut coefficients = vec![0.0; model.num_vars()];
    for worker in 0..model.worker_count() {
        coefficients[model.used_var(worker)] = -(model.score(worker) as f64);
    }
    coefficients
}

/// `sum(used[w]) - eps * sum(score[w] * used[w])`
pub fn weighted_objective(model: &AllocationModel) -> Vec<f64> {
    let eps = score_weight(model);
    let mut coefficients = vec![0.0; model.num_vars()];
    for worker in 0..model.worker_count() {
        coefficients[model.used_var(worker)] = 1.0 - eps * model.score(worker) as f64;
    }
    coefficients
}

/// Pin `sum(used[w]) == count` for the second lexicographic phase.
pub fn fix_worker_count(model: &AllocationModel, program: &mut LinearProgram, count: usize) {
    let terms = (0..model.worker_count())
        .map(|worker| (model.used_var(worker), 1.0))
        .collect();
    program.add_constraint(ConstraintKind::WorkerCount, terms, Sense::Eq, count as f64);
}

/// Value of the weighted objective for the given used-worker flags.
///
/// Reported in both objective modes so results stay comparable.
pub fn reported_objective(model: &AllocationModel, used: &[bool]) -> f64 {
    let eps = score_weight(model);
    used.iter()
        .enumerate()
        .filter(|(_, &is_used)| is_used)
        .map(|(worker, _)| 1.0 - eps * model.score(worker) as f64)
        .sum()
}
