//! The allocation pipeline: records -> model -> constraints + objective ->
//! optimizer -> result.

use thiserror::Error;

use crate::config::{ConfigError, ObjectiveMode, OptimizerConfig, SolveSettings};
use crate::extract::extract_result;
use crate::model::{
    constraint_program, fix_worker_count, score_objective, weighted_objective,
    worker_count_objective, AllocationModel, LinearProgram,
};
use crate::models::{AllocationResult, Task, Worker};
use crate::solver::{optimizer_for, Optimizer, SolveOutcome, Solution, SolverError};
use crate::{log_changes, log_checks};

/// Errors from the one-shot `allocate_tasks` entry point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Stateless allocator: each call builds, solves and discards its own model.
pub struct TaskAllocator {
    settings: SolveSettings,
    optimizer: Box<dyn Optimizer>,
}

impl TaskAllocator {
    /// Validate `config` and select its backend.
    pub fn new(config: &OptimizerConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_settings(config.settings()?))
    }

    pub fn from_settings(settings: SolveSettings) -> Self {
        let optimizer = optimizer_for(&settings);
        Self {
            settings,
            optimizer,
        }
    }

    /// Use a caller-supplied backend instead of the configured one.
    pub fn with_optimizer(settings: SolveSettings, optimizer: Box<dyn Optimizer>) -> Self {
        Self {
            settings,
            optimizer,
        }
    }

    pub fn settings(&self) -> &SolveSettings {
        &self.settings
    }

    /// Find the smallest team set covering every task, preferring higher scores.
    ///
    /// # Returns
    /// * `Ok(Some(result))` with an optimal allocation
    /// * `Ok(None)` if no allocation satisfies every hard constraint
    /// * `Err(SolverError)` if the backend could not reach a verdict
    pub fn allocate(
        &self,
        tasks: &[Task],
        workers: &[Worker],
    ) -> Result<Option<AllocationResult>, SolverError> {
        let verbosity = self.settings.verbosity;
        let model = AllocationModel::build(tasks, workers);
        let base = constraint_program(&model, self.settings.dayless_policy);
        log_checks!(
            verbosity,
            "model: {} tasks, {} workers, {} skills, {} days, {} variables, {} rows",
            model.task_count(),
            model.worker_count(),
            model.skill_count(),
            model.days().len(),
            model.num_vars(),
            base.constraints().len()
        );

        let solution = match self.settings.objective {
            ObjectiveMode::Weighted => {
                let mut program = base;
                program.set_objective(weighted_objective(&model));
                self.run(&program)?
            }
            ObjectiveMode::Lexicographic => self.solve_lexicographic(&model, base)?,
        };

        let Some(solution) = solution else {
            log_changes!(
                verbosity,
                "no allocation satisfies the constraints ({} tasks, {} workers)",
                model.task_count(),
                model.worker_count()
            );
            return Ok(None);
        };

        let result = extract_result(&model, &solution);
        log_changes!(
            verbosity,
            "allocation uses {} workers (total score {}): {:?}",
            result.minimum_workers_count,
            result.total_score,
            result.workers_used
        );
        Ok(Some(result))
    }

    /// Phase 1 minimises the worker count; phase 2 pins that count and
    /// maximises total score.
    fn solve_lexicographic(
        &self,
        model: &AllocationModel,
        base: LinearProgram,
    ) -> Result<Option<Solution>, SolverError> {
        let mut first = base.clone();
        first.set_objective(worker_count_objective(model));
        let Some(first_solution) = self.run(&first)? else {
            return Ok(None);
        };

        let count = (0..model.worker_count())
            .filter(|&worker| first_solution.is_set(model.used_var(worker)))
            .count();
        log_checks!(self.settings.verbosity, "phase 1: minimum worker count {}", count);
        if count == 0 || model.max_score() == 0 {
            return Ok(Some(first_solution));
        }

        let mut second = base;
        fix_worker_count(model, &mut second, count);
        second.set_objective(score_objective(model));
        match self.run(&second)? {
            Some(solution) => {
                log_checks!(
                    self.settings.verbosity,
                    "phase 2: total score {}",
                    -solution.objective_value
                );
                Ok(Some(solution))
            }
            // Phase 1's own solution satisfies the pinned count
            None => Err(SolverError::Backend(format!(
                "score phase found no solution with {} workers although the count phase did",
                count
            ))),
        }
    }

    fn run(&self, program: &LinearProgram) -> Result<Option<Solution>, SolverError> {
        match self.optimizer.solve(program) {
            Ok(SolveOutcome::Optimal(solution)) => Ok(Some(solution)),
            Ok(SolveOutcome::Infeasible) => Ok(None),
            Err(err) => {
                tracing::warn!(backend = self.optimizer.name(), error = %err, "solve failed");
                Err(err)
            }
        }
    }
}

/// Validate `config`, then allocate.
pub fn allocate_tasks(
    tasks: &[Task],
    workers: &[Worker],
    config: &OptimizerConfig,
) -> Result<Option<AllocationResult>, AllocationError> {
    let allocator = TaskAllocator::new(config)?;
    Ok(allocator.allocate(tasks, workers)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Backend, DaylessPolicy};
    use crate::validation::verify_allocation;
    use chrono::Weekday;
    use chrono::Weekday::{Fri, Mon, Thu, Tue, Wed};
    use std::time::Duration;

    fn make_task(name: &str, skills: &[&str], days: &[Weekday]) -> Task {
        Task {
            name: name.to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            scheduled_days: days.iter().copied().collect(),
        }
    }

    fn make_worker(name: &str, skills: &[&str], days: &[Weekday], score: i32) -> Worker {
        Worker {
            name: name.to_string(),
            available_skills: skills.iter().map(|s| s.to_string()).collect(),
            available_days: days.iter().copied().collect(),
            score,
        }
    }

    fn settings(objective: ObjectiveMode, backend: Backend) -> SolveSettings {
        SolveSettings {
            objective,
            backend,
            ..SolveSettings::default()
        }
    }

    /// Every objective mode on every backend.
    fn all_allocators() -> Vec<TaskAllocator> {
        let mut allocators = Vec::new();
        for objective in [ObjectiveMode::Lexicographic, ObjectiveMode::Weighted] {
            for backend in [Backend::Milp, Backend::BranchAndBound] {
                allocators.push(TaskAllocator::from_settings(settings(objective, backend)));
            }
        }
        allocators
    }

    fn allocate_ok(
        allocator: &TaskAllocator,
        tasks: &[Task],
        workers: &[Worker],
    ) -> Option<AllocationResult> {
        let result = allocator.allocate(tasks, workers).unwrap();
        if let Some(result) = &result {
            let violations =
                verify_allocation(tasks, workers, result, allocator.settings().dayless_policy);
            assert!(violations.is_empty(), "violations: {:?}", violations);
        }
        result
    }

    #[test]
    fn test_tie_break_prefers_higher_score() {
        let tasks = vec![make_task("Filtration", &["X"], &[])];
        let workers = vec![
            make_worker("P", &["X"], &[], 3),
            make_worker("Q", &["X"], &[], 9),
        ];
        for allocator in all_allocators() {
            let result = allocate_ok(&allocator, &tasks, &workers).unwrap();
            assert_eq!(result.workers_used, vec!["Q"]);
            assert_eq!(result.minimum_workers_count, 1);
            assert_eq!(result.team("Filtration"), ["Q".to_string()]);
            assert_eq!(result.total_score, 9);
        }
    }

    #[test]
    fn test_team_covers_skills_collectively() {
        let tasks = vec![make_task("Brewing", &["X", "Y"], &[])];
        let workers = vec![
            make_worker("worker1", &["X"], &[], 5),
            make_worker("worker2", &["Y"], &[], 5),
        ];
        for allocator in all_allocators() {
            let result = allocate_ok(&allocator, &tasks, &workers).unwrap();
            let team = result.team("Brewing");
            assert!(team.contains(&"worker1".to_string()));
            assert!(team.contains(&"worker2".to_string()));
            assert_eq!(result.minimum_workers_count, 2);
        }
    }

    #[test]
    fn test_missing_skill_is_infeasible() {
        let tasks = vec![make_task("Repair", &["Welding"], &[])];
        let workers = vec![make_worker("Ana", &["Brewing"], &[], 5)];
        for allocator in all_allocators() {
            assert_eq!(allocator.allocate(&tasks, &workers), Ok(None));
        }
    }

    #[test]
    fn test_day_availability() {
        let tasks = vec![make_task("Mashing", &["Brewing"], &[Mon])];
        let tuesday_only = vec![make_worker("Ana", &["Brewing"], &[Tue], 5)];
        let monday = vec![make_worker("Ana", &["Brewing"], &[Mon], 5)];

        for allocator in all_allocators() {
            assert_eq!(allocator.allocate(&tasks, &tuesday_only), Ok(None));

            let result = allocate_ok(&allocator, &tasks, &monday).unwrap();
            assert_eq!(result.team("Mashing"), ["Ana".to_string()]);

            // A second Monday task cannot share the only worker
            let mut two_mondays = tasks.clone();
            two_mondays.push(make_task("Kegging", &["Brewing"], &[Mon]));
            assert_eq!(allocator.allocate(&two_mondays, &monday), Ok(None));
        }
    }

    #[test]
    fn test_worker_reused_across_days() {
        let tasks = vec![
            make_task("Mashing", &["Brewing"], &[Mon]),
            make_task("Boiling", &["Brewing"], &[Tue]),
            make_task("Kegging", &["Brewing"], &[Mon, Wed]),
        ];
        let workers = vec![
            make_worker("Ana", &["Brewing"], &[Mon, Tue, Wed], 5),
            make_worker("Ben", &["Brewing"], &[Mon, Wed], 5),
            make_worker("Cy", &["Brewing"], &[Mon, Tue, Wed, Thu, Fri], 5),
        ];
        for allocator in all_allocators() {
            let result = allocate_ok(&allocator, &tasks, &workers).unwrap();
            // Mashing and Kegging share Monday, so two workers are needed
            assert_eq!(result.minimum_workers_count, 2);
        }
    }

    #[test]
    fn test_generalist_covers_sample_workforce() {
        let tasks = vec![
            make_task("Task A", &["S1", "S2"], &[]),
            make_task("Task B", &["S2", "S3"], &[]),
            make_task("Task C", &["S1"], &[]),
        ];
        let workers = vec![
            make_worker("Alice", &["S1"], &[], 8),
            make_worker("Bob", &["S2"], &[], 6),
            make_worker("Charlie", &["S3"], &[], 4),
            make_worker("David", &["S1", "S2", "S3"], &[], 9),
        ];
        for allocator in all_allocators() {
            let result = allocate_ok(&allocator, &tasks, &workers).unwrap();
            // Day-less tasks are unrestricted, so David covers everything
            assert_eq!(result.workers_used, vec!["David"]);
            for task in ["Task A", "Task B", "Task C"] {
                assert_eq!(result.team(task), ["David".to_string()]);
            }
        }
    }

    #[test]
    fn test_shared_slot_policy_limits_dayless_tasks() {
        let tasks = vec![
            make_task("Audit", &["S1"], &[]),
            make_task("Training", &["S1"], &[]),
        ];
        let workers = vec![
            make_worker("Alice", &["S1"], &[], 8),
            make_worker("David", &["S1"], &[], 9),
        ];
        let allocator = TaskAllocator::from_settings(SolveSettings {
            dayless_policy: DaylessPolicy::SharedSlot,
            ..SolveSettings::default()
        });
        let result = allocate_ok(&allocator, &tasks, &workers).unwrap();
        assert_eq!(result.minimum_workers_count, 2);

        let unrestricted = TaskAllocator::from_settings(SolveSettings::default());
        let result = allocate_ok(&unrestricted, &tasks, &workers).unwrap();
        assert_eq!(result.workers_used, vec!["David"]);
    }

    #[test]
    fn test_count_dominates_score() {
        // Two strong specialists against one weak generalist
        let tasks = vec![make_task("Brewing", &["X", "Y"], &[])];
        let workers = vec![
            make_worker("xs", &["X"], &[], 10),
            make_worker("ys", &["Y"], &[], 10),
            make_worker("generalist", &["X", "Y"], &[], 0),
        ];
        for allocator in all_allocators() {
            let result = allocate_ok(&allocator, &tasks, &workers).unwrap();
            assert_eq!(result.workers_used, vec!["generalist"]);
            assert_eq!(result.total_score, 0);
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let workers = vec![make_worker("Ana", &["Brewing"], &[Mon], 5)];
        let tasks = vec![make_task("Inspection", &[], &[Mon])];
        let skilled = vec![make_task("Mashing", &["Brewing"], &[])];

        for allocator in all_allocators() {
            let result = allocate_ok(&allocator, &[], &workers).unwrap();
            assert!(result.assignments.is_empty());
            assert_eq!(result.minimum_workers_count, 0);

            let result = allocate_ok(&allocator, &tasks, &[]).unwrap();
            assert!(result.team("Inspection").is_empty());

            let result = allocate_ok(&allocator, &[], &[]).unwrap();
            assert_eq!(result, AllocationResult::default());

            // A skill requirement with nobody to cover it
            assert_eq!(allocator.allocate(&skilled, &[]), Ok(None));

            // Tasks without skills may keep an empty team
            let result = allocate_ok(&allocator, &tasks, &workers).unwrap();
            assert!(result.team("Inspection").is_empty());
            assert_eq!(result.minimum_workers_count, 0);
        }
    }

    #[test]
    fn test_solver_error_is_not_infeasible() {
        let tasks: Vec<Task> = (0..4)
            .map(|i| make_task(&format!("t{i}"), &["X"], &[]))
            .collect();
        let workers: Vec<Worker> = (0..4)
            .map(|i| make_worker(&format!("w{i}"), &["X"], &[], 5))
            .collect();
        let allocator = TaskAllocator::from_settings(SolveSettings {
            backend: Backend::BranchAndBound,
            node_limit: Some(2),
            ..SolveSettings::default()
        });
        assert_eq!(
            allocator.allocate(&tasks, &workers),
            Err(SolverError::NodeLimit(2))
        );
    }

    #[test]
    fn test_branch_and_bound_deadline() {
        let tasks = vec![make_task("Filtration", &["X"], &[])];
        let workers = vec![make_worker("P", &["X"], &[], 3)];
        let allocator = TaskAllocator::with_optimizer(
            SolveSettings::default(),
            Box::new(crate::solver::BranchAndBoundOptimizer::new(
                None,
                Some(Duration::ZERO),
                0,
            )),
        );
        assert_eq!(
            allocator.allocate(&tasks, &workers),
            Err(SolverError::TimedOut(Duration::ZERO))
        );
    }

    #[test]
    fn test_branch_and_bound_handles_wide_inputs() {
        // 150 x 150 gives 22,650 variables, one search level each
        let tasks: Vec<Task> = (0..150)
            .map(|i| make_task(&format!("t{i}"), &[], &[]))
            .collect();
        let workers: Vec<Worker> = (0..150)
            .map(|i| make_worker(&format!("w{i}"), &[], &[], 5))
            .collect();
        let allocator = TaskAllocator::from_settings(SolveSettings {
            backend: Backend::BranchAndBound,
            node_limit: Some(1_000_000),
            ..SolveSettings::default()
        });
        let result = allocator.allocate(&tasks, &workers).unwrap().unwrap();
        assert_eq!(result.minimum_workers_count, 0);
        assert_eq!(result.assignments.len(), 150);
    }

    #[test]
    fn test_milp_time_limit_reports_timeout() {
        let week = [Mon, Tue, Wed, Thu, Fri];
        let skills = ["S0", "S1", "S2", "S3", "S4", "S5"];
        let tasks: Vec<Task> = (0..30)
            .map(|i| {
                make_task(
                    &format!("t{i}"),
                    &[skills[i % 6], skills[(i + 1) % 6]],
                    &[week[i % 5]],
                )
            })
            .collect();
        let workers: Vec<Worker> = (0..40)
            .map(|j| {
                make_worker(
                    &format!("w{j}"),
                    &[skills[j % 6], skills[(j * 5 + 2) % 6]],
                    &[week[j % 5], week[(j + 2) % 5]],
                    (j % 11) as i32,
                )
            })
            .collect();
        let allocator = TaskAllocator::from_settings(SolveSettings {
            backend: Backend::Milp,
            time_limit: Some(Duration::from_millis(1)),
            ..SolveSettings::default()
        });
        assert!(matches!(
            allocator.allocate(&tasks, &workers),
            Err(SolverError::TimedOut(_))
        ));
    }

    #[test]
    fn test_allocate_tasks_rejects_bad_config() {
        let config = OptimizerConfig {
            backend: "cplex".to_string(),
            ..OptimizerConfig::default()
        };
        assert_eq!(
            allocate_tasks(&[], &[], &config),
            Err(AllocationError::Config(ConfigError::UnknownBackend(
                "cplex".to_string()
            )))
        );
    }

    #[test]
    fn test_allocate_tasks_default_config() {
        let tasks = vec![make_task("Filtration", &["X"], &[Fri])];
        let workers = vec![make_worker("P", &["X"], &[Fri], 3)];
        let result = allocate_tasks(&tasks, &workers, &OptimizerConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(result.minimum_workers_count, 1);
    }

    #[test]
    fn test_reported_objective_matches_between_modes() {
        let tasks = vec![make_task("Filtration", &["X"], &[])];
        let workers = vec![
            make_worker("P", &["X"], &[], 3),
            make_worker("Q", &["X"], &[], 9),
        ];
        let lexicographic = TaskAllocator::from_settings(SolveSettings::default())
            .allocate(&tasks, &workers)
            .unwrap()
            .unwrap();
        let weighted = TaskAllocator::from_settings(settings(ObjectiveMode::Weighted, Backend::Milp))
            .allocate(&tasks, &workers)
            .unwrap()
            .unwrap();
        assert!((lexicographic.objective_value - weighted.objective_value).abs() < 1e-9);
        assert!(lexicographic.objective_value < 1.0);
    }
}
