//! Hard constraints of the allocation program.

use crate::config::DaylessPolicy;

use super::builder::AllocationModel;
use super::program::{ConstraintKind, LinearProgram, Sense, VarId};

/// Build the constraint rows over `assign` and `used`, with an empty objective.
///
/// Rows:
/// 1. coverage: every required skill is held by someone on the team
/// 2. link: `assign[t, w] <= used[w]`
/// 3. capacity: per worker and day, at most one task scheduled that day
/// 4. availability: `assign[t, w] <= 0` when `w` is off on a day `t` runs
///
/// Plus, under `DaylessPolicy::SharedSlot`, one slot row per worker over
/// the tasks without scheduled days.
pub fn constraint_program(model: &AllocationModel, policy: DaylessPolicy) -> LinearProgram {
    let mut program = LinearProgram::new(model.num_vars());
    add_skill_coverage(model, &mut program);
    add_utilization_links(model, &mut program);
    add_day_capacity(model, &mut program);
    add_day_availability(model, &mut program);
    if policy == DaylessPolicy::SharedSlot {
        add_dayless_slots(model, &mut program);
    }
    program
}

fn add_skill_coverage(model: &AllocationModel, program: &mut LinearProgram) {
    for task in 0..model.task_count() {
        for skill in model.required_skills(task) {
            // Collective: any team member holding the skill covers it
            let terms: Vec<(VarId, f64)> = (0..model.worker_count())
                .filter(|&worker| model.has_skill(worker, skill))
                .map(|worker| (model.assign_var(task, worker), 1.0))
                .collect();
            program.add_constraint(
                ConstraintKind::SkillCoverage { task, skill },
                terms,
                Sense::Geq,
                1.0,
            );
        }
    }
}

fn add_utilization_links(model: &AllocationModel, program: &mut LinearProgram) {
    for task in 0..model.task_count() {
        for worker in 0..model.worker_count() {
            program.add_constraint(
                ConstraintKind::UtilizationLink { task, worker },
                vec![
                    (model.assign_var(task, worker), 1.0),
                    (model.used_var(worker), -1.0),
                ],
                Sense::Leq,
                0.0,
            );
        }
    }
}

fn add_day_capacity(model: &AllocationModel, program: &mut LinearProgram) {
    for &day in model.days() {
        let on_day: Vec<usize> = (0..model.task_count())
            .filter(|&task| model.task_days(task).contains(day))
            .collect();
        // A single task cannot overbook anyone
        if on_day.len() < 2 {
            continue;
        }
        for worker in 0..model.worker_count() {
            let terms = on_day
                .iter()
                .map(|&task| (model.assign_var(task, worker), 1.0))
                .collect();
            program.add_constraint(
                ConstraintKind::DayCapacity { worker, day },
                terms,
                Sense::Leq,
                1.0,
            );
        }
    }
}

fn add_day_availability(model: &AllocationModel, program: &mut LinearProgram) {
    for task in 0..model.task_count() {
        for day in model.task_days(task).iter() {
            for worker in 0..model.worker_count() {
                // `assign <= 1` is already implied by the binary domain
                if model.is_available(worker, day) {
                    continue;
                }
                program.add_constraint(
                    ConstraintKind::DayAvailability { task, worker, day },
                    vec![(model.assign_var(task, worker), 1.0)],
                    Sense::Leq,
                    0.0,
                );
            }
        }
    }
}

fn add_dayless_slots(model: &AllocationModel, program: &mut LinearProgram) {
    let dayless: Vec<usize> = (0..model.task_count())
        .filter(|&task| model.task_days(task).is_empty())
        .collect();
    if dayless.len() < 2 {
        return;
    }
    for worker in 0..model.worker_count() {
        let terms = dayless
            .iter()
            .map(|&task| (model.assign_var(task, worker), 1.0))
            .collect();
        program.add_constraint(
            ConstraintKind::DaylessSlot { worker },
            terms,
            Sense::Leq,
            1.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::days::WEEK;
    use crate::models::{Task, Worker};
    use chrono::Weekday;

    fn make_task(name: &str, skills: &[&str], days: &[Weekday]) -> Task {
        Task {
            name: name.to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            scheduled_days: days.iter().copied().collect(),
        }
    }

    fn make_worker(name: &str, skills: &[&str], days: &[Weekday]) -> Worker {
        Worker {
            name: name.to_string(),
            available_skills: skills.iter().map(|s| s.to_string()).collect(),
            available_days: days.iter().copied().collect(),
            score: 5,
        }
    }

    #[test]
    fn test_coverage_rows_list_capable_workers() {
        let tasks = vec![make_task("Mashing", &["Brewing", "Cleaning"], &[])];
        let workers = vec![
            make_worker("Ana", &["Brewing"], &[]),
            make_worker("Ben", &["Brewing", "Cleaning"], &[]),
        ];
        let model = AllocationModel::build(&tasks, &workers);
        let program = constraint_program(&model, DaylessPolicy::Unrestricted);

        let coverage: Vec<_> = program
            .constraints()
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::SkillCoverage { .. }))
            .collect();
        assert_eq!(coverage.len(), 2);
        // Brewing: both workers
        assert_eq!(coverage[0].terms, vec![(0, 1.0), (1, 1.0)]);
        // Cleaning: only Ben
        assert_eq!(coverage[1].terms, vec![(1, 1.0)]);
        assert_eq!(coverage[1].sense, Sense::Geq);
    }

    #[test]
    fn test_missing_skill_yields_constant_violation() {
        let tasks = vec![make_task("Repair", &["Welding"], &[])];
        let workers = vec![make_worker("Ana", &["Brewing"], &[])];
        let model = AllocationModel::build(&tasks, &workers);
        let program = constraint_program(&model, DaylessPolicy::Unrestricted);

        assert!(matches!(
            program.trivially_infeasible().map(|c| c.kind),
            Some(ConstraintKind::SkillCoverage { task: 0, .. })
        ));
    }

    #[test]
    fn test_link_rows_for_every_pair() {
        let tasks = vec![make_task("a", &[], &[]), make_task("b", &[], &[])];
        let workers = vec![make_worker("x", &[], &[]), make_worker("y", &[], &[])];
        let model = AllocationModel::build(&tasks, &workers);
        let program = constraint_program(&model, DaylessPolicy::Unrestricted);

        assert_eq!(
            program.count_kind(|k| matches!(k, ConstraintKind::UtilizationLink { .. })),
            4
        );
        // Tasks without skills need no coverage
        assert_eq!(
            program.count_kind(|k| matches!(k, ConstraintKind::SkillCoverage { .. })),
            0
        );
    }

    #[test]
    fn test_capacity_rows_only_for_shared_days() {
        let tasks = vec![
            make_task("a", &[], &[Weekday::Mon, Weekday::Tue]),
            make_task("b", &[], &[Weekday::Mon]),
            make_task("c", &[], &[Weekday::Wed]),
            make_task("d", &[], &[]),
        ];
        let workers = vec![make_worker("x", &[], &WEEK)];
        let model = AllocationModel::build(&tasks, &workers);
        let program = constraint_program(&model, DaylessPolicy::Unrestricted);

        let capacity: Vec<_> = program
            .constraints()
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::DayCapacity { .. }))
            .collect();
        // Only Monday has two tasks
        assert_eq!(capacity.len(), 1);
        assert_eq!(
            capacity[0].kind,
            ConstraintKind::DayCapacity {
                worker: 0,
                day: Weekday::Mon
            }
        );
        assert_eq!(capacity[0].terms, vec![(0, 1.0), (1, 1.0)]);
    }

    #[test]
    fn test_availability_rows_for_days_off() {
        let tasks = vec![make_task("a", &[], &[Weekday::Mon, Weekday::Tue])];
        let workers = vec![
            make_worker("x", &[], &[Weekday::Mon]),
            make_worker("y", &[], &[Weekday::Mon, Weekday::Tue]),
            make_worker("z", &[], &[]),
        ];
        let model = AllocationModel::build(&tasks, &workers);
        let program = constraint_program(&model, DaylessPolicy::Unrestricted);

        let kinds: Vec<_> = program
            .constraints()
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::DayAvailability { .. }))
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ConstraintKind::DayAvailability {
                    task: 0,
                    worker: 2,
                    day: Weekday::Mon
                },
                ConstraintKind::DayAvailability {
                    task: 0,
                    worker: 0,
                    day: Weekday::Tue
                },
                ConstraintKind::DayAvailability {
                    task: 0,
                    worker: 2,
                    day: Weekday::Tue
                },
            ]
        );
    }

    #[test]
    fn test_dayless_policy() {
        let tasks = vec![
            make_task("a", &[], &[]),
            make_task("b", &[], &[]),
            make_task("c", &[], &[Weekday::Fri]),
        ];
        let workers = vec![make_worker("x", &[], &[Weekday::Fri])];
        let model = AllocationModel::build(&tasks, &workers);

        let unrestricted = constraint_program(&model, DaylessPolicy::Unrestricted);
        assert_eq!(
            unrestricted.count_kind(|k| matches!(k, ConstraintKind::DaylessSlot { .. })),
            0
        );

        let shared = constraint_program(&model, DaylessPolicy::SharedSlot);
        let slots: Vec<_> = shared
            .constraints()
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::DaylessSlot { .. }))
            .collect();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].terms, vec![(0, 1.0), (1, 1.0)]);
    }
}
