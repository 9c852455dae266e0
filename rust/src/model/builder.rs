//! Encoding of task and worker records into index-addressed tables.

use chrono::Weekday;
use rustc_hash::FxHashMap;

use crate::days::WeekdaySet;
use crate::models::{Task, Worker, MAX_SCORE};

use super::program::VarId;

/// Dense skill index, assigned in first-seen order over task requirements.
pub type SkillId = u32;

/// Sets and parameters of one allocation problem.
///
/// Built fresh for every call and dropped afterwards. Task and worker
/// indices follow input order; names are assumed unique per list.
#[derive(Debug, Clone)]
pub struct AllocationModel {
    task_names: Vec<String>,
    worker_names: Vec<String>,
    /// Skill universe: every label some task requires, indexed by `SkillId`.
    skill_labels: Vec<String>,
    /// Day universe, Monday first.
    days: Vec<Weekday>,
    /// requires[t][s]
    requires: Vec<Vec<bool>>,
    /// has_skill[w][s]
    has_skill: Vec<Vec<bool>>,
    task_days: Vec<WeekdaySet>,
    worker_days: Vec<WeekdaySet>,
    /// Scores clamped into 0..=MAX_SCORE.
    scores: Vec<i32>,
}

impl AllocationModel {
    pub fn build(tasks: &[Task], workers: &[Worker]) -> Self {
        let mut skill_ids: FxHashMap<&str, SkillId> = FxHashMap::default();
        let mut skill_labels: Vec<String> = Vec::new();
        for task in tasks {
            for skill in &task.required_skills {
                skill_ids.entry(skill.as_str()).or_insert_with(|| {
                    skill_labels.push(skill.clone());
                    (skill_labels.len() - 1) as SkillId
                });
            }
        }

        let day_universe = tasks
            .iter()
            .map(|t| t.scheduled_days)
            .chain(workers.iter().map(|w| w.available_days))
            .fold(WeekdaySet::EMPTY, WeekdaySet::union);

        let requires = tasks
            .iter()
            .map(|task| skill_row(&skill_ids, &task.required_skills))
            .collect();
        // Labels outside the skill universe are never needed and drop out here
        let has_skill = workers
            .iter()
            .map(|worker| skill_row(&skill_ids, &worker.available_skills))
            .collect();

        let scores = workers
            .iter()
            .map(|worker| {
                let clamped = worker.score.clamp(0, MAX_SCORE);
                if clamped != worker.score {
                    tracing::warn!(
                        worker = %worker.name,
                        score = worker.score,
                        "worker score outside 0..={}, clamped to {}",
                        MAX_SCORE,
                        clamped
                    );
                }
                clamped
            })
            .collect();

        Self {
            task_names: tasks.iter().map(|t| t.name.clone()).collect(),
            worker_names: workers.iter().map(|w| w.name.clone()).collect(),
            skill_labels,
            days: day_universe.iter().collect(),
            requires,
            has_skill,
            task_days: tasks.iter().map(|t| t.scheduled_days).collect(),
            worker_days: workers.iter().map(|w| w.available_days).collect(),
            scores,
        }
    }

    pub fn task_count(&self) -> usize {
        self.task_names.len()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_names.len()
    }

    pub fn skill_count(&self) -> usize {
        self.skill_labels.len()
    }

    pub fn task_name(&self, task: usize) -> &str {
        &self.task_names[task]
    }

    pub fn worker_name(&self, worker: usize) -> &str {
        &self.worker_names[worker]
    }

    pub fn skill_label(&self, skill: SkillId) -> Option<&str> {
        self.skill_labels.get(skill as usize).map(String::as_str)
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    #[inline]
    pub fn requires_skill(&self, task: usize, skill: SkillId) -> bool {
        self.requires[task][skill as usize]
    }

    #[inline]
    pub fn has_skill(&self, worker: usize, skill: SkillId) -> bool {
        self.has_skill[worker][skill as usize]
    }

    /// Skills task `task` requires, in skill-id order.
    pub fn required_skills(&self, task: usize) -> impl Iterator<Item = SkillId> + '_ {
        self.requires[task]
            .iter()
            .enumerate()
            .filter(|(_, &required)| required)
            .map(|(skill, _)| skill as SkillId)
    }

    pub fn task_days(&self, task: usize) -> WeekdaySet {
        self.task_days[task]
    }

    #[inline]
    pub fn is_available(&self, worker: usize, day: Weekday) -> bool {
        self.worker_days[worker].contains(day)
    }

    pub fn score(&self, worker: usize) -> i32 {
        self.scores[worker]
    }

    pub fn max_score(&self) -> i32 {
        self.scores.iter().copied().max().unwrap_or(0)
    }

    /// Variable layout: all `assign[t, w]` row-major by task, then `used[w]`.
    #[inline]
    pub fn assign_var(&self, task: usize, worker: usize) -> VarId {
        task * self.worker_count() + worker
    }

    #[inline]
    pub fn used_var(&self, worker: usize) -> VarId {
        self.task_count() * self.worker_count() + worker
    }

    pub fn num_vars(&self) -> usize {
        (self.task_count() + 1) * self.worker_count()
    }
}

fn skill_row(skill_ids: &FxHashMap<&str, SkillId>, labels: &[String]) -> Vec<bool> {
    let mut row = vec![false; skill_ids.len()];
    for label in labels {
        if let Some(&id) = skill_ids.get(label.as_str()) {
            row[id as usize] = true;
        }
    }
    row
}
