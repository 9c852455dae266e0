//! Translation of task/worker records into a 0/1 integer program.
//!
//! `builder` derives the skill and day universes and index tables,
//! `constraints` emits the hard rows, `objective` composes the
//! worker-count and score criteria.

mod builder;
mod constraints;
mod objective;
mod program;

pub use builder::{AllocationModel, SkillId};
pub use constraints::constraint_program;
pub use objective::{
    fix_worker_count, reported_objective, score_objective, score_weight, weighted_objective,
    worker_count_objective,
};
pub use program::{
    ConstraintKind, LinearConstraint, LinearProgram, Sense, VarId, FEASIBILITY_TOLERANCE,
};
