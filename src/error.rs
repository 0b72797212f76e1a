use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{HabitId, MilestoneLevel};

/// Errors raised by engine inputs that can be rejected up front.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Recalibration level must be a finite value between 0 and 1, got {0}")]
    InvalidRecalibrationLevel(f64),
    #[error("Unknown habit: {0}")]
    UnknownHabit(HabitId),
}

/// Invariant violations found while validating a snapshot from storage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("Duplicate habit id {0}")]
    DuplicateHabit(HabitId),
    #[error("Duplicate entry for habit {habit_id} on {date}")]
    DuplicateEntry { habit_id: HabitId, date: NaiveDate },
    #[error("Entry on {date} references unknown habit {habit_id}")]
    OrphanEntry { habit_id: HabitId, date: NaiveDate },
    #[error("Negative value in entry for habit {habit_id} on {date}")]
    NegativeValue { habit_id: HabitId, date: NaiveDate },
    #[error("Habit {0} has a negative start value")]
    NegativeStartValue(HabitId),
    #[error("Pause for habit {habit_id} ends ({end}) before it starts ({start})")]
    InvertedPause {
        habit_id: HabitId,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("Duplicate milestone {level} for habit {habit_id}")]
    DuplicateMilestone {
        habit_id: HabitId,
        level: MilestoneLevel,
    },
}
