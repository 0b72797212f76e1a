//! Target dose computation.
//!
//! A habit's dose on a date is its start value moved by its progression rule
//! once per elapsed period, clamped so it never overshoots the target and
//! never drops below zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Direction, Habit, ProgressionMode};

/// How planned pauses affect the elapsed-period count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseAccrual {
    /// The curve keeps moving during a pause; pauses only hide absence and
    /// streak gaps.
    #[default]
    Continue,
    /// Paused days are removed from the elapsed count.
    Freeze,
}

/// Compute the dose for `date` using the default pause policy.
pub fn calculate_target_dose(habit: &Habit, date: NaiveDate) -> f64 {
    calculate_target_dose_with_policy(habit, date, PauseAccrual::default())
}

/// Compute the dose for `date` under an explicit pause policy.
pub fn calculate_target_dose_with_policy(
    habit: &Habit,
    date: NaiveDate,
    policy: PauseAccrual,
) -> f64 {
    let progression = match (habit.direction, habit.progression) {
        (Direction::Maintain, _) => return habit.start_value,
        (_, None) => return clamp_dose(habit, habit.start_value),
        (_, Some(progression)) => progression,
    };

    let periods = elapsed_periods(habit, date, policy);
    if periods == 0 {
        return clamp_dose(habit, habit.start_value);
    }

    let sign = habit.direction.sign();
    let raw = match progression.mode {
        ProgressionMode::Absolute => habit.start_value + sign * progression.value * periods as f64,
        ProgressionMode::Percentage => {
            let factor = 1.0 + sign * progression.value / 100.0;
            habit.start_value * factor.max(0.0).powf(periods as f64)
        }
    };

    clamp_dose(habit, raw)
}

/// Whole progression periods between the habit's anchor date and `date`.
///
/// A weekly period is a full 7-day span counted from the anchor, not a
/// Monday-aligned calendar week. Dates on or before the anchor yield zero.
pub fn elapsed_periods(habit: &Habit, date: NaiveDate, policy: PauseAccrual) -> i64 {
    let Some(progression) = habit.progression else {
        return 0;
    };
    let anchor = habit.anchor_date();
    if date <= anchor {
        return 0;
    }

    let mut days = (date - anchor).num_days();
    if policy == PauseAccrual::Freeze {
        days -= habit.paused_days_between(anchor, date);
    }

    days.max(0) / progression.period.days()
}

/// Apply the target clamp for the habit's direction and the non-negative floor.
fn clamp_dose(habit: &Habit, raw: f64) -> f64 {
    let raw = if raw.is_finite() { raw } else { f64::MAX };
    let clamped = match (habit.direction, habit.target_value) {
        (Direction::Increase, Some(target)) => raw.min(target),
        (Direction::Decrease, Some(target)) => raw.max(target),
        _ => raw,
    };
    clamped.max(0.0)
}
