//! Progress-toward-target percentages and milestone crossings.

use chrono::NaiveDate;

use crate::model::{Direction, Habit, Milestone, MilestoneLevel, MilestoneSet};

/// Percent of the way from start value to target value.
///
/// Direction-aware, may exceed 100, and 0 for maintain habits or habits
/// without a target.
pub fn calculate_progress_percentage(habit: &Habit, current_value: f64) -> f64 {
    let Some(target) = habit.target_value else {
        return 0.0;
    };
    let start = habit.start_value;

    match habit.direction {
        Direction::Increase => {
            if start >= target {
                return if current_value >= target { 100.0 } else { 0.0 };
            }
            (current_value - start) / (target - start) * 100.0
        }
        Direction::Decrease => {
            if start <= target {
                return if current_value <= target { 100.0 } else { 0.0 };
            }
            (start - current_value) / (start - target) * 100.0
        }
        Direction::Maintain => 0.0,
    }
}

/// Levels at or below `percent`, ascending.
pub fn get_reached_levels(percent: f64) -> Vec<MilestoneLevel> {
    MilestoneLevel::ALL
        .into_iter()
        .filter(|level| level.percent() <= percent)
        .collect()
}

/// Levels reached at `current_value` that are not yet recorded, each as an
/// uncelebrated milestone dated `today`.
pub fn detect_new_milestones(
    habit: &Habit,
    current_value: f64,
    existing: &MilestoneSet,
    today: NaiveDate,
) -> Vec<Milestone> {
    let percent = calculate_progress_percentage(habit, current_value);
    get_reached_levels(percent)
        .into_iter()
        .filter(|level| !existing.contains(&habit.id, *level))
        .map(|level| Milestone::new(habit.id.clone(), level, today))
        .collect()
}

/// The single milestone to celebrate after a check-in moved the value from
/// `previous_value` to `new_value`.
///
/// Only the highest newly crossed level is returned, so a check-in that
/// jumps several thresholds celebrates once.
pub fn check_for_new_milestone_after_check_in(
    habit: &Habit,
    previous_value: f64,
    new_value: f64,
    existing: &MilestoneSet,
    today: NaiveDate,
) -> Option<Milestone> {
    let before = calculate_progress_percentage(habit, previous_value);
    let after = calculate_progress_percentage(habit, new_value);

    let level = MilestoneLevel::ALL
        .into_iter()
        .rev()
        .find(|level| {
            let threshold = level.percent();
            before < threshold && threshold <= after && !existing.contains(&habit.id, *level)
        })?;

    tracing::debug!(
        "Habit {} crossed {} ({:.1}% -> {:.1}%)",
        habit.id,
        level,
        before,
        after
    );
    Some(Milestone::new(habit.id.clone(), level, today))
}
