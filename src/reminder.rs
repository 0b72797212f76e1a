//! Decide whether the evening check-in reminder should go out.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::config::ReminderConfig;
use crate::model::{DailyEntry, Habit, HabitId};

/// Habits that are expected today but have nothing logged yet.
///
/// Expected means active on `today` and outside every planned pause.
pub fn pending_habits<'a>(
    habits: &'a [Habit],
    entries: &[DailyEntry],
    today: NaiveDate,
) -> Vec<&'a Habit> {
    let logged: HashSet<&HabitId> = entries
        .iter()
        .filter(|e| e.date == today)
        .map(|e| &e.habit_id)
        .collect();

    habits
        .iter()
        .filter(|h| h.is_active_on(today) && !h.is_paused_on(today))
        .filter(|h| !logged.contains(&h.id))
        .collect()
}

/// True when fewer habits were logged today than are expected today.
pub fn should_send_evening_reminder(
    habits: &[Habit],
    entries: &[DailyEntry],
    today: NaiveDate,
) -> bool {
    !pending_habits(habits, entries, today).is_empty()
}

impl ReminderConfig {
    /// Apply the enabled flag and the hour gate on top of the pending check.
    pub fn should_fire(
        &self,
        now_hour: u32,
        habits: &[Habit],
        entries: &[DailyEntry],
        today: NaiveDate,
    ) -> bool {
        if !self.enabled || now_hour < self.hour {
            return false;
        }
        let pending = pending_habits(habits, entries, today);
        if !pending.is_empty() {
            tracing::debug!(
                "{} habit(s) still pending at {}:00 on {}",
                pending.len(),
                now_hour,
                today
            );
        }
        !pending.is_empty()
    }
}
