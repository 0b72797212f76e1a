//! Inactivity detection, globally and per habit.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::AbsenceConfig;
use crate::dose::{PauseAccrual, calculate_target_dose_with_policy};
use crate::model::{DailyEntry, Habit, HabitId, entries_for_habit};

/// Days without any entry before the user counts as absent.
pub const ABSENCE_THRESHOLD: i64 = 2;

/// Days without an entry before a recalibration is offered.
pub const EXTENDED_ABSENCE_THRESHOLD: i64 = 7;

/// Inactivity across all habits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalAbsence {
    pub days_since_last_entry: i64,
    pub is_absent: bool,
    pub last_entry_date: Option<NaiveDate>,
}

/// Inactivity for one habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitAbsence {
    pub habit_id: HabitId,
    /// Days since the last entry, or since creation when nothing was logged.
    /// Planned pause days inside the gap are not counted.
    pub days_since_last_entry: i64,
    pub is_absent: bool,
    pub last_entry_date: Option<NaiveDate>,
    /// Pause days skipped while counting the gap
    pub paused_days: i64,
}

/// A habit that has been idle long enough to need a new starting dose.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedAbsence {
    pub habit_id: HabitId,
    pub days_since_last_entry: i64,
    pub last_entry_date: Option<NaiveDate>,
    pub last_actual_value: Option<f64>,
    pub current_target_dose: f64,
}

pub fn detect_global_absence(entries: &[DailyEntry], today: NaiveDate) -> GlobalAbsence {
    detect_global_absence_with_config(entries, today, &AbsenceConfig::default())
}

/// Latest entry across every habit decides global absence.
pub fn detect_global_absence_with_config(
    entries: &[DailyEntry],
    today: NaiveDate,
    config: &AbsenceConfig,
) -> GlobalAbsence {
    let last_entry_date = entries.iter().map(|e| e.date).filter(|d| *d <= today).max();

    match last_entry_date {
        Some(last) => {
            let days = (today - last).num_days();
            GlobalAbsence {
                days_since_last_entry: days,
                is_absent: days >= config.threshold_days,
                last_entry_date: Some(last),
            }
        }
        None => GlobalAbsence {
            days_since_last_entry: 0,
            is_absent: false,
            last_entry_date: None,
        },
    }
}

pub fn detect_habit_absence(habit: &Habit, entries: &[DailyEntry], today: NaiveDate) -> HabitAbsence {
    detect_habit_absence_with_config(habit, entries, today, &AbsenceConfig::default())
}

/// Absence scoped to one habit, counted from the last entry or from creation.
pub fn detect_habit_absence_with_config(
    habit: &Habit,
    entries: &[DailyEntry],
    today: NaiveDate,
    config: &AbsenceConfig,
) -> HabitAbsence {
    let last_entry_date = entries_for_habit(entries, &habit.id)
        .into_iter()
        .map(|e| e.date)
        .filter(|d| *d <= today)
        .max();

    let since = last_entry_date.unwrap_or(habit.created_at);
    let raw_days = (today - since).num_days().max(0);
    // The day of the last entry itself never counts as a gap day
    let paused_days = match since.succ_opt() {
        Some(first_gap_day) => habit.paused_days_between(first_gap_day, today.succ_opt().unwrap_or(today)),
        None => 0,
    };
    let days = (raw_days - paused_days).max(0);

    HabitAbsence {
        habit_id: habit.id.clone(),
        days_since_last_entry: days,
        is_absent: days >= config.threshold_days,
        last_entry_date,
        paused_days,
    }
}

/// Whether `date` falls within any of the habit's planned pauses.
pub fn is_habit_paused(habit: &Habit, date: NaiveDate) -> bool {
    habit.is_paused_on(date)
}

pub fn needs_recalibration(habit: &Habit, entries: &[DailyEntry], today: NaiveDate) -> bool {
    needs_recalibration_with_config(habit, entries, today, &AbsenceConfig::default())
}

/// True only for habits with a progression rule idle past the extended threshold.
pub fn needs_recalibration_with_config(
    habit: &Habit,
    entries: &[DailyEntry],
    today: NaiveDate,
    config: &AbsenceConfig,
) -> bool {
    if !habit.has_progression() {
        return false;
    }
    let absence = detect_habit_absence_with_config(habit, entries, today, config);
    absence.days_since_last_entry >= config.extended_threshold_days
}

pub fn detect_extended_absence(
    habit: &Habit,
    entries: &[DailyEntry],
    today: NaiveDate,
) -> Option<ExtendedAbsence> {
    detect_extended_absence_with_config(
        habit,
        entries,
        today,
        &AbsenceConfig::default(),
        PauseAccrual::default(),
    )
}

/// Report for a habit that needs recalibration, `None` otherwise.
///
/// The current target dose follows the same pause policy as the dose
/// calculator so both report one value for a given date.
pub fn detect_extended_absence_with_config(
    habit: &Habit,
    entries: &[DailyEntry],
    today: NaiveDate,
    config: &AbsenceConfig,
    pause_accrual: PauseAccrual,
) -> Option<ExtendedAbsence> {
    if !needs_recalibration_with_config(habit, entries, today, config) {
        return None;
    }
    let absence = detect_habit_absence_with_config(habit, entries, today, config);
    let last_actual_value = entries_for_habit(entries, &habit.id)
        .into_iter()
        .filter(|e| e.date <= today)
        .next_back()
        .map(|e| e.actual_value);

    Some(ExtendedAbsence {
        habit_id: habit.id.clone(),
        days_since_last_entry: absence.days_since_last_entry,
        last_entry_date: absence.last_entry_date,
        last_actual_value,
        current_target_dose: calculate_target_dose_with_policy(habit, today, pause_accrual),
    })
}
