use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::completion::{day_completion_ratio, get_completion_status};
use crate::config::StatisticsConfig;
use crate::model::{DailyEntry, Direction, Habit, HabitId, entries_for_habit};

// ==================== Trend Types ====================

/// Direction of a week-over-week trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Logged values are rising
    Increasing,
    /// Logged values are falling
    Decreasing,
    /// Within the stable band
    Stable,
    /// Not enough data to determine trend
    Insufficient,
}

impl TrendDirection {
    /// Returns a human-readable description of the trend.
    pub fn description(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "going up",
            TrendDirection::Decreasing => "going down",
            TrendDirection::Stable => "holding steady",
            TrendDirection::Insufficient => "insufficient data",
        }
    }

    /// Whether this trend moves a habit with `direction` the right way.
    pub fn is_improving(&self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (TrendDirection::Increasing, Direction::Increase)
                | (TrendDirection::Decreasing, Direction::Decrease)
                | (TrendDirection::Stable, Direction::Maintain)
        )
    }
}

/// Most recent 7 days compared with the 7 days before.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTrend {
    pub recent_average: Option<f64>,
    pub previous_average: Option<f64>,
    /// Relative change in percent (0 when either week is empty)
    pub change_percent: f64,
    pub direction: TrendDirection,
    /// Human-readable form of `direction`
    pub description: &'static str,
    /// Whether the trend moves the habit toward its goal
    pub improving: bool,
}

// ==================== Habit Statistics ====================

/// Aggregates for one habit over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitStats {
    pub habit_id: HabitId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Days with a logged value above zero
    pub active_days: u32,
    /// Calendar days in the range
    pub total_days: u32,
    /// Days completed or exceeded
    pub completed_days: u32,
    /// Mean daily completion in percent, missing days count as 0
    pub average_completion: f64,
    /// Last logged value minus the start value (negative for shrinking habits)
    pub total_progression: f64,
    pub current_streak: u32,
    pub best_streak: u32,
}

/// Window presets for the global overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Week,
    Month,
    Quarter,
    Year,
    All,
}

impl StatsPeriod {
    /// Length in days, `None` for the unbounded period.
    pub fn days(&self) -> Option<i64> {
        match self {
            StatsPeriod::Week => Some(7),
            StatsPeriod::Month => Some(30),
            StatsPeriod::Quarter => Some(90),
            StatsPeriod::Year => Some(365),
            StatsPeriod::All => None,
        }
    }

    /// Inclusive window ending at `today`.
    ///
    /// `All` starts at the earliest habit creation date.
    pub fn window(&self, habits: &[Habit], today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self.days() {
            Some(days) => today - Duration::days(days - 1),
            None => habits
                .iter()
                .map(|h| h.created_at)
                .min()
                .unwrap_or(today)
                .min(today),
        };
        (start, today)
    }
}

/// One habit's line in the global overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitSummary {
    pub habit_id: HabitId,
    pub name: String,
    pub direction: Direction,
    pub stats: HabitStats,
    pub weekly_trend: WeeklyTrend,
}

/// Overview across every active habit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStats {
    pub period: StatsPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active_habits: usize,
    pub total_active_days: u32,
    pub total_completed_days: u32,
    /// Mean of the per-habit average completion
    pub average_completion: f64,
    pub best_current_streak: u32,
    pub best_streak: u32,
    pub habits: Vec<HabitSummary>,
}

/// Whether an entry keeps a streak alive.
///
/// A logged zero counts for decrease habits, where it is the best outcome.
fn qualifies_for_streak(entry: &DailyEntry, direction: Direction) -> bool {
    match direction {
        Direction::Decrease => true,
        Direction::Increase | Direction::Maintain => entry.actual_value > 0.0,
    }
}

/// Calculate aggregates for `habit` over the inclusive range `[start, end]`.
pub fn calculate_habit_stats(
    habit: &Habit,
    entries: &[DailyEntry],
    start: NaiveDate,
    end: NaiveDate,
) -> HabitStats {
    let mut stats = HabitStats {
        habit_id: habit.id.clone(),
        start_date: start,
        end_date: end,
        active_days: 0,
        total_days: 0,
        completed_days: 0,
        average_completion: 0.0,
        total_progression: 0.0,
        current_streak: 0,
        best_streak: 0,
    };
    if end < start {
        return stats;
    }

    let by_date: BTreeMap<NaiveDate, &DailyEntry> = entries_for_habit(entries, &habit.id)
        .into_iter()
        .filter(|e| start <= e.date && e.date <= end)
        .map(|e| (e.date, e))
        .collect();

    let total_days = (end - start).num_days() + 1;
    stats.total_days = total_days as u32;
    stats.active_days = by_date.values().filter(|e| e.actual_value > 0.0).count() as u32;
    stats.completed_days = by_date
        .values()
        .filter(|e| get_completion_status(Some(**e), habit.direction).is_success())
        .count() as u32;

    let completion_sum: f64 = by_date
        .values()
        .map(|e| day_completion_ratio(Some(*e), habit.direction))
        .sum();
    stats.average_completion = completion_sum / total_days as f64 * 100.0;

    stats.total_progression = by_date
        .values()
        .next_back()
        .map(|e| e.actual_value - habit.start_value)
        .unwrap_or(0.0);

    stats.best_streak = best_streak(habit, &by_date, start, end);
    stats.current_streak = current_streak(habit, &by_date, start, end);
    stats
}

/// Longest run of qualifying days in the range. Paused days without an entry
/// are skipped rather than breaking the run.
fn best_streak(
    habit: &Habit,
    by_date: &BTreeMap<NaiveDate, &DailyEntry>,
    start: NaiveDate,
    end: NaiveDate,
) -> u32 {
    let mut best = 0;
    let mut run = 0;

    for day in start.iter_days().take_while(|d| *d <= end) {
        match by_date.get(&day) {
            Some(entry) if qualifies_for_streak(entry, habit.direction) => {
                run += 1;
                best = best.max(run);
            }
            None if habit.is_paused_on(day) => {}
            _ => run = 0,
        }
    }
    best
}

/// Run of qualifying days ending at `end`.
///
/// An `end` day with no entry yet does not break the run, so an unlogged
/// today still shows yesterday's streak.
fn current_streak(
    habit: &Habit,
    by_date: &BTreeMap<NaiveDate, &DailyEntry>,
    start: NaiveDate,
    end: NaiveDate,
) -> u32 {
    let mut streak = 0;
    let mut day = end;

    loop {
        match by_date.get(&day) {
            Some(entry) if qualifies_for_streak(entry, habit.direction) => streak += 1,
            None if habit.is_paused_on(day) || day == end => {}
            _ => break,
        }
        if day <= start {
            break;
        }
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

// ==================== Trends ====================

fn window_average(
    by_date: &BTreeMap<NaiveDate, &DailyEntry>,
    from: NaiveDate,
    to: NaiveDate,
) -> Option<f64> {
    let values: Vec<f64> = by_date
        .range(from..=to)
        .map(|(_, e)| e.actual_value)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Compare the average logged value of the last 7 days with the 7 days before.
pub fn calculate_weekly_trend(
    habit: &Habit,
    entries: &[DailyEntry],
    today: NaiveDate,
    config: &StatisticsConfig,
) -> WeeklyTrend {
    let by_date: BTreeMap<NaiveDate, &DailyEntry> = entries_for_habit(entries, &habit.id)
        .into_iter()
        .map(|e| (e.date, e))
        .collect();

    let recent_start = today - Duration::days(6);
    let previous_end = today - Duration::days(7);
    let previous_start = today - Duration::days(13);

    let recent_average = window_average(&by_date, recent_start, today);
    let previous_average = window_average(&by_date, previous_start, previous_end);

    let (change_percent, direction) = match (recent_average, previous_average) {
        (Some(recent), Some(previous)) => {
            let change = if previous > 0.0 {
                (recent - previous) / previous * 100.0
            } else if recent > 0.0 {
                100.0 // From 0 to something is 100% increase
            } else {
                0.0
            };
            let direction = if change > config.trend_stable_percent {
                TrendDirection::Increasing
            } else if change < -config.trend_stable_percent {
                TrendDirection::Decreasing
            } else {
                TrendDirection::Stable
            };
            (change, direction)
        }
        _ => (0.0, TrendDirection::Insufficient),
    };

    WeeklyTrend {
        recent_average,
        previous_average,
        change_percent,
        direction,
        description: direction.description(),
        improving: direction.is_improving(habit.direction),
    }
}

// ==================== Global Statistics ====================

pub fn get_global_stats(
    habits: &[Habit],
    entries: &[DailyEntry],
    period: StatsPeriod,
    today: NaiveDate,
) -> GlobalStats {
    get_global_stats_with_config(habits, entries, period, today, &StatisticsConfig::default())
}

/// Aggregate every habit active on `today` over the period window.
///
/// Each habit's range starts no earlier than its creation date.
pub fn get_global_stats_with_config(
    habits: &[Habit],
    entries: &[DailyEntry],
    period: StatsPeriod,
    today: NaiveDate,
    config: &StatisticsConfig,
) -> GlobalStats {
    let (start_date, end_date) = period.window(habits, today);

    let summaries: Vec<HabitSummary> = habits
        .iter()
        .filter(|h| h.is_active_on(today))
        .map(|habit| {
            let habit_start = start_date.max(habit.created_at);
            HabitSummary {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                direction: habit.direction,
                stats: calculate_habit_stats(habit, entries, habit_start, end_date),
                weekly_trend: calculate_weekly_trend(habit, entries, today, config),
            }
        })
        .collect();

    let average_completion = if summaries.is_empty() {
        0.0
    } else {
        summaries
            .iter()
            .map(|s| s.stats.average_completion)
            .sum::<f64>()
            / summaries.len() as f64
    };

    GlobalStats {
        period,
        start_date,
        end_date,
        active_habits: summaries.len(),
        total_active_days: summaries.iter().map(|s| s.stats.active_days).sum(),
        total_completed_days: summaries.iter().map(|s| s.stats.completed_days).sum(),
        average_completion,
        best_current_streak: summaries
            .iter()
            .map(|s| s.stats.current_streak)
            .max()
            .unwrap_or(0),
        best_streak: summaries
            .iter()
            .map(|s| s.stats.best_streak)
            .max()
            .unwrap_or(0),
        habits: summaries,
    }
}
