//! Chart series and trajectory projection.
//!
//! The trend is an ordinary least squares line through recent logged values;
//! every projected quantity is guarded so callers never see `NaN` or
//! infinities.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Days, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::ProjectionConfig;
use crate::dose::{PauseAccrual, calculate_target_dose_with_policy};
use crate::model::{DailyEntry, Direction, Habit, HabitId, entries_for_habit};

/// Projections further out than this are reported as unknown.
const MAX_PROJECTION_DAYS: f64 = 36_500.0;

/// Upper bound on the configured regression window.
const MAX_REGRESSION_WINDOW_DAYS: i64 = 36_500;

// ==================== Regression ====================

/// Fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, 0 for degenerate fits
    pub r_squared: f64,
}

impl RegressionResult {
    fn degenerate(points: &[(f64, f64)]) -> Self {
        let intercept = if points.is_empty() {
            0.0
        } else {
            points.iter().map(|(_, y)| y).sum::<f64>() / points.len() as f64
        };
        Self {
            slope: 0.0,
            intercept,
            r_squared: 0.0,
        }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares fit.
///
/// Needs at least two points with a positive `y` and some spread in `x`,
/// otherwise returns a flat line through the mean.
pub fn linear_regression(points: &[(f64, f64)]) -> RegressionResult {
    let positive = points.iter().filter(|(_, y)| *y > 0.0).count();
    if positive < 2 {
        return RegressionResult::degenerate(points);
    }

    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return RegressionResult::degenerate(points);
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    } else {
        1.0
    };

    RegressionResult {
        slope,
        intercept,
        r_squared,
    }
}

// ==================== Chart Data ====================

/// Window presets for charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPeriod {
    Week,
    Month,
    Quarter,
    Year,
}

impl ChartPeriod {
    pub fn days(&self) -> i64 {
        match self {
            ChartPeriod::Week => 7,
            ChartPeriod::Month => 30,
            ChartPeriod::Quarter => 90,
            ChartPeriod::Year => 365,
        }
    }
}

/// One day on a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub date: NaiveDate,
    /// Logged value, 0 when nothing was logged
    pub value: f64,
    /// Dose for the day
    pub target: f64,
    /// `value / target * 100`, 0 when the dose is 0
    pub percentage: f64,
}

/// Daily series for one habit plus summary values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub habit_id: HabitId,
    pub period: ChartPeriod,
    pub points: Vec<DataPoint>,
    pub average_value: f64,
    pub average_percentage: f64,
    /// Trend line over the series, x = day index
    pub trend: RegressionResult,
}

impl ChartData {
    /// Write the points as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for point in &self.points {
            wtr.serialize(point)
                .context("Failed to serialize data point")?;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}

/// Build one point per day of `period`, ending at `reference_date`.
pub fn get_chart_data(
    habit: &Habit,
    entries: &[DailyEntry],
    period: ChartPeriod,
    reference_date: NaiveDate,
) -> ChartData {
    get_chart_data_with_policy(habit, entries, period, reference_date, PauseAccrual::default())
}

/// Chart data with each point's target computed under `pause_accrual`.
pub fn get_chart_data_with_policy(
    habit: &Habit,
    entries: &[DailyEntry],
    period: ChartPeriod,
    reference_date: NaiveDate,
    pause_accrual: PauseAccrual,
) -> ChartData {
    let scoped = entries_for_habit(entries, &habit.id);
    let start = reference_date - Duration::days(period.days() - 1);

    let points: Vec<DataPoint> = start
        .iter_days()
        .take(period.days() as usize)
        .map(|date| {
            let value = scoped
                .iter()
                .find(|e| e.date == date)
                .map(|e| e.actual_value)
                .unwrap_or(0.0);
            let target = calculate_target_dose_with_policy(habit, date, pause_accrual);
            let percentage = if target > 0.0 { value / target * 100.0 } else { 0.0 };
            DataPoint {
                date,
                value,
                target,
                percentage,
            }
        })
        .collect();

    let count = points.len().max(1) as f64;
    let average_value = points.iter().map(|p| p.value).sum::<f64>() / count;
    let average_percentage = points.iter().map(|p| p.percentage).sum::<f64>() / count;

    let series: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.value))
        .collect();

    ChartData {
        habit_id: habit.id.clone(),
        period,
        points,
        average_value,
        average_percentage,
        trend: linear_regression(&series),
    }
}

// ==================== Projection ====================

/// Where the habit is heading at its recent pace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionData {
    pub habit_id: HabitId,
    /// Most recent logged value, or the start value when nothing is logged
    pub current_value: f64,
    pub daily_rate: f64,
    pub weekly_rate: f64,
    pub target_value: Option<f64>,
    pub days_remaining: Option<u32>,
    pub estimated_completion_date: Option<NaiveDate>,
    pub projection_in_30_days: f64,
    pub projection_in_90_days: f64,
    /// r² of the fitted trend
    pub confidence: f64,
    /// Entries used for the fit
    pub sample_count: usize,
}

pub fn get_projection(habit: &Habit, entries: &[DailyEntry], today: NaiveDate) -> ProjectionData {
    get_projection_with_config(habit, entries, today, &ProjectionConfig::default())
}

/// Project the habit's trajectory from entries in the regression window.
pub fn get_projection_with_config(
    habit: &Habit,
    entries: &[DailyEntry],
    today: NaiveDate,
    config: &ProjectionConfig,
) -> ProjectionData {
    let scoped: Vec<&DailyEntry> = entries_for_habit(entries, &habit.id)
        .into_iter()
        .filter(|e| e.date <= today)
        .collect();

    let window_days = config
        .regression_window_days
        .clamp(1, MAX_REGRESSION_WINDOW_DAYS);
    let window_start = today
        .checked_sub_days(Days::new((window_days - 1) as u64))
        .unwrap_or(NaiveDate::MIN);
    let points: Vec<(f64, f64)> = scoped
        .iter()
        .filter(|e| e.date >= window_start)
        .map(|e| ((e.date - window_start).num_days() as f64, e.actual_value))
        .collect();

    let fit = linear_regression(&points);
    let daily_rate = if fit.slope.is_finite() { fit.slope } else { 0.0 };
    let current_value = scoped
        .last()
        .map(|e| e.actual_value)
        .unwrap_or(habit.start_value);

    let days_remaining = estimate_days_remaining(habit, current_value, daily_rate);
    let estimated_completion_date =
        days_remaining.and_then(|days| today.checked_add_days(Days::new(u64::from(days))));

    ProjectionData {
        habit_id: habit.id.clone(),
        current_value,
        daily_rate,
        weekly_rate: daily_rate * 7.0,
        target_value: habit.target_value,
        days_remaining: estimated_completion_date.and(days_remaining),
        estimated_completion_date,
        projection_in_30_days: (current_value + daily_rate * 30.0).max(0.0),
        projection_in_90_days: (current_value + daily_rate * 90.0).max(0.0),
        confidence: fit.r_squared,
        sample_count: points.len(),
    }
}

/// Days until the target at `daily_rate`, when the rate is heading there.
fn estimate_days_remaining(habit: &Habit, current_value: f64, daily_rate: f64) -> Option<u32> {
    if habit.direction == Direction::Maintain || daily_rate == 0.0 {
        return None;
    }
    let target = habit.target_value?;
    let days = (target - current_value) / daily_rate;

    // Negative days mean the rate runs away from the target
    if !days.is_finite() || days <= 0.0 || days > MAX_PROJECTION_DAYS {
        return None;
    }
    Some(days.ceil() as u32)
}
