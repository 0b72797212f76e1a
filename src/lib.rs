//! Habit Dose Library
//!
//! Temporal progression and statistics engine for dose-based habits: daily
//! targets, completion, absences, recalibration, statistics, projections
//! and milestones.

pub mod absence;
pub mod cache;
pub mod completion;
pub mod config;
pub mod dose;
pub mod error;
pub mod milestones;
pub mod model;
pub mod projection;
pub mod recalibration;
pub mod reminder;
pub mod snapshot;
pub mod stats;
pub mod traits;

// Re-export commonly used types
pub use absence::{
    ABSENCE_THRESHOLD, EXTENDED_ABSENCE_THRESHOLD, ExtendedAbsence, GlobalAbsence, HabitAbsence,
    detect_extended_absence, detect_global_absence, detect_habit_absence, is_habit_paused,
    needs_recalibration,
};
pub use cache::{CacheStats, StatsCache};
pub use completion::{CompletionStatus, get_completion_status, is_zero_victory};
pub use config::AppConfig;
pub use dose::{PauseAccrual, calculate_target_dose, calculate_target_dose_with_policy};
pub use error::{EngineError, SnapshotError};
pub use milestones::{
    calculate_progress_percentage, check_for_new_milestone_after_check_in, detect_new_milestones,
    get_reached_levels,
};
pub use model::{
    DailyEntry, Direction, Habit, HabitId, Milestone, MilestoneLevel, MilestoneSet, PlannedPause,
    Progression, ProgressionMode, ProgressionPeriod, TrackingFrequency,
};
pub use projection::{
    ChartData, ChartPeriod, DataPoint, ProjectionData, RegressionResult, get_chart_data,
    get_chart_data_with_policy,
    get_projection, linear_regression,
};
pub use recalibration::{RecalibrationLevel, apply_recalibration, calculate_recalibration_dose};
pub use reminder::{pending_habits, should_send_evening_reminder};
pub use snapshot::Snapshot;
pub use stats::{
    GlobalStats, HabitStats, HabitSummary, StatsPeriod, TrendDirection, WeeklyTrend,
    calculate_habit_stats, calculate_weekly_trend, get_global_stats,
};
pub use traits::{Clock, MockClock, SystemClock};
