use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::absence::{ABSENCE_THRESHOLD, EXTENDED_ABSENCE_THRESHOLD};
use crate::dose::PauseAccrual;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub dose: DoseConfig,
    pub absence: AbsenceConfig,
    pub recalibration: RecalibrationConfig,
    pub statistics: StatisticsConfig,
    pub projection: ProjectionConfig,
    pub reminder: ReminderConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DoseConfig {
    pub pause_accrual: PauseAccrual,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct AbsenceConfig {
    /// Days without an entry before the user counts as absent
    pub threshold_days: i64,
    /// Days without an entry before a recalibration is offered
    pub extended_threshold_days: i64,
}

impl Default for AbsenceConfig {
    fn default() -> Self {
        Self {
            threshold_days: ABSENCE_THRESHOLD,
            extended_threshold_days: EXTENDED_ABSENCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecalibrationConfig {
    /// Level preselected in the recalibration dialog
    pub default_level: f64,
}

impl Default for RecalibrationConfig {
    fn default() -> Self {
        Self {
            default_level: 0.75,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatisticsConfig {
    /// Week-over-week change (in percent) still considered stable
    pub trend_stable_percent: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            trend_stable_percent: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectionConfig {
    pub regression_window_days: i64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            regression_window_days: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReminderConfig {
    pub enabled: bool,
    /// Local hour from which the evening reminder may fire
    pub hour: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 20,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("habit-dose");

        let builder = Config::builder()
            // 1. Load default values
            // Dose
            .set_default("dose.pause_accrual", "continue")?
            // Absence
            .set_default("absence.threshold_days", ABSENCE_THRESHOLD)?
            .set_default("absence.extended_threshold_days", EXTENDED_ABSENCE_THRESHOLD)?
            // Recalibration
            .set_default("recalibration.default_level", 0.75)?
            // Statistics
            .set_default("statistics.trend_stable_percent", 5.0)?
            // Projection
            .set_default("projection.regression_window_days", 30)?
            // Reminder
            .set_default("reminder.enabled", true)?
            .set_default("reminder.hour", 20)?

            // 2. Load from local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))

            // 3. Load from user config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))

            // 4. Load from Environment variables (HABIT_DOSE__ABSENCE__THRESHOLD_DAYS=...)
            .add_source(Environment::with_prefix("HABIT_DOSE").separator("__"));

        let s = builder.build().context("Failed to assemble configuration sources")?;
        Ok(s.try_deserialize()?)
    }
}
