//! Restart doses after a prolonged absence.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::Habit;

/// How much of the gap between the last value and today's dose to close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalibrationLevel {
    /// Halfway back
    Gentle,
    /// Three quarters back
    Moderate,
    /// Straight to the current dose
    Full,
    /// A user-chosen fraction in `[0, 1]`
    Custom(f64),
}

impl RecalibrationLevel {
    /// Validate a user-supplied fraction.
    pub fn custom(level: f64) -> Result<Self, EngineError> {
        if level.is_finite() && (0.0..=1.0).contains(&level) {
            Ok(RecalibrationLevel::Custom(level))
        } else {
            Err(EngineError::InvalidRecalibrationLevel(level))
        }
    }

    /// Map a numeric level onto the presets where one matches exactly.
    pub fn from_fraction(level: f64) -> Result<Self, EngineError> {
        if level == 0.5 {
            Ok(RecalibrationLevel::Gentle)
        } else if level == 0.75 {
            Ok(RecalibrationLevel::Moderate)
        } else if level == 1.0 {
            Ok(RecalibrationLevel::Full)
        } else {
            Self::custom(level)
        }
    }

    pub fn fraction(&self) -> f64 {
        match self {
            RecalibrationLevel::Gentle => 0.5,
            RecalibrationLevel::Moderate => 0.75,
            RecalibrationLevel::Full => 1.0,
            RecalibrationLevel::Custom(level) => *level,
        }
    }
}

/// Compute the restart dose after an absence.
///
/// Interpolates from the last logged value (or the habit's start value) toward
/// the current dose and rounds half away from zero. The result never exceeds
/// the current dose and is at least 1, for every direction.
pub fn calculate_recalibration_dose(
    last_actual_value: Option<f64>,
    current_target_dose: f64,
    level: RecalibrationLevel,
    habit: &Habit,
) -> f64 {
    let base = last_actual_value.unwrap_or(habit.start_value);
    let raw = (base + level.fraction() * (current_target_dose - base)).round();
    let dose = raw.min(current_target_dose).max(1.0);

    tracing::debug!(
        "Recalibration for {}: base {:.1}, current dose {:.1}, level {:.2} -> {}",
        habit.id,
        base,
        current_target_dose,
        level.fraction(),
        dose
    );
    dose
}

/// Re-anchor a habit on its recalibrated dose.
///
/// The returned habit starts its progression curve again from `new_dose` on
/// `date`; the input is left untouched.
pub fn apply_recalibration(habit: &Habit, new_dose: f64, date: NaiveDate) -> Habit {
    Habit {
        start_value: new_dose,
        progression_anchor: Some(date),
        ..habit.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dose::calculate_target_dose;
    use crate::model::fixtures::*;
    use crate::model::{Direction, ProgressionMode, ProgressionPeriod};

    fn runner() -> Habit {
        progressive(
            "run",
            Direction::Increase,
            10.0,
            Some(40.0),
            ProgressionMode::Absolute,
            1.0,
            ProgressionPeriod::Daily,
        )
    }

    #[test]
    fn test_preset_levels() {
        let h = runner();
        let dose = |level| calculate_recalibration_dose(Some(10.0), 20.0, level, &h);
        assert_eq!(dose(RecalibrationLevel::Gentle), 15.0);
        assert_eq!(dose(RecalibrationLevel::Moderate), 18.0);
        assert_eq!(dose(RecalibrationLevel::Full), 20.0);
    }

    #[test]
    fn test_base_falls_back_to_start_value() {
        let h = runner();
        let dose = calculate_recalibration_dose(None, 30.0, RecalibrationLevel::Gentle, &h);
        assert_eq!(dose, 20.0);
    }

    #[test]
    fn test_never_below_one() {
        let h = runner();
        let level = RecalibrationLevel::custom(0.2).unwrap();
        let dose = calculate_recalibration_dose(Some(0.0), 1.0, level, &h);
        assert_eq!(dose, 1.0);
    }

    #[test]
    fn test_never_above_current_dose() {
        let h = runner();
        // Last value beat the dose; restart no higher than the dose
        let dose = calculate_recalibration_dose(Some(30.0), 20.0, RecalibrationLevel::Gentle, &h);
        assert_eq!(dose, 20.0);
    }

    #[test]
    fn test_decrease_habit_never_exceeds_current_dose() {
        let h = progressive(
            "smoke",
            Direction::Decrease,
            20.0,
            Some(0.0),
            ProgressionMode::Absolute,
            1.0,
            ProgressionPeriod::Daily,
        );
        for level in [
            RecalibrationLevel::Gentle,
            RecalibrationLevel::Moderate,
            RecalibrationLevel::Full,
        ] {
            let dose = calculate_recalibration_dose(Some(16.0), 8.0, level, &h);
            assert_eq!(dose, 8.0);
        }
        // Below the current dose the interpolation still applies
        let dose = calculate_recalibration_dose(Some(4.0), 8.0, RecalibrationLevel::Gentle, &h);
        assert_eq!(dose, 6.0);
    }

    #[test]
    fn test_custom_level_validation() {
        assert!(RecalibrationLevel::custom(0.3).is_ok());
        assert_eq!(
            RecalibrationLevel::custom(1.5),
            Err(EngineError::InvalidRecalibrationLevel(1.5))
        );
        assert!(RecalibrationLevel::custom(-0.1).is_err());
        assert!(RecalibrationLevel::custom(f64::NAN).is_err());
    }

    #[test]
    fn test_from_fraction_maps_presets() {
        assert_eq!(
            RecalibrationLevel::from_fraction(0.5),
            Ok(RecalibrationLevel::Gentle)
        );
        assert_eq!(
            RecalibrationLevel::from_fraction(1.0),
            Ok(RecalibrationLevel::Full)
        );
        assert_eq!(
            RecalibrationLevel::from_fraction(0.6),
            Ok(RecalibrationLevel::Custom(0.6))
        );
    }

    #[test]
    fn test_apply_recalibration_reanchors_curve() {
        let h = runner();
        let today = date(2024, 3, 1);
        let recalibrated = apply_recalibration(&h, 18.0, today);

        assert_eq!(h.start_value, 10.0);
        assert!(h.progression_anchor.is_none());
        assert_eq!(recalibrated.start_value, 18.0);
        assert_eq!(calculate_target_dose(&recalibrated, today), 18.0);
        assert_eq!(calculate_target_dose(&recalibrated, date(2024, 3, 3)), 20.0);
    }
}
