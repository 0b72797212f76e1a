//! Classifying a logged value against its dose.

use serde::{Deserialize, Serialize};

use crate::model::{DailyEntry, Direction};

/// How a day's logged value compares to its dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Nothing logged yet
    Pending,
    /// Logged, but short of the dose
    Partial,
    /// Logged exactly the dose
    Completed,
    /// Logged better than the dose
    Exceeded,
}

impl CompletionStatus {
    /// Completed or exceeded.
    pub fn is_success(&self) -> bool {
        matches!(self, CompletionStatus::Completed | CompletionStatus::Exceeded)
    }
}

/// Classify an entry for a habit moving in `direction`.
///
/// For decrease habits doing less than the dose is the favorable outcome, so
/// the comparison is inverted.
pub fn get_completion_status(entry: Option<&DailyEntry>, direction: Direction) -> CompletionStatus {
    let Some(entry) = entry else {
        return CompletionStatus::Pending;
    };
    let actual = entry.actual_value;
    let target = entry.target_dose;

    if actual == target {
        return CompletionStatus::Completed;
    }

    match direction {
        Direction::Increase | Direction::Maintain => {
            if actual > target {
                CompletionStatus::Exceeded
            } else if actual > 0.0 {
                CompletionStatus::Partial
            } else {
                CompletionStatus::Pending
            }
        }
        Direction::Decrease => {
            if actual < target {
                CompletionStatus::Exceeded
            } else {
                CompletionStatus::Partial
            }
        }
    }
}

/// A decrease habit logged at exactly zero.
///
/// Not a separate status; callers render it specially.
pub fn is_zero_victory(entry: Option<&DailyEntry>, direction: Direction) -> bool {
    direction == Direction::Decrease && entry.is_some_and(|e| e.actual_value == 0.0)
}

/// Fraction of the dose achieved on a day, in `[0, 1]`.
///
/// Missing entries score 0. A zero dose is met by any value on increase
/// habits; on decrease habits doing less than or equal to the dose scores 1.
pub fn day_completion_ratio(entry: Option<&DailyEntry>, direction: Direction) -> f64 {
    let Some(entry) = entry else {
        return 0.0;
    };
    let actual = entry.actual_value.max(0.0);
    let target = entry.target_dose.max(0.0);

    let ratio = match direction {
        Direction::Increase | Direction::Maintain => {
            if target == 0.0 {
                1.0
            } else {
                actual / target
            }
        }
        Direction::Decrease => {
            if actual <= target {
                1.0
            } else {
                target / actual
            }
        }
    };
    ratio.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;

    fn status(direction: Direction, target: f64, actual: f64) -> CompletionStatus {
        let e = entry("x", date(2024, 1, 1), target, actual);
        get_completion_status(Some(&e), direction)
    }

    #[test]
    fn test_missing_entry_is_pending() {
        assert_eq!(
            get_completion_status(None, Direction::Increase),
            CompletionStatus::Pending
        );
        assert_eq!(
            get_completion_status(None, Direction::Decrease),
            CompletionStatus::Pending
        );
    }

    #[test]
    fn test_increase_classification() {
        assert_eq!(status(Direction::Increase, 5.0, 5.0), CompletionStatus::Completed);
        assert_eq!(status(Direction::Increase, 5.0, 7.0), CompletionStatus::Exceeded);
        assert_eq!(status(Direction::Increase, 5.0, 3.0), CompletionStatus::Partial);
        assert_eq!(status(Direction::Increase, 5.0, 0.0), CompletionStatus::Pending);
    }

    #[test]
    fn test_maintain_follows_increase_rules() {
        assert_eq!(status(Direction::Maintain, 5.0, 6.0), CompletionStatus::Exceeded);
        assert_eq!(status(Direction::Maintain, 5.0, 2.0), CompletionStatus::Partial);
    }

    #[test]
    fn test_decrease_is_inverted() {
        assert_eq!(status(Direction::Decrease, 5.0, 3.0), CompletionStatus::Exceeded);
        assert_eq!(status(Direction::Decrease, 5.0, 5.0), CompletionStatus::Completed);
        assert_eq!(status(Direction::Decrease, 5.0, 8.0), CompletionStatus::Partial);
        assert_eq!(status(Direction::Decrease, 5.0, 0.0), CompletionStatus::Exceeded);
    }

    #[test]
    fn test_same_numbers_opposite_directions() {
        assert_eq!(status(Direction::Decrease, 5.0, 3.0), CompletionStatus::Exceeded);
        assert_eq!(status(Direction::Increase, 5.0, 3.0), CompletionStatus::Partial);
    }

    #[test]
    fn test_zero_dose_zero_value_is_completed() {
        assert_eq!(status(Direction::Increase, 0.0, 0.0), CompletionStatus::Completed);
        assert_eq!(status(Direction::Decrease, 0.0, 0.0), CompletionStatus::Completed);
    }

    #[test]
    fn test_zero_victory() {
        let zero = entry("x", date(2024, 1, 1), 4.0, 0.0);
        let some = entry("x", date(2024, 1, 1), 4.0, 1.0);
        assert!(is_zero_victory(Some(&zero), Direction::Decrease));
        assert!(!is_zero_victory(Some(&some), Direction::Decrease));
        assert!(!is_zero_victory(Some(&zero), Direction::Increase));
        assert!(!is_zero_victory(None, Direction::Decrease));
    }

    #[test]
    fn test_success_statuses() {
        assert!(CompletionStatus::Completed.is_success());
        assert!(CompletionStatus::Exceeded.is_success());
        assert!(!CompletionStatus::Partial.is_success());
        assert!(!CompletionStatus::Pending.is_success());
    }

    #[test]
    fn test_completion_ratio() {
        let half = entry("x", date(2024, 1, 1), 10.0, 5.0);
        let over = entry("x", date(2024, 1, 1), 10.0, 15.0);
        assert_eq!(day_completion_ratio(Some(&half), Direction::Increase), 0.5);
        assert_eq!(day_completion_ratio(Some(&over), Direction::Increase), 1.0);
        assert_eq!(day_completion_ratio(None, Direction::Increase), 0.0);

        // Doing twice the allowed amount on a decrease habit scores half
        let double = entry("x", date(2024, 1, 1), 5.0, 10.0);
        let under = entry("x", date(2024, 1, 1), 5.0, 2.0);
        assert_eq!(day_completion_ratio(Some(&double), Direction::Decrease), 0.5);
        assert_eq!(day_completion_ratio(Some(&under), Direction::Decrease), 1.0);
    }
}
