use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, SnapshotError};
use crate::model::{DailyEntry, Habit, HabitId, Milestone, MilestoneSet};

/// Everything the storage layer hands over: habits, their entries and the
/// milestones recorded so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub entries: Vec<DailyEntry>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl Snapshot {
    /// Read and validate a JSON snapshot from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        snapshot
            .validate()
            .with_context(|| format!("Invalid snapshot {}", path.display()))?;

        tracing::info!(
            "Loaded snapshot with {} habits, {} entries and {} milestones",
            snapshot.habits.len(),
            snapshot.entries.len(),
            snapshot.milestones.len()
        );
        Ok(snapshot)
    }

    /// Write the snapshot back as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        tracing::debug!("Saved snapshot to {}", path.display());
        Ok(())
    }

    /// Check the record invariants, reporting the first violation.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut habit_ids: HashSet<&HabitId> = HashSet::new();
        for habit in &self.habits {
            if !habit_ids.insert(&habit.id) {
                return Err(SnapshotError::DuplicateHabit(habit.id.clone()));
            }
            if habit.start_value < 0.0 {
                return Err(SnapshotError::NegativeStartValue(habit.id.clone()));
            }
            if let Some(pause) = habit
                .planned_pauses
                .iter()
                .find(|p| p.end_date < p.start_date)
            {
                return Err(SnapshotError::InvertedPause {
                    habit_id: habit.id.clone(),
                    start: pause.start_date,
                    end: pause.end_date,
                });
            }
        }

        let mut entry_keys: HashSet<(&HabitId, NaiveDate)> = HashSet::new();
        for entry in &self.entries {
            if !habit_ids.contains(&entry.habit_id) {
                return Err(SnapshotError::OrphanEntry {
                    habit_id: entry.habit_id.clone(),
                    date: entry.date,
                });
            }
            if !entry_keys.insert((&entry.habit_id, entry.date)) {
                return Err(SnapshotError::DuplicateEntry {
                    habit_id: entry.habit_id.clone(),
                    date: entry.date,
                });
            }
            if entry.actual_value < 0.0 || entry.target_dose < 0.0 {
                return Err(SnapshotError::NegativeValue {
                    habit_id: entry.habit_id.clone(),
                    date: entry.date,
                });
            }
        }

        let mut milestone_keys = HashSet::new();
        for milestone in &self.milestones {
            if !milestone_keys.insert((&milestone.habit_id, milestone.level)) {
                return Err(SnapshotError::DuplicateMilestone {
                    habit_id: milestone.habit_id.clone(),
                    level: milestone.level,
                });
            }
        }

        Ok(())
    }

    pub fn habit(&self, id: &HabitId) -> Result<&Habit, EngineError> {
        self.habits
            .iter()
            .find(|h| &h.id == id)
            .ok_or_else(|| EngineError::UnknownHabit(id.clone()))
    }

    pub fn milestone_set(&self) -> MilestoneSet {
        self.milestones.iter().cloned().collect()
    }

    /// Record milestones, keeping the original record for levels already stored.
    pub fn record_milestones(&mut self, milestones: impl IntoIterator<Item = Milestone>) -> usize {
        let mut set = self.milestone_set();
        let added = milestones
            .into_iter()
            .filter(|m| set.insert(m.clone()))
            .count();
        self.milestones = set.iter().cloned().collect();
        added
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::model::fixtures::*;
    use crate::model::{Direction, MilestoneLevel, PlannedPause};

    fn sample() -> Snapshot {
        Snapshot {
            habits: vec![
                habit("read", Direction::Increase, 10.0, Some(30.0)),
                habit("smoke", Direction::Decrease, 20.0, Some(0.0)),
            ],
            entries: vec![
                entry("read", date(2024, 3, 1), 10.0, 12.0),
                entry("smoke", date(2024, 3, 1), 20.0, 18.0),
            ],
            milestones: vec![Milestone::new(
                "read".into(),
                MilestoneLevel::Quarter,
                date(2024, 3, 1),
            )],
        }
    }

    #[test]
    fn test_valid_snapshot_passes() {
        assert_eq!(sample().validate(), Ok(()));
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let mut snapshot = sample();
        snapshot
            .entries
            .push(entry("read", date(2024, 3, 1), 10.0, 5.0));
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::DuplicateEntry {
                habit_id: "read".into(),
                date: date(2024, 3, 1),
            })
        );
    }

    #[test]
    fn test_orphan_entry_rejected() {
        let mut snapshot = sample();
        snapshot.entries.push(entry("ghost", date(2024, 3, 2), 1.0, 1.0));
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::OrphanEntry { .. })
        ));
    }

    #[test]
    fn test_negative_values_rejected() {
        let mut snapshot = sample();
        snapshot.entries[0].actual_value = -1.0;
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::NegativeValue { .. })
        ));

        let mut snapshot = sample();
        snapshot.habits[0].start_value = -5.0;
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::NegativeStartValue("read".into()))
        );
    }

    #[test]
    fn test_inverted_pause_rejected() {
        let mut snapshot = sample();
        snapshot.habits[1]
            .planned_pauses
            .push(PlannedPause::new(date(2024, 3, 10), date(2024, 3, 5)));
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::InvertedPause {
                habit_id: "smoke".into(),
                start: date(2024, 3, 10),
                end: date(2024, 3, 5),
            })
        );
    }

    #[test]
    fn test_duplicate_habit_and_milestone_rejected() {
        let mut snapshot = sample();
        snapshot.habits.push(snapshot.habits[0].clone());
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::DuplicateHabit("read".into()))
        );

        let mut snapshot = sample();
        snapshot.milestones.push(snapshot.milestones[0].clone());
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::DuplicateMilestone { .. })
        ));
    }

    #[test]
    fn test_habit_lookup() {
        let snapshot = sample();
        assert_eq!(snapshot.habit(&"smoke".into()).unwrap().start_value, 20.0);
        assert_eq!(
            snapshot.habit(&"nope".into()),
            Err(EngineError::UnknownHabit("nope".into()))
        );
    }

    #[test]
    fn test_record_milestones_keeps_existing() {
        let mut snapshot = sample();
        let added = snapshot.record_milestones(vec![
            Milestone::new("read".into(), MilestoneLevel::Quarter, date(2024, 4, 1)),
            Milestone::new("read".into(), MilestoneLevel::Half, date(2024, 4, 1)),
        ]);
        assert_eq!(added, 1);
        assert_eq!(snapshot.milestones.len(), 2);
        let set = snapshot.milestone_set();
        assert_eq!(
            set.get(&"read".into(), MilestoneLevel::Quarter)
                .map(|m| m.reached_at),
            Some(date(2024, 3, 1))
        );
    }

    // ==================== File I/O Tests ====================

    #[test]
    fn test_save_then_load() {
        let snapshot = sample();
        let file = NamedTempFile::new().unwrap();
        snapshot.save(file.path()).unwrap();

        let loaded = Snapshot::load(file.path()).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_load_minimal_document() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"habits": [{{"id": "walk", "name": "Walk", "direction": "increase",
                "start_value": 2, "created_at": "2024-01-01"}}]}}"#
        )
        .unwrap();

        let loaded = Snapshot::load(file.path()).unwrap();
        assert_eq!(loaded.habits.len(), 1);
        assert!(loaded.entries.is_empty());
        assert!(loaded.habits[0].target_value.is_none());
    }

    #[test]
    fn test_load_reports_invalid_snapshot() {
        let mut snapshot = sample();
        snapshot.entries.push(entry("ghost", date(2024, 3, 2), 1.0, 1.0));
        let file = NamedTempFile::new().unwrap();
        snapshot.save(file.path()).unwrap();

        let err = Snapshot::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid snapshot"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Snapshot::load(&dir.path().join("missing.json"));
        assert!(result.is_err());
    }
}
