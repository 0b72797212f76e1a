//! Integration tests for snapshot files handed over by the storage layer.

use std::fs;

use chrono::NaiveDate;
use habit_dose::{
    HabitId, MilestoneLevel, Snapshot, SnapshotError, StatsPeriod, detect_new_milestones,
    get_global_stats,
};
use tempfile::TempDir;

const DOCUMENT: &str = r#"{
  "habits": [
    {
      "id": "pushups",
      "name": "Push-ups",
      "direction": "increase",
      "start_value": 10,
      "target_value": 30,
      "progression": { "mode": "absolute", "value": 2, "period": "weekly" },
      "unit": "reps",
      "created_at": "2024-01-01"
    },
    {
      "id": "smoke",
      "name": "Cigarettes",
      "direction": "decrease",
      "start_value": 20,
      "target_value": 0,
      "progression": { "mode": "percentage", "value": 10, "period": "weekly" },
      "created_at": "2024-01-01",
      "planned_pauses": [
        { "start_date": "2024-01-10", "end_date": "2024-01-12", "reason": "holiday" }
      ]
    }
  ],
  "entries": [
    {
      "habit_id": "pushups",
      "date": "2024-01-02",
      "target_dose": 10,
      "actual_value": 16,
      "created_at": "2024-01-02T19:00:00Z",
      "updated_at": "2024-01-02T19:00:00Z"
    },
    {
      "habit_id": "smoke",
      "date": "2024-01-02",
      "target_dose": 20,
      "actual_value": 0,
      "created_at": "2024-01-02T21:00:00Z",
      "updated_at": "2024-01-02T21:00:00Z"
    }
  ],
  "milestones": [
    { "habit_id": "pushups", "level": 25, "reached_at": "2024-01-02", "celebrated": true }
  ]
}"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write_document(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("snapshot.json");
    fs::write(&path, contents).expect("write snapshot");
    path
}

#[test]
fn test_load_full_document() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);

    let snapshot = Snapshot::load(&path).expect("snapshot should load");
    assert_eq!(snapshot.habits.len(), 2);
    assert_eq!(snapshot.entries.len(), 2);

    let smoke = snapshot.habit(&HabitId::new("smoke")).unwrap();
    assert_eq!(smoke.planned_pauses.len(), 1);
    assert!(smoke.is_paused_on(date(2024, 1, 11)));

    let milestones = snapshot.milestone_set();
    assert!(milestones.contains(&HabitId::new("pushups"), MilestoneLevel::Quarter));
    assert!(milestones.uncelebrated().is_empty());
}

#[test]
fn test_loaded_snapshot_feeds_the_engine() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);
    let snapshot = Snapshot::load(&path).unwrap();
    let today = date(2024, 1, 2);

    let global = get_global_stats(&snapshot.habits, &snapshot.entries, StatsPeriod::Week, today);
    assert_eq!(global.active_habits, 2);
    assert_eq!(global.total_completed_days, 2);

    let pushups = snapshot.habit(&HabitId::new("pushups")).unwrap();
    let found = detect_new_milestones(pushups, 16.0, &snapshot.milestone_set(), today);
    assert!(found.is_empty(), "25% is already recorded, 30% reaches nothing new");
}

#[test]
fn test_record_and_reload_milestones() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, DOCUMENT);
    let mut snapshot = Snapshot::load(&path).unwrap();
    let today = date(2024, 2, 1);

    let pushups = snapshot.habit(&HabitId::new("pushups")).unwrap().clone();
    let found = detect_new_milestones(&pushups, 26.0, &snapshot.milestone_set(), today);
    assert_eq!(found.len(), 2);

    assert_eq!(snapshot.record_milestones(found), 2);
    snapshot.save(&path).unwrap();

    let reloaded = Snapshot::load(&path).unwrap();
    assert_eq!(
        reloaded.milestone_set().levels_for(&pushups.id),
        vec![
            MilestoneLevel::Quarter,
            MilestoneLevel::Half,
            MilestoneLevel::ThreeQuarters
        ]
    );
    assert_eq!(reloaded.milestone_set().uncelebrated().len(), 2);
}

#[test]
fn test_invalid_document_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut snapshot: Snapshot = serde_json::from_str(DOCUMENT).unwrap();
    let mut copy = snapshot.entries[0].clone();
    copy.actual_value = 12.0;
    snapshot.entries.push(copy);

    assert_eq!(
        snapshot.validate(),
        Err(SnapshotError::DuplicateEntry {
            habit_id: HabitId::new("pushups"),
            date: date(2024, 1, 2),
        })
    );

    let path = write_document(&dir, &serde_json::to_string(&snapshot).unwrap());
    let err = Snapshot::load(&path).unwrap_err();
    let chain = format!("{:#}", err);
    assert!(chain.contains("Duplicate entry for habit pushups on 2024-01-02"), "{}", chain);
}

#[test]
fn test_malformed_json_reports_parse_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, "{ \"habits\": [ ");
    let err = Snapshot::load(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse snapshot"));
}

#[test]
fn test_unknown_direction_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, &DOCUMENT.replace("\"increase\"", "\"sideways\""));
    assert!(Snapshot::load(&path).is_err());
}
