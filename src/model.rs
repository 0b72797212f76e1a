//! Typed records handed to the engine by the storage layer.
//!
//! Everything here is an immutable snapshot: engine functions borrow these
//! values and return new derived values, they never mutate them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==================== Identity ====================

/// Identifier of a habit, as assigned by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(pub String);

impl HabitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HabitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ==================== Enumerations ====================

/// Which way a habit's dose moves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Dose grows toward the target (e.g. push-ups)
    Increase,
    /// Dose shrinks toward the target (e.g. cigarettes)
    Decrease,
    /// Dose stays at the start value
    Maintain,
}

impl Direction {
    /// Sign applied to a progression increment.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Increase => 1.0,
            Direction::Decrease => -1.0,
            Direction::Maintain => 0.0,
        }
    }
}

/// How the progression value is applied per elapsed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionMode {
    /// Fixed units added or removed per period
    Absolute,
    /// Compound percentage change per period
    Percentage,
}

/// Length of one progression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionPeriod {
    Daily,
    Weekly,
}

impl ProgressionPeriod {
    /// Number of calendar days in one period.
    pub fn days(&self) -> i64 {
        match self {
            ProgressionPeriod::Daily => 1,
            ProgressionPeriod::Weekly => 7,
        }
    }
}

/// How often the user is expected to log the habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingFrequency {
    #[default]
    Daily,
    Weekly,
}

// ==================== Habit ====================

/// The (mode, value, period) rule that moves a habit's dose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    pub mode: ProgressionMode,
    pub value: f64,
    pub period: ProgressionPeriod,
}

/// A user-planned break, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlannedPause {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

impl PlannedPause {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            reason: None,
        }
    }

    /// Whether `date` falls inside the pause (both ends included).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Number of pause days inside the half-open range `[from, to)`.
    pub fn days_overlapping(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        let start = self.start_date.max(from);
        // end_date is inclusive, `to` is exclusive
        let end = self.end_date.succ_opt().unwrap_or(self.end_date).min(to);
        (end - start).num_days().max(0)
    }
}

/// A tracked habit as stored by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub direction: Direction,
    pub start_value: f64,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub progression: Option<Progression>,
    /// Display only, never used in computation
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub tracking_frequency: TrackingFrequency,
    pub created_at: NaiveDate,
    #[serde(default)]
    pub archived_at: Option<NaiveDate>,
    #[serde(default)]
    pub planned_pauses: Vec<PlannedPause>,
    /// Date the dose curve counts from after a recalibration.
    #[serde(default)]
    pub progression_anchor: Option<NaiveDate>,
}

impl Habit {
    /// Date the elapsed-period count starts from.
    pub fn anchor_date(&self) -> NaiveDate {
        self.progression_anchor.unwrap_or(self.created_at)
    }

    /// Whether the habit has a rule that moves its dose.
    pub fn has_progression(&self) -> bool {
        self.direction != Direction::Maintain && self.progression.is_some()
    }

    /// Whether `date` falls inside any planned pause.
    pub fn is_paused_on(&self, date: NaiveDate) -> bool {
        self.planned_pauses.iter().any(|p| p.contains(date))
    }

    /// Created on or before `date` and not yet archived.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.created_at <= date && self.archived_at.is_none_or(|archived| date < archived)
    }

    /// Paused days inside the half-open range `[from, to)`.
    ///
    /// Overlapping pauses are counted once per day.
    pub fn paused_days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        if to <= from || self.planned_pauses.is_empty() {
            return 0;
        }
        if self.planned_pauses.len() == 1 {
            return self.planned_pauses[0].days_overlapping(from, to);
        }
        from.iter_days()
            .take_while(|d| *d < to)
            .filter(|d| self.is_paused_on(*d))
            .count() as i64
    }
}

// ==================== Entries ====================

/// One logged value for a habit on a calendar date.
///
/// At most one entry exists per `(habit_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub habit_id: HabitId,
    pub date: NaiveDate,
    /// Dose computed and frozen when the entry was logged
    pub target_dose: f64,
    pub actual_value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyEntry {
    /// Build an entry whose timestamps are midnight UTC of `date`.
    pub fn new(habit_id: HabitId, date: NaiveDate, target_dose: f64, actual_value: f64) -> Self {
        let stamp = midnight_utc(date);
        Self {
            habit_id,
            date,
            target_dose,
            actual_value,
            created_at: stamp,
            updated_at: stamp,
        }
    }
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight (0,0,0) is always valid")
        .and_utc()
}

/// Entries belonging to one habit, sorted by date.
pub fn entries_for_habit<'a>(entries: &'a [DailyEntry], habit_id: &HabitId) -> Vec<&'a DailyEntry> {
    let mut scoped: Vec<&DailyEntry> = entries.iter().filter(|e| &e.habit_id == habit_id).collect();
    scoped.sort_by_key(|e| e.date);
    scoped
}

// ==================== Milestones ====================

/// Progress thresholds that trigger a celebration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MilestoneLevel {
    Quarter,
    Half,
    ThreeQuarters,
    Complete,
}

impl MilestoneLevel {
    /// All levels in ascending order.
    pub const ALL: [MilestoneLevel; 4] = [
        MilestoneLevel::Quarter,
        MilestoneLevel::Half,
        MilestoneLevel::ThreeQuarters,
        MilestoneLevel::Complete,
    ];

    pub fn value(&self) -> u8 {
        match self {
            MilestoneLevel::Quarter => 25,
            MilestoneLevel::Half => 50,
            MilestoneLevel::ThreeQuarters => 75,
            MilestoneLevel::Complete => 100,
        }
    }

    pub fn percent(&self) -> f64 {
        f64::from(self.value())
    }
}

impl TryFrom<u8> for MilestoneLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            25 => Ok(MilestoneLevel::Quarter),
            50 => Ok(MilestoneLevel::Half),
            75 => Ok(MilestoneLevel::ThreeQuarters),
            100 => Ok(MilestoneLevel::Complete),
            other => Err(format!("Unknown milestone level: {}", other)),
        }
    }
}

impl From<MilestoneLevel> for u8 {
    fn from(level: MilestoneLevel) -> Self {
        level.value()
    }
}

impl fmt::Display for MilestoneLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.value())
    }
}

/// A threshold a habit has reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub habit_id: HabitId,
    pub level: MilestoneLevel,
    pub reached_at: NaiveDate,
    #[serde(default)]
    pub celebrated: bool,
}

impl Milestone {
    pub fn new(habit_id: HabitId, level: MilestoneLevel, reached_at: NaiveDate) -> Self {
        Self {
            habit_id,
            level,
            reached_at,
            celebrated: false,
        }
    }
}

/// Recorded milestones keyed by `(habit_id, level)`.
///
/// Holds at most one record per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MilestoneSet {
    records: BTreeMap<(HabitId, MilestoneLevel), Milestone>,
}

impl MilestoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a milestone. Returns `false` and keeps the existing record if
    /// the key is already present.
    pub fn insert(&mut self, milestone: Milestone) -> bool {
        let key = (milestone.habit_id.clone(), milestone.level);
        if self.records.contains_key(&key) {
            return false;
        }
        self.records.insert(key, milestone);
        true
    }

    pub fn contains(&self, habit_id: &HabitId, level: MilestoneLevel) -> bool {
        self.records.contains_key(&(habit_id.clone(), level))
    }

    pub fn get(&self, habit_id: &HabitId, level: MilestoneLevel) -> Option<&Milestone> {
        self.records.get(&(habit_id.clone(), level))
    }

    /// Recorded levels for one habit, ascending.
    pub fn levels_for(&self, habit_id: &HabitId) -> Vec<MilestoneLevel> {
        self.records
            .keys()
            .filter(|(id, _)| id == habit_id)
            .map(|(_, level)| *level)
            .collect()
    }

    pub fn highest_level(&self, habit_id: &HabitId) -> Option<MilestoneLevel> {
        self.levels_for(habit_id).into_iter().max()
    }

    /// Flag a milestone as celebrated. Returns `false` if it is not recorded.
    pub fn mark_celebrated(&mut self, habit_id: &HabitId, level: MilestoneLevel) -> bool {
        match self.records.get_mut(&(habit_id.clone(), level)) {
            Some(milestone) => {
                milestone.celebrated = true;
                true
            }
            None => false,
        }
    }

    /// Milestones still waiting for a celebration.
    pub fn uncelebrated(&self) -> Vec<&Milestone> {
        self.records.values().filter(|m| !m.celebrated).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Milestone> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Milestone> for MilestoneSet {
    fn from_iter<I: IntoIterator<Item = Milestone>>(iter: I) -> Self {
        let mut set = MilestoneSet::new();
        for milestone in iter {
            set.insert(milestone);
        }
        set
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn habit(id: &str, direction: Direction, start: f64, target: Option<f64>) -> Habit {
        Habit {
            id: HabitId::new(id),
            name: format!("Habit {}", id),
            direction,
            start_value: start,
            target_value: target,
            progression: None,
            unit: "reps".to_string(),
            tracking_frequency: TrackingFrequency::Daily,
            created_at: date(2024, 1, 1),
            archived_at: None,
            planned_pauses: Vec::new(),
            progression_anchor: None,
        }
    }

    pub fn progressive(
        id: &str,
        direction: Direction,
        start: f64,
        target: Option<f64>,
        mode: ProgressionMode,
        value: f64,
        period: ProgressionPeriod,
    ) -> Habit {
        Habit {
            progression: Some(Progression {
                mode,
                value,
                period,
            }),
            ..habit(id, direction, start, target)
        }
    }

    pub fn entry(id: &str, on: NaiveDate, target: f64, actual: f64) -> DailyEntry {
        DailyEntry::new(HabitId::new(id), on, target, actual)
    }
}
