//! Memoized per-habit statistics.
//!
//! Entries are keyed by habit, date range, an entries version supplied by
//! the caller and a fingerprint of the habit's own fields. Bumping the version
//! or editing the habit (a recalibration, a new pause) drops everything cached
//! for it under the old state.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{DailyEntry, Habit, HabitId};
use crate::stats::{HabitStats, calculate_habit_stats};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatsKey {
    pub habit_id: HabitId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Monotonic counter the caller bumps whenever the habit's entries change
    pub entries_version: u64,
    /// Hash of every habit field the statistics read
    pub habit_fingerprint: u64,
}

/// Hash of a habit's configuration. Floats are hashed by bit pattern.
pub fn habit_fingerprint(habit: &Habit) -> u64 {
    let mut hasher = DefaultHasher::new();
    habit.id.hash(&mut hasher);
    habit.name.hash(&mut hasher);
    habit.direction.hash(&mut hasher);
    habit.start_value.to_bits().hash(&mut hasher);
    habit.target_value.map(f64::to_bits).hash(&mut hasher);
    if let Some(progression) = &habit.progression {
        progression.mode.hash(&mut hasher);
        progression.value.to_bits().hash(&mut hasher);
        progression.period.hash(&mut hasher);
    }
    habit.tracking_frequency.hash(&mut hasher);
    habit.created_at.hash(&mut hasher);
    habit.archived_at.hash(&mut hasher);
    habit.planned_pauses.hash(&mut hasher);
    habit.progression_anchor.hash(&mut hasher);
    hasher.finish()
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
pub struct StatsCache {
    entries: HashMap<StatsKey, HabitStats>,
    /// Newest (entries version, habit fingerprint) seen per habit
    latest: HashMap<HabitId, (u64, u64)>,
    stats: CacheStats,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached `calculate_habit_stats`.
    pub fn habit_stats(
        &mut self,
        habit: &Habit,
        entries: &[DailyEntry],
        start: NaiveDate,
        end: NaiveDate,
        entries_version: u64,
    ) -> HabitStats {
        let fingerprint = habit_fingerprint(habit);
        self.observe(&habit.id, entries_version, fingerprint);

        let key = StatsKey {
            habit_id: habit.id.clone(),
            start,
            end,
            entries_version,
            habit_fingerprint: fingerprint,
        };

        if let Some(hit) = self.entries.get(&key) {
            self.stats.hits += 1;
            tracing::debug!("Stats cache hit for {} ({} to {})", habit.id, start, end);
            return hit.clone();
        }

        self.stats.misses += 1;
        tracing::debug!("Stats cache miss for {} ({} to {})", habit.id, start, end);
        let computed = calculate_habit_stats(habit, entries, start, end);
        self.entries.insert(key, computed.clone());
        computed
    }

    /// Drop everything cached for one habit.
    pub fn invalidate(&mut self, habit_id: &HabitId) {
        let before = self.entries.len();
        self.entries.retain(|key, _| &key.habit_id != habit_id);
        self.latest.remove(habit_id);
        self.stats.evictions += (before - self.entries.len()) as u64;
    }

    pub fn clear(&mut self) {
        self.stats.evictions += self.entries.len() as u64;
        self.entries.clear();
        self.latest.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn observe(&mut self, habit_id: &HabitId, version: u64, fingerprint: u64) {
        let latest = self
            .latest
            .entry(habit_id.clone())
            .or_insert((version, fingerprint));
        let newer_version = version > latest.0;
        let habit_changed = version == latest.0 && fingerprint != latest.1;
        if !newer_version && !habit_changed {
            return;
        }
        *latest = (version, fingerprint);

        let before = self.entries.len();
        self.entries.retain(|key, _| {
            &key.habit_id != habit_id
                || (key.entries_version >= version && key.habit_fingerprint == fingerprint)
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!(
                "Evicted {} stale stats entries for {} (now at version {})",
                evicted,
                habit_id,
                version
            );
        }
        self.stats.evictions += evicted as u64;
    }
}
