//! Daily aggregation of log entries.
//!
//! Entries are bucketed by the calendar day of their timestamp in a given
//! timezone (the local one by default) and their numeric fields summed:
//! - Food: calories and protein
//! - Exercise: weight lifted (weight × reps) and reps

use crate::store::Record;
use crate::{ExerciseLogEntry, FoodLogEntry};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::Add;

/// Summed numeric fields for a set of entries
pub trait DayTotals: Copy + Default + Add<Output = Self> + PartialEq + Debug {
    /// Per-field arithmetic mean
    type Mean: Copy + Default + PartialEq + Debug;

    fn fieldwise_max(self, other: Self) -> Self;

    /// Mean per entry; zero for every field when `count` is zero
    fn mean(self, count: usize) -> Self::Mean;
}

/// A timestamped record that contributes to daily totals
pub trait LogEntry: Record {
    type Totals: DayTotals;

    /// Stored timestamp, or now when unset
    fn timestamp(&self) -> DateTime<Utc>;

    /// This entry's contribution to its day
    fn totals(&self) -> Self::Totals;
}

// ============================================================================
// Food
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FoodTotals {
    pub calories: i64,
    pub protein: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FoodMeans {
    pub calories: f64,
    pub protein: f64,
}

impl Add for FoodTotals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
        }
    }
}

impl DayTotals for FoodTotals {
    type Mean = FoodMeans;

    fn fieldwise_max(self, other: Self) -> Self {
        Self {
            calories: self.calories.max(other.calories),
            protein: self.protein.max(other.protein),
        }
    }

    fn mean(self, count: usize) -> FoodMeans {
        if count == 0 {
            return FoodMeans::default();
        }
        FoodMeans {
            calories: self.calories as f64 / count as f64,
            protein: self.protein as f64 / count as f64,
        }
    }
}

impl LogEntry for FoodLogEntry {
    type Totals = FoodTotals;

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }

    fn totals(&self) -> FoodTotals {
        FoodTotals {
            calories: i64::from(self.calories),
            protein: i64::from(self.protein),
        }
    }
}

// ============================================================================
// Exercise
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExerciseTotals {
    pub weight_lifted: f64,
    pub reps: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExerciseMeans {
    pub weight_lifted: f64,
    pub reps: f64,
}

impl Add for ExerciseTotals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            weight_lifted: self.weight_lifted + other.weight_lifted,
            reps: self.reps + other.reps,
        }
    }
}

impl DayTotals for ExerciseTotals {
    type Mean = ExerciseMeans;

    fn fieldwise_max(self, other: Self) -> Self {
        Self {
            weight_lifted: self.weight_lifted.max(other.weight_lifted),
            reps: self.reps.max(other.reps),
        }
    }

    fn mean(self, count: usize) -> ExerciseMeans {
        if count == 0 {
            return ExerciseMeans::default();
        }
        ExerciseMeans {
            weight_lifted: self.weight_lifted / count as f64,
            reps: self.reps as f64 / count as f64,
        }
    }
}

impl LogEntry for ExerciseLogEntry {
    type Totals = ExerciseTotals;

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }

    fn totals(&self) -> ExerciseTotals {
        ExerciseTotals {
            weight_lifted: self.weight * f64::from(self.reps),
            reps: i64::from(self.reps),
        }
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Calendar day of `ts` as seen in `tz`
pub fn day_of<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// First instant of `day` in `tz`
pub fn start_of_day_in<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Sum entries per calendar day in `tz`
///
/// Only days that have at least one entry appear as keys.
pub fn group_by_day_in<E: LogEntry, Tz: TimeZone>(
    entries: &[E],
    tz: &Tz,
) -> BTreeMap<NaiveDate, E::Totals> {
    // Fold in (day, id) order so float sums don't depend on input order
    let mut keyed: Vec<(NaiveDate, &E)> = entries
        .iter()
        .map(|e| (day_of(e.timestamp(), tz), e))
        .collect();
    keyed.sort_by_key(|(day, e)| (*day, e.id()));

    let mut days: BTreeMap<NaiveDate, E::Totals> = BTreeMap::new();
    for (day, entry) in keyed {
        let total = days.entry(day).or_default();
        *total = *total + entry.totals();
    }
    days
}

/// [`group_by_day_in`] using the local timezone
pub fn group_by_day<E: LogEntry>(entries: &[E]) -> BTreeMap<NaiveDate, E::Totals> {
    group_by_day_in(entries, &Local)
}

/// Totals for a single day; zero if nothing was logged
pub fn totals_on_day_in<E: LogEntry, Tz: TimeZone>(
    entries: &[E],
    day: NaiveDate,
    tz: &Tz,
) -> E::Totals {
    let on_day: Vec<E> = entries
        .iter()
        .filter(|e| day_of(e.timestamp(), tz) == day)
        .cloned()
        .collect();
    group_by_day_in(&on_day, tz)
        .remove(&day)
        .unwrap_or_default()
}

/// Totals of every entry at or after `since`
pub fn totals_since<E: LogEntry>(entries: &[E], since: DateTime<Utc>) -> E::Totals {
    entries
        .iter()
        .filter(|e| e.timestamp() >= since)
        .fold(E::Totals::default(), |acc, e| acc + e.totals())
}

/// Exercise entries grouped by exercise name, names sorted
pub fn group_by_name(entries: &[ExerciseLogEntry]) -> BTreeMap<String, Vec<ExerciseLogEntry>> {
    let mut groups: BTreeMap<String, Vec<ExerciseLogEntry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry(entry.exercise_name.clone())
            .or_default()
            .push(entry.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn food(name: &str, calories: i32, protein: i32, ts: DateTime<Utc>) -> FoodLogEntry {
        FoodLogEntry {
            id: Uuid::new_v4(),
            food: name.into(),
            calories,
            protein,
            cholesterol: 0,
            saturated_fat: 0,
            serving_size: 1,
            unit_of_measure: String::new(),
            comments: String::new(),
            timestamp: Some(ts),
        }
    }

    fn lift(name: &str, weight: f64, reps: i32, ts: DateTime<Utc>) -> ExerciseLogEntry {
        ExerciseLogEntry {
            id: Uuid::new_v4(),
            muscle_group: "Legs".into(),
            exercise_name: name.into(),
            weight,
            reps,
            time: 0,
            timestamp: Some(ts),
        }
    }

    #[test]
    fn test_food_scenario_groups_by_day() {
        let foods = vec![
            food("Apple", 95, 0, at(2025, 1, 1, 8)),
            food("Banana", 105, 1, at(2025, 1, 1, 15)),
            food("Toast", 120, 4, at(2025, 1, 2, 9)),
        ];

        let days = group_by_day_in(&foods, &Utc);

        assert_eq!(days.len(), 2);
        assert_eq!(days[&date(2025, 1, 1)].calories, 200);
        assert_eq!(days[&date(2025, 1, 1)].protein, 1);
        assert_eq!(days[&date(2025, 1, 2)].calories, 120);
    }

    #[test]
    fn test_weight_lifted_is_weight_times_reps() {
        let sets = vec![lift("Squat", 135.0, 10, at(2025, 1, 1, 8))];
        let days = group_by_day_in(&sets, &Utc);

        let totals = days[&date(2025, 1, 1)];
        assert_eq!(totals.weight_lifted, 1350.0);
        assert_eq!(totals.reps, 10);
    }

    #[test]
    fn test_no_synthetic_gap_days() {
        let foods = vec![
            food("Apple", 95, 0, at(2025, 1, 1, 8)),
            food("Toast", 120, 4, at(2025, 1, 5, 9)),
        ];
        let days = group_by_day_in(&foods, &Utc);
        let keys: Vec<NaiveDate> = days.keys().copied().collect();
        assert_eq!(keys, vec![date(2025, 1, 1), date(2025, 1, 5)]);
    }

    #[test]
    fn test_no_cross_day_leakage() {
        let sets = vec![
            lift("Squat", 100.0, 5, at(2025, 3, 1, 23)),
            lift("Bench", 80.5, 8, at(2025, 3, 2, 0)),
            lift("Row", 60.25, 12, at(2025, 3, 2, 18)),
        ];

        let days = group_by_day_in(&sets, &Utc);
        for (day, totals) in &days {
            let expected: f64 = sets
                .iter()
                .filter(|s| day_of(s.timestamp(), &Utc) == *day)
                .map(|s| s.weight * f64::from(s.reps))
                .sum();
            assert_eq!(totals.weight_lifted, expected);
        }
        assert_eq!(days[&date(2025, 3, 1)].reps, 5);
        assert_eq!(days[&date(2025, 3, 2)].reps, 20);
    }

    #[test]
    fn test_result_independent_of_input_order() {
        let mut sets = vec![
            lift("Squat", 0.1, 3, at(2025, 3, 1, 7)),
            lift("Bench", 0.2, 7, at(2025, 3, 1, 8)),
            lift("Row", 0.3, 11, at(2025, 3, 1, 9)),
            lift("Curl", 17.5, 9, at(2025, 3, 2, 9)),
        ];
        let forward = group_by_day_in(&sets, &Utc);
        sets.reverse();
        let backward = group_by_day_in(&sets, &Utc);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_day_boundary_follows_timezone() {
        // 03:00 UTC on Jan 2 is still Jan 1 in UTC-5
        let foods = vec![food("Late snack", 300, 2, at(2025, 1, 2, 3))];
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();

        let local_days = group_by_day_in(&foods, &eastern);
        assert!(local_days.contains_key(&date(2025, 1, 1)));

        let utc_days = group_by_day_in(&foods, &Utc);
        assert!(utc_days.contains_key(&date(2025, 1, 2)));
    }

    #[test]
    fn test_missing_timestamp_counts_as_today() {
        let mut entry = food("Apple", 95, 0, at(2025, 1, 1, 8));
        entry.timestamp = None;
        let today = day_of(Utc::now(), &Utc);

        let totals = totals_on_day_in(&[entry], today, &Utc);
        assert_eq!(totals.calories, 95);
    }

    #[test]
    fn test_totals_on_empty_day_is_zero() {
        let foods = vec![food("Apple", 95, 0, at(2025, 1, 1, 8))];
        let totals = totals_on_day_in(&foods, date(2025, 1, 9), &Utc);
        assert_eq!(totals, FoodTotals::default());
    }

    #[test]
    fn test_totals_since() {
        let sets = vec![
            lift("Squat", 100.0, 5, at(2025, 3, 1, 7)),
            lift("Bench", 50.0, 10, at(2025, 3, 2, 7)),
        ];
        let since = start_of_day_in(date(2025, 3, 2), &Utc);
        let totals = totals_since(&sets, since);
        assert_eq!(totals.weight_lifted, 500.0);
        assert_eq!(totals.reps, 10);
    }

    #[test]
    fn test_start_of_day_in_offset_zone() {
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let start = start_of_day_in(date(2025, 1, 1), &eastern);
        assert_eq!(start, at(2025, 1, 1, 5));
    }

    #[test]
    fn test_group_by_name() {
        let sets = vec![
            lift("Squat", 100.0, 5, at(2025, 3, 1, 7)),
            lift("Bench", 50.0, 10, at(2025, 3, 1, 8)),
            lift("Squat", 110.0, 3, at(2025, 3, 1, 9)),
        ];
        let groups = group_by_name(&sets);
        let names: Vec<&String> = groups.keys().collect();
        assert_eq!(names, vec!["Bench", "Squat"]);
        assert_eq!(groups["Squat"].len(), 2);
    }

    #[test]
    fn test_mean_of_zero_entries_is_zero() {
        assert_eq!(FoodTotals::default().mean(0), FoodMeans::default());
        assert_eq!(ExerciseTotals::default().mean(0).weight_lifted, 0.0);
    }
}
