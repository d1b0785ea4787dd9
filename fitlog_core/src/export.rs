//! CSV export of food and exercise logs.
//!
//! Each export starts with a fixed header row followed by one row per entry.
//! Fields containing commas, quotes or newlines are quoted (RFC 4180), so a
//! comment like "with jam, toasted" stays one column.

use crate::daily::{day_of, LogEntry};
use crate::summary::DateRange;
use crate::{Error, ExerciseLogEntry, FoodLogEntry, Result};
use chrono::{Local, TimeZone};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const FOOD_HEADER: [&str; 9] = [
    "Date",
    "Food",
    "Calories",
    "Protein",
    "Cholesterol",
    "Saturated Fat",
    "Serving Size",
    "Unit Of Measure",
    "Comments",
];

pub const EXERCISE_HEADER: [&str; 6] = [
    "Date",
    "Muscle Group",
    "Exercise Name",
    "Weight",
    "Reps",
    "Time",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Which log is being exported
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    Food,
    Exercise,
}

impl ExportKind {
    /// Suggested file name handed to whatever shares the file
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportKind::Food => "FoodLog.csv",
            ExportKind::Exercise => "ExerciseLog.csv",
        }
    }
}

/// Everything, or only entries whose day falls in a range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportScope {
    All,
    Range(DateRange),
}

#[derive(Debug, Serialize)]
struct FoodRow<'a> {
    date: String,
    food: &'a str,
    calories: i32,
    protein: i32,
    cholesterol: i32,
    saturated_fat: i32,
    serving_size: i32,
    unit_of_measure: &'a str,
    comments: &'a str,
}

impl<'a> From<&'a FoodLogEntry> for FoodRow<'a> {
    fn from(entry: &'a FoodLogEntry) -> Self {
        FoodRow {
            date: entry.timestamp().format(TIMESTAMP_FORMAT).to_string(),
            food: &entry.food,
            calories: entry.calories,
            protein: entry.protein,
            cholesterol: entry.cholesterol,
            saturated_fat: entry.saturated_fat,
            serving_size: entry.serving_size,
            unit_of_measure: &entry.unit_of_measure,
            comments: &entry.comments,
        }
    }
}

#[derive(Debug, Serialize)]
struct ExerciseRow<'a> {
    date: String,
    muscle_group: &'a str,
    exercise_name: &'a str,
    weight: f64,
    reps: i32,
    time: i32,
}

impl<'a> From<&'a ExerciseLogEntry> for ExerciseRow<'a> {
    fn from(entry: &'a ExerciseLogEntry) -> Self {
        ExerciseRow {
            date: entry.timestamp().format(TIMESTAMP_FORMAT).to_string(),
            muscle_group: &entry.muscle_group,
            exercise_name: &entry.exercise_name,
            weight: entry.weight,
            reps: entry.reps,
            time: entry.time,
        }
    }
}

/// Entries covered by `scope`, using days in `tz`
pub fn select_in<E: LogEntry, Tz: TimeZone>(entries: &[E], scope: ExportScope, tz: &Tz) -> Vec<E> {
    match scope {
        ExportScope::All => entries.to_vec(),
        ExportScope::Range(range) => entries
            .iter()
            .filter(|e| range.contains(day_of(e.timestamp(), tz)))
            .cloned()
            .collect(),
    }
}

/// [`select_in`] using the local timezone
pub fn select<E: LogEntry>(entries: &[E], scope: ExportScope) -> Vec<E> {
    select_in(entries, scope, &Local)
}

pub fn food_csv(entries: &[FoodLogEntry]) -> Result<String> {
    write_csv(&FOOD_HEADER, entries.iter().map(FoodRow::from))
}

pub fn exercise_csv(entries: &[ExerciseLogEntry]) -> Result<String> {
    write_csv(&EXERCISE_HEADER, entries.iter().map(ExerciseRow::from))
}

fn write_csv<T, I>(header: &[&str], rows: I) -> Result<String>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    // Header is written explicitly so an empty export still has one
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header)?;

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    tracing::debug!("Serialized {} rows to CSV", count);
    String::from_utf8(bytes).map_err(|e| Error::Other(format!("CSV output is not UTF-8: {}", e)))
}

/// Atomically write `csv` to `dir/<kind file name>`, returning the path
pub fn export_to_dir(dir: &Path, kind: ExportKind, csv: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(kind.file_name());

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(csv.as_bytes())?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(&path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported CSV to {:?}", path);
    Ok(path)
}
