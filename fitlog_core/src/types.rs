//! Core domain types for fitlog.
//!
//! This module defines the persisted records and the form drafts they are
//! created from:
//! - Food and exercise log entries
//! - Food and exercise lookup items (reusable templates)
//! - Journal entries
//!
//! Log entries copy the values of the lookup item they were filled from, so
//! deleting a lookup item never changes history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Record kinds and sorting
// ============================================================================

/// The five kinds of persisted record
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    FoodLog,
    ExerciseLog,
    FoodItem,
    ExerciseItem,
    Journal,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::FoodLog => "food log",
            RecordKind::ExerciseLog => "exercise log",
            RecordKind::FoodItem => "food item",
            RecordKind::ExerciseItem => "exercise item",
            RecordKind::Journal => "journal",
        };
        f.write_str(name)
    }
}

/// Field a store read can be ordered by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Timestamp,
    /// Food name, exercise name or journal subject
    Name,
    MuscleGroup,
}

/// Value extracted from a record for sorting.
///
/// Records without the requested field yield `Missing`, which sorts first.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortField<'a> {
    Missing,
    Time(DateTime<Utc>),
    Text(&'a str),
}

// ============================================================================
// Food
// ============================================================================

/// One logged meal
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodLogEntry {
    pub id: Uuid,
    #[serde(default)]
    pub food: String,
    #[serde(default)]
    pub calories: i32,
    #[serde(default)]
    pub protein: i32,
    #[serde(default)]
    pub cholesterol: i32,
    #[serde(default)]
    pub saturated_fat: i32,
    #[serde(default)]
    pub serving_size: i32,
    #[serde(default)]
    pub unit_of_measure: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Reusable food template, soft-unique by name
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodLookupItem {
    pub id: Uuid,
    #[serde(default)]
    pub food: String,
    #[serde(default)]
    pub calories: i32,
    #[serde(default)]
    pub protein: i32,
    #[serde(default)]
    pub cholesterol: i32,
    #[serde(default)]
    pub saturated_fat: i32,
    #[serde(default)]
    pub serving_size: i32,
    #[serde(default)]
    pub unit_of_measure: String,
}

/// Food form input before it becomes a [`FoodLogEntry`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FoodDraft {
    pub food: String,
    pub calories: i32,
    pub protein: i32,
    pub cholesterol: i32,
    pub saturated_fat: i32,
    pub serving_size: i32,
    pub unit_of_measure: String,
    pub comments: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl FoodDraft {
    /// Prefill from a chosen lookup item, keeping comments and timestamp
    pub fn apply_lookup(&mut self, item: &FoodLookupItem) {
        self.food = item.food.clone();
        self.calories = item.calories;
        self.protein = item.protein;
        self.cholesterol = item.cholesterol;
        self.saturated_fat = item.saturated_fat;
        self.serving_size = item.serving_size;
        self.unit_of_measure = item.unit_of_measure.clone();
    }

    pub fn to_entry(&self) -> FoodLogEntry {
        FoodLogEntry {
            id: Uuid::new_v4(),
            food: self.food.clone(),
            calories: self.calories,
            protein: self.protein,
            cholesterol: self.cholesterol,
            saturated_fat: self.saturated_fat,
            serving_size: self.serving_size,
            unit_of_measure: self.unit_of_measure.clone(),
            comments: self.comments.clone(),
            timestamp: Some(self.timestamp.unwrap_or_else(Utc::now)),
        }
    }

    pub fn to_lookup_item(&self) -> FoodLookupItem {
        FoodLookupItem {
            id: Uuid::new_v4(),
            food: self.food.clone(),
            calories: self.calories,
            protein: self.protein,
            cholesterol: self.cholesterol,
            saturated_fat: self.saturated_fat,
            serving_size: self.serving_size,
            unit_of_measure: self.unit_of_measure.clone(),
        }
    }
}

// ============================================================================
// Exercise
// ============================================================================

/// One logged set or session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseLogEntry {
    pub id: Uuid,
    #[serde(default)]
    pub muscle_group: String,
    #[serde(default)]
    pub exercise_name: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub reps: i32,
    /// Minutes
    #[serde(default)]
    pub time: i32,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Reusable exercise template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseLookupItem {
    pub id: Uuid,
    #[serde(default)]
    pub muscle_group: String,
    #[serde(default)]
    pub exercise_name: String,
}

/// Exercise form input before it becomes an [`ExerciseLogEntry`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseDraft {
    pub muscle_group: String,
    pub exercise_name: String,
    pub weight: f64,
    pub reps: i32,
    pub time: i32,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ExerciseDraft {
    pub fn to_entry(&self) -> ExerciseLogEntry {
        ExerciseLogEntry {
            id: Uuid::new_v4(),
            muscle_group: self.muscle_group.clone(),
            exercise_name: self.exercise_name.clone(),
            weight: self.weight,
            reps: self.reps,
            time: self.time,
            timestamp: Some(self.timestamp.unwrap_or_else(Utc::now)),
        }
    }

    pub fn to_lookup_item(&self) -> ExerciseLookupItem {
        ExerciseLookupItem {
            id: Uuid::new_v4(),
            muscle_group: self.muscle_group.clone(),
            exercise_name: self.exercise_name.clone(),
        }
    }
}

// ============================================================================
// Journal
// ============================================================================

/// Free-text journal entry
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalEntry {
    pub id: Uuid,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl JournalEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }
}

/// Journal form input; every field is required
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JournalDraft {
    pub subject: String,
    pub content: String,
    pub tags: String,
    pub timestamp: Option<DateTime<Utc>>,
}
