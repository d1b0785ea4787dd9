//! Logbook services: the operations behind each screen.
//!
//! Every service borrows the store it works on; nothing here holds global
//! state. Writes are committed immediately with `save()`.

use crate::daily::{self, day_of, start_of_day_in, ExerciseTotals, FoodTotals, LogEntry};
use crate::lookup;
use crate::store::RecordStore;
use crate::{
    Error, ExerciseDraft, ExerciseLogEntry, ExerciseLookupItem, FoodDraft, FoodLogEntry,
    FoodLookupItem, JournalDraft, JournalEntry, Result, SortKey,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Asked whether a value missing from the lookup tables should be added
pub trait NewItemPrompt {
    fn confirm_new_food(&mut self, food: &str) -> bool;

    fn confirm_new_exercise(&mut self, muscle_group: &str, exercise_name: &str) -> bool;
}

/// Prompt that gives the same answer every time
#[derive(Clone, Copy, Debug)]
pub struct FixedAnswer(pub bool);

impl NewItemPrompt for FixedAnswer {
    fn confirm_new_food(&mut self, _food: &str) -> bool {
        self.0
    }

    fn confirm_new_exercise(&mut self, _muscle_group: &str, _exercise_name: &str) -> bool {
        self.0
    }
}

/// Result of a `check_and_save`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveOutcome {
    pub entry_id: Uuid,
    /// Set when a new lookup item was written before the entry
    pub new_lookup_id: Option<Uuid>,
}

fn entries_on_day<E: LogEntry, S: RecordStore, Tz: TimeZone>(
    store: &S,
    day: NaiveDate,
    tz: &Tz,
) -> Vec<E> {
    let mut entries: Vec<E> = store.fetch_filtered(|e: &E| day_of(e.timestamp(), tz) == day);
    entries.sort_by_key(|e| e.timestamp());
    entries
}

// ============================================================================
// Food
// ============================================================================

pub struct FoodLog<'s, S: RecordStore> {
    store: &'s mut S,
}

impl<'s, S: RecordStore> FoodLog<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    /// Lookup items, sorted by name
    pub fn lookup_items(&self) -> Vec<FoodLookupItem> {
        self.store.fetch_all(SortKey::Name, true)
    }

    /// Copy values from the lookup item named exactly `draft.food`, if any
    pub fn prefill(&self, draft: &mut FoodDraft) -> bool {
        let items = self.lookup_items();
        match lookup::find_food_item(&items, &draft.food) {
            Some(item) => {
                draft.apply_lookup(item);
                true
            }
            None => false,
        }
    }

    /// Write the entry, first offering to add its food to the lookup table
    pub fn check_and_save(
        &mut self,
        draft: &FoodDraft,
        prompt: &mut dyn NewItemPrompt,
    ) -> Result<SaveOutcome> {
        let items = self.lookup_items();
        let mut new_lookup_id = None;

        if !lookup::food_item_exists(&items, &draft.food) && prompt.confirm_new_food(&draft.food) {
            let item = draft.to_lookup_item();
            new_lookup_id = Some(item.id);
            self.store.create(item)?;
            self.store.save()?;
            tracing::info!("Added food lookup item {:?}", draft.food);
        }

        let entry = draft.to_entry();
        let entry_id = entry.id;
        self.store.create(entry)?;
        self.store.save()?;
        tracing::info!("Logged food {:?} ({} kcal)", draft.food, draft.calories);

        Ok(SaveOutcome {
            entry_id,
            new_lookup_id,
        })
    }

    /// All entries, oldest first
    pub fn all(&self) -> Vec<FoodLogEntry> {
        self.store.fetch_all(SortKey::Timestamp, true)
    }

    pub fn entries_on<Tz: TimeZone>(&self, day: NaiveDate, tz: &Tz) -> Vec<FoodLogEntry> {
        entries_on_day(&*self.store, day, tz)
    }

    pub fn totals_on<Tz: TimeZone>(&self, day: NaiveDate, tz: &Tz) -> FoodTotals {
        daily::totals_on_day_in(&self.entries_on(day, tz), day, tz)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<FoodLogEntry> {
        let removed = self.store.delete(id)?;
        self.store.save()?;
        Ok(removed)
    }
}

// ============================================================================
// Exercise
// ============================================================================

pub struct ExerciseLog<'s, S: RecordStore> {
    store: &'s mut S,
}

impl<'s, S: RecordStore> ExerciseLog<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    /// Lookup items, sorted by muscle group
    pub fn lookup_items(&self) -> Vec<ExerciseLookupItem> {
        self.store.fetch_all(SortKey::MuscleGroup, true)
    }

    /// Write the entry, first offering to add its (muscle group, name) pair
    /// to the lookup table
    pub fn check_and_save(
        &mut self,
        draft: &ExerciseDraft,
        prompt: &mut dyn NewItemPrompt,
    ) -> Result<SaveOutcome> {
        let items = self.lookup_items();
        let mut new_lookup_id = None;

        if !lookup::exercise_item_exists(&items, &draft.muscle_group, &draft.exercise_name)
            && prompt.confirm_new_exercise(&draft.muscle_group, &draft.exercise_name)
        {
            let item = draft.to_lookup_item();
            new_lookup_id = Some(item.id);
            self.store.create(item)?;
            self.store.save()?;
            tracing::info!(
                "Added exercise lookup item {:?} / {:?}",
                draft.muscle_group,
                draft.exercise_name
            );
        }

        let entry = draft.to_entry();
        let entry_id = entry.id;
        self.store.create(entry)?;
        self.store.save()?;
        tracing::info!(
            "Logged {:?}: {} x {}",
            draft.exercise_name,
            draft.weight,
            draft.reps
        );

        Ok(SaveOutcome {
            entry_id,
            new_lookup_id,
        })
    }

    /// All entries, oldest first
    pub fn all(&self) -> Vec<ExerciseLogEntry> {
        self.store.fetch_all(SortKey::Timestamp, true)
    }

    pub fn entries_on<Tz: TimeZone>(&self, day: NaiveDate, tz: &Tz) -> Vec<ExerciseLogEntry> {
        entries_on_day(&*self.store, day, tz)
    }

    /// One day's entries grouped by exercise name
    pub fn grouped_on<Tz: TimeZone>(
        &self,
        day: NaiveDate,
        tz: &Tz,
    ) -> BTreeMap<String, Vec<ExerciseLogEntry>> {
        daily::group_by_name(&self.entries_on(day, tz))
    }

    pub fn totals_on<Tz: TimeZone>(&self, day: NaiveDate, tz: &Tz) -> ExerciseTotals {
        daily::totals_on_day_in(&self.entries_on(day, tz), day, tz)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<ExerciseLogEntry> {
        let removed = self.store.delete(id)?;
        self.store.save()?;
        Ok(removed)
    }
}

// ============================================================================
// Lookup tables
// ============================================================================

pub struct LookupTables<'s, S: RecordStore> {
    store: &'s mut S,
}

impl<'s, S: RecordStore> LookupTables<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    pub fn food_items(&self) -> Vec<FoodLookupItem> {
        self.store.fetch_all(SortKey::Name, true)
    }

    pub fn add_food_item(&mut self, item: FoodLookupItem) -> Result<Uuid> {
        let id = item.id;
        self.store.create(item)?;
        self.store.save()?;
        Ok(id)
    }

    pub fn remove_food_item(&mut self, id: Uuid) -> Result<FoodLookupItem> {
        let removed = self.store.delete(id)?;
        self.store.save()?;
        Ok(removed)
    }

    pub fn exercise_items(&self) -> Vec<ExerciseLookupItem> {
        self.store.fetch_all(SortKey::MuscleGroup, true)
    }

    pub fn exercise_items_by_group(&self) -> BTreeMap<String, Vec<ExerciseLookupItem>> {
        let mut groups: BTreeMap<String, Vec<ExerciseLookupItem>> = BTreeMap::new();
        for item in self.exercise_items() {
            groups.entry(item.muscle_group.clone()).or_default().push(item);
        }
        groups
    }

    pub fn add_exercise_item(&mut self, muscle_group: &str, exercise_name: &str) -> Result<Uuid> {
        let item = ExerciseLookupItem {
            id: Uuid::new_v4(),
            muscle_group: muscle_group.to_string(),
            exercise_name: exercise_name.to_string(),
        };
        let id = item.id;
        self.store.create(item)?;
        self.store.save()?;
        Ok(id)
    }

    pub fn remove_exercise_item(&mut self, id: Uuid) -> Result<ExerciseLookupItem> {
        let removed = self.store.delete(id)?;
        self.store.save()?;
        Ok(removed)
    }
}

// ============================================================================
// Journal
// ============================================================================

pub struct Journal<'s, S: RecordStore> {
    store: &'s mut S,
}

impl<'s, S: RecordStore> Journal<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    /// Write a journal entry; subject, content and tags are all required
    pub fn add(&mut self, draft: &JournalDraft) -> Result<Uuid> {
        let missing: Vec<&str> = [
            ("subject", &draft.subject),
            ("content", &draft.content),
            ("tags", &draft.tags),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Please fill in all fields (missing: {})",
                missing.join(", ")
            )));
        }

        let entry = JournalEntry {
            id: Uuid::new_v4(),
            subject: draft.subject.clone(),
            content: draft.content.clone(),
            tags: draft.tags.clone(),
            timestamp: Some(draft.timestamp.unwrap_or_else(Utc::now)),
        };
        let id = entry.id;
        self.store.create(entry)?;
        self.store.save()?;
        tracing::info!("Added journal entry {:?}", draft.subject);
        Ok(id)
    }

    /// One day's entries grouped by subject
    pub fn entries_on<Tz: TimeZone>(
        &self,
        day: NaiveDate,
        tz: &Tz,
    ) -> BTreeMap<String, Vec<JournalEntry>> {
        let mut entries: Vec<JournalEntry> = self
            .store
            .fetch_filtered(|e: &JournalEntry| day_of(e.timestamp(), tz) == day);
        entries.sort_by_key(|e| e.timestamp());

        let mut groups: BTreeMap<String, Vec<JournalEntry>> = BTreeMap::new();
        for entry in entries {
            groups.entry(entry.subject.clone()).or_default().push(entry);
        }
        groups
    }

    pub fn delete(&mut self, id: Uuid) -> Result<JournalEntry> {
        let removed = self.store.delete(id)?;
        self.store.save()?;
        Ok(removed)
    }
}

// ============================================================================
// Dashboard
// ============================================================================

/// Food and exercise totals logged since midnight
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TodayTotals {
    pub food: FoodTotals,
    pub exercise: ExerciseTotals,
}

pub fn today_totals_in<S: RecordStore, Tz: TimeZone>(
    store: &S,
    now: DateTime<Utc>,
    tz: &Tz,
) -> TodayTotals {
    let since = start_of_day_in(day_of(now, tz), tz);
    let foods: Vec<FoodLogEntry> = store.fetch_filtered(|e: &FoodLogEntry| e.timestamp() >= since);
    let exercises: Vec<ExerciseLogEntry> =
        store.fetch_filtered(|e: &ExerciseLogEntry| e.timestamp() >= since);

    TodayTotals {
        food: daily::totals_since(&foods, since),
        exercise: daily::totals_since(&exercises, since),
    }
}
