//! Lookup matching for typeahead suggestions and new-item detection.
//!
//! Suggestions are a case-insensitive substring filter that keeps candidate
//! order. Deciding whether a logged value is "new" uses exact, case-sensitive
//! comparison against the lookup tables.

use crate::{ExerciseLookupItem, FoodLookupItem};
use std::collections::BTreeSet;

/// Whether `candidate` contains `query`, ignoring case
pub fn matches(query: &str, candidate: &str) -> bool {
    candidate.to_lowercase().contains(&query.to_lowercase())
}

/// Candidates containing `query`, in their original order.
///
/// An empty query hides suggestions: the result is empty, not every candidate.
pub fn filter_candidates<'a, S: AsRef<str>>(query: &str, candidates: &'a [S]) -> Vec<&'a S> {
    if query.is_empty() {
        return Vec::new();
    }
    candidates
        .iter()
        .filter(|c| matches(query, c.as_ref()))
        .collect()
}

/// Text field state with suggestions drawn from a list of records
pub struct Typeahead<'a, T> {
    text: String,
    items: &'a [T],
    label: fn(&T) -> &str,
    suggestions: Vec<usize>,
}

impl<'a, T> Typeahead<'a, T> {
    pub fn new(items: &'a [T], label: fn(&T) -> &str) -> Self {
        Self {
            text: String::new(),
            items,
            label,
            suggestions: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text and recompute suggestions
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.suggestions = if self.text.is_empty() {
            Vec::new()
        } else {
            self.items
                .iter()
                .enumerate()
                .filter(|(_, item)| matches(&self.text, (self.label)(item)))
                .map(|(i, _)| i)
                .collect()
        };
    }

    pub fn suggestions(&self) -> Vec<&'a T> {
        self.suggestions.iter().map(|&i| &self.items[i]).collect()
    }

    /// Accept the `index`-th suggestion
    ///
    /// The text becomes the suggestion's label, the suggestion list is cleared
    /// and `on_select` receives the full record. Returns `None` if `index` is
    /// out of bounds.
    pub fn select<F>(&mut self, index: usize, on_select: F) -> Option<&'a T>
    where
        F: FnOnce(&T),
    {
        let item_index = *self.suggestions.get(index)?;
        let item: &'a T = &self.items[item_index];
        self.text = (self.label)(item).to_string();
        self.suggestions.clear();
        on_select(item);
        Some(item)
    }
}

/// Distinct muscle groups, sorted
pub fn muscle_groups(items: &[ExerciseLookupItem]) -> Vec<String> {
    items
        .iter()
        .map(|i| i.muscle_group.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Exercise names recorded for `muscle_group`, sorted
pub fn exercise_names_for(items: &[ExerciseLookupItem], muscle_group: &str) -> Vec<String> {
    let mut names: Vec<String> = items
        .iter()
        .filter(|i| i.muscle_group == muscle_group)
        .map(|i| i.exercise_name.clone())
        .collect();
    names.sort();
    names
}

/// Exact, case-sensitive food lookup
pub fn find_food_item<'a>(items: &'a [FoodLookupItem], name: &str) -> Option<&'a FoodLookupItem> {
    items.iter().find(|i| i.food == name)
}

pub fn food_item_exists(items: &[FoodLookupItem], name: &str) -> bool {
    find_food_item(items, name).is_some()
}

/// Exact, case-sensitive match on both muscle group and exercise name
pub fn exercise_item_exists(
    items: &[ExerciseLookupItem],
    muscle_group: &str,
    exercise_name: &str,
) -> bool {
    items
        .iter()
        .any(|i| i.muscle_group == muscle_group && i.exercise_name == exercise_name)
}
