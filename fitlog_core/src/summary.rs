//! Range summaries for charting.
//!
//! Given log entries and an inclusive day range, a [`RangeSummary`] holds the
//! entries inside the range, a gap-filled per-day series, per-field means and
//! per-day maxima (for axis scaling).

use crate::daily::{day_of, group_by_day_in, DayTotals, LogEntry};
use crate::{Error, Result};
use chrono::{Days, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest range a summary will build a per-day series for (ten years)
pub const MAX_SUMMARY_DAYS: u64 = 3660;

/// Inclusive range of calendar days
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Every day from start to end in order; empty when start > end.
    ///
    /// Allocates one element per day. Check [`DateRange::len_days`] before
    /// calling this on user input.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = self.start;
        while current <= self.end {
            days.push(current);
            match current.checked_add_days(Days::new(1)) {
                Some(next) => current = next,
                None => break,
            }
        }
        days
    }

    /// Number of days covered; zero when start > end
    pub fn len_days(&self) -> u64 {
        let span = (self.end - self.start).num_days();
        if span < 0 {
            0
        } else {
            span as u64 + 1
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Which entries the mean is computed over.
///
/// Charts have always averaged every entry passed in, not just the ones in
/// the selected range. `AllEntries` keeps that behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AverageScope {
    #[default]
    AllEntries,
    InRange,
}

impl FromStr for AverageScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "all_entries" | "all" => Ok(AverageScope::AllEntries),
            "in_range" | "range" => Ok(AverageScope::InRange),
            other => Err(Error::Config(format!("Unknown average scope: {}", other))),
        }
    }
}

/// Chart-ready view of a set of entries over a day range
#[derive(Clone, Debug)]
pub struct RangeSummary<E: LogEntry> {
    pub range: DateRange,
    /// Entries whose day falls in the range, in input order
    pub entries: Vec<E>,
    /// Every day of the range
    pub days: Vec<NaiveDate>,
    /// Totals for every day of the range, zero where nothing was logged
    pub series: Vec<(NaiveDate, E::Totals)>,
    /// Per-entry mean over the entries selected by the average scope
    pub mean: <E::Totals as DayTotals>::Mean,
    /// Fieldwise maximum of the per-day totals inside the range
    pub max: E::Totals,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RangeSummarizer {
    pub average_scope: AverageScope,
}

impl RangeSummarizer {
    pub fn new(average_scope: AverageScope) -> Self {
        Self { average_scope }
    }

    /// Summarize in the local timezone
    pub fn summarize<E: LogEntry>(
        &self,
        entries: &[E],
        range: DateRange,
    ) -> Result<RangeSummary<E>> {
        self.summarize_in(entries, range, &Local)
    }

    /// Summarize with days taken in `tz`
    ///
    /// Ranges longer than [`MAX_SUMMARY_DAYS`] are rejected with
    /// `Error::Validation`.
    pub fn summarize_in<E: LogEntry, Tz: TimeZone>(
        &self,
        entries: &[E],
        range: DateRange,
        tz: &Tz,
    ) -> Result<RangeSummary<E>> {
        if range.len_days() > MAX_SUMMARY_DAYS {
            return Err(Error::Validation(format!(
                "Date range {} to {} is {} days; summaries cover at most {} days",
                range.start,
                range.end,
                range.len_days(),
                MAX_SUMMARY_DAYS
            )));
        }

        let in_range: Vec<E> = entries
            .iter()
            .filter(|e| range.contains(day_of(e.timestamp(), tz)))
            .cloned()
            .collect();

        let per_day = group_by_day_in(&in_range, tz);
        let days = range.days();
        let series: Vec<(NaiveDate, E::Totals)> = days
            .iter()
            .map(|day| (*day, per_day.get(day).copied().unwrap_or_default()))
            .collect();

        let max = per_day
            .values()
            .fold(E::Totals::default(), |acc, t| acc.fieldwise_max(*t));

        let averaged: &[E] = match self.average_scope {
            AverageScope::AllEntries => entries,
            AverageScope::InRange => &in_range,
        };
        let sum = averaged
            .iter()
            .fold(E::Totals::default(), |acc, e| acc + e.totals());
        let mean = sum.mean(averaged.len());

        tracing::debug!(
            "Summarized {} of {} entries over {} days",
            in_range.len(),
            entries.len(),
            days.len()
        );

        Ok(RangeSummary {
            range,
            entries: in_range,
            days,
            series,
            mean,
            max,
        })
    }
}
