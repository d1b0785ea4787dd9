#![forbid(unsafe_code)]

//! Core domain model and business logic for fitlog.
//!
//! This crate provides:
//! - Domain types (food/exercise log entries, lookup items, journal entries)
//! - A record store with snapshot + WAL persistence and change notification
//! - Daily aggregation and date-range summaries
//! - Lookup matching (typeahead, new-item detection)
//! - CSV export
//! - Logbook services tying the above together

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod wal;
pub mod snapshot;
pub mod compact;
pub mod store;
pub mod daily;
pub mod summary;
pub mod lookup;
pub mod export;
pub mod logbook;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{FileStore, Record, RecordStore, StoreEvent};
pub use daily::{group_by_day, group_by_day_in, ExerciseTotals, FoodTotals, LogEntry};
pub use summary::{AverageScope, DateRange, RangeSummarizer, RangeSummary};
pub use export::{ExportKind, ExportScope};
pub use logbook::{ExerciseLog, FixedAnswer, FoodLog, Journal, LookupTables, NewItemPrompt};
