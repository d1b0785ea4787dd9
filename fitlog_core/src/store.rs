//! Record store: the persistence seam every service is handed.
//!
//! Services take a `&mut impl RecordStore` instead of reaching for shared
//! state. [`FileStore`] is the implementation used by the binary; it keeps
//! all records in memory, persists them as a snapshot plus a WAL, and tells
//! subscribers which record kinds changed after each commit.

use crate::wal::{JsonlWal, WalOp};
use crate::{
    Error, ExerciseLogEntry, ExerciseLookupItem, FoodLogEntry, FoodLookupItem, JournalEntry,
    RecordKind, Result, SortField, SortKey,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const SNAPSHOT_FILE: &str = "records.json";
pub const WAL_FILE: &str = "records.wal";

/// A persisted record type
pub trait Record: Clone + Serialize + DeserializeOwned {
    const KIND: RecordKind;

    fn id(&self) -> Uuid;

    fn sort_field(&self, key: SortKey) -> SortField<'_>;

    fn table(tables: &Tables) -> &Vec<Self>;

    fn table_mut(tables: &mut Tables) -> &mut Vec<Self>;
}

/// Read/write access to typed records.
///
/// Writes are staged by `create`/`delete` and committed by `save`.
pub trait RecordStore {
    fn create<R: Record>(&mut self, record: R) -> Result<()>;

    /// Delete by stable id, returning the removed record
    fn delete<R: Record>(&mut self, id: Uuid) -> Result<R>;

    fn fetch_all<R: Record>(&self, sort: SortKey, ascending: bool) -> Vec<R>;

    fn fetch_filtered<R: Record, P: Fn(&R) -> bool>(&self, predicate: P) -> Vec<R>;

    fn save(&mut self) -> Result<()>;
}

/// Notification sent to subscribers after a successful save
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Changed(RecordKind),
}

type Subscriber = Box<dyn FnMut(&StoreEvent)>;

// ============================================================================
// Tables
// ============================================================================

/// Every live record, grouped by kind. Also the snapshot file format.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub food_log: Vec<FoodLogEntry>,
    #[serde(default)]
    pub exercise_log: Vec<ExerciseLogEntry>,
    #[serde(default)]
    pub food_items: Vec<FoodLookupItem>,
    #[serde(default)]
    pub exercise_items: Vec<ExerciseLookupItem>,
    #[serde(default)]
    pub journal: Vec<JournalEntry>,
}

impl Tables {
    pub fn len(&self) -> usize {
        self.food_log.len()
            + self.exercise_log.len()
            + self.food_items.len()
            + self.exercise_items.len()
            + self.journal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replay WAL operations in order, skipping ones that no longer parse
    pub fn replay(&mut self, ops: &[WalOp]) {
        for op in ops {
            if let Err(e) = self.apply(op) {
                tracing::warn!("Skipping unreadable {} record in WAL: {}", op.kind(), e);
            }
        }
    }

    /// Replay one WAL operation
    pub fn apply(&mut self, op: &WalOp) -> Result<()> {
        match op.kind() {
            RecordKind::FoodLog => self.apply_as::<FoodLogEntry>(op),
            RecordKind::ExerciseLog => self.apply_as::<ExerciseLogEntry>(op),
            RecordKind::FoodItem => self.apply_as::<FoodLookupItem>(op),
            RecordKind::ExerciseItem => self.apply_as::<ExerciseLookupItem>(op),
            RecordKind::Journal => self.apply_as::<JournalEntry>(op),
        }
    }

    fn apply_as<R: Record>(&mut self, op: &WalOp) -> Result<()> {
        match op {
            WalOp::Create { record, .. } => {
                let record: R = serde_json::from_value(record.clone())?;
                let table = R::table_mut(self);
                if table.iter().all(|r| r.id() != record.id()) {
                    table.push(record);
                }
            }
            WalOp::Delete { id, .. } => {
                R::table_mut(self).retain(|r| r.id() != *id);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Record impls
// ============================================================================

impl Record for FoodLogEntry {
    const KIND: RecordKind = RecordKind::FoodLog;

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_field(&self, key: SortKey) -> SortField<'_> {
        match key {
            SortKey::Timestamp => self.timestamp.map_or(SortField::Missing, SortField::Time),
            SortKey::Name => SortField::Text(&self.food),
            SortKey::MuscleGroup => SortField::Missing,
        }
    }

    fn table(tables: &Tables) -> &Vec<Self> {
        &tables.food_log
    }

    fn table_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.food_log
    }
}

impl Record for ExerciseLogEntry {
    const KIND: RecordKind = RecordKind::ExerciseLog;

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_field(&self, key: SortKey) -> SortField<'_> {
        match key {
            SortKey::Timestamp => self.timestamp.map_or(SortField::Missing, SortField::Time),
            SortKey::Name => SortField::Text(&self.exercise_name),
            SortKey::MuscleGroup => SortField::Text(&self.muscle_group),
        }
    }

    fn table(tables: &Tables) -> &Vec<Self> {
        &tables.exercise_log
    }

    fn table_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.exercise_log
    }
}

impl Record for FoodLookupItem {
    const KIND: RecordKind = RecordKind::FoodItem;

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_field(&self, key: SortKey) -> SortField<'_> {
        match key {
            SortKey::Name => SortField::Text(&self.food),
            SortKey::Timestamp | SortKey::MuscleGroup => SortField::Missing,
        }
    }

    fn table(tables: &Tables) -> &Vec<Self> {
        &tables.food_items
    }

    fn table_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.food_items
    }
}

impl Record for ExerciseLookupItem {
    const KIND: RecordKind = RecordKind::ExerciseItem;

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_field(&self, key: SortKey) -> SortField<'_> {
        match key {
            SortKey::Name => SortField::Text(&self.exercise_name),
            SortKey::MuscleGroup => SortField::Text(&self.muscle_group),
            SortKey::Timestamp => SortField::Missing,
        }
    }

    fn table(tables: &Tables) -> &Vec<Self> {
        &tables.exercise_items
    }

    fn table_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.exercise_items
    }
}

impl Record for JournalEntry {
    const KIND: RecordKind = RecordKind::Journal;

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_field(&self, key: SortKey) -> SortField<'_> {
        match key {
            SortKey::Timestamp => self.timestamp.map_or(SortField::Missing, SortField::Time),
            SortKey::Name => SortField::Text(&self.subject),
            SortKey::MuscleGroup => SortField::Missing,
        }
    }

    fn table(tables: &Tables) -> &Vec<Self> {
        &tables.journal
    }

    fn table_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.journal
    }
}

// ============================================================================
// FileStore
// ============================================================================

struct StoreFiles {
    dir: PathBuf,
    snapshot: PathBuf,
    wal: JsonlWal,
    /// Where a corrupt snapshot found at open was moved
    quarantined: Option<PathBuf>,
}

/// Snapshot + WAL backed store; or memory-only via [`FileStore::in_memory`]
pub struct FileStore {
    tables: Tables,
    pending: Vec<WalOp>,
    files: Option<StoreFiles>,
    subscribers: Vec<Subscriber>,
}

impl FileStore {
    /// Open (or create) the store in `dir`
    ///
    /// Loads `records.json`, then replays `records.wal` on top of it, both
    /// under the WAL lock. A snapshot that does not parse is moved aside to
    /// `records.json.corrupt` and the store starts from the WAL alone; that
    /// store refuses to [`compact`](Self::compact).
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let snapshot = dir.join(SNAPSHOT_FILE);
        let wal = JsonlWal::new(dir.join(WAL_FILE));

        let mut lock = wal.lock()?;
        let (mut tables, quarantined) = match Tables::load(&snapshot) {
            Ok(tables) => (tables, None),
            Err(Error::Json(e)) => {
                let moved = crate::snapshot::quarantine(&snapshot)?;
                tracing::warn!(
                    "Snapshot {:?} is corrupt ({}); moved it to {:?}. Its records are not loaded.",
                    snapshot,
                    e,
                    moved
                );
                (Tables::default(), Some(moved))
            }
            Err(e) => return Err(e),
        };
        let ops = lock.read_ops()?;
        drop(lock);
        tables.replay(&ops);

        tracing::info!(
            "Opened store at {:?}: {} records ({} WAL operations replayed)",
            dir,
            tables.len(),
            ops.len()
        );

        Ok(Self {
            tables,
            pending: Vec::new(),
            files: Some(StoreFiles {
                dir: dir.to_path_buf(),
                snapshot,
                wal,
                quarantined,
            }),
            subscribers: Vec::new(),
        })
    }

    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            tables: Tables::default(),
            pending: Vec::new(),
            files: None,
            subscribers: Vec::new(),
        }
    }

    /// Directory backing this store, if any
    pub fn dir(&self) -> Option<&Path> {
        self.files.as_ref().map(|f| f.dir.as_path())
    }

    /// Number of staged changes not yet saved
    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    /// Register an observer called after each save, once per changed kind
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    /// Corrupt snapshot moved aside when this store was opened, if any
    pub fn quarantined_snapshot(&self) -> Option<&Path> {
        self.files.as_ref().and_then(|f| f.quarantined.as_deref())
    }

    /// Fold the WAL into a fresh snapshot
    ///
    /// Staged changes are saved first. The snapshot is rebuilt from disk under
    /// the WAL lock, so other processes' committed writes are included, and
    /// this store's tables are replaced with the result. Returns the number of
    /// live records.
    pub fn compact(&mut self) -> Result<usize> {
        self.save()?;

        let Some(files) = &self.files else {
            return Ok(self.tables.len());
        };
        if let Some(moved) = &files.quarantined {
            return Err(Error::Store(format!(
                "snapshot was corrupt and moved to {:?}; recover it and reopen before compacting",
                moved
            )));
        }

        self.tables = crate::compact::compact_into_snapshot(&files.snapshot, &files.wal)?;
        Ok(self.tables.len())
    }

    fn notify(&mut self, kinds: &BTreeSet<RecordKind>) {
        for kind in kinds {
            let event = StoreEvent::Changed(*kind);
            for subscriber in self.subscribers.iter_mut() {
                subscriber(&event);
            }
        }
    }
}

impl RecordStore for FileStore {
    fn create<R: Record>(&mut self, record: R) -> Result<()> {
        let value = serde_json::to_value(&record)?;
        let table = R::table_mut(&mut self.tables);
        if table.iter().any(|r| r.id() == record.id()) {
            return Err(Error::Store(format!(
                "{} record {} already exists",
                R::KIND,
                record.id()
            )));
        }
        table.push(record);
        self.pending.push(WalOp::Create {
            kind: R::KIND,
            record: value,
        });
        Ok(())
    }

    fn delete<R: Record>(&mut self, id: Uuid) -> Result<R> {
        let table = R::table_mut(&mut self.tables);
        let index = table
            .iter()
            .position(|r| r.id() == id)
            .ok_or(Error::NotFound { kind: R::KIND, id })?;
        let removed = table.remove(index);
        self.pending.push(WalOp::Delete { kind: R::KIND, id });
        Ok(removed)
    }

    fn fetch_all<R: Record>(&self, sort: SortKey, ascending: bool) -> Vec<R> {
        let mut records = R::table(&self.tables).clone();
        records.sort_by(|a, b| {
            let ordering = a.sort_field(sort).cmp(&b.sort_field(sort));
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        records
    }

    fn fetch_filtered<R: Record, P: Fn(&R) -> bool>(&self, predicate: P) -> Vec<R> {
        R::table(&self.tables)
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    fn save(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        if let Some(files) = &self.files {
            // Staged changes stay queued on failure so a later save can retry
            files.wal.append(&self.pending)?;
        }

        let kinds: BTreeSet<RecordKind> = self.pending.iter().map(WalOp::kind).collect();
        tracing::debug!("Committed {} changes", self.pending.len());
        self.pending.clear();
        self.notify(&kinds);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn food(name: &str, calories: i32, day: u32) -> FoodLogEntry {
        FoodLogEntry {
            id: Uuid::new_v4(),
            food: name.into(),
            calories,
            protein: 0,
            cholesterol: 0,
            saturated_fat: 0,
            serving_size: 1,
            unit_of_measure: "g".into(),
            comments: String::new(),
            timestamp: Some(Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_create_and_fetch_sorted() {
        let mut store = FileStore::in_memory();
        store.create(food("Toast", 120, 2)).unwrap();
        store.create(food("Apple", 95, 1)).unwrap();
        store.create(food("Banana", 105, 3)).unwrap();
        store.save().unwrap();

        let by_time: Vec<FoodLogEntry> = store.fetch_all(SortKey::Timestamp, true);
        let names: Vec<&str> = by_time.iter().map(|f| f.food.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Toast", "Banana"]);

        let by_name_desc: Vec<FoodLogEntry> = store.fetch_all(SortKey::Name, false);
        let names: Vec<&str> = by_name_desc.iter().map(|f| f.food.as_str()).collect();
        assert_eq!(names, vec!["Toast", "Banana", "Apple"]);
    }

    #[test]
    fn test_fetch_filtered_keeps_insertion_order() {
        let mut store = FileStore::in_memory();
        store.create(food("Toast", 120, 2)).unwrap();
        store.create(food("Apple", 95, 1)).unwrap();
        store.create(food("Banana", 105, 3)).unwrap();

        let big: Vec<FoodLogEntry> = store.fetch_filtered(|f: &FoodLogEntry| f.calories > 100);
        let names: Vec<&str> = big.iter().map(|f| f.food.as_str()).collect();
        assert_eq!(names, vec!["Toast", "Banana"]);
    }

    #[test]
    fn test_delete_by_id() {
        let mut store = FileStore::in_memory();
        let apple = food("Apple", 95, 1);
        let apple_id = apple.id;
        store.create(apple).unwrap();
        store.create(food("Toast", 120, 2)).unwrap();

        let removed: FoodLogEntry = store.delete(apple_id).unwrap();
        assert_eq!(removed.food, "Apple");

        let rest: Vec<FoodLogEntry> = store.fetch_all(SortKey::Timestamp, true);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].food, "Toast");
    }

    #[test]
    fn test_delete_unknown_id_is_not_found() {
        let mut store = FileStore::in_memory();
        let result = store.delete::<JournalEntry>(Uuid::new_v4());
        assert!(matches!(
            result,
            Err(Error::NotFound {
                kind: RecordKind::Journal,
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = FileStore::in_memory();
        let apple = food("Apple", 95, 1);
        store.create(apple.clone()).unwrap();
        assert!(store.create(apple).is_err());
    }

    #[test]
    fn test_subscribers_notified_once_per_kind() {
        crate::logging::init_test();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);

        let mut store = FileStore::in_memory();
        store.subscribe(move |event| sink.borrow_mut().push(*event));

        store.create(food("Apple", 95, 1)).unwrap();
        store.create(food("Toast", 120, 2)).unwrap();
        store
            .create(ExerciseLookupItem {
                id: Uuid::new_v4(),
                muscle_group: "Legs".into(),
                exercise_name: "Squat".into(),
            })
            .unwrap();
        assert!(events.borrow().is_empty());

        store.save().unwrap();
        assert_eq!(
            *events.borrow(),
            vec![
                StoreEvent::Changed(RecordKind::FoodLog),
                StoreEvent::Changed(RecordKind::ExerciseItem),
            ]
        );

        // Nothing staged, nothing to announce
        store.save().unwrap();
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_reopen_replays_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keep = food("Apple", 95, 1);
        let gone = food("Toast", 120, 2);
        let gone_id = gone.id;

        {
            let mut store = FileStore::open(temp_dir.path()).unwrap();
            store.create(keep.clone()).unwrap();
            store.create(gone).unwrap();
            store.save().unwrap();
            store.delete::<FoodLogEntry>(gone_id).unwrap();
            store.save().unwrap();
        }

        let store = FileStore::open(temp_dir.path()).unwrap();
        let foods: Vec<FoodLogEntry> = store.fetch_all(SortKey::Timestamp, true);
        assert_eq!(foods, vec![keep]);
    }

    #[test]
    fn test_unsaved_changes_are_not_persisted() {
        let temp_dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::open(temp_dir.path()).unwrap();
            store.create(food("Apple", 95, 1)).unwrap();
            assert_eq!(store.pending_changes(), 1);
        }

        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.fetch_all::<FoodLogEntry>(SortKey::Timestamp, true).is_empty());
    }

    #[test]
    fn test_compact_then_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::open(temp_dir.path()).unwrap();
            store.create(food("Apple", 95, 1)).unwrap();
            store.create(food("Toast", 120, 2)).unwrap();
            let count = store.compact().unwrap();
            assert_eq!(count, 2);
        }

        assert!(temp_dir.path().join(SNAPSHOT_FILE).exists());
        assert_eq!(std::fs::metadata(temp_dir.path().join(WAL_FILE)).unwrap().len(), 0);

        let mut store = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.fetch_all::<FoodLogEntry>(SortKey::Name, true).len(), 2);

        // Writes after compaction land in a fresh WAL
        store.create(food("Banana", 105, 3)).unwrap();
        store.save().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.fetch_all::<FoodLogEntry>(SortKey::Name, true).len(), 3);
    }

    #[test]
    fn test_compact_keeps_writes_from_another_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut first = FileStore::open(temp_dir.path()).unwrap();
        let mut second = FileStore::open(temp_dir.path()).unwrap();

        first.create(food("Apple", 95, 1)).unwrap();
        first.save().unwrap();
        second.create(food("Toast", 120, 2)).unwrap();
        second.save().unwrap();

        // `first` never saw Toast in memory, but compaction rebuilds from disk
        assert_eq!(first.compact().unwrap(), 2);
        assert_eq!(first.fetch_all::<FoodLogEntry>(SortKey::Name, true).len(), 2);

        // `second` still appends to the live log after compaction
        second.create(food("Banana", 105, 3)).unwrap();
        second.save().unwrap();

        let store = FileStore::open(temp_dir.path()).unwrap();
        let names: Vec<String> = store
            .fetch_all::<FoodLogEntry>(SortKey::Name, true)
            .into_iter()
            .map(|f| f.food)
            .collect();
        assert_eq!(names, vec!["Apple", "Banana", "Toast"]);
    }

    #[test]
    fn test_corrupt_snapshot_moved_aside_and_compaction_refused() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let snapshot = temp_dir.path().join(SNAPSHOT_FILE);

        {
            let mut store = FileStore::open(temp_dir.path()).unwrap();
            for (name, day) in [("Apple", 1), ("Banana", 2), ("Toast", 3)] {
                store.create(food(name, 100, day)).unwrap();
            }
            store.compact().unwrap();
        }

        // Lose the final byte of the snapshot
        let mut bytes = std::fs::read(&snapshot).unwrap();
        bytes.pop();
        std::fs::write(&snapshot, &bytes).unwrap();

        let mut store = FileStore::open(temp_dir.path()).unwrap();
        let moved = temp_dir.path().join("records.json.corrupt");
        assert_eq!(store.quarantined_snapshot(), Some(moved.as_path()));
        assert!(!snapshot.exists());

        store.create(food("Pear", 60, 4)).unwrap();
        assert!(matches!(store.compact(), Err(Error::Store(_))));

        // The new entry was still saved, and the old records are recoverable
        assert_eq!(std::fs::read(&moved).unwrap(), bytes);
        let reopened = FileStore::open(temp_dir.path()).unwrap();
        assert!(reopened.quarantined_snapshot().is_none());
        let foods: Vec<FoodLogEntry> = reopened.fetch_all(SortKey::Name, true);
        assert_eq!(foods.len(), 1);
        assert_eq!(foods[0].food, "Pear");
        assert!(moved.exists());
    }
}
