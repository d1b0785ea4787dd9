//! Snapshot persistence with file locking.
//!
//! The snapshot holds every live record at the time of the last compaction.
//! Changes since then live in the WAL.

use crate::store::Tables;
use crate::{Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

impl Tables {
    /// Load a snapshot with shared locking
    ///
    /// A missing or empty file gives empty tables. A file that cannot be
    /// read is an `Io` error and one that does not parse is a `Json` error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No snapshot found at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = Vec::new();
        let read = std::io::BufReader::new(&file).read_to_end(&mut contents);
        file.unlock()?;
        read?;

        if contents.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!("Snapshot {:?} is empty", path);
            return Ok(Self::default());
        }

        let tables: Tables = serde_json::from_slice(&contents)?;
        tracing::debug!("Loaded {} records from {:?}", tables.len(), path);
        Ok(tables)
    }

    /// Save a snapshot with exclusive locking
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store(format!("snapshot path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} records to {:?}", self.len(), path);
        Ok(())
    }
}

/// Move an unparseable snapshot to `<name>.corrupt` (or `.corrupt.N` if
/// taken) so nothing overwrites it, returning the new path
pub fn quarantine(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Store(format!("snapshot path {:?} has no file name", path)))?
        .to_string_lossy()
        .into_owned();

    let mut target = path.with_file_name(format!("{}.corrupt", file_name));
    let mut n = 1;
    while target.exists() {
        target = path.with_file_name(format!("{}.corrupt.{}", file_name, n));
        n += 1;
    }

    std::fs::rename(path, &target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExerciseLookupItem, JournalEntry};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_tables() -> Tables {
        let mut tables = Tables::default();
        tables.exercise_items.push(ExerciseLookupItem {
            id: Uuid::new_v4(),
            muscle_group: "Back".into(),
            exercise_name: "Row".into(),
        });
        tables.journal.push(JournalEntry {
            id: Uuid::new_v4(),
            subject: "Week 1".into(),
            content: "Felt strong".into(),
            tags: "progress".into(),
            timestamp: Some(Utc::now()),
        });
        tables
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("records.json");

        sample_tables().save(&path).unwrap();
        let loaded = Tables::load(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.exercise_items[0].exercise_name, "Row");
        assert_eq!(loaded.journal[0].subject, "Week 1");
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let loaded = Tables::load(&temp_dir.path().join("missing.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupted_snapshot_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("records.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        assert!(matches!(Tables::load(&path), Err(Error::Json(_))));
        // Left untouched for the caller to deal with
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ invalid json }");
    }

    #[test]
    fn test_truncated_snapshot_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("records.json");
        sample_tables().save(&path).unwrap();

        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.pop();
        std::fs::write(&path, contents).unwrap();

        assert!(Tables::load(&path).is_err());
    }

    #[test]
    fn test_empty_snapshot_file_loads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("records.json");
        std::fs::write(&path, "").unwrap();

        assert!(Tables::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_quarantine_never_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("records.json");

        std::fs::write(&path, "first").unwrap();
        let first = quarantine(&path).unwrap();
        std::fs::write(&path, "second").unwrap();
        let second = quarantine(&path).unwrap();

        assert_eq!(first, temp_dir.path().join("records.json.corrupt"));
        assert_eq!(second, temp_dir.path().join("records.json.corrupt.1"));
        assert_eq!(std::fs::read_to_string(first).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "second");
        assert!(!path.exists());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("records.json");

        sample_tables().save(&path).unwrap();
        sample_tables().save(&path).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "records.json")
            .collect();
        assert!(extras.is_empty(), "Expected only records.json, found extras: {:?}", extras);
    }
}
