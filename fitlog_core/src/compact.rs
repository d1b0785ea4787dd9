//! Compaction: folding the WAL into the snapshot.
//!
//! Everything happens under the WAL's exclusive lock. The snapshot on disk is
//! reloaded and the whole WAL replayed over it, so changes other processes
//! appended since this one opened the store are kept. The snapshot is written
//! and fsynced before the WAL is emptied; a crash in between at worst replays
//! operations already in the snapshot (replay skips ids it already holds).

use crate::store::Tables;
use crate::wal::JsonlWal;
use crate::Result;
use std::path::Path;

/// Rebuild `snapshot` from itself plus the WAL, archive the WAL, and return
/// the compacted tables
///
/// The WAL contents are appended to `<name>.wal.processed` rather than
/// deleted so they can be inspected by hand; see [`cleanup_processed_wals`].
/// A snapshot that fails to load aborts compaction with nothing written.
pub fn compact_into_snapshot(snapshot: &Path, wal: &JsonlWal) -> Result<Tables> {
    let mut lock = wal.lock()?;

    let mut tables = Tables::load(snapshot)?;
    let ops = lock.read_ops()?;
    tables.replay(&ops);

    tables.save(snapshot)?;
    tracing::info!(
        "Wrote {} records to snapshot ({} WAL operations folded in)",
        tables.len(),
        ops.len()
    );

    lock.archive_to(&wal.path().with_extension("wal.processed"))?;
    Ok(tables)
}

/// Remove every `.processed` file in `dir`
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}
