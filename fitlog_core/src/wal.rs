//! Write-Ahead Log (WAL) for record changes.
//!
//! Every committed create/delete is appended to a JSONL (JSON Lines) file
//! with file locking. Opening the store replays the log over the snapshot.

use crate::{RecordKind, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A single logged change
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalOp {
    Create {
        kind: RecordKind,
        record: serde_json::Value,
    },
    Delete {
        kind: RecordKind,
        id: Uuid,
    },
}

impl WalOp {
    pub fn kind(&self) -> RecordKind {
        match self {
            WalOp::Create { kind, .. } | WalOp::Delete { kind, .. } => *kind,
        }
    }
}

/// Append-only JSONL log with file locking
pub struct JsonlWal {
    path: PathBuf,
}

impl JsonlWal {
    /// Create a new WAL handle for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append a batch of operations under one exclusive lock
    pub fn append(&self, ops: &[WalOp]) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        for op in ops {
            let line = serde_json::to_string(op)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        drop(writer);
        file.sync_data()?;

        file.unlock()?;

        tracing::debug!("Appended {} operations to WAL", ops.len());
        Ok(())
    }

    /// Read every parseable operation, skipping corrupt lines
    pub fn read(&self) -> Result<Vec<WalOp>> {
        read_ops(&self.path)
    }

    /// Open (creating if needed) and exclusively lock the WAL
    ///
    /// Appenders block until the returned guard is dropped, so the holder
    /// can read, snapshot and truncate the log without losing writes.
    pub fn lock(&self) -> Result<WalLock> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        Ok(WalLock { file })
    }
}

/// Exclusive hold on a WAL file, released on drop
pub struct WalLock {
    file: File,
}

impl WalLock {
    /// Every parseable operation currently in the log
    pub fn read_ops(&mut self) -> Result<Vec<WalOp>> {
        self.file.seek(SeekFrom::Start(0))?;
        parse_ops(BufReader::new(&self.file))
    }

    /// Append the log's contents to `processed`, then empty the log in place
    ///
    /// Truncating instead of renaming keeps writers that already opened the
    /// file appending to the live log.
    pub fn archive_to(&mut self, processed: &Path) -> Result<()> {
        let mut contents = Vec::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_end(&mut contents)?;

        if !contents.is_empty() {
            let mut archive = OpenOptions::new()
                .create(true)
                .append(true)
                .open(processed)?;
            archive.write_all(&contents)?;
            archive.sync_all()?;
        }

        self.file.set_len(0)?;
        self.file.sync_all()?;
        tracing::info!("Archived {} bytes of WAL to {:?}", contents.len(), processed);
        Ok(())
    }
}

impl Drop for WalLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to unlock WAL: {}", e);
        }
    }
}

/// Read all operations from a WAL file
pub fn read_ops(path: &Path) -> Result<Vec<WalOp>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;
    let ops = parse_ops(BufReader::new(&file));
    file.unlock()?;
    ops
}

fn parse_ops<R: BufRead>(reader: R) -> Result<Vec<WalOp>> {
    let mut ops = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<WalOp>(&line) {
            Ok(op) => ops.push(op),
            Err(e) => {
                tracing::warn!("Failed to parse WAL entry at line {}: {}", line_num + 1, e);
            }
        }
    }

    tracing::debug!("Read {} operations from WAL", ops.len());
    Ok(ops)
}
