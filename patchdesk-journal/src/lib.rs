//! Append-only record of file operations.
//!
//! One JSON object per line. Each entry carries the hash of the previous entry,
//! so editing or dropping a line breaks the chain and `verify_log` reports it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("hash chain broken at line {line}")]
    ChainMismatch { line: usize },
    #[error("entry hash invalid at line {line}")]
    HashInvalid { line: usize },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalAction {
    PatchCreated,
    PatchApplied,
    BackupRestored,
}

impl JournalAction {
    fn as_str(&self) -> &'static str {
        match self {
            JournalAction::PatchCreated => "patch_created",
            JournalAction::PatchApplied => "patch_applied",
            JournalAction::BackupRestored => "backup_restored",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    pub timestamp: String,
    pub action: JournalAction,
    /// Patch or backup name the operation was driven by.
    pub subject: String,
    /// Root-relative file the operation wrote (or will write).
    pub target: String,
    pub backup: Option<String>,
    /// sha256 of the bytes written.
    pub content_hash: String,
    pub prev_hash: Option<String>,
    pub chain_hash: String,
}

impl JournalEntry {
    pub fn new(
        action: JournalAction,
        subject: impl Into<String>,
        target: impl Into<String>,
        content: &[u8],
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            action,
            subject: subject.into(),
            target: target.into(),
            backup: None,
            content_hash: content_hash(content),
            prev_hash: None,
            chain_hash: String::new(),
        }
    }

    pub fn with_backup(mut self, backup: Option<String>) -> Self {
        self.backup = backup;
        self
    }
}

pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

pub struct Journal {
    path: PathBuf,
    last_hash: Mutex<Option<String>>,
}

impl Journal {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let last_hash = read_entries(&path)?.pop().map(|e| e.chain_hash);
        Ok(Self {
            path,
            last_hash: Mutex::new(last_hash),
        })
    }

    /// Link `entry` to the current head and append it. Returns the stored entry.
    pub fn append(&self, mut entry: JournalEntry) -> Result<JournalEntry, JournalError> {
        let mut last = self
            .last_hash
            .lock()
            .map_err(|_| JournalError::Io("lock".into()))?;
        entry.prev_hash = last.clone();
        entry.chain_hash = hash_entry(&entry);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| JournalError::Io(e.to_string()))?;
        let line = serde_json::to_string(&entry).map_err(|e| JournalError::Parse {
            line: 0,
            message: e.to_string(),
        })?;
        writeln!(file, "{line}").map_err(|e| JournalError::Io(e.to_string()))?;
        *last = Some(entry.chain_hash.clone());
        Ok(entry)
    }
}

/// Check every link of the journal at `path`; returns the number of entries.
pub fn verify_log(path: impl AsRef<Path>) -> Result<usize, JournalError> {
    let entries = read_entries(path.as_ref())?;
    let mut prev: Option<&str> = None;
    for (i, entry) in entries.iter().enumerate() {
        let line = i + 1;
        if entry.prev_hash.as_deref() != prev {
            return Err(JournalError::ChainMismatch { line });
        }
        if entry.chain_hash != hash_entry(entry) {
            return Err(JournalError::HashInvalid { line });
        }
        prev = Some(entry.chain_hash.as_str());
    }
    Ok(entries.len())
}

/// Last `n` entries, oldest first.
pub fn tail(path: impl AsRef<Path>, n: usize) -> Result<Vec<JournalEntry>, JournalError> {
    let mut entries = read_entries(path.as_ref())?;
    let start = entries.len().saturating_sub(n);
    Ok(entries.split_off(start))
}

fn hash_entry(entry: &JournalEntry) -> String {
    let mut h = Sha256::new();
    hash_field(&mut h, entry.entry_id.to_string());
    hash_field(&mut h, &entry.timestamp);
    hash_field(&mut h, entry.action.as_str());
    hash_field(&mut h, &entry.subject);
    hash_field(&mut h, &entry.target);
    hash_optional(&mut h, entry.backup.as_deref());
    hash_field(&mut h, &entry.content_hash);
    hash_optional(&mut h, entry.prev_hash.as_deref());
    hex::encode(h.finalize())
}

/// Length-prefixed so text cannot move between adjacent fields.
fn hash_field(h: &mut Sha256, value: impl AsRef<[u8]>) {
    let value = value.as_ref();
    h.update((value.len() as u64).to_le_bytes());
    h.update(value);
}

fn hash_optional(h: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            h.update([1u8]);
            hash_field(h, v);
        }
        None => h.update([0u8]),
    }
}

fn read_entries(path: &Path) -> Result<Vec<JournalEntry>, JournalError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).map_err(|e| JournalError::Io(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| JournalError::Io(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: JournalEntry = serde_json::from_str(&line).map_err(|e| JournalError::Parse {
            line: i + 1,
            message: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
