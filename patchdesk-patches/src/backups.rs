use std::cmp::Reverse;
use std::path::Path;

use chrono::{DateTime, Local, TimeZone};
use patchdesk_types::naming;

use crate::blobs::BlobDir;
use crate::error::PatchError;

/// Collision suffixes tried before giving up on a backup name.
const MAX_SUFFIX: u32 = 1000;

/// Copies of files taken just before they were overwritten, named
/// `{target with separators as '_'}.bak_{YYYYMMDD_HHMMSS}`.
pub struct BackupRepository {
    blobs: BlobDir,
}

impl BackupRepository {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PatchError> {
        Ok(Self {
            blobs: BlobDir::open(dir)?,
        })
    }

    /// Backup names, newest first by the timestamp after `.bak_`.
    pub fn list(&self) -> Result<Vec<String>, PatchError> {
        let mut names = self.blobs.names()?;
        names.sort_by_cached_key(|name| {
            let (stamp, suffix) = split_stamp(naming::backup_timestamp(name).unwrap_or(""));
            Reverse((stamp.to_string(), suffix, name.clone()))
        });
        Ok(names)
    }

    pub fn get(&self, name: &str) -> Result<Vec<u8>, PatchError> {
        self.blobs.read(name)
    }

    /// Store `content` as a backup of `sanitized_target`; returns the backup name.
    pub fn create(&self, sanitized_target: &str, content: &[u8]) -> Result<String, PatchError> {
        self.create_at(sanitized_target, content, &Local::now())
    }

    /// A second backup of the same target in the same second gets a `.N`
    /// suffix rather than replacing the first.
    pub fn create_at<Tz>(
        &self,
        sanitized_target: &str,
        content: &[u8],
        at: &DateTime<Tz>,
    ) -> Result<String, PatchError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let base = naming::backup_name(sanitized_target, &naming::timestamp(at));
        let mut name = base.clone();
        for n in 1..=MAX_SUFFIX {
            match self.blobs.write_new(&name, content) {
                Ok(()) => {
                    tracing::debug!(%name, bytes = content.len(), "backup stored");
                    return Ok(name);
                }
                Err(PatchError::Conflict { .. }) => name = format!("{base}.{n}"),
                Err(e) => return Err(e),
            }
        }
        Err(PatchError::Conflict { name: base })
    }
}

/// `20240101_120000.2` -> (`20240101_120000`, 2)
fn split_stamp(stamp: &str) -> (&str, u32) {
    match stamp.rsplit_once('.') {
        Some((head, n)) => match n.parse() {
            Ok(n) => (head, n),
            Err(_) => (stamp, 0),
        },
        None => (stamp, 0),
    }
}
