use std::path::Path;

use chrono::{DateTime, Local, TimeZone};
use patchdesk_types::naming;

use crate::blobs::BlobDir;
use crate::error::PatchError;

/// Proposed file contents, one file per patch, named
/// `{YYYYMMDD_HHMMSS}_{target with separators as '_'}`.
pub struct PatchRepository {
    blobs: BlobDir,
}

impl PatchRepository {
    /// Open (creating if needed) the patch directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PatchError> {
        Ok(Self {
            blobs: BlobDir::open(dir)?,
        })
    }

    pub fn dir(&self) -> &Path {
        self.blobs.dir()
    }

    /// Patch names, newest first.
    pub fn list(&self) -> Result<Vec<String>, PatchError> {
        let mut names = self.blobs.names()?;
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    pub fn get(&self, name: &str) -> Result<Vec<u8>, PatchError> {
        self.blobs.read(name)
    }

    /// Store `content` as a new patch for `target`; returns the patch name.
    pub fn create(&self, target: &str, content: &[u8]) -> Result<String, PatchError> {
        self.create_at(target, content, &Local::now())
    }

    pub fn create_at<Tz>(
        &self,
        target: &str,
        content: &[u8],
        at: &DateTime<Tz>,
    ) -> Result<String, PatchError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        check_target(target)?;
        let name = naming::patch_name(&naming::timestamp(at), target);
        self.blobs.write_new(&name, content)?;
        tracing::debug!(%name, bytes = content.len(), "patch stored");
        Ok(name)
    }
}

/// Targets must survive the name round trip and stay under the project root.
fn check_target(target: &str) -> Result<(), PatchError> {
    let invalid = |reason| PatchError::InvalidTarget {
        target: target.to_string(),
        reason,
    };
    if target.trim_start_matches(['/', '\\']).is_empty() {
        return Err(invalid("empty path"));
    }
    if target.contains('_') {
        return Err(invalid("underscores cannot be encoded in a patch name"));
    }
    if target.split(['/', '\\']).any(|part| part == "..") {
        return Err(PatchError::PathTraversal {
            path: target.to_string(),
        });
    }
    Ok(())
}
