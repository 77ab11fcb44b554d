use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use patchdesk_journal::{Journal, JournalAction, JournalEntry};
use patchdesk_types::naming;

use crate::backups::BackupRepository;
use crate::error::PatchError;
use crate::patches::PatchRepository;

#[derive(Clone, Debug)]
pub struct ApplyOutcome {
    pub patch: String,
    /// Target relative to the project root, `/`-separated.
    pub target: String,
    pub path: PathBuf,
    /// `None` when the target did not exist before the apply.
    pub backup: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RollbackOutcome {
    pub backup: String,
    pub target: String,
    pub path: PathBuf,
}

/// Writes patches and backups onto files under a fixed project root.
///
/// Backup-then-overwrite is two separate writes: if the overwrite fails the
/// backup stays behind, and nothing is undone.
pub struct PatchEngine {
    patches: PatchRepository,
    backups: BackupRepository,
    project_root: PathBuf,
    journal: Option<Arc<Journal>>,
}

impl PatchEngine {
    pub fn new(
        patches: PatchRepository,
        backups: BackupRepository,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            patches,
            backups,
            project_root: project_root.into(),
            journal: None,
        }
    }

    /// Repositories at `{data_dir}/patches` and `{data_dir}/backups`.
    pub fn open(data_dir: impl AsRef<Path>, project_root: impl Into<PathBuf>) -> Result<Self, PatchError> {
        let data_dir = data_dir.as_ref();
        Ok(Self::new(
            PatchRepository::open(data_dir.join("patches"))?,
            BackupRepository::open(data_dir.join("backups"))?,
            project_root,
        ))
    }

    pub fn with_journal(mut self, journal: Arc<Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn patches(&self) -> &PatchRepository {
        &self.patches
    }

    pub fn backups(&self) -> &BackupRepository {
        &self.backups
    }

    /// Store a new patch for `target` and journal it.
    pub fn create_patch(&self, target: &str, content: &[u8]) -> Result<String, PatchError> {
        let name = self.patches.create(target, content)?;
        self.record(JournalEntry::new(
            JournalAction::PatchCreated,
            &name,
            target,
            content,
        ));
        Ok(name)
    }

    /// Overwrite the file a patch names with the patch content, backing up
    /// the current file first if there is one.
    pub fn apply(&self, patch_name: &str) -> Result<ApplyOutcome, PatchError> {
        let content = self.patches.get(patch_name)?;
        let encoded = naming::target_from_patch_name(patch_name).ok_or_else(|| {
            PatchError::InvalidName {
                name: patch_name.to_string(),
            }
        })?;
        let (target, path) = self.resolve(&encoded)?;

        let backup = if path.is_file() {
            let current = fs::read(&path).map_err(PatchError::io(&path))?;
            Some(
                self.backups
                    .create(&naming::sanitize_target(&target), &current)?,
            )
        } else {
            None
        };

        fs::write(&path, &content).map_err(PatchError::io(&path))?;
        tracing::info!(patch = %patch_name, %target, backup = ?backup, "patch applied");

        self.record(
            JournalEntry::new(JournalAction::PatchApplied, patch_name, &target, &content)
                .with_backup(backup.clone()),
        );
        Ok(ApplyOutcome {
            patch: patch_name.to_string(),
            target,
            path,
            backup,
        })
    }

    /// Overwrite the backed-up file with the backup content. Whatever the
    /// target holds now is lost; no new backup is taken.
    pub fn rollback(&self, backup_name: &str) -> Result<RollbackOutcome, PatchError> {
        let content = self.backups.get(backup_name)?;
        let encoded = naming::target_from_backup_name(backup_name).ok_or_else(|| {
            PatchError::InvalidName {
                name: backup_name.to_string(),
            }
        })?;
        let (target, path) = self.resolve(&encoded)?;

        fs::write(&path, &content).map_err(PatchError::io(&path))?;
        tracing::info!(backup = %backup_name, %target, "backup restored");

        self.record(JournalEntry::new(
            JournalAction::BackupRestored,
            backup_name,
            &target,
            &content,
        ));
        Ok(RollbackOutcome {
            backup: backup_name.to_string(),
            target,
            path,
        })
    }

    /// Map a decoded `/`-separated target onto the project root. Leading
    /// separators are dropped; `..` is refused.
    fn resolve(&self, relative: &str) -> Result<(String, PathBuf), PatchError> {
        let mut parts: Vec<&str> = Vec::new();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => match part.to_str() {
                    Some(p) => parts.push(p),
                    None => {
                        return Err(PatchError::InvalidName {
                            name: relative.to_string(),
                        })
                    }
                },
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    return Err(PatchError::PathTraversal {
                        path: relative.to_string(),
                    })
                }
            }
        }
        if parts.is_empty() {
            return Err(PatchError::InvalidName {
                name: relative.to_string(),
            });
        }
        let path = parts
            .iter()
            .fold(self.project_root.clone(), |acc, p| acc.join(p));
        Ok((parts.join("/"), path))
    }

    fn record(&self, entry: JournalEntry) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(entry) {
                tracing::warn!(error = %e, "journal append failed");
            }
        }
    }
}
