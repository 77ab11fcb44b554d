use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::PatchError;

/// A flat directory of write-once named files.
pub(crate) struct BlobDir {
    dir: PathBuf,
}

impl BlobDir {
    pub(crate) fn open(dir: impl AsRef<Path>) -> Result<Self, PatchError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(PatchError::io(&dir))?;
        Ok(Self { dir })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of regular, non-hidden files. Unordered.
    pub(crate) fn names(&self) -> Result<Vec<String>, PatchError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(PatchError::io(&self.dir))? {
            let entry = entry.map_err(PatchError::io(&self.dir))?;
            let is_file = entry
                .file_type()
                .map_err(PatchError::io(entry.path()))?
                .is_file();
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    pub(crate) fn read(&self, name: &str) -> Result<Vec<u8>, PatchError> {
        let path = self.path_of(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PatchError::NotFound {
                name: name.to_string(),
            }),
            Err(source) => Err(PatchError::Io { path, source }),
        }
    }

    /// Create `name`; an existing file of that name is never touched.
    pub(crate) fn write_new(&self, name: &str, content: &[u8]) -> Result<(), PatchError> {
        let path = self.path_of(name)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(PatchError::Conflict {
                    name: name.to_string(),
                })
            }
            Err(source) => return Err(PatchError::Io { path, source }),
        };
        file.write_all(content).map_err(PatchError::io(&path))?;
        file.sync_all().map_err(PatchError::io(&path))
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, PatchError> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !plain {
            return Err(PatchError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self.dir.join(name))
    }
}
