//! Patch and backup storage, and the engine that applies them to files.
//!
//! Both repositories are flat directories of write-once files whose names
//! encode their target path (see `patchdesk_types::naming`). Nothing here is
//! ever deleted; cleanup is manual.

mod blobs;

pub mod backups;
pub mod engine;
pub mod error;
pub mod patches;

pub use backups::BackupRepository;
pub use engine::{ApplyOutcome, PatchEngine, RollbackOutcome};
pub use error::PatchError;
pub use patches::PatchRepository;
