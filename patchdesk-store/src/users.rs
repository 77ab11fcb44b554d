use std::path::Path;

use patchdesk_types::{Role, User, UserRecord, UserTable};

use crate::{JsonFileStore, RecordStore, StoreError};

/// Accounts keyed by email. Insert-only: users are never updated or removed.
pub struct UserStore {
    records: Box<dyn RecordStore<UserTable>>,
}

impl UserStore {
    pub fn new(records: impl RecordStore<UserTable> + 'static) -> Self {
        Self {
            records: Box::new(records),
        }
    }

    /// Users persisted in a JSON file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(JsonFileStore::<UserTable>::new(path))
    }

    pub fn find(&self, email: &str) -> Result<Option<User>, StoreError> {
        let table = self.records.load()?;
        Ok(table.get(email).map(|rec| User {
            email: email.to_string(),
            password: rec.password.clone(),
            role: rec.role,
        }))
    }

    /// Add a user; fails with `Conflict` if the email is taken.
    pub fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut table = self.records.load()?;
        if table.contains_key(&user.email) {
            return Err(StoreError::Conflict { email: user.email });
        }
        table.insert(
            user.email,
            UserRecord {
                password: user.password,
                role: user.role,
            },
        );
        self.records.save(&table)
    }

    /// Plain comparison against the stored password.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User, StoreError> {
        match self.find(email)? {
            Some(user) if user.password == password => Ok(user),
            _ => Err(StoreError::Unauthorized),
        }
    }

    /// Seed an admin account when no users exist yet. Returns whether one was added.
    pub fn ensure_default_admin(&self, email: &str, password: &str) -> Result<bool, StoreError> {
        let table = self.records.load()?;
        if !table.is_empty() {
            return Ok(false);
        }
        tracing::info!(%email, "seeding default admin account");
        self.insert(User {
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
        })?;
        Ok(true)
    }
}
