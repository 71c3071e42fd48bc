//! Durable storage for user records. The protocol layer treats records as opaque: load one by id, save one back.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use dashmap::DashMap;

use crate::account::UserRecord;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity;

/// RecordStore loads and saves user records
pub trait RecordStore: Send + Sync {
    /// load returns None when no record exists for the id
    fn load(&self, user_id: &str) -> Result<Option<UserRecord>>;

    fn save(&self, record: &UserRecord) -> Result<()>;

    fn exists(&self, user_id: &str) -> Result<bool>;
}

/// FileRecordStore keeps one JSON file per user under `<data_dir>/users/`
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    users_dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(config: &Config) -> Self {
        Self { users_dir: config.users_dir() }
    }

    /// record_path refuses anything that isn't a well-formed id, since the id becomes a file name
    fn record_path(&self, user_id: &str) -> Result<PathBuf> {
        if !identity::is_valid_user_id(user_id) {
            return Err(Error::InvalidUserId(user_id.to_string()));
        }
        Ok(self.users_dir.join(format!("{}.json", user_id)))
    }
}

impl RecordStore for FileRecordStore {
    fn load(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let path = self.record_path(user_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let record = UserRecord::from_json(&text)?;
        if record.user_id() != user_id {
            return Err(Error::MalformedRecord(format!("{} holds a record for another user", path.display())));
        }
        tracing::debug!(user_id = identity::short_id(user_id), contacts = record.contacts().len(), "loaded user record");
        Ok(Some(record))
    }

    /// save writes to a temp file and renames it over the old record, so a crash never leaves half a file behind
    fn save(&self, record: &UserRecord) -> Result<()> {
        let path = self.record_path(record.user_id())?;
        fs::create_dir_all(&self.users_dir)?;
        let json = record.to_json()?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            // Holds a clear-text private key
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(fs::Permissions::from_mode(0o600))?;
            }
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        tracing::debug!(user_id = identity::short_id(record.user_id()), "saved user record");
        Ok(())
    }

    fn exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.record_path(user_id)?.exists())
    }
}

/// MemoryRecordStore keeps serialized records in memory. Records still go through the JSON format.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: DashMap<String, String>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self, user_id: &str) -> Result<Option<UserRecord>> {
        match self.records.get(user_id) {
            Some(json) => Ok(Some(UserRecord::from_json(json.value())?)),
            None => Ok(None),
        }
    }

    fn save(&self, record: &UserRecord) -> Result<()> {
        self.records.insert(record.user_id().to_string(), record.to_json()?);
        Ok(())
    }

    fn exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.records.contains_key(user_id))
    }
}

/* ------------------------------------------------------------------------- */

// TESTS
