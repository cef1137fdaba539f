//! Core SessionStore implementation

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Unique identifier for a session
pub type SessionId = String;

/// Envelope wrapping a stored value with write-time metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEnvelope<T> {
    /// When the value was written
    pub stored_at: DateTime<Utc>,
    /// Time-to-live in seconds; expired records read as absent
    pub ttl_secs: i64,
    /// The stored value
    pub value: T,
}

impl<T> StoredEnvelope<T> {
    /// Check whether this envelope has outlived its TTL at `now`
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.stored_at).num_seconds();
        let expired = age >= self.ttl_secs;
        debug!(age_secs = age, ttl_secs = self.ttl_secs, expired, "StoredEnvelope::expired_at: called");
        expired
    }
}

/// The session store
///
/// One JSON file per session id. Writes go through a temp file + rename so a
/// crash mid-write never leaves a torn record behind.
pub struct SessionStore {
    /// Base path for storage
    base_path: PathBuf,
    /// Record TTL applied on every put
    ttl_secs: i64,
    /// Held for the lifetime of the store to exclude concurrent writers
    _lock: fs::File,
}

impl SessionStore {
    /// Open or create a session store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_ttl(path, crate::DEFAULT_TTL_SECS)
    }

    /// Open or create a session store with an explicit TTL
    pub fn open_with_ttl(path: impl AsRef<Path>, ttl_secs: i64) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let lock_path = base_path.join(".lock");
        let lock = fs::File::create(&lock_path).context("Failed to create lock file")?;
        lock.try_lock_exclusive()
            .context(format!("Store already locked: {}", lock_path.display()))?;

        debug!(?base_path, ttl_secs, "Opened session store");
        Ok(Self {
            base_path,
            ttl_secs,
            _lock: lock,
        })
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", sanitize_id(id)))
    }

    /// Write a value for the given session id, replacing any prior record
    pub fn put<T: Serialize>(&self, id: &str, value: &T) -> Result<()> {
        debug!(%id, "put: called");
        let envelope = StoredEnvelope {
            stored_at: Utc::now(),
            ttl_secs: self.ttl_secs,
            value,
        };

        let json = serde_json::to_string_pretty(&envelope).context("Failed to serialize record")?;

        let path = self.record_path(id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &json).context(format!("Failed to write record: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path).context(format!("Failed to commit record: {}", path.display()))?;

        debug!(%id, bytes = json.len(), "put: record written");
        Ok(())
    }

    /// Read a value by session id
    ///
    /// Returns `Ok(None)` for missing records and for records past their TTL.
    pub fn get<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        debug!(%id, "get: called");
        let path = self.record_path(id);

        if !path.exists() {
            debug!(%id, "get: record not found");
            return Ok(None);
        }

        let json = fs::read_to_string(&path).context(format!("Failed to read record: {}", path.display()))?;
        let envelope: StoredEnvelope<T> =
            serde_json::from_str(&json).context(format!("Corrupt record: {}", path.display()))?;

        if envelope.expired_at(Utc::now()) {
            debug!(%id, "get: record expired");
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    /// Delete a record by session id; missing records are not an error
    pub fn delete(&self, id: &str) -> Result<()> {
        debug!(%id, "delete: called");
        let path = self.record_path(id);
        if path.exists() {
            fs::remove_file(&path).context(format!("Failed to delete record: {}", path.display()))?;
            debug!(%id, "delete: record removed");
        }
        Ok(())
    }

    /// List the ids of all stored records, expired or not
    pub fn list_ids(&self) -> Result<Vec<SessionId>> {
        debug!("list_ids: called");
        let mut ids = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                ids.push(stem.to_string());
            }
        }

        ids.sort();
        debug!(count = ids.len(), "list_ids: complete");
        Ok(ids)
    }

    /// Remove all records whose TTL has elapsed at `now`
    ///
    /// Returns the number of records removed. Corrupt records are skipped
    /// with a warning rather than aborting the sweep.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        debug!("purge_expired: called");
        let mut removed = 0;

        for id in self.list_ids()? {
            let path = self.record_path(&id);
            let json = match fs::read_to_string(&path) {
                Ok(j) => j,
                Err(e) => {
                    warn!(%id, error = %e, "purge_expired: unreadable record, skipping");
                    continue;
                }
            };

            let envelope: StoredEnvelope<serde_json::Value> = match serde_json::from_str(&json) {
                Ok(e) => e,
                Err(e) => {
                    warn!(%id, error = %e, "purge_expired: corrupt record, skipping");
                    continue;
                }
            };

            if envelope.expired_at(now) {
                fs::remove_file(&path).context(format!("Failed to delete record: {}", path.display()))?;
                removed += 1;
            }
        }

        info!(removed, "Purged expired session records");
        Ok(removed)
    }
}

/// Strip path-hostile characters from an id before using it as a file name
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn test_put_get_roundtrip() {
        let temp = tempdir().unwrap();
        let store = SessionStore::open(temp.path()).unwrap();

        let doc = Doc {
            name: "paris".to_string(),
            count: 3,
        };
        store.put("abc123-trip-paris", &doc).unwrap();

        let loaded: Option<Doc> = store.get("abc123-trip-paris").unwrap();
        assert_eq!(loaded, Some(doc));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let temp = tempdir().unwrap();
        let store = SessionStore::open(temp.path()).unwrap();

        let loaded: Option<Doc> = store.get("nope").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let temp = tempdir().unwrap();
        let store = SessionStore::open(temp.path()).unwrap();

        store.put("id", &Doc { name: "a".into(), count: 1 }).unwrap();
        store.put("id", &Doc { name: "b".into(), count: 2 }).unwrap();

        let loaded: Option<Doc> = store.get("id").unwrap();
        assert_eq!(loaded.unwrap().name, "b");
    }

    #[test]
    fn test_expired_record_reads_as_absent() {
        let temp = tempdir().unwrap();
        let store = SessionStore::open_with_ttl(temp.path(), 0).unwrap();

        store.put("id", &Doc { name: "a".into(), count: 1 }).unwrap();

        let loaded: Option<Doc> = store.get("id").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_purge_expired_removes_only_stale() {
        let temp = tempdir().unwrap();

        {
            let store = SessionStore::open_with_ttl(temp.path(), 0).unwrap();
            store.put("old", &Doc { name: "old".into(), count: 1 }).unwrap();
        }

        let store = SessionStore::open(temp.path()).unwrap();
        store.put("fresh", &Doc { name: "fresh".into(), count: 2 }).unwrap();

        let removed = store.purge_expired(Utc::now()).unwrap();
        assert_eq!(removed, 1);

        let ids = store.list_ids().unwrap();
        assert_eq!(ids, vec!["fresh".to_string()]);
    }

    #[test]
    fn test_list_ids_sorted() {
        let temp = tempdir().unwrap();
        let store = SessionStore::open(temp.path()).unwrap();

        store.put("b", &Doc { name: "b".into(), count: 1 }).unwrap();
        store.put("a", &Doc { name: "a".into(), count: 1 }).unwrap();

        assert_eq!(store.list_ids().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_second_open_fails_while_locked() {
        let temp = tempdir().unwrap();
        let _store = SessionStore::open(temp.path()).unwrap();

        assert!(SessionStore::open(temp.path()).is_err());
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("abc-123_x"), "abc-123_x");
        assert_eq!(sanitize_id("../etc/passwd"), "___etc_passwd");
    }
}
