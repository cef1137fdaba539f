//! SessionStore - durable key-value persistence for planning sessions
//!
//! Stores one JSON envelope per session id under a base directory. The
//! envelope carries the stored value plus write-time metadata so the store
//! can enforce a TTL policy without the caller's involvement.
//!
//! # Architecture
//!
//! ```text
//! .sessionstore/
//! ├── .lock                      # exclusive process lock (fs2)
//! └── {session_id}.json          # envelope: stored_at, ttl_secs, value
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sessionstore::SessionStore;
//!
//! let store = SessionStore::open(".sessionstore")?;
//! store.put("abc123-trip-paris", &session)?;
//! let loaded: Option<Session> = store.get("abc123-trip-paris")?;
//! ```

mod store;

pub use store::{SessionId, SessionStore, StoredEnvelope};

/// Default record TTL (30 days)
pub const DEFAULT_TTL_SECS: i64 = 30 * 24 * 60 * 60;
