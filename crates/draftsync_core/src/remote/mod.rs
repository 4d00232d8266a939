//! Remote store contract consumed by the edit buffer.
//!
//! # Responsibility
//! - Define the select/insert/update/delete surface of the hosted store.
//! - Report failures as values, never panics.
//!
//! # Invariants
//! - Each call is atomic on its own; no multi-call transactions are implied.
//! - `update_record`/`delete_record` on a missing id return `NotFound`.

use crate::db::DbError;
use crate::model::record::{ContextId, Record, RecordDraft, RecordId, RecordPatch};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sqlite_store;

pub use sqlite_store::SqliteRemoteStore;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure reported by a remote store call.
#[derive(Debug)]
pub enum RemoteError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target record does not exist.
    NotFound(RecordId),
    /// Write would violate a uniqueness constraint.
    Conflict(String),
    /// Stored data cannot be converted into a valid record.
    InvalidData(String),
    /// Store could not be reached or refused the call.
    Unavailable(String),
    /// Connection schema is not ready for record queries.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "remote record not found: {id}"),
            Self::Conflict(message) => write!(f, "remote conflict: {message}"),
            Self::InvalidData(message) => write!(f, "invalid remote record data: {message}"),
            Self::Unavailable(message) => write!(f, "remote store unavailable: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RemoteError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RemoteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Hosted record store used as the persistence target of the edit buffer.
pub trait RemoteStore {
    /// Returns every record of one context ordered by name.
    fn select_records(&self, context_id: &str) -> RemoteResult<Vec<Record>>;
    /// Inserts one record and returns the stored row with its issued id.
    fn insert_record(&self, context_id: &ContextId, draft: &RecordDraft) -> RemoteResult<Record>;
    /// Applies a partial update and returns the stored row.
    fn update_record(&self, record_id: &str, patch: &RecordPatch) -> RemoteResult<Record>;
    /// Deletes one record.
    fn delete_record(&self, record_id: &str) -> RemoteResult<()>;
}

impl<T: RemoteStore + ?Sized> RemoteStore for &T {
    fn select_records(&self, context_id: &str) -> RemoteResult<Vec<Record>> {
        (**self).select_records(context_id)
    }

    fn insert_record(&self, context_id: &ContextId, draft: &RecordDraft) -> RemoteResult<Record> {
        (**self).insert_record(context_id, draft)
    }

    fn update_record(&self, record_id: &str, patch: &RecordPatch) -> RemoteResult<Record> {
        (**self).update_record(record_id, patch)
    }

    fn delete_record(&self, record_id: &str) -> RemoteResult<()> {
        (**self).delete_record(record_id)
    }
}
