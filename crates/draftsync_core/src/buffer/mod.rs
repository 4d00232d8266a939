//! Optimistic edit buffer with debounced persistence.
//!
//! # Responsibility
//! - Mirror one remote collection in memory and apply local edits immediately.
//! - Coalesce rapid edits per record into one debounced remote write.
//! - Surface persistence failures as record state, never as lost edits.
//!
//! # Invariants
//! - In-memory content is always the latest local edit.
//! - Superseded content is never written.
//! - Writes for one record never overlap and never reorder.
//!
//! # See also
//! - DESIGN.md

use crate::model::record::{NameValidationError, RecordId};
use crate::remote::RemoteError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod notify;
pub mod pending;
mod store;

pub use notify::{ChangeEvent, ChangeNotifier, Subscription};
pub use pending::SyncState;
pub use store::{
    CollectionSnapshot, DeleteReport, EditBufferStore, FlushAllReport, FlushJob, FlushOutcome,
    RecordView, TickReport,
};

pub type EditBufferResult<T> = Result<T, EditBufferError>;

/// Errors surfaced synchronously by edit buffer operations.
#[derive(Debug)]
pub enum EditBufferError {
    /// Collection fetch failed; previous collection retained.
    RemoteUnavailable(RemoteError),
    /// Create/rename/delete write failed; in-memory state unchanged.
    RemoteWriteError(RemoteError),
    /// Explicit flush failed; record marked `SyncFailed`.
    FlushFailed {
        record_id: RecordId,
        source: RemoteError,
    },
    /// Record id is not part of the active collection.
    RecordNotFound(RecordId),
    /// Folder records have no editable content.
    NotEditable(RecordId),
    /// Operation requires a loaded collection.
    NoActiveContext,
    /// Record name failed normalization.
    InvalidName(NameValidationError),
    /// Another record in the collection already has this name.
    NameConflict(String),
    /// Folder rename target lies inside the folder itself.
    CycleDetected { record_id: RecordId, new_name: String },
    /// A write for the record is in flight; retry after it settles.
    WriteInFlight(RecordId),
    /// Container cascade finished with per-record remote failures.
    CascadeIncomplete {
        affected: Vec<RecordId>,
        failed: Vec<(RecordId, RemoteError)>,
    },
    /// Context switch refused because edits could not be persisted.
    SwitchAborted { unsynced: Vec<RecordId> },
}

impl Display for EditBufferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoteUnavailable(err) => write!(f, "remote store unavailable: {err}"),
            Self::RemoteWriteError(err) => write!(f, "remote write failed: {err}"),
            Self::FlushFailed { record_id, source } => {
                write!(f, "flush failed for record {record_id}: {source}")
            }
            Self::RecordNotFound(id) => write!(f, "record not found: {id}"),
            Self::NotEditable(id) => write!(f, "record is not editable: {id}"),
            Self::NoActiveContext => write!(f, "no collection is loaded"),
            Self::InvalidName(err) => write!(f, "{err}"),
            Self::NameConflict(name) => write!(f, "record name already in use: `{name}`"),
            Self::CycleDetected {
                record_id,
                new_name,
            } => write!(
                f,
                "cannot move folder {record_id} under its own path `{new_name}`"
            ),
            Self::WriteInFlight(id) => write!(f, "write already in flight for record {id}"),
            Self::CascadeIncomplete { affected, failed } => write!(
                f,
                "cascade incomplete: {} of {} remote writes failed",
                failed.len(),
                affected.len()
            ),
            Self::SwitchAborted { unsynced } => write!(
                f,
                "context switch aborted: {} record(s) could not be persisted",
                unsynced.len()
            ),
        }
    }
}

impl Error for EditBufferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::RemoteUnavailable(err) => Some(err),
            Self::RemoteWriteError(err) => Some(err),
            Self::FlushFailed { source, .. } => Some(source),
            Self::InvalidName(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NameValidationError> for EditBufferError {
    fn from(value: NameValidationError) -> Self {
        Self::InvalidName(value)
    }
}
