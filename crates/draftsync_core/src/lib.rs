//! Core logic for draftsync.
//! This crate owns the edit-buffer invariants; hosts only drive it.

pub mod buffer;
pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;

pub use buffer::{
    ChangeEvent, CollectionSnapshot, DeleteReport, EditBufferError, EditBufferResult,
    EditBufferStore, FlushAllReport, FlushJob, FlushOutcome, RecordView, Subscription, SyncState,
    TickReport,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BufferConfig, ConfigError, ContextSwitchPolicy};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::classify::{classify_name, FALLBACK_LANGUAGE};
pub use model::record::{
    AttributeValue, Attributes, ContextId, NameValidationError, Record, RecordDraft, RecordId,
    RecordKind, RecordPatch, LANGUAGE_ATTRIBUTE,
};
pub use remote::{RemoteError, RemoteResult, RemoteStore, SqliteRemoteStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
