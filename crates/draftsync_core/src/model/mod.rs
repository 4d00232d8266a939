//! Domain model for mirrored record collections.
//!
//! # Responsibility
//! - Define the record shape shared by the remote store and the edit buffer.
//! - Own name normalization and name-derived classification.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - Container membership is derived from names, never stored.

pub mod classify;
pub mod record;
