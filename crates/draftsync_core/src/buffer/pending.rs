//! Per-record persistence state machine.
//!
//! # Responsibility
//! - Track debounce deadline, in-flight write and retry budget per record.
//! - Decide the next state when a write settles.
//!
//! # Invariants
//! - At most one write per record is in flight (`in_flight` is one slot).
//! - `generation` increases on every local edit; a write settles as clean only
//!   when it carried the latest generation.
//! - A record with no entry in the arena is `Clean`.

use crate::remote::RemoteError;

/// Persistence state of one record as seen by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// In-memory content matches the last confirmed remote write.
    Clean,
    /// Local edits are waiting for their debounce deadline or a retry.
    Dirty,
    /// A write is in flight.
    Flushing,
    /// Automatic retry was exhausted; waits for a new edit or manual flush.
    SyncFailed,
}

impl SyncState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::Flushing => "flushing",
            Self::SyncFailed => "sync_failed",
        }
    }
}

/// Next step after a successful write settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SuccessOutcome {
    /// Entry can be dropped; record is clean.
    Clean,
    /// An edit arrived while the write was in flight; one follow-up is due.
    FollowUp,
}

/// Next step after a failed write settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureOutcome {
    /// First failure; retry scheduled.
    Retrying,
    /// Newer edit arrived while the write was in flight; fresh cycle.
    Superseded,
    /// Retry also failed.
    Exhausted,
}

/// Arena entry for one record with unsynced local content.
#[derive(Debug, Clone)]
pub(crate) struct PendingWrite {
    pub(crate) state: SyncState,
    pub(crate) generation: u64,
    /// Epoch ms when the next write becomes due; `None` means no timer.
    pub(crate) deadline: Option<i64>,
    /// Generation carried by the write currently in flight.
    pub(crate) in_flight: Option<u64>,
    /// Failed attempts in the current edit cycle.
    pub(crate) attempt: u8,
    /// Content of the last confirmed remote write.
    pub(crate) persisted_content: String,
    pub(crate) last_error: Option<String>,
}

impl PendingWrite {
    pub(crate) fn new(persisted_content: String) -> Self {
        Self {
            state: SyncState::Clean,
            generation: 0,
            deadline: None,
            in_flight: None,
            attempt: 0,
            persisted_content,
            last_error: None,
        }
    }

    /// Registers one local edit and restarts the quiet-period timer.
    pub(crate) fn record_edit(&mut self, now_ms: i64, debounce_ms: u64) {
        self.generation += 1;
        self.deadline = Some(deadline_after(now_ms, debounce_ms));
        self.attempt = 0;
        self.last_error = None;
        if self.in_flight.is_none() {
            self.state = SyncState::Dirty;
        }
    }

    pub(crate) fn is_due(&self, now_ms: i64) -> bool {
        self.in_flight.is_none() && self.deadline.is_some_and(|deadline| deadline <= now_ms)
    }

    /// Earliest time this entry wants to be polled, if it is waiting.
    pub(crate) fn wake_at(&self) -> Option<i64> {
        if self.in_flight.is_some() {
            return None;
        }
        self.deadline
    }

    /// Marks a write as started and returns the generation it carries.
    pub(crate) fn begin(&mut self) -> u64 {
        self.state = SyncState::Flushing;
        self.deadline = None;
        self.in_flight = Some(self.generation);
        self.generation
    }

    /// Requests the follow-up write to run as soon as the in-flight one settles.
    pub(crate) fn expedite(&mut self, now_ms: i64) {
        self.deadline = Some(now_ms);
    }

    pub(crate) fn settle_success(&mut self, written_content: String) -> SuccessOutcome {
        let written_generation = self.in_flight.take();
        self.persisted_content = written_content;
        self.attempt = 0;
        self.last_error = None;
        if written_generation == Some(self.generation) {
            self.state = SyncState::Clean;
            self.deadline = None;
            return SuccessOutcome::Clean;
        }
        self.state = SyncState::Dirty;
        SuccessOutcome::FollowUp
    }

    pub(crate) fn settle_failure(
        &mut self,
        now_ms: i64,
        retry_delay_ms: u64,
        error: &RemoteError,
    ) -> FailureOutcome {
        let written_generation = self.in_flight.take();
        self.last_error = Some(error.to_string());

        if written_generation != Some(self.generation) {
            self.state = SyncState::Dirty;
            self.attempt = 0;
            return FailureOutcome::Superseded;
        }

        if self.attempt == 0 {
            self.attempt = 1;
            self.state = SyncState::Dirty;
            self.deadline = Some(deadline_after(now_ms, retry_delay_ms));
            return FailureOutcome::Retrying;
        }

        self.mark_sync_failed(error);
        FailureOutcome::Exhausted
    }

    /// Terminal failure: no timer until the next edit or manual flush.
    pub(crate) fn mark_sync_failed(&mut self, error: &RemoteError) {
        self.in_flight = None;
        self.state = SyncState::SyncFailed;
        self.deadline = None;
        self.last_error = Some(error.to_string());
    }
}

fn deadline_after(now_ms: i64, delay_ms: u64) -> i64 {
    now_ms.saturating_add(i64::try_from(delay_ms).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::{FailureOutcome, PendingWrite, SuccessOutcome, SyncState};
    use crate::remote::RemoteError;

    fn unavailable() -> RemoteError {
        RemoteError::Unavailable("offline".to_string())
    }

    #[test]
    fn edit_restarts_deadline() {
        let mut entry = PendingWrite::new(String::new());
        entry.record_edit(0, 1_500);
        entry.record_edit(200, 1_500);
        assert_eq!(entry.state, SyncState::Dirty);
        assert!(!entry.is_due(1_500));
        assert!(entry.is_due(1_700));
    }

    #[test]
    fn edit_during_flight_produces_follow_up() {
        let mut entry = PendingWrite::new(String::new());
        entry.record_edit(0, 1_500);
        entry.begin();
        entry.record_edit(1_600, 1_500);
        assert_eq!(entry.state, SyncState::Flushing);
        assert!(!entry.is_due(10_000));

        assert_eq!(
            entry.settle_success("a".to_string()),
            SuccessOutcome::FollowUp
        );
        assert_eq!(entry.state, SyncState::Dirty);
        assert_eq!(entry.persisted_content, "a");
        assert!(entry.is_due(3_100));
    }

    #[test]
    fn failure_retries_once_then_exhausts() {
        let mut entry = PendingWrite::new(String::new());
        entry.record_edit(0, 1_500);
        entry.begin();
        assert_eq!(
            entry.settle_failure(1_500, 500, &unavailable()),
            FailureOutcome::Retrying
        );
        assert!(entry.is_due(2_000));

        entry.begin();
        assert_eq!(
            entry.settle_failure(2_000, 500, &unavailable()),
            FailureOutcome::Exhausted
        );
        assert_eq!(entry.state, SyncState::SyncFailed);
        assert_eq!(entry.wake_at(), None);
    }

    #[test]
    fn new_edit_after_sync_failure_starts_fresh_cycle() {
        let mut entry = PendingWrite::new(String::new());
        entry.record_edit(0, 1_500);
        entry.mark_sync_failed(&unavailable());
        entry.record_edit(5_000, 1_500);
        assert_eq!(entry.state, SyncState::Dirty);
        assert_eq!(entry.attempt, 0);
        assert!(entry.last_error.is_none());
    }

    #[test]
    fn oversized_delay_saturates_instead_of_wrapping() {
        let mut entry = PendingWrite::new(String::new());
        entry.record_edit(1_000, u64::MAX);
        assert_eq!(entry.wake_at(), Some(i64::MAX));
        assert!(!entry.is_due(1_000));
    }
}
