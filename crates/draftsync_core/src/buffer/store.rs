//! Edit buffer store over one active collection.
//!
//! # Responsibility
//! - Own the in-memory collection and the pending-write arena.
//! - Drive debounced writes from an injected clock (`tick`) or hand them to
//!   the host (`poll_due_flushes` + `complete_flush`).
//! - Run create/rename/delete synchronously against the remote store.
//!
//! # Invariants
//! - Local mutations are visible before the mutating call returns.
//! - Only the write carrying the latest generation marks a record clean.
//! - Completions from a previous context epoch or for removed records are
//!   ignored.
//! - Container cascades remove records from memory before any remote delete
//!   and never roll back on partial failure.

use crate::buffer::notify::{ChangeEvent, ChangeNotifier, Subscription};
use crate::buffer::pending::{FailureOutcome, PendingWrite, SuccessOutcome, SyncState};
use crate::buffer::{EditBufferError, EditBufferResult};
use crate::clock::{Clock, SystemClock};
use crate::config::{BufferConfig, ConfigError, ContextSwitchPolicy};
use crate::model::classify::classify_name;
use crate::model::record::{
    is_descendant_name, normalize_record_name, rebase_name, Attributes, ContextId, Record,
    RecordDraft, RecordId, RecordKind, RecordPatch, LANGUAGE_ATTRIBUTE,
};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

/// One debounced write handed out by `poll_due_flushes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushJob {
    pub record_id: RecordId,
    /// Content read at fire time.
    pub content: String,
    generation: u64,
    epoch: u64,
}

impl FlushJob {
    /// Patch to send to the remote store for this job.
    pub fn patch(&self) -> RecordPatch {
        RecordPatch::content(self.content.clone())
    }
}

/// Result of an explicit flush request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Current content was written.
    Written,
    /// Nothing to write.
    AlreadyClean,
    /// A write is in flight; the follow-up is due as soon as it settles.
    Deferred,
}

/// Counters from one `tick`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Outcome of `flush_all`.
#[derive(Debug, Default)]
pub struct FlushAllReport {
    pub written: Vec<RecordId>,
    pub deferred: Vec<RecordId>,
    pub failed: Vec<(RecordId, RemoteError)>,
}

impl FlushAllReport {
    pub fn is_complete(&self) -> bool {
        self.deferred.is_empty() && self.failed.is_empty()
    }
}

/// Records removed by a successful delete, container last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub removed: Vec<RecordId>,
}

/// Record plus its persistence state.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordView {
    pub record: Record,
    pub state: SyncState,
    pub last_error: Option<String>,
}

/// Point-in-time copy of the active collection, ordered by name.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    pub context_id: Option<ContextId>,
    pub records: Vec<RecordView>,
}

/// In-memory mirror of one remote collection with debounced persistence.
pub struct EditBufferStore<S: RemoteStore, C: Clock = SystemClock> {
    remote: S,
    clock: C,
    config: BufferConfig,
    context_id: Option<ContextId>,
    epoch: u64,
    records: BTreeMap<RecordId, Record>,
    pending: HashMap<RecordId, PendingWrite>,
    notifier: ChangeNotifier,
}

impl<S: RemoteStore> EditBufferStore<S, SystemClock> {
    /// Creates a store driven by wall-clock time.
    pub fn new(remote: S, config: BufferConfig) -> Result<Self, ConfigError> {
        Self::with_clock(remote, SystemClock, config)
    }
}

impl<S: RemoteStore, C: Clock> EditBufferStore<S, C> {
    /// Creates a store with an explicit time source.
    pub fn with_clock(remote: S, clock: C, config: BufferConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            remote,
            clock,
            config,
            context_id: None,
            epoch: 0,
            records: BTreeMap::new(),
            pending: HashMap::new(),
            notifier: ChangeNotifier::default(),
        })
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Active context id, if a collection is loaded.
    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    pub fn record(&self, record_id: &str) -> Option<&Record> {
        self.records.get(record_id)
    }

    /// Iterates records in id order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns persistence state, or `None` for unknown ids.
    pub fn sync_state(&self, record_id: &str) -> Option<SyncState> {
        if !self.records.contains_key(record_id) {
            return None;
        }
        Some(
            self.pending
                .get(record_id)
                .map_or(SyncState::Clean, |entry| entry.state),
        )
    }

    /// Returns the last persistence error recorded for a record.
    pub fn last_error(&self, record_id: &str) -> Option<&str> {
        self.pending
            .get(record_id)
            .and_then(|entry| entry.last_error.as_deref())
    }

    pub fn has_unsynced_edits(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        let mut records: Vec<RecordView> = self
            .records
            .values()
            .map(|record| {
                let entry = self.pending.get(&record.id);
                RecordView {
                    record: record.clone(),
                    state: entry.map_or(SyncState::Clean, |entry| entry.state),
                    last_error: entry.and_then(|entry| entry.last_error.clone()),
                }
            })
            .collect();
        records.sort_by(|left, right| {
            left.record
                .name
                .cmp(&right.record.name)
                .then_with(|| left.record.id.cmp(&right.record.id))
        });
        CollectionSnapshot {
            context_id: self.context_id.clone(),
            records,
        }
    }

    /// Registers a listener fired after every state-affecting operation.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }

    /// Earliest pending deadline the host should wake up for.
    pub fn next_deadline(&self) -> Option<i64> {
        self.pending.values().filter_map(PendingWrite::wake_at).min()
    }

    /// Fetches all records of `context_id` and replaces the collection.
    ///
    /// Pending writes of the current collection are handled per
    /// `ContextSwitchPolicy` first. On fetch failure the previous collection
    /// is kept and `RemoteUnavailable` is returned.
    pub fn load(&mut self, context_id: &str) -> EditBufferResult<Vec<Record>> {
        let started_at = Instant::now();
        info!(
            "event=collection_load module=buffer status=start context_id={} policy={:?}",
            context_id, self.config.switch_policy
        );

        if self.config.switch_policy == ContextSwitchPolicy::FlushBeforeSwitch {
            self.flush_before_switch()?;
        }

        let rows = match self.remote.select_records(context_id) {
            Ok(rows) => rows,
            Err(err) => {
                error!(
                    "event=collection_load module=buffer status=error context_id={} duration_ms={} error_code=remote_unavailable error={}",
                    context_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(EditBufferError::RemoteUnavailable(err));
            }
        };

        self.drop_pending();
        self.records = rows
            .iter()
            .map(|record| (record.id.clone(), record.clone()))
            .collect();
        self.context_id = Some(context_id.to_string());
        self.epoch += 1;

        info!(
            "event=collection_load module=buffer status=ok context_id={} records={} epoch={} duration_ms={}",
            context_id,
            rows.len(),
            self.epoch,
            started_at.elapsed().as_millis()
        );
        self.notifier.emit(&ChangeEvent::Loaded {
            context_id: context_id.to_string(),
            record_count: rows.len(),
        });
        Ok(rows)
    }

    /// Applies one local edit and (re)starts the record's debounce timer.
    pub fn apply_edit(
        &mut self,
        record_id: &str,
        content: impl Into<String>,
    ) -> EditBufferResult<()> {
        let now = self.clock.now_ms();
        let record = self
            .records
            .get_mut(record_id)
            .ok_or_else(|| EditBufferError::RecordNotFound(record_id.to_string()))?;
        if record.is_folder() {
            return Err(EditBufferError::NotEditable(record_id.to_string()));
        }

        let previous = std::mem::replace(&mut record.content, content.into());
        let content_len = record.content.len();
        let entry = self
            .pending
            .entry(record_id.to_string())
            .or_insert_with(|| PendingWrite::new(previous));
        entry.record_edit(now, self.config.debounce_ms);

        debug!(
            "event=edit_apply module=buffer status=ok record_id={} generation={} bytes={} state={}",
            record_id,
            entry.generation,
            content_len,
            entry.state.as_str()
        );
        self.notifier.emit(&ChangeEvent::Edited {
            record_id: record_id.to_string(),
        });
        Ok(())
    }

    /// Starts every write whose deadline has passed and hands them out.
    ///
    /// Each returned job must be settled with `complete_flush`.
    pub fn poll_due_flushes(&mut self) -> Vec<FlushJob> {
        let now = self.clock.now_ms();
        let mut due: Vec<RecordId> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.is_due(now))
            .map(|(record_id, _)| record_id.clone())
            .collect();
        due.sort();

        let mut jobs = Vec::with_capacity(due.len());
        for record_id in due {
            if let Some(job) = self.begin_flush(&record_id) {
                jobs.push(job);
            }
        }
        jobs
    }

    /// Settles one write started by `poll_due_flushes`.
    pub fn complete_flush(&mut self, job: FlushJob, result: RemoteResult<Record>) {
        if job.epoch != self.epoch {
            debug!(
                "event=flush_complete module=buffer status=ignored record_id={} reason=stale_epoch",
                job.record_id
            );
            return;
        }
        let now = self.clock.now_ms();
        let retry_delay_ms = self.config.retry_delay_ms;
        let Some(entry) = self.pending.get_mut(&job.record_id) else {
            debug!(
                "event=flush_complete module=buffer status=ignored record_id={} reason=no_pending_write",
                job.record_id
            );
            return;
        };
        if entry.in_flight != Some(job.generation) {
            debug!(
                "event=flush_complete module=buffer status=ignored record_id={} reason=stale_generation",
                job.record_id
            );
            return;
        }

        match result {
            Ok(stored) => {
                let outcome = entry.settle_success(job.content);
                let state = entry.state;
                if outcome == SuccessOutcome::Clean {
                    self.pending.remove(&job.record_id);
                }
                if let Some(record) = self.records.get_mut(&job.record_id) {
                    record.revision = stored.revision;
                    record.updated_at = stored.updated_at;
                }
                info!(
                    "event=flush module=buffer status=ok record_id={} revision={} follow_up={}",
                    job.record_id,
                    stored.revision,
                    outcome == SuccessOutcome::FollowUp
                );
                self.notifier.emit(&ChangeEvent::Flushed {
                    record_id: job.record_id,
                    state,
                });
            }
            Err(err) => match entry.settle_failure(now, retry_delay_ms, &err) {
                FailureOutcome::Retrying | FailureOutcome::Superseded => {
                    warn!(
                        "event=flush module=buffer status=error record_id={} error_code=flush_failed will_retry=true error={}",
                        job.record_id, err
                    );
                    self.notifier.emit(&ChangeEvent::FlushFailed {
                        record_id: job.record_id,
                        will_retry: true,
                    });
                }
                FailureOutcome::Exhausted => {
                    error!(
                        "event=flush module=buffer status=error record_id={} error_code=sync_failed will_retry=false error={}",
                        job.record_id, err
                    );
                    self.notifier.emit(&ChangeEvent::FlushFailed {
                        record_id: job.record_id.clone(),
                        will_retry: false,
                    });
                    self.notifier.emit(&ChangeEvent::SyncFailed {
                        record_id: job.record_id,
                    });
                }
            },
        }
    }

    /// Runs every due debounced write and retry against the remote store.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        for job in self.poll_due_flushes() {
            report.attempted += 1;
            let result = self.remote.update_record(&job.record_id, &job.patch());
            if result.is_ok() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
            self.complete_flush(job, result);
        }
        report
    }

    /// Cancels the record's timer and writes its current content now.
    ///
    /// A failed explicit flush is not retried automatically: the record goes
    /// straight to `SyncFailed` and the error is returned.
    pub fn flush_now(&mut self, record_id: &str) -> EditBufferResult<FlushOutcome> {
        if !self.records.contains_key(record_id) {
            return Err(EditBufferError::RecordNotFound(record_id.to_string()));
        }
        let now = self.clock.now_ms();
        let Some(entry) = self.pending.get_mut(record_id) else {
            return Ok(FlushOutcome::AlreadyClean);
        };
        if entry.in_flight.is_some() {
            entry.expedite(now);
            debug!(
                "event=flush_now module=buffer status=deferred record_id={}",
                record_id
            );
            return Ok(FlushOutcome::Deferred);
        }

        let Some(job) = self.begin_flush(record_id) else {
            return Ok(FlushOutcome::AlreadyClean);
        };
        match self.remote.update_record(&job.record_id, &job.patch()) {
            Ok(stored) => {
                self.complete_flush(job, Ok(stored));
                Ok(FlushOutcome::Written)
            }
            Err(err) => {
                if let Some(entry) = self.pending.get_mut(record_id) {
                    entry.mark_sync_failed(&err);
                }
                error!(
                    "event=flush_now module=buffer status=error record_id={} error_code=flush_failed error={}",
                    record_id, err
                );
                self.notifier.emit(&ChangeEvent::SyncFailed {
                    record_id: record_id.to_string(),
                });
                Err(EditBufferError::FlushFailed {
                    record_id: record_id.to_string(),
                    source: err,
                })
            }
        }
    }

    /// Flushes every record with unsynced content (navigate-away/unmount).
    pub fn flush_all(&mut self) -> FlushAllReport {
        let mut record_ids: Vec<RecordId> = self.pending.keys().cloned().collect();
        record_ids.sort();

        let mut report = FlushAllReport::default();
        for record_id in record_ids {
            match self.flush_now(&record_id) {
                Ok(FlushOutcome::Written) => report.written.push(record_id),
                Ok(FlushOutcome::Deferred) => report.deferred.push(record_id),
                Ok(FlushOutcome::AlreadyClean) => {}
                Err(EditBufferError::FlushFailed { record_id, source }) => {
                    report.failed.push((record_id, source));
                }
                Err(other) => {
                    warn!(
                        "event=flush_all module=buffer status=skipped record_id={} error={}",
                        record_id, other
                    );
                }
            }
        }
        report
    }

    /// Drops local unsynced content and restores the last persisted content.
    pub fn discard_local(&mut self, record_id: &str) -> EditBufferResult<()> {
        let record = self
            .records
            .get_mut(record_id)
            .ok_or_else(|| EditBufferError::RecordNotFound(record_id.to_string()))?;
        match self.pending.get(record_id) {
            None => return Ok(()),
            Some(entry) if entry.in_flight.is_some() => {
                return Err(EditBufferError::WriteInFlight(record_id.to_string()));
            }
            Some(_) => {}
        }
        if let Some(entry) = self.pending.remove(record_id) {
            record.content = entry.persisted_content;
        }

        info!(
            "event=edit_discard module=buffer status=ok record_id={}",
            record_id
        );
        self.notifier.emit(&ChangeEvent::Discarded {
            record_id: record_id.to_string(),
        });
        Ok(())
    }

    /// Inserts a new file record remotely, then into the collection.
    ///
    /// The name-derived language tag is stored under `language`.
    pub fn create_record(
        &mut self,
        name: &str,
        initial_content: impl Into<String>,
        attributes: Attributes,
    ) -> EditBufferResult<Record> {
        let name = normalize_record_name(name)?;
        let mut attributes = attributes;
        attributes.insert(LANGUAGE_ATTRIBUTE.to_string(), classify_name(&name).into());
        self.insert_new(RecordDraft {
            name,
            kind: RecordKind::File,
            content: initial_content.into(),
            attributes,
        })
    }

    /// Inserts a new folder record.
    pub fn create_folder(&mut self, name: &str) -> EditBufferResult<Record> {
        let name = normalize_record_name(name)?;
        self.insert_new(RecordDraft {
            name,
            kind: RecordKind::Folder,
            content: String::new(),
            attributes: Attributes::new(),
        })
    }

    /// Renames a record remotely and in memory; folders rebase descendants.
    ///
    /// A folder cannot move under its own path, and no rebased descendant may
    /// collide with a record outside the folder. Both are checked before any
    /// remote write. Descendant renames are best-effort; failures are reported
    /// through `CascadeIncomplete` after all of them were attempted.
    pub fn rename_record(&mut self, record_id: &str, new_name: &str) -> EditBufferResult<Record> {
        let current = self
            .records
            .get(record_id)
            .ok_or_else(|| EditBufferError::RecordNotFound(record_id.to_string()))?;
        let new_name = normalize_record_name(new_name)?;
        if current.name == new_name {
            return Ok(current.clone());
        }

        let old_name = current.name.clone();
        let is_folder = current.is_folder();
        if is_folder && is_descendant_name(&old_name, &new_name) {
            return Err(EditBufferError::CycleDetected {
                record_id: record_id.to_string(),
                new_name,
            });
        }

        let rebased: Vec<(RecordId, String)> = if is_folder {
            self.descendants_of(record_id)
                .into_iter()
                .filter_map(|descendant_id| {
                    let descendant = self.records.get(&descendant_id)?;
                    let name = rebase_name(&descendant.name, &old_name, &new_name)?;
                    Some((descendant_id, name))
                })
                .collect()
        } else {
            Vec::new()
        };
        let moving: HashSet<&str> = rebased
            .iter()
            .map(|(descendant_id, _)| descendant_id.as_str())
            .chain(std::iter::once(record_id))
            .collect();
        let taken = |name: &str| {
            self.records
                .values()
                .any(|record| !moving.contains(record.id.as_str()) && record.name == name)
        };
        if taken(&new_name) {
            return Err(EditBufferError::NameConflict(new_name));
        }
        if let Some((_, name)) = rebased.iter().find(|(_, name)| taken(name)) {
            return Err(EditBufferError::NameConflict(name.clone()));
        }

        let attributes = if is_folder {
            None
        } else {
            let mut attributes = current.attributes.clone();
            attributes.insert(
                LANGUAGE_ATTRIBUTE.to_string(),
                classify_name(&new_name).into(),
            );
            Some(attributes)
        };
        let patch = RecordPatch {
            name: Some(new_name.clone()),
            attributes,
            ..RecordPatch::default()
        };

        let stored = self
            .remote
            .update_record(record_id, &patch)
            .map_err(|err| {
                error!(
                    "event=record_rename module=buffer status=error record_id={} error_code=remote_write_failed error={}",
                    record_id, err
                );
                EditBufferError::RemoteWriteError(err)
            })?;
        let renamed = self.merge_remote_metadata(record_id, &stored);
        info!(
            "event=record_rename module=buffer status=ok record_id={} kind={}",
            record_id,
            stored.kind.as_str()
        );
        self.notifier.emit(&ChangeEvent::Renamed {
            record_id: record_id.to_string(),
        });

        if !is_folder {
            return Ok(renamed);
        }

        let affected: Vec<RecordId> = rebased
            .iter()
            .map(|(descendant_id, _)| descendant_id.clone())
            .collect();
        let mut failed = Vec::new();
        for (descendant_id, name) in rebased {
            let patch = RecordPatch {
                name: Some(name),
                ..RecordPatch::default()
            };
            match self.remote.update_record(&descendant_id, &patch) {
                Ok(stored) => {
                    self.merge_remote_metadata(&descendant_id, &stored);
                    self.notifier.emit(&ChangeEvent::Renamed {
                        record_id: descendant_id,
                    });
                }
                Err(err) => {
                    error!(
                        "event=record_rename module=buffer status=error record_id={} container_id={} error_code=cascade_rename_failed error={}",
                        descendant_id, record_id, err
                    );
                    failed.push((descendant_id, err));
                }
            }
        }

        if failed.is_empty() {
            Ok(renamed)
        } else {
            Err(EditBufferError::CascadeIncomplete { affected, failed })
        }
    }

    /// Removes a record (and for folders every descendant) then deletes remotely.
    ///
    /// Memory removal and timer cancellation happen before any remote call.
    /// Remote deletes run descendants first, container last; individual
    /// failures are logged and collected without rollback.
    pub fn delete_record(&mut self, record_id: &str) -> EditBufferResult<DeleteReport> {
        let record = self
            .records
            .get(record_id)
            .ok_or_else(|| EditBufferError::RecordNotFound(record_id.to_string()))?;

        let mut targets = if record.is_folder() {
            self.descendants_of(record_id)
        } else {
            Vec::new()
        };
        targets.push(record_id.to_string());

        for target in &targets {
            self.pending.remove(target);
            self.records.remove(target);
        }
        self.notifier.emit(&ChangeEvent::Deleted {
            record_ids: targets.clone(),
        });

        let mut failed = Vec::new();
        for target in &targets {
            match self.remote.delete_record(target) {
                Ok(()) => {}
                Err(RemoteError::NotFound(_)) => {
                    debug!(
                        "event=record_delete module=buffer status=ok record_id={} note=already_absent",
                        target
                    );
                }
                Err(err) => {
                    error!(
                        "event=record_delete module=buffer status=error record_id={} error_code=remote_write_failed error={}",
                        target, err
                    );
                    failed.push((target.clone(), err));
                }
            }
        }

        info!(
            "event=record_delete module=buffer status={} record_id={} removed={} failed={}",
            if failed.is_empty() { "ok" } else { "partial" },
            record_id,
            targets.len(),
            failed.len()
        );
        if failed.is_empty() {
            Ok(DeleteReport { removed: targets })
        } else {
            Err(EditBufferError::CascadeIncomplete {
                affected: targets,
                failed,
            })
        }
    }

    /// Flushes everything and releases the store (view unmount).
    pub fn close(mut self) -> FlushAllReport {
        let report = self.flush_all();
        info!(
            "event=buffer_close module=buffer status={} written={} deferred={} failed={}",
            if report.is_complete() { "ok" } else { "partial" },
            report.written.len(),
            report.deferred.len(),
            report.failed.len()
        );
        report
    }

    fn begin_flush(&mut self, record_id: &str) -> Option<FlushJob> {
        let content = self.records.get(record_id)?.content.clone();
        let entry = self.pending.get_mut(record_id)?;
        let generation = entry.begin();
        debug!(
            "event=flush module=buffer status=start record_id={} generation={} attempt={}",
            record_id, generation, entry.attempt
        );
        self.notifier.emit(&ChangeEvent::FlushStarted {
            record_id: record_id.to_string(),
        });
        Some(FlushJob {
            record_id: record_id.to_string(),
            content,
            generation,
            epoch: self.epoch,
        })
    }

    fn insert_new(&mut self, draft: RecordDraft) -> EditBufferResult<Record> {
        let context_id = self
            .context_id
            .clone()
            .ok_or(EditBufferError::NoActiveContext)?;
        if self.records.values().any(|record| record.name == draft.name) {
            return Err(EditBufferError::NameConflict(draft.name));
        }

        let record = self
            .remote
            .insert_record(&context_id, &draft)
            .map_err(|err| {
                error!(
                    "event=record_create module=buffer status=error context_id={} kind={} error_code=remote_write_failed error={}",
                    context_id,
                    draft.kind.as_str(),
                    err
                );
                EditBufferError::RemoteWriteError(err)
            })?;

        info!(
            "event=record_create module=buffer status=ok context_id={} record_id={} kind={}",
            context_id,
            record.id,
            record.kind.as_str()
        );
        self.records.insert(record.id.clone(), record.clone());
        self.notifier.emit(&ChangeEvent::Created {
            record_id: record.id.clone(),
        });
        Ok(record)
    }

    /// Copies remote-owned fields onto the local record, keeping local content.
    fn merge_remote_metadata(&mut self, record_id: &str, stored: &Record) -> Record {
        match self.records.get_mut(record_id) {
            Some(record) => {
                record.name = stored.name.clone();
                record.attributes = stored.attributes.clone();
                record.revision = stored.revision;
                record.updated_at = stored.updated_at;
                record.clone()
            }
            None => stored.clone(),
        }
    }

    /// Descendant ids of a container, deepest first then by name.
    fn descendants_of(&self, container_id: &str) -> Vec<RecordId> {
        let Some(container) = self.records.get(container_id) else {
            return Vec::new();
        };
        let mut descendants: Vec<&Record> = self
            .records
            .values()
            .filter(|record| record.id != container.id && container.contains(record))
            .collect();
        descendants.sort_by(|left, right| {
            path_depth(&right.name)
                .cmp(&path_depth(&left.name))
                .then_with(|| left.name.cmp(&right.name))
        });
        descendants
            .into_iter()
            .map(|record| record.id.clone())
            .collect()
    }

    fn flush_before_switch(&mut self) -> EditBufferResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let report = self.flush_all();
        if report.is_complete() {
            info!(
                "event=context_switch module=buffer status=flushed written={}",
                report.written.len()
            );
            return Ok(());
        }

        let mut unsynced: Vec<RecordId> = report
            .failed
            .into_iter()
            .map(|(record_id, _)| record_id)
            .chain(report.deferred)
            .collect();
        unsynced.sort();
        error!(
            "event=context_switch module=buffer status=error error_code=switch_aborted unsynced={}",
            unsynced.len()
        );
        Err(EditBufferError::SwitchAborted { unsynced })
    }

    fn drop_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let mut dropped: Vec<RecordId> = self.pending.drain().map(|(id, _)| id).collect();
        dropped.sort();
        for record_id in &dropped {
            warn!(
                "event=context_switch module=buffer status=dropped record_id={}",
                record_id
            );
        }
        self.notifier.emit(&ChangeEvent::PendingDropped {
            record_ids: dropped,
        });
    }
}

fn path_depth(name: &str) -> usize {
    name.matches('/').count()
}
