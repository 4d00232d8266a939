//! Scripted in-memory remote store shared by integration tests.

#![allow(dead_code)]

use draftsync_core::{
    ContextId, Record, RecordDraft, RecordPatch, RemoteError, RemoteResult, RemoteStore,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// Remote call observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Select(String),
    Insert(String),
    Update {
        record_id: String,
        content: Option<String>,
        name: Option<String>,
    },
    Delete(String),
}

#[derive(Default)]
struct FakeState {
    rows: BTreeMap<String, Record>,
    calls: Vec<RemoteCall>,
    next_id: u64,
    fail_selects: bool,
    fail_inserts: bool,
    update_failures: BTreeMap<String, VecDeque<bool>>,
    failing_deletes: Vec<String>,
}

/// Cloneable handle; clones observe the same rows and call log.
#[derive(Clone, Default)]
pub struct FakeRemote {
    state: Rc<RefCell<FakeState>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one stored row and returns it.
    pub fn seed(&self, context_id: &str, id: &str, name: &str, content: &str) -> Record {
        let record = Record {
            id: id.to_string(),
            context_id: context_id.to_string(),
            name: name.to_string(),
            kind: draftsync_core::RecordKind::File,
            content: content.to_string(),
            attributes: Default::default(),
            revision: 0,
            updated_at: 0,
        };
        self.state
            .borrow_mut()
            .rows
            .insert(id.to_string(), record.clone());
        record
    }

    pub fn seed_folder(&self, context_id: &str, id: &str, name: &str) -> Record {
        let mut record = self.seed(context_id, id, name, "");
        record.kind = draftsync_core::RecordKind::Folder;
        self.state
            .borrow_mut()
            .rows
            .insert(id.to_string(), record.clone());
        record
    }

    pub fn stored(&self, id: &str) -> Option<Record> {
        self.state.borrow().rows.get(id).cloned()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.borrow().calls.clone()
    }

    /// Content-carrying updates issued for one record, in order.
    pub fn content_writes(&self, record_id: &str) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Update {
                    record_id: id,
                    content: Some(content),
                    ..
                } if id == record_id => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn set_select_failure(&self, fail: bool) {
        self.state.borrow_mut().fail_selects = fail;
    }

    pub fn set_insert_failure(&self, fail: bool) {
        self.state.borrow_mut().fail_inserts = fail;
    }

    /// Queues outcomes for the next updates of one record (`true` = fail).
    pub fn script_updates(&self, record_id: &str, failures: &[bool]) {
        self.state
            .borrow_mut()
            .update_failures
            .entry(record_id.to_string())
            .or_default()
            .extend(failures.iter().copied());
    }

    pub fn fail_delete_of(&self, record_id: &str) {
        self.state
            .borrow_mut()
            .failing_deletes
            .push(record_id.to_string());
    }
}

fn offline() -> RemoteError {
    RemoteError::Unavailable("scripted failure".to_string())
}

impl RemoteStore for FakeRemote {
    fn select_records(&self, context_id: &str) -> RemoteResult<Vec<Record>> {
        let mut state = self.state.borrow_mut();
        state.calls.push(RemoteCall::Select(context_id.to_string()));
        if state.fail_selects {
            return Err(offline());
        }
        let mut rows: Vec<Record> = state
            .rows
            .values()
            .filter(|record| record.context_id == context_id)
            .cloned()
            .collect();
        rows.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(rows)
    }

    fn insert_record(&self, context_id: &ContextId, draft: &RecordDraft) -> RemoteResult<Record> {
        let mut state = self.state.borrow_mut();
        state.calls.push(RemoteCall::Insert(draft.name.clone()));
        if state.fail_inserts {
            return Err(offline());
        }
        state.next_id += 1;
        let record = Record {
            id: format!("r{}", state.next_id),
            context_id: context_id.clone(),
            name: draft.name.clone(),
            kind: draft.kind,
            content: draft.content.clone(),
            attributes: draft.attributes.clone(),
            revision: 0,
            updated_at: 0,
        };
        state.rows.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_record(&self, record_id: &str, patch: &RecordPatch) -> RemoteResult<Record> {
        let mut state = self.state.borrow_mut();
        state.calls.push(RemoteCall::Update {
            record_id: record_id.to_string(),
            content: patch.content.clone(),
            name: patch.name.clone(),
        });
        let scripted_failure = state
            .update_failures
            .get_mut(record_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(false);
        if scripted_failure {
            return Err(offline());
        }

        let record = state
            .rows
            .get_mut(record_id)
            .ok_or_else(|| RemoteError::NotFound(record_id.to_string()))?;
        if let Some(name) = patch.name.as_ref() {
            record.name = name.clone();
        }
        if let Some(content) = patch.content.as_ref() {
            record.content = content.clone();
        }
        if let Some(attributes) = patch.attributes.as_ref() {
            record.attributes = attributes.clone();
        }
        record.revision += 1;
        Ok(record.clone())
    }

    fn delete_record(&self, record_id: &str) -> RemoteResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(RemoteCall::Delete(record_id.to_string()));
        if state.failing_deletes.iter().any(|id| id == record_id) {
            return Err(offline());
        }
        state
            .rows
            .remove(record_id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(record_id.to_string()))
    }
}
