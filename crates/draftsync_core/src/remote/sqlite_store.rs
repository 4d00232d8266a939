//! SQLite-backed remote store.
//!
//! # Responsibility
//! - Persist records of every context in the `records` table.
//! - Keep SQL and JSON attribute encoding inside the store boundary.
//!
//! # Invariants
//! - `(context_id, name)` is unique; violations surface as `Conflict`.
//! - Every successful update bumps `revision` and `updated_at`.
//! - Read paths reject malformed rows instead of masking them.

use crate::db::migrations::latest_version;
use crate::model::record::{Attributes, ContextId, Record, RecordDraft, RecordKind, RecordPatch};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

const RECORD_SELECT_SQL: &str = "SELECT
    id,
    context_id,
    name,
    kind,
    content,
    attributes,
    revision,
    updated_at
FROM records";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "context_id",
    "name",
    "kind",
    "content",
    "attributes",
    "revision",
    "created_at",
    "updated_at",
];

/// Remote store over a migrated SQLite connection.
pub struct SqliteRemoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRemoteStore<'conn> {
    /// Creates a store from a connection returned by `open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RemoteResult<Self> {
        ensure_records_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_record(&self, record_id: &str) -> RemoteResult<Option<Record>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RECORD_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([record_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_record_row(row)?)),
            None => Ok(None),
        }
    }
}

impl RemoteStore for SqliteRemoteStore<'_> {
    fn select_records(&self, context_id: &str) -> RemoteResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE context_id = ?1
             ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([context_id])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn insert_record(&self, context_id: &ContextId, draft: &RecordDraft) -> RemoteResult<Record> {
        let id = Uuid::new_v4().to_string();
        let attributes = encode_attributes(&draft.attributes)?;
        self.conn
            .execute(
                "INSERT INTO records (id, context_id, name, kind, content, attributes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    id,
                    context_id,
                    draft.name,
                    draft.kind.as_str(),
                    draft.content,
                    attributes,
                ],
            )
            .map_err(|err| map_constraint(err, &draft.name))?;

        self.load_record(&id)?.ok_or_else(|| {
            RemoteError::InvalidData(format!("inserted record `{id}` missing in read-back"))
        })
    }

    fn update_record(&self, record_id: &str, patch: &RecordPatch) -> RemoteResult<Record> {
        let mut assignments = vec![
            "revision = revision + 1",
            "updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)",
        ];
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = patch.name.as_ref() {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(content) = patch.content.as_ref() {
            assignments.push("content = ?");
            bind_values.push(Value::Text(content.clone()));
        }
        if let Some(attributes) = patch.attributes.as_ref() {
            assignments.push("attributes = ?");
            bind_values.push(Value::Text(encode_attributes(attributes)?));
        }
        bind_values.push(Value::Text(record_id.to_string()));

        let sql = format!(
            "UPDATE records SET {} WHERE id = ?;",
            assignments.join(", ")
        );
        let changed = self
            .conn
            .execute(&sql, params_from_iter(bind_values))
            .map_err(|err| map_constraint(err, patch.name.as_deref().unwrap_or(record_id)))?;
        if changed == 0 {
            return Err(RemoteError::NotFound(record_id.to_string()));
        }

        self.load_record(record_id)?
            .ok_or_else(|| RemoteError::NotFound(record_id.to_string()))
    }

    fn delete_record(&self, record_id: &str) -> RemoteResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM records WHERE id = ?1;", [record_id])?;
        if changed == 0 {
            return Err(RemoteError::NotFound(record_id.to_string()));
        }
        Ok(())
    }
}

fn parse_record_row(row: &Row<'_>) -> RemoteResult<Record> {
    let id: String = row.get("id")?;
    let kind_text: String = row.get("kind")?;
    let kind = RecordKind::parse(&kind_text).ok_or_else(|| {
        RemoteError::InvalidData(format!("invalid kind `{kind_text}` for record `{id}`"))
    })?;
    let attributes_text: String = row.get("attributes")?;
    let attributes: Attributes = serde_json::from_str(&attributes_text).map_err(|err| {
        RemoteError::InvalidData(format!("invalid attributes for record `{id}`: {err}"))
    })?;

    Ok(Record {
        context_id: row.get("context_id")?,
        name: row.get("name")?,
        kind,
        content: row.get("content")?,
        attributes,
        revision: row.get("revision")?,
        updated_at: row.get("updated_at")?,
        id,
    })
}

fn encode_attributes(attributes: &Attributes) -> RemoteResult<String> {
    serde_json::to_string(attributes)
        .map_err(|err| RemoteError::InvalidData(format!("unencodable attributes: {err}")))
}

fn map_constraint(err: rusqlite::Error, name: &str) -> RemoteError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            RemoteError::Conflict(format!("record name already exists: `{name}`"))
        }
        other => other.into(),
    }
}

fn ensure_records_connection_ready(conn: &Connection) -> RemoteResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RemoteError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'records';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(RemoteError::InvalidData(
            "required table `records` is missing".to_string(),
        ));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(records);")?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let column: String = row.get(1)?;
        columns.push(column);
    }
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !columns.iter().any(|current| current == *column))
    {
        return Err(RemoteError::InvalidData(format!(
            "required column `{missing}` is missing from `records`"
        )));
    }

    Ok(())
}
