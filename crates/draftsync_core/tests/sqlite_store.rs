use draftsync_core::db::open_db_in_memory;
use draftsync_core::{
    AttributeValue, Attributes, BufferConfig, EditBufferStore, ManualClock, RecordDraft,
    RecordKind, RecordPatch, RemoteError, RemoteStore, SqliteRemoteStore, SyncState,
};
use rusqlite::Connection;

fn draft(name: &str, content: &str) -> RecordDraft {
    RecordDraft {
        name: name.to_string(),
        kind: RecordKind::File,
        content: content.to_string(),
        attributes: Attributes::new(),
    }
}

#[test]
fn insert_then_select_roundtrip_scoped_by_context() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRemoteStore::try_new(&conn).unwrap();

    let mut attributes = Attributes::new();
    attributes.insert("language".to_string(), AttributeValue::from("rust"));
    attributes.insert("pinned".to_string(), AttributeValue::from(true));
    let inserted = store
        .insert_record(
            &"p1".to_string(),
            &RecordDraft {
                attributes,
                ..draft("src/main.rs", "fn main() {}")
            },
        )
        .unwrap();
    store
        .insert_record(&"p2".to_string(), &draft("other.md", ""))
        .unwrap();

    let rows = store.select_records("p1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], inserted);
    assert_eq!(rows[0].language(), Some("rust"));
    assert_eq!(
        rows[0].attributes.get("pinned"),
        Some(&AttributeValue::Bool(true))
    );
    assert_eq!(rows[0].revision, 0);
    assert!(store.select_records("missing").unwrap().is_empty());
}

#[test]
fn select_orders_by_name() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRemoteStore::try_new(&conn).unwrap();
    let context = "p1".to_string();

    for name in ["b.txt", "a.txt", "c/d.txt"] {
        store.insert_record(&context, &draft(name, "")).unwrap();
    }

    let names: Vec<String> = store
        .select_records("p1")
        .unwrap()
        .into_iter()
        .map(|record| record.name)
        .collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c/d.txt"]);
}

#[test]
fn duplicate_name_in_same_context_is_conflict() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRemoteStore::try_new(&conn).unwrap();
    let context = "p1".to_string();

    store.insert_record(&context, &draft("a.txt", "")).unwrap();
    let err = store
        .insert_record(&context, &draft("a.txt", ""))
        .unwrap_err();
    assert!(matches!(err, RemoteError::Conflict(_)));

    store
        .insert_record(&"p2".to_string(), &draft("a.txt", ""))
        .unwrap();
}

#[test]
fn partial_update_bumps_revision_and_leaves_other_fields() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRemoteStore::try_new(&conn).unwrap();
    let inserted = store
        .insert_record(&"p1".to_string(), &draft("notes.md", "v1"))
        .unwrap();

    let updated = store
        .update_record(&inserted.id, &RecordPatch::content("v2"))
        .unwrap();
    assert_eq!(updated.content, "v2");
    assert_eq!(updated.name, "notes.md");
    assert_eq!(updated.revision, 1);

    let renamed = store
        .update_record(
            &inserted.id,
            &RecordPatch {
                name: Some("docs/notes.md".to_string()),
                ..RecordPatch::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "docs/notes.md");
    assert_eq!(renamed.content, "v2");
    assert_eq!(renamed.revision, 2);
}

#[test]
fn update_and_delete_of_missing_record_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRemoteStore::try_new(&conn).unwrap();

    assert!(matches!(
        store.update_record("nope", &RecordPatch::content("x")),
        Err(RemoteError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_record("nope"),
        Err(RemoteError::NotFound(_))
    ));

    let inserted = store
        .insert_record(&"p1".to_string(), &draft("a.txt", ""))
        .unwrap();
    store.delete_record(&inserted.id).unwrap();
    assert!(store.select_records("p1").unwrap().is_empty());
}

#[test]
fn malformed_attributes_are_rejected_on_read() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO records (id, context_id, name, kind, attributes)
         VALUES ('bad', 'p1', 'bad.txt', 'file', 'not json');",
        [],
    )
    .unwrap();
    let store = SqliteRemoteStore::try_new(&conn).unwrap();

    assert!(matches!(
        store.select_records("p1"),
        Err(RemoteError::InvalidData(_))
    ));
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteRemoteStore::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RemoteError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn edit_buffer_persists_debounced_edits_to_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let remote = SqliteRemoteStore::try_new(&conn).unwrap();
    let clock = ManualClock::starting_at(0);
    let mut store =
        EditBufferStore::with_clock(&remote, clock.clone(), BufferConfig::default()).unwrap();

    store.load("p1").unwrap();
    let folder = store.create_folder("src").unwrap();
    let file = store
        .create_record("src/main.py", "", Attributes::new())
        .unwrap();
    store.apply_edit(&file.id, "print('hi')").unwrap();
    clock.advance(1_500);
    assert_eq!(store.tick().succeeded, 1);
    assert_eq!(store.sync_state(&file.id), Some(SyncState::Clean));

    let renamed = store.rename_record(&folder.id, "app").unwrap();
    assert_eq!(renamed.name, "app");
    let rows = remote.select_records("p1").unwrap();
    let stored_file = rows.iter().find(|record| record.id == file.id).unwrap();
    assert_eq!(stored_file.name, "app/main.py");
    assert_eq!(stored_file.content, "print('hi')");
    assert_eq!(stored_file.language(), Some("python"));

    store.delete_record(&folder.id).unwrap();
    assert!(remote.select_records("p1").unwrap().is_empty());
    assert!(store.is_empty());
}
