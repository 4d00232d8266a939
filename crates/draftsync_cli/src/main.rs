//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive one edit/flush cycle against the SQLite store to verify wiring.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `draftsync_cli [DB_PATH] [LOG_DIR]`. Without `DB_PATH` an in-memory
//! database is used; `LOG_DIR` must be absolute.

use draftsync_core::db::{open_db, open_db_in_memory};
use draftsync_core::{
    default_log_level, init_logging, Attributes, BufferConfig, EditBufferStore, SqliteRemoteStore,
};
use log::info;
use std::error::Error;

const SMOKE_CONTEXT: &str = "smoke";

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    if let Some(log_dir) = args.next() {
        init_logging(default_log_level(), &log_dir)?;
    }

    let conn = match db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let remote = SqliteRemoteStore::try_new(&conn)?;
    let mut store = EditBufferStore::new(&remote, BufferConfig::default())?;

    let loaded = store.load(SMOKE_CONTEXT)?;
    println!("draftsync_core version={}", draftsync_core::core_version());
    println!("loaded context={} records={}", SMOKE_CONTEXT, loaded.len());

    let name = format!("scratch-{}.md", loaded.len() + 1);
    let record = store.create_record(&name, "", Attributes::new())?;
    store.apply_edit(&record.id, "# smoke\n")?;
    println!(
        "edited name={} state={}",
        record.name,
        store
            .sync_state(&record.id)
            .map_or("unknown", |state| state.as_str())
    );

    let outcome = store.flush_now(&record.id)?;
    println!(
        "flushed outcome={:?} state={}",
        outcome,
        store
            .sync_state(&record.id)
            .map_or("unknown", |state| state.as_str())
    );

    let report = store.close();
    info!(
        "event=cli_smoke module=cli status={} record_id={}",
        if report.is_complete() { "ok" } else { "partial" },
        record.id
    );
    Ok(())
}
