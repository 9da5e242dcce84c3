//! SQLite-based store implementation

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use romkeep_api::{RomRecord, TriState};
use romkeep_util::RomFile;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{merge_record, RomStore, StoreError, StoreResult};

/// How long a writer waits for another process holding the database lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "file, name, count, time, lastsessiontime, last, completed, favorite";

/// SQLite-based store
///
/// Every process opens its own `SqliteStore`; SQLite's file locking keeps
/// concurrent writers consistent.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    /// Change counter value this process has accounted for
    observed: AtomicI64,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            observed: AtomicI64::new(0),
        };
        store.init_schema()?;
        let counter = store.change_counter()?;
        store.observed.store(counter, Ordering::SeqCst);
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS roms (
                file TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                time INTEGER NOT NULL DEFAULT 0,
                lastsessiontime INTEGER NOT NULL DEFAULT 0,
                last TEXT NOT NULL DEFAULT '',
                completed INTEGER NOT NULL DEFAULT -1,
                favorite INTEGER NOT NULL DEFAULT -1
            );

            -- Bumped on every mutation, from any process
            CREATE TABLE IF NOT EXISTS change_counter (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                value INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO change_counter (id, value) VALUES (1, 0);

            CREATE TRIGGER IF NOT EXISTS roms_after_insert AFTER INSERT ON roms
            BEGIN
                UPDATE change_counter SET value = value + 1 WHERE id = 1;
            END;
            CREATE TRIGGER IF NOT EXISTS roms_after_update AFTER UPDATE ON roms
            BEGIN
                UPDATE change_counter SET value = value + 1 WHERE id = 1;
            END;
            CREATE TRIGGER IF NOT EXISTS roms_after_delete AFTER DELETE ON roms
            BEGIN
                UPDATE change_counter SET value = value + 1 WHERE id = 1;
            END;

            CREATE INDEX IF NOT EXISTS idx_roms_last ON roms(last);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    /// Mark our own write as seen, unless a foreign write slipped in since
    /// the last observation; that one must stay visible to the next check.
    fn advance_observed(&self, before: i64, after: i64) {
        let _ = self
            .observed
            .compare_exchange(before, after, Ordering::SeqCst, Ordering::SeqCst);
    }
}

fn read_counter(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT value FROM change_counter WHERE id = 1", [], |row| {
        row.get(0)
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<RomRecord> {
    let file: String = row.get(0)?;
    Ok(RomRecord {
        file: RomFile::new(file),
        name: row.get(1)?,
        count: row.get(2)?,
        time: row.get(3)?,
        last_session_time: row.get(4)?,
        last: row.get(5)?,
        completed: TriState::from_db(row.get(6)?),
        favorite: TriState::from_db(row.get(7)?),
    })
}

fn select_one(conn: &Connection, file: &RomFile) -> rusqlite::Result<Option<RomRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM roms WHERE file = ?", SELECT_COLUMNS),
        [file.as_str()],
        row_to_record,
    )
    .optional()
}

impl RomStore for SqliteStore {
    fn load(&self, file: &RomFile) -> StoreResult<Option<RomRecord>> {
        let conn = self.lock()?;
        Ok(select_one(&conn, file)?)
    }

    fn load_all(&self) -> StoreResult<Vec<RomRecord>> {
        let conn = self.lock()?;
        let counter = read_counter(&conn)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM roms ORDER BY last DESC, file ASC",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        self.observed.store(counter, Ordering::SeqCst);
        debug!(count = records.len(), counter, "Loaded library snapshot");
        Ok(records)
    }

    fn save(&self, record: &RomRecord) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let before = read_counter(&tx)?;
        let prior = select_one(&tx, &record.file)?;
        let merged = merge_record(prior.as_ref(), record, &romkeep_util::timestamp_now());

        tx.execute(
            r#"
            INSERT INTO roms (file, name, count, time, lastsessiontime, last, completed, favorite)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(file)
            DO UPDATE SET
                name = excluded.name,
                count = excluded.count,
                time = excluded.time,
                lastsessiontime = excluded.lastsessiontime,
                last = excluded.last,
                completed = excluded.completed,
                favorite = excluded.favorite
            "#,
            params![
                merged.file.as_str(),
                merged.name,
                merged.count,
                merged.time,
                merged.last_session_time,
                merged.last,
                merged.completed.to_db(),
                merged.favorite.to_db(),
            ],
        )?;

        let after = read_counter(&tx)?;
        tx.commit()?;
        self.advance_observed(before, after);

        debug!(
            file = %merged.file,
            count = merged.count,
            time = merged.time,
            session_secs = record.time,
            "Record saved"
        );
        Ok(())
    }

    fn remove(&self, file: &RomFile) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let before = read_counter(&tx)?;
        let deleted = tx.execute("DELETE FROM roms WHERE file = ?", [file.as_str()])?;
        let after = read_counter(&tx)?;
        tx.commit()?;
        self.advance_observed(before, after);

        debug!(file = %file, deleted, "Record removed");
        Ok(())
    }

    fn change_counter(&self) -> StoreResult<i64> {
        let conn = self.lock()?;
        Ok(read_counter(&conn)?)
    }

    fn is_external_change_pending(&self) -> StoreResult<bool> {
        let current = self.change_counter()?;
        Ok(current != self.observed.load(Ordering::SeqCst))
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
