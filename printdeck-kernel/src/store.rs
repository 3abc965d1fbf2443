/**
 * STATUS STORE - Durable keyed state, one row per printer
 *
 * ROLE: Persist the latest report per printer (keyed by name) and stamp
 * every write with the kernel clock. SQLite in WAL mode behind a shared
 * connection; writes are parameterized full-replace upserts, so concurrent
 * reports for the same printer resolve last-writer-wins per row with no
 * application-level locking.
 */

use std::path::Path;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};
use tracing::info;

use crate::models::{PrinterStatus, StatusReport};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage constraint violated: {0}")]
    Constraint(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    ErrorCode::ConstraintViolation | ErrorCode::TypeMismatch
                ) =>
            {
                StoreError::Constraint(err.to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS printer_status (
    name              TEXT PRIMARY KEY,
    ip                TEXT NOT NULL,
    job_id            INTEGER,
    job_progress      REAL,
    time_remaining    INTEGER,
    time_printing     INTEGER,
    storage_path      TEXT,
    storage_name      TEXT,
    storage_read_only INTEGER,
    state             TEXT NOT NULL DEFAULT 'UNKNOWN',
    temp_bed          REAL,
    target_bed        REAL,
    temp_nozzle       REAL,
    target_nozzle     REAL,
    axis_x            REAL,
    axis_y            REAL,
    axis_z            REAL,
    flow              INTEGER,
    speed             INTEGER,
    fan_hotend        INTEGER,
    fan_print         INTEGER,
    last_updated_utc  TEXT NOT NULL
)";

const UPSERT: &str = "
INSERT INTO printer_status (
    name, ip,
    job_id, job_progress, time_remaining, time_printing,
    storage_path, storage_name, storage_read_only,
    state, temp_bed, target_bed, temp_nozzle, target_nozzle,
    axis_x, axis_y, axis_z, flow, speed, fan_hotend, fan_print,
    last_updated_utc
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
          ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
ON CONFLICT(name) DO UPDATE SET
    ip                = excluded.ip,
    job_id            = excluded.job_id,
    job_progress      = excluded.job_progress,
    time_remaining    = excluded.time_remaining,
    time_printing     = excluded.time_printing,
    storage_path      = excluded.storage_path,
    storage_name      = excluded.storage_name,
    storage_read_only = excluded.storage_read_only,
    state             = excluded.state,
    temp_bed          = excluded.temp_bed,
    target_bed        = excluded.target_bed,
    temp_nozzle       = excluded.temp_nozzle,
    target_nozzle     = excluded.target_nozzle,
    axis_x            = excluded.axis_x,
    axis_y            = excluded.axis_y,
    axis_z            = excluded.axis_z,
    flow              = excluded.flow,
    speed             = excluded.speed,
    fan_hotend        = excluded.fan_hotend,
    fan_print         = excluded.fan_print,
    last_updated_utc  = excluded.last_updated_utc";

const LIST_ALL: &str = "
SELECT name, ip,
       job_id, job_progress, time_remaining, time_printing,
       storage_path, storage_name, storage_read_only,
       state, temp_bed, target_bed, temp_nozzle, target_nozzle,
       axis_x, axis_y, axis_z, flow, speed, fan_hotend, fan_print,
       last_updated_utc
FROM printer_status
ORDER BY name ASC";

#[derive(Clone)]
pub struct StatusStore {
    conn: Arc<Mutex<Connection>>,
}

impl StatusStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path.as_ref())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self::init(conn)?;
        info!("status store ready at {}", path.as_ref().display());
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Inserts or fully replaces the row keyed by `report.name`, stamping
    /// `last_updated_utc` with the current kernel clock in the same
    /// statement. All-or-nothing: a failed upsert leaves the row untouched.
    pub fn upsert(&self, report: &StatusReport) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let conn = self.conn.lock();
        conn.execute(
            UPSERT,
            params![
                report.name,
                report.ip,
                report.job_id,
                report.job_progress,
                report.time_remaining,
                report.time_printing,
                report.storage_path,
                report.storage_name,
                report.storage_read_only,
                report.state,
                report.temp_bed,
                report.target_bed,
                report.temp_nozzle,
                report.target_nozzle,
                report.axis_x,
                report.axis_y,
                report.axis_z,
                report.flow,
                report.speed,
                report.fan_hotend,
                report.fan_print,
                now,
            ],
        )?;
        Ok(())
    }

    /// All rows ordered by printer name ascending. An empty store is a
    /// valid state and yields an empty vec, not an error.
    pub fn list_all(&self) -> Result<Vec<PrinterStatus>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(LIST_ALL)?;
        let rows = stmt.query_map([], |row| {
            Ok(PrinterStatus {
                report: StatusReport {
                    name: row.get(0)?,
                    ip: row.get(1)?,
                    job_id: row.get(2)?,
                    job_progress: row.get(3)?,
                    time_remaining: row.get(4)?,
                    time_printing: row.get(5)?,
                    storage_path: row.get(6)?,
                    storage_name: row.get(7)?,
                    storage_read_only: row.get(8)?,
                    state: row.get(9)?,
                    temp_bed: row.get(10)?,
                    target_bed: row.get(11)?,
                    temp_nozzle: row.get(12)?,
                    target_nozzle: row.get(13)?,
                    axis_x: row.get(14)?,
                    axis_y: row.get(15)?,
                    axis_z: row.get(16)?,
                    flow: row.get(17)?,
                    speed: row.get(18)?,
                    fan_hotend: row.get(19)?,
                    fan_print: row.get(20)?,
                },
                last_updated_utc: row.get(21)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str) -> StatusReport {
        StatusReport {
            name: name.to_string(),
            ip: "10.0.0.7".to_string(),
            state: "PRINTING".to_string(),
            time_printing: Some(120),
            time_remaining: Some(60),
            temp_bed: Some(60.2),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let store = StatusStore::open_in_memory().unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_is_idempotent_per_identity() {
        let store = StatusStore::open_in_memory().unwrap();
        store.upsert(&report("mk4-lab")).unwrap();
        store.upsert(&report("mk4-lab")).unwrap();

        let rows = store.list_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].report.name, "mk4-lab");
    }

    #[test]
    fn test_last_updated_advances_monotonically() {
        let store = StatusStore::open_in_memory().unwrap();
        store.upsert(&report("mk4-lab")).unwrap();
        let first = store.list_all().unwrap()[0].last_updated_utc.clone();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        store.upsert(&report("mk4-lab")).unwrap();
        let second = store.list_all().unwrap()[0].last_updated_utc.clone();
        assert!(second > first, "{second} should be after {first}");
    }

    #[test]
    fn test_list_orders_by_name_ascending() {
        let store = StatusStore::open_in_memory().unwrap();
        store.upsert(&report("xl-workshop")).unwrap();
        store.upsert(&report("mini-office")).unwrap();
        store.upsert(&report("mk4-lab")).unwrap();

        let names: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.report.name)
            .collect();
        assert_eq!(names, vec!["mini-office", "mk4-lab", "xl-workshop"]);
    }

    #[test]
    fn test_upsert_fully_replaces_the_row() {
        let store = StatusStore::open_in_memory().unwrap();
        store.upsert(&report("mk4-lab")).unwrap();

        // Second report omits temp_bed: the column must come back absent,
        // not carry the previous 60.2 forward.
        let mut second = report("mk4-lab");
        second.temp_bed = None;
        second.state = "IDLE".to_string();
        store.upsert(&second).unwrap();

        let rows = store.list_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].report.temp_bed, None);
        assert_eq!(rows[0].report.state, "IDLE");
    }

    #[test]
    fn test_zero_and_absent_are_distinct() {
        let store = StatusStore::open_in_memory().unwrap();
        let mut r = report("mk4-lab");
        r.flow = Some(0);
        r.speed = None;
        store.upsert(&r).unwrap();

        let row = &store.list_all().unwrap()[0];
        assert_eq!(row.report.flow, Some(0));
        assert_eq!(row.report.speed, None);
    }

    #[test]
    fn test_open_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("printdeck.db");
        {
            let store = StatusStore::open(&path).unwrap();
            store.upsert(&report("mk4-lab")).unwrap();
        }
        let store = StatusStore::open(&path).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
    }
}
