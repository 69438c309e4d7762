/// IncidentStore: SQLite-backed append-only store of per-reporter incident chains.
use std::path::Path;

use rusqlite::{params, Connection};
use tracing::{info, warn};

use uwazi_types::{IncidentPayload, UwaziError};

use crate::query::ChainOrder;
use crate::record::IncidentRecord;

/// Append-only storage for hash-chained incident records.
///
/// The store holds no chain state in memory: every append re-reads the
/// reporter's tail from storage, so any number of store handles (including
/// separate processes) stay consistent with each other. Per-reporter append
/// ordering is enforced by a compare-and-set on the tail hash rather than a
/// lock, so appends for different reporters never contend.
pub struct IncidentStore {
    conn: Connection,
}

impl IncidentStore {
    /// Open (or create) the incident ledger at the given path.
    ///
    /// Enables WAL mode and creates the `incident_log` table and indices if
    /// they do not exist.
    pub fn open(path: &Path) -> Result<Self, UwaziError> {
        let conn = Connection::open(path)
            .map_err(|e| UwaziError::StorageUnavailable(format!("failed to open database: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| UwaziError::StorageUnavailable(format!("failed to set WAL mode: {e}")))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| UwaziError::StorageUnavailable(format!("failed to set busy timeout: {e}")))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS incident_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id TEXT NOT NULL UNIQUE,
                reporter_id TEXT NOT NULL,
                recorded_at_millis INTEGER NOT NULL,
                office TEXT NOT NULL,
                service TEXT NOT NULL,
                amount_minor INTEGER,
                severity TEXT NOT NULL,
                note TEXT,
                location TEXT,
                prev_hash TEXT,
                self_hash TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reporter ON incident_log(reporter_id);
            CREATE INDEX IF NOT EXISTS idx_recorded_at ON incident_log(recorded_at_millis);
            CREATE INDEX IF NOT EXISTS idx_office ON incident_log(office);
            CREATE INDEX IF NOT EXISTS idx_severity ON incident_log(severity);",
        )
        .map_err(|e| UwaziError::StorageUnavailable(format!("failed to create schema: {e}")))?;

        info!(path = %path.display(), "incident store opened");

        Ok(Self { conn })
    }

    /// Append a new incident to the reporter's chain.
    ///
    /// Reads the reporter's current tail, computes the new record's hash
    /// extending it, and inserts with a compare-and-set on the tail. If a
    /// concurrent append for the same reporter wins the race, the append is
    /// retried once against a freshly read tail; a second loss surfaces
    /// [`UwaziError::AppendConflict`] to the caller.
    ///
    /// An absent tail is the valid first-record case, not an error.
    pub fn append(
        &self,
        reporter_id: &str,
        payload: &IncidentPayload,
    ) -> Result<IncidentRecord, UwaziError> {
        let tail = self.chain_tail(reporter_id)?.map(|r| r.self_hash);
        match self.append_after(reporter_id, payload, tail) {
            Err(UwaziError::AppendConflict(_)) => {
                warn!(reporter_id, "append lost the tail race, retrying with a fresh tail");
                let tail = self.chain_tail(reporter_id)?.map(|r| r.self_hash);
                self.append_after(reporter_id, payload, tail)
            }
            other => other,
        }
    }

    /// Single-shot append extending exactly `expected_prev`.
    ///
    /// The insert is one atomic statement that only applies while the
    /// reporter's stored tail hash still equals `expected_prev` (`None`
    /// meaning an empty chain). If the tail moved in the meantime, nothing
    /// is written and [`UwaziError::AppendConflict`] is returned.
    ///
    /// [`append`](Self::append) wraps this with a one-retry loop; it is
    /// public so callers can drive their own retry policy.
    pub fn append_after(
        &self,
        reporter_id: &str,
        payload: &IncidentPayload,
        expected_prev: Option<String>,
    ) -> Result<IncidentRecord, UwaziError> {
        let record = IncidentRecord::new(reporter_id, payload, expected_prev);

        let location_json = record
            .location
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| UwaziError::LedgerError(format!("failed to serialize location: {e}")))?;

        // `IS` gives null-safe equality, so an empty chain matches a NULL
        // expected tail. Zero rows changed means another append moved the
        // tail between the caller's read and this insert.
        let changed = self
            .conn
            .execute(
                "INSERT INTO incident_log (record_id, reporter_id, recorded_at_millis, office, service, amount_minor, severity, note, location, prev_hash, self_hash)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
                 WHERE (SELECT self_hash FROM incident_log
                        WHERE reporter_id = ?2
                        ORDER BY id DESC LIMIT 1) IS ?10",
                params![
                    record.record_id.to_string(),
                    record.reporter_id,
                    record.recorded_at_millis,
                    record.office,
                    record.service,
                    record.amount_minor,
                    record.severity.to_string(),
                    record.note,
                    location_json,
                    record.prev_hash,
                    record.self_hash,
                ],
            )
            .map_err(|e| UwaziError::StorageUnavailable(format!("failed to insert record: {e}")))?;

        if changed == 0 {
            return Err(UwaziError::AppendConflict(reporter_id.to_string()));
        }

        Ok(record)
    }

    /// Return the most recently appended record of a reporter's chain, if any.
    pub fn chain_tail(&self, reporter_id: &str) -> Result<Option<IncidentRecord>, UwaziError> {
        let mut records = self.query_by_reporter(reporter_id, ChainOrder::Newest, Some(1))?;
        Ok(records.pop())
    }

    /// Read access to the underlying connection for query extensions.
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}
