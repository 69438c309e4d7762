/// Query interface for incident records.
use rusqlite::params;
use uuid::Uuid;

use uwazi_types::UwaziError;

use crate::filter::RecordFilter;
use crate::record::IncidentRecord;
use crate::store::IncidentStore;

/// Direction of a reporter-scoped chain read.
///
/// Chain position is insertion order: timestamps are server-assigned at
/// insert, so row order and timestamp order agree, and row order stays
/// stable when timestamps tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOrder {
    /// Oldest record first (chain-walk order).
    Oldest,
    /// Newest record first (tail first).
    Newest,
}

pub(crate) const RECORD_COLUMNS: &str = "record_id, reporter_id, recorded_at_millis, office, service, amount_minor, severity, note, location, prev_hash, self_hash";

impl IncidentStore {
    /// Return a reporter's records in chain order, optionally limited.
    pub fn query_by_reporter(
        &self,
        reporter_id: &str,
        order: ChainOrder,
        limit: Option<usize>,
    ) -> Result<Vec<IncidentRecord>, UwaziError> {
        let direction = match order {
            ChainOrder::Oldest => "ASC",
            ChainOrder::Newest => "DESC",
        };
        let limit_clause = match limit {
            Some(n) => format!(" LIMIT {n}"),
            None => String::new(),
        };
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM incident_log
             WHERE reporter_id = ?1 ORDER BY id {direction}{limit_clause}"
        );

        let mut stmt = self
            .connection()
            .prepare(&sql)
            .map_err(|e| UwaziError::StorageUnavailable(format!("query_by_reporter prepare failed: {e}")))?;

        let rows = stmt
            .query_map(params![reporter_id], row_to_record)
            .map_err(|e| UwaziError::StorageUnavailable(format!("query_by_reporter failed: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| read_error("query_by_reporter read failed", e))
    }

    /// Return all records matching the filter, across reporters.
    ///
    /// No ordering is guaranteed; this is the aggregation read path, which
    /// is order-independent by contract.
    pub fn query_all(&self, filter: &RecordFilter) -> Result<Vec<IncidentRecord>, UwaziError> {
        let fragment = filter.to_sql();
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM incident_log");
        if !fragment.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&fragment.where_clause);
        }
        if let Some(limit) = fragment.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = fragment.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        let mut stmt = self
            .connection()
            .prepare(&sql)
            .map_err(|e| UwaziError::StorageUnavailable(format!("query_all prepare failed: {e}")))?;

        let params = rusqlite::params_from_iter(fragment.params.iter().map(|p| p.as_ref()));
        let rows = stmt
            .query_map(params, row_to_record)
            .map_err(|e| UwaziError::StorageUnavailable(format!("query_all failed: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| read_error("query_all read failed", e))
    }

    /// Return the last `n` records across all reporters, most recent first.
    pub fn query_last(&self, n: usize) -> Result<Vec<IncidentRecord>, UwaziError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM incident_log ORDER BY id DESC LIMIT ?1"
        );
        let mut stmt = self
            .connection()
            .prepare(&sql)
            .map_err(|e| UwaziError::StorageUnavailable(format!("query_last prepare failed: {e}")))?;

        let rows = stmt
            .query_map(params![n as i64], row_to_record)
            .map_err(|e| UwaziError::StorageUnavailable(format!("query_last failed: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| read_error("query_last read failed", e))
    }

    /// Return the total number of records in the ledger.
    pub fn count(&self) -> Result<usize, UwaziError> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM incident_log", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|c| c as usize)
            .map_err(|e| UwaziError::StorageUnavailable(format!("count failed: {e}")))
    }

    /// Return the number of records in one reporter's chain.
    pub fn count_by_reporter(&self, reporter_id: &str) -> Result<usize, UwaziError> {
        self.connection()
            .query_row(
                "SELECT COUNT(*) FROM incident_log WHERE reporter_id = ?1",
                params![reporter_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|c| c as usize)
            .map_err(|e| UwaziError::StorageUnavailable(format!("count_by_reporter failed: {e}")))
    }
}

/// Map a SQLite row to an IncidentRecord.
///
/// A row that no longer decodes (tampered severity text, corrupt location
/// JSON, malformed record id) is reported as a conversion failure, which the
/// read paths surface as [`UwaziError::LedgerError`] -- never a panic, so a
/// tampered store still returns results to the caller.
pub(crate) fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<IncidentRecord> {
    let record_id = row
        .get::<_, String>(0)
        .and_then(|s| Uuid::parse_str(&s).map_err(|e| decode_failure(0, e)))?;
    let severity = row
        .get::<_, String>(6)
        .and_then(|s| s.parse().map_err(|e| decode_failure(6, e)))?;
    let location = row
        .get::<_, Option<String>>(8)?
        .map(|s| serde_json::from_str(&s).map_err(|e| decode_failure(8, e)))
        .transpose()?;

    Ok(IncidentRecord {
        record_id,
        reporter_id: row.get(1)?,
        recorded_at_millis: row.get(2)?,
        office: row.get(3)?,
        service: row.get(4)?,
        amount_minor: row.get(5)?,
        severity,
        note: row.get(7)?,
        location,
        prev_hash: row.get(9)?,
        self_hash: row.get(10)?,
    })
}

fn decode_failure(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

/// Classify a row-read failure: an undecodable row is a ledger invariant
/// violation, anything else is the storage collaborator failing.
pub(crate) fn read_error(context: &str, e: rusqlite::Error) -> UwaziError {
    match e {
        rusqlite::Error::FromSqlConversionFailure(..) => {
            UwaziError::LedgerError(format!("{context}: undecodable record: {e}"))
        }
        other => UwaziError::StorageUnavailable(format!("{context}: {other}")),
    }
}
