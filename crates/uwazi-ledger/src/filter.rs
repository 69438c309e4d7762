//! Composable filter for incident queries and aggregation.
//!
//! Builds a parameterized SQL WHERE clause dynamically from optional
//! filter criteria. All filters are AND-combined. Each `Some` field
//! adds a condition; `None` fields are ignored.

use uwazi_types::Severity;

/// A composable filter over the incident record set.
///
/// Use `Default::default()` for an empty filter (matches everything),
/// then set individual fields to narrow results. The time window is
/// inclusive at `from_millis` and exclusive at `to_millis`; an absent
/// window means all time.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    /// Only records concerning this office.
    pub office: Option<String>,
    /// Only records with this severity.
    pub severity: Option<Severity>,
    /// Only records at or after this epoch-millisecond timestamp.
    pub from_millis: Option<i64>,
    /// Only records strictly before this epoch-millisecond timestamp.
    pub to_millis: Option<i64>,
    /// Maximum number of records to return (queries only; ignored by aggregation).
    pub limit: Option<usize>,
    /// Number of records to skip (for pagination).
    pub offset: Option<usize>,
}

/// A built SQL fragment with its positional parameters.
pub(crate) struct SqlFragment {
    /// The WHERE clause (without the "WHERE" keyword), or empty if no filters.
    pub where_clause: String,
    /// The positional parameter values, in order.
    pub params: Vec<Box<dyn rusqlite::types::ToSql>>,
    /// The LIMIT clause value, if any.
    pub limit: Option<usize>,
    /// The OFFSET clause value, if any.
    pub offset: Option<usize>,
}

impl RecordFilter {
    /// Build a SQL WHERE clause and parameter list from this filter.
    ///
    /// Parameters use positional `?N` placeholders starting from 1.
    /// The returned `SqlFragment` can be appended to a base query.
    pub(crate) fn to_sql(&self) -> SqlFragment {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut idx = 1usize;

        if let Some(ref office) = self.office {
            conditions.push(format!("office = ?{idx}"));
            params.push(Box::new(office.clone()));
            idx += 1;
        }

        if let Some(severity) = self.severity {
            conditions.push(format!("severity = ?{idx}"));
            params.push(Box::new(severity.to_string()));
            idx += 1;
        }

        if let Some(from) = self.from_millis {
            conditions.push(format!("recorded_at_millis >= ?{idx}"));
            params.push(Box::new(from));
            idx += 1;
        }

        if let Some(to) = self.to_millis {
            conditions.push(format!("recorded_at_millis < ?{idx}"));
            params.push(Box::new(to));
            idx += 1;
        }

        // idx tracks the next parameter slot and must be kept in sync if new
        // filter branches are added above.
        let _ = idx;

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            conditions.join(" AND ")
        };

        SqlFragment {
            where_clause,
            params,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
