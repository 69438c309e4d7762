//! Anonymized aggregation over the incident record set.
//!
//! Computes counts and amount sums bucketed by a fixed set of grouping
//! dimensions. This is the view surfaced to non-owners of a chain, so no
//! output ever carries a reporter identity: only keys, counts, and sums.

use rusqlite::params_from_iter;
use serde::Serialize;

use uwazi_types::UwaziError;

use crate::filter::RecordFilter;
use crate::store::IncidentStore;

/// The dimension to bucket aggregates by.
///
/// A closed set of variants rather than an open string key, so every
/// grouping the platform can render is statically known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    /// One bucket per office.
    Office,
    /// One bucket per severity level.
    Severity,
    /// Fixed-width time buckets; the bucket key is the bucket's start in
    /// epoch milliseconds.
    TimeBucket { width_millis: i64 },
}

impl GroupBy {
    fn key_expr(&self) -> Result<String, UwaziError> {
        match self {
            GroupBy::Office => Ok("office".to_string()),
            GroupBy::Severity => Ok("severity".to_string()),
            GroupBy::TimeBucket { width_millis } => {
                if *width_millis <= 0 {
                    return Err(UwaziError::LedgerError(format!(
                        "time bucket width must be positive, got {width_millis}"
                    )));
                }
                Ok(format!("(recorded_at_millis / {w}) * {w}", w = width_millis))
            }
        }
    }
}

/// One grouping key with its count and amount sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateBucket {
    /// Office name, severity name, or time-bucket start millis as a string.
    pub key: String,
    pub count: usize,
    /// Sum of `amount_minor` over the bucket; missing amounts count as zero.
    pub total_amount_minor: i64,
}

/// Aggregate totals plus per-bucket breakdown.
///
/// Bucket order is not significant; callers sort for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateSummary {
    pub total_count: usize,
    pub total_amount_minor: i64,
    pub buckets: Vec<AggregateBucket>,
}

impl IncidentStore {
    /// Aggregate records matching `filter`, bucketed by `group_by`.
    ///
    /// Order-independent over the record set. The filter's `limit`/`offset`
    /// are pagination controls for record queries and are ignored here; an
    /// aggregate is always over the full matching set.
    pub fn aggregate(
        &self,
        filter: &RecordFilter,
        group_by: GroupBy,
    ) -> Result<AggregateSummary, UwaziError> {
        let key_expr = group_by.key_expr()?;
        let fragment = filter.to_sql();

        let mut sql = format!(
            "SELECT {key_expr} AS bucket_key,
                    COUNT(*),
                    COALESCE(SUM(COALESCE(amount_minor, 0)), 0)
             FROM incident_log"
        );
        if !fragment.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&fragment.where_clause);
        }
        sql.push_str(" GROUP BY bucket_key");

        let mut stmt = self
            .connection()
            .prepare(&sql)
            .map_err(|e| UwaziError::StorageUnavailable(format!("aggregate prepare failed: {e}")))?;

        let rows = stmt
            .query_map(
                params_from_iter(fragment.params.iter().map(|p| p.as_ref())),
                |row| {
                    let key = match group_by {
                        GroupBy::Office | GroupBy::Severity => row.get::<_, String>(0)?,
                        GroupBy::TimeBucket { .. } => row.get::<_, i64>(0)?.to_string(),
                    };
                    let count: i64 = row.get(1)?;
                    let total_amount_minor: i64 = row.get(2)?;
                    Ok(AggregateBucket {
                        key,
                        count: count as usize,
                        total_amount_minor,
                    })
                },
            )
            .map_err(|e| UwaziError::StorageUnavailable(format!("aggregate failed: {e}")))?;

        let buckets: Vec<AggregateBucket> = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| UwaziError::StorageUnavailable(format!("aggregate read failed: {e}")))?;

        let total_count = buckets.iter().map(|b| b.count).sum();
        let total_amount_minor = buckets.iter().map(|b| b.total_amount_minor).sum();

        Ok(AggregateSummary {
            total_count,
            total_amount_minor,
            buckets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use uwazi_types::{IncidentPayload, Severity};

    fn test_db() -> (NamedTempFile, IncidentStore) {
        let tmp = NamedTempFile::new().unwrap();
        let store = IncidentStore::open(tmp.path()).unwrap();
        (tmp, store)
    }

    fn populate(store: &IncidentStore) {
        let rows = vec![
            ("alice", "lands-office", Severity::High, Some(1_000)),
            ("alice", "lands-office", Severity::Low, None),
            ("bob", "lands-office", Severity::High, Some(500)),
            ("bob", "water-board", Severity::Medium, Some(250)),
            ("carol", "water-board", Severity::High, None),
        ];
        for (reporter, office, severity, amount) in rows {
            let mut payload = IncidentPayload::new(office, "some-service", severity);
            if let Some(a) = amount {
                payload = payload.with_amount(a);
            }
            store.append(reporter, &payload).unwrap();
        }
    }

    #[test]
    fn aggregate_by_office_counts_and_sums() {
        let (_tmp, store) = test_db();
        populate(&store);

        let summary = store
            .aggregate(&RecordFilter::default(), GroupBy::Office)
            .unwrap();

        assert_eq!(summary.total_count, 5);
        assert_eq!(summary.total_amount_minor, 1_750);

        let lands = summary.buckets.iter().find(|b| b.key == "lands-office").unwrap();
        assert_eq!(lands.count, 3);
        assert_eq!(lands.total_amount_minor, 1_500);

        let water = summary.buckets.iter().find(|b| b.key == "water-board").unwrap();
        assert_eq!(water.count, 2);
        assert_eq!(water.total_amount_minor, 250);
    }

    #[test]
    fn aggregate_by_severity() {
        let (_tmp, store) = test_db();
        populate(&store);

        let summary = store
            .aggregate(&RecordFilter::default(), GroupBy::Severity)
            .unwrap();

        let high = summary.buckets.iter().find(|b| b.key == "high").unwrap();
        assert_eq!(high.count, 3);
        assert_eq!(high.total_amount_minor, 1_500);

        let low = summary.buckets.iter().find(|b| b.key == "low").unwrap();
        assert_eq!(low.count, 1);
        assert_eq!(low.total_amount_minor, 0); // missing amount counts as zero
    }

    #[test]
    fn severity_filter_narrows_aggregate_across_reporters() {
        let (_tmp, store) = test_db();
        populate(&store);

        let summary = store
            .aggregate(
                &RecordFilter {
                    severity: Some(Severity::High),
                    ..Default::default()
                },
                GroupBy::Office,
            )
            .unwrap();

        // Three high-severity records, spread over three reporters.
        assert_eq!(summary.total_count, 3);
    }

    #[test]
    fn time_window_filter_is_half_open() {
        let (_tmp, store) = test_db();
        let record = store
            .append(
                "r1",
                &IncidentPayload::new("office", "service", Severity::Low).with_amount(100),
            )
            .unwrap();
        let t = record.recorded_at_millis;

        let covering = store
            .aggregate(
                &RecordFilter {
                    from_millis: Some(t),
                    to_millis: Some(t + 1),
                    ..Default::default()
                },
                GroupBy::Office,
            )
            .unwrap();
        assert_eq!(covering.total_count, 1);

        // Exclusive end: a window ending exactly at the record excludes it.
        let excluded = store
            .aggregate(
                &RecordFilter {
                    to_millis: Some(t),
                    ..Default::default()
                },
                GroupBy::Office,
            )
            .unwrap();
        assert_eq!(excluded.total_count, 0);
    }

    #[test]
    fn time_buckets_key_by_bucket_start() {
        let (_tmp, store) = test_db();
        let record = store
            .append("r1", &IncidentPayload::new("office", "service", Severity::Low))
            .unwrap();

        let width = 86_400_000; // one day
        let summary = store
            .aggregate(&RecordFilter::default(), GroupBy::TimeBucket { width_millis: width })
            .unwrap();

        assert_eq!(summary.buckets.len(), 1);
        let expected_start = (record.recorded_at_millis / width) * width;
        assert_eq!(summary.buckets[0].key, expected_start.to_string());
    }

    #[test]
    fn non_positive_bucket_width_is_rejected() {
        let (_tmp, store) = test_db();
        let result = store.aggregate(
            &RecordFilter::default(),
            GroupBy::TimeBucket { width_millis: 0 },
        );
        assert!(matches!(result, Err(UwaziError::LedgerError(_))));
    }

    #[test]
    fn aggregate_output_never_names_a_reporter() {
        let (_tmp, store) = test_db();
        populate(&store);

        for group_by in [
            GroupBy::Office,
            GroupBy::Severity,
            GroupBy::TimeBucket { width_millis: 3_600_000 },
        ] {
            let summary = store
                .aggregate(&RecordFilter::default(), group_by)
                .unwrap();
            let json = serde_json::to_string(&summary).unwrap();
            for reporter in ["alice", "bob", "carol", "reporter"] {
                assert!(
                    !json.contains(reporter),
                    "aggregate output leaked '{reporter}': {json}"
                );
            }
        }
    }

    #[test]
    fn empty_ledger_aggregates_to_zero() {
        let (_tmp, store) = test_db();
        let summary = store
            .aggregate(&RecordFilter::default(), GroupBy::Severity)
            .unwrap();
        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.total_amount_minor, 0);
        assert!(summary.buckets.is_empty());
    }
}
