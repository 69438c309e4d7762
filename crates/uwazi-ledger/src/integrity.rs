//! Chain verification: replay a reporter's chain and recompute every hash.

use uwazi_types::UwaziError;

use crate::query::ChainOrder;
use crate::record::compute_hash;
use crate::store::IncidentStore;

/// The result of verifying one reporter's hash chain.
///
/// A broken chain is an expected, actionable outcome (possible tampering),
/// so it is reported here as a value rather than raised as an error. Callers
/// must surface an invalid result as an integrity warning and must still
/// display the flagged records.
#[derive(Debug, Clone)]
pub struct ChainVerification {
    /// Whether the entire chain is intact.
    pub valid: bool,
    /// Number of records in the chain, reported even when verification fails.
    pub record_count: usize,
    /// 0-based index of the first record whose hash or chain link is invalid.
    /// Everything from this index forward is considered unverified.
    pub broken_at: Option<usize>,
    /// Human-readable summary of the verification result.
    pub message: String,
}

impl IncidentStore {
    /// Verify the integrity of one reporter's chain.
    ///
    /// Walks the chain oldest-first and checks, for each record:
    /// 1. Its `prev_hash` equals the preceding record's `self_hash`
    ///    (absent for the first record).
    /// 2. Its `self_hash` matches the hash recomputed from its fields.
    ///
    /// Stops at the first mismatch of either. Read-only and lock-free;
    /// an append landing after the read began is simply not seen.
    ///
    /// # Errors
    ///
    /// Returns [`UwaziError::NotFound`] if the reporter has no records.
    pub fn verify_chain(&self, reporter_id: &str) -> Result<ChainVerification, UwaziError> {
        let records = self.query_by_reporter(reporter_id, ChainOrder::Oldest, None)?;

        let record_count = records.len();
        if record_count == 0 {
            return Err(UwaziError::NotFound(format!(
                "no chain exists for reporter '{reporter_id}'"
            )));
        }

        let mut expected_prev: Option<String> = None;

        for (i, record) in records.iter().enumerate() {
            if record.prev_hash != expected_prev {
                return Ok(ChainVerification {
                    valid: false,
                    record_count,
                    broken_at: Some(i),
                    message: format!(
                        "chain broken at record {i}: expected prev_hash {:?}, found {:?}",
                        expected_prev, record.prev_hash
                    ),
                });
            }

            let recomputed = compute_hash(
                record.recorded_at_millis,
                &record.office,
                &record.service,
                record.amount_minor.unwrap_or(0),
                record.prev_hash.as_deref().unwrap_or(""),
            );
            if record.self_hash != recomputed {
                return Ok(ChainVerification {
                    valid: false,
                    record_count,
                    broken_at: Some(i),
                    message: format!(
                        "hash mismatch at record {i}: stored '{}', computed '{recomputed}'",
                        record.self_hash
                    ),
                });
            }

            expected_prev = Some(record.self_hash.clone());
        }

        Ok(ChainVerification {
            valid: true,
            record_count,
            broken_at: None,
            message: format!("all {record_count} records verified successfully"),
        })
    }
}
