//! IncidentRecord: a single hash-chained incident report.
//!
//! Each record links to the previous record in its reporter's chain via
//! `prev_hash`, forming a per-reporter tamper-evident chain.

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use uwazi_types::{GeoPoint, IncidentPayload, Severity};

/// One persisted incident report in a reporter's chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentRecord {
    pub record_id: Uuid,
    pub reporter_id: String,
    /// Server-assigned write timestamp, epoch milliseconds.
    pub recorded_at_millis: i64,
    pub office: String,
    pub service: String,
    pub amount_minor: Option<i64>,
    pub severity: Severity,
    pub note: Option<String>,
    pub location: Option<GeoPoint>,
    /// Hash of the preceding record in this reporter's chain; `None` for
    /// the chain's first record.
    pub prev_hash: Option<String>,
    /// `compute_hash` over this record's hashed fields and `prev_hash`.
    pub self_hash: String,
}

impl IncidentRecord {
    /// Build a new record extending `prev_hash`, stamping the write time now.
    pub fn new(reporter_id: &str, payload: &IncidentPayload, prev_hash: Option<String>) -> Self {
        let recorded_at_millis = Utc::now().timestamp_millis();
        let self_hash = compute_hash(
            recorded_at_millis,
            &payload.office,
            &payload.service,
            payload.amount_minor.unwrap_or(0),
            prev_hash.as_deref().unwrap_or(""),
        );

        Self {
            record_id: Uuid::new_v4(),
            reporter_id: reporter_id.to_string(),
            recorded_at_millis,
            office: payload.office.clone(),
            service: payload.service.clone(),
            amount_minor: payload.amount_minor,
            severity: payload.severity,
            note: payload.note.clone(),
            location: payload.location.clone(),
            prev_hash,
            self_hash,
        }
    }

    /// Recompute this record's hash from its stored fields.
    ///
    /// Compare the result against `self.self_hash` to detect tampering.
    pub fn recompute_hash(&self) -> String {
        compute_hash(
            self.recorded_at_millis,
            &self.office,
            &self.service,
            self.amount_minor.unwrap_or(0),
            self.prev_hash.as_deref().unwrap_or(""),
        )
    }
}

/// Compute the content hash committing a record to its predecessor.
///
/// SHA-256 over the canonical field order
/// `{timestamp, office, service, amount, prev_hash}`, hex-encoded. A missing
/// amount hashes as `0` and an absent previous hash as the empty string, so
/// the serialization stays stable across optional fields. Fields are joined
/// with a `|` separator so adjacent string fields cannot alias each other.
///
/// The free-text note and geolocation are deliberately outside the hashed
/// set; the chain commits to the fields the aggregation layer reports on.
pub(crate) fn compute_hash(
    recorded_at_millis: i64,
    office: &str,
    service: &str,
    amount_minor: i64,
    prev_hash: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(recorded_at_millis.to_string());
    hasher.update("|");
    hasher.update(office);
    hasher.update("|");
    hasher.update(service);
    hasher.update("|");
    hasher.update(amount_minor.to_string());
    hasher.update("|");
    hasher.update(prev_hash);
    hex::encode(hasher.finalize())
}
