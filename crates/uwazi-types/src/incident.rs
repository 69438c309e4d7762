//! Incident payload types submitted by citizen reporters.
//!
//! Payloads arrive pre-validated from the request handlers: numeric amounts,
//! enum severities, well-formed coordinates. The ledger core takes them as
//! given and never performs its own input validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UwaziError;

/// Severity of a reported incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Severity {
    type Err = UwaziError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(UwaziError::LedgerError(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

/// Where an incident took place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
            ward: None,
            district: None,
        }
    }
}

/// The reporter-supplied fields of an incident report.
///
/// The write timestamp is not part of the payload: it is assigned by the
/// ledger at append time so that forged client timestamps cannot feed into
/// chain ordering or the content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentPayload {
    /// The government office the incident concerns.
    pub office: String,
    /// The service being sought when the incident occurred.
    pub service: String,
    /// Amount involved, in minor currency units (e.g. cents), if any.
    pub amount_minor: Option<i64>,
    pub severity: Severity,
    /// Free-text description, if the reporter provided one.
    pub note: Option<String>,
    pub location: Option<GeoPoint>,
}

impl IncidentPayload {
    pub fn new(
        office: impl Into<String>,
        service: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            office: office.into(),
            service: service.into(),
            amount_minor: None,
            severity,
            note: None,
            location: None,
        }
    }

    pub fn with_amount(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}
