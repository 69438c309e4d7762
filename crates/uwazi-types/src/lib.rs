//! Core types shared across the Uwazi crates.
//!
//! Defines the incident payload, severity scale, geolocation, and error
//! types used by the incident ledger and the request handlers that call it.

pub mod error;
pub mod incident;

pub use error::UwaziError;
pub use incident::{GeoPoint, IncidentPayload, Severity};
