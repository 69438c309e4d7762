//! Tamper-evident incident ledger.
//!
//! Each reporter owns an append-only chain of incident records. Every record
//! commits to its predecessor through `prev_hash`, so later insertion,
//! deletion, or retroactive edits anywhere in the middle of a chain are
//! detectable by replaying the hashes. The aggregation surface built on top
//! of the same store exposes only anonymized counts and sums.

pub mod aggregate;
pub mod filter;
pub mod integrity;
pub mod query;
pub mod record;
pub mod store;

pub use aggregate::{AggregateBucket, AggregateSummary, GroupBy};
pub use filter::RecordFilter;
pub use integrity::ChainVerification;
pub use query::ChainOrder;
pub use record::IncidentRecord;
pub use store::IncidentStore;
