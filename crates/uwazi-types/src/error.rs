//! Error types shared across the Uwazi crates.

/// Errors that can occur in the incident ledger core.
///
/// A broken hash chain is deliberately *not* represented here: chain breaks
/// are an expected, actionable verification outcome and are reported through
/// `ChainVerification`, never raised as an error.
#[derive(Debug, thiserror::Error)]
pub enum UwaziError {
    /// The storage collaborator failed or is unreachable. Propagated
    /// unchanged; retry policy belongs to the caller.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An internal ledger invariant failed (e.g. a persisted row that can
    /// no longer be decoded).
    #[error("incident ledger error: {0}")]
    LedgerError(String),

    /// The referenced reporter or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A concurrent append to the same reporter's chain won the tail race.
    /// Recoverable by re-reading the tail and retrying.
    #[error("concurrent append conflict for reporter '{0}'")]
    AppendConflict(String),
}
