//! Error types for the reconciliation read/compute path.
//!
//! The rule from the accounting side: a report is either complete or it does
//! not exist. Any failure while loading the shift ledger aborts the whole
//! computation; a partially aggregated report is never returned.

use thiserror::Error;

/// Fatal errors raised while loading or reconciling a shift ledger.
///
/// "Shift not found" is deliberately *not* a variant — an unknown shift id is
/// a defined empty result (`Ok(None)`), not a failure.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Underlying SQLite failure during one of the ledger reads.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// The shared connection mutex was poisoned by a panicking holder.
    #[error("database connection lock poisoned")]
    LockPoisoned,

    /// A stored value could not be interpreted (unknown order status,
    /// discount type, or cash transaction type). Treated the same as a fetch
    /// failure: the ledger snapshot is unusable.
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}
