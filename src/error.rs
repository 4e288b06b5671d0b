use uuid::Uuid;

/// Errors surfaced by the escrow ledger and its stores.
///
/// Every ledger operation either fully succeeds or fails with one of these
/// without mutating anything, except `ReconciliationRequired` which marks a
/// partial write that needs out-of-band repair.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Booking, wallet or held escrow transaction does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Operation attempted from a state that does not permit it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Payer's wallet cannot cover the requested amount.
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Transient infrastructure error from the underlying store. Safe to
    /// retry from the caller, the ledger itself never retries.
    #[error("store failure: {0}")]
    StoreFailure(String),

    /// A write failed after the operation's serialization point, so the
    /// stores may disagree with each other. Not retryable; an operator or
    /// reconciliation job has to repair the booking.
    #[error("reconciliation required for booking {booking_id}: {detail}")]
    ReconciliationRequired { booking_id: Uuid, detail: String },
}

impl LedgerError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        LedgerError::InvalidState(msg.into())
    }

    pub fn reconciliation(booking_id: Uuid, step: &str, source: LedgerError) -> Self {
        LedgerError::ReconciliationRequired {
            booking_id,
            detail: format!("{step}: {source}"),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::StoreFailure(err.to_string())
    }
}
