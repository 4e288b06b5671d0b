use async_trait::async_trait;
use uuid::Uuid;

use crate::error::LedgerError;

use super::model::{
    Booking, BookingStatus, EscrowStatus, EscrowTransaction, PaymentStatus, TransactionLogEntry,
};

/// Per-user point balances. Both mutations must be atomic at the store level
/// (a conditional `UPDATE`, not read-modify-write) so concurrent flows
/// touching the same wallet never lose updates.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Fails with `InsufficientBalance` if the resulting balance would go
    /// negative; in that case the balance is untouched.
    async fn decrement(&self, user_id: Uuid, amount: i64) -> Result<(), LedgerError>;

    async fn increment(&self, user_id: Uuid, amount: i64) -> Result<(), LedgerError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get(&self, booking_id: Uuid) -> Result<Booking, LedgerError>;

    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<(), LedgerError>;
}

#[async_trait]
pub trait EscrowTransactionStore: Send + Sync {
    /// Persists a new hold. The store enforces that at most one `held` row
    /// exists per booking; inserting a second is an error.
    async fn insert(&self, tx: EscrowTransaction) -> Result<EscrowTransaction, LedgerError>;

    async fn find_held(&self, booking_id: Uuid) -> Result<Option<EscrowTransaction>, LedgerError>;

    /// Compare-and-swap on the status column: moves `tx_id` from `from` to
    /// `to` (stamping `released_at`) and returns whether the swap happened.
    /// This is the serialization point for release and refund.
    async fn conditional_transition(
        &self,
        tx_id: Uuid,
        from: EscrowStatus,
        to: EscrowStatus,
    ) -> Result<bool, LedgerError>;
}

#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn append(&self, entry: TransactionLogEntry) -> Result<(), LedgerError>;
}
