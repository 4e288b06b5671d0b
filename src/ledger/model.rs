use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance_points: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    HeldInEscrow,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    /// Gross amount agreed at booking time. Fixed at creation, never mutated
    /// by the ledger.
    pub total_points: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "escrow_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Held,
    Released,
    Refunded,
}

/// A single escrow hold and its outcome. Created as `held`, transitions
/// exactly once to `released` or `refunded` and is terminal thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EscrowTransaction {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub payer_id: Uuid,
    pub payee_id: Uuid,
    /// Net amount payable to the provider, commission already excluded.
    pub amount: i64,
    pub commission: i64,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entry_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    EscrowHold,
    EscrowRelease,
    #[sqlx(rename = "debit-commission")]
    #[serde(rename = "debit-commission")]
    DebitCommission,
    #[sqlx(rename = "credit-refund")]
    #[serde(rename = "credit-refund")]
    CreditRefund,
    TopUp,
    TransferIn,
    TransferOut,
}

/// Append-only record of a point movement, kept for display and audit. The
/// wallet balance stays authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub amount: i64,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TransactionLogEntry {
    pub fn new(user_id: Uuid, entry_type: EntryType, amount: i64, booking_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            entry_type,
            amount,
            booking_id,
            created_at: Utc::now(),
        }
    }
}
