use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::LedgerError;

pub mod model;
pub mod store;

#[cfg(test)]
mod memory;
#[cfg(test)]
mod tests;

use model::{
    BookingStatus, EntryType, EscrowStatus, EscrowTransaction, PaymentStatus, TransactionLogEntry,
};
use store::{BookingStore, EscrowTransactionStore, TransactionLog, WalletStore};

/// Platform cut withheld from the payee on release, in percent.
pub const COMMISSION_RATE_PERCENT: i64 = 5;

/// Commission on a gross amount, rounded half-up to the nearest whole point.
pub fn commission_for(amount_total: i64) -> i64 {
    (amount_total * COMMISSION_RATE_PERCENT + 50) / 100
}

/// The escrow ledger: hold, release and refund of a booking's points, plus
/// the bookkeeping around them (wallet mutation + transaction log).
///
/// Operations run against injected stores so the HTTP service wires in the
/// Postgres implementations and tests substitute an in-memory fake. Each
/// operation performs its serialization-point write before any wallet credit;
/// a write that fails after that point surfaces as `ReconciliationRequired`
/// instead of being silently compensated.
pub struct EscrowLedger {
    wallets: Arc<dyn WalletStore>,
    bookings: Arc<dyn BookingStore>,
    escrows: Arc<dyn EscrowTransactionStore>,
    log: Arc<dyn TransactionLog>,
}

impl EscrowLedger {
    pub fn new(
        wallets: Arc<dyn WalletStore>,
        bookings: Arc<dyn BookingStore>,
        escrows: Arc<dyn EscrowTransactionStore>,
        log: Arc<dyn TransactionLog>,
    ) -> Self {
        Self {
            wallets,
            bookings,
            escrows,
            log,
        }
    }

    /// Reserves the gross amount from the payer's wallet against a booking.
    ///
    /// The booking must still be awaiting payment and must not already carry
    /// a hold. On success the payer is debited `amount_total`, a `held`
    /// escrow transaction exists with the net/commission split, and the
    /// booking moves to (confirmed, held_in_escrow).
    pub async fn create_hold(
        &self,
        booking_id: Uuid,
        payer_id: Uuid,
        payee_id: Uuid,
        amount_total: i64,
    ) -> Result<EscrowTransaction, LedgerError> {
        if amount_total <= 0 {
            return Err(LedgerError::invalid_state("hold amount must be positive"));
        }
        if payer_id == payee_id {
            return Err(LedgerError::invalid_state("payer and payee must differ"));
        }

        let booking = self.bookings.get(booking_id).await?;
        if booking.payment_status != PaymentStatus::Pending {
            return Err(LedgerError::invalid_state(format!(
                "booking {booking_id} payment was already processed"
            )));
        }
        if self.escrows.find_held(booking_id).await?.is_some() {
            return Err(LedgerError::invalid_state(format!(
                "booking {booking_id} already has a hold"
            )));
        }

        let commission = commission_for(amount_total);
        let net_amount = amount_total - commission;

        // Debit the gross amount before creating any row: an insufficient
        // balance must fail without leaving a stranded hold behind.
        self.wallets.decrement(payer_id, amount_total).await?;

        let escrow = self
            .escrows
            .insert(EscrowTransaction {
                id: Uuid::new_v4(),
                booking_id,
                payer_id,
                payee_id,
                amount: net_amount,
                commission,
                status: EscrowStatus::Held,
                created_at: Utc::now(),
                released_at: None,
            })
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "inserting hold after debit", err))?;

        self.log
            .append(TransactionLogEntry::new(
                payer_id,
                EntryType::EscrowHold,
                amount_total,
                Some(booking_id),
            ))
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "recording hold entry", err))?;

        self.bookings
            .update_status(booking_id, BookingStatus::Confirmed, PaymentStatus::HeldInEscrow)
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "confirming booking", err))?;

        tracing::info!(
            "escrow hold created for booking {booking_id}: {amount_total} points ({commission} commission)"
        );
        Ok(escrow)
    }

    /// Releases a held payment to the payee, minus commission.
    ///
    /// The commission is captured by withholding: it is never credited to the
    /// payee and never moved to another wallet, only recorded as an
    /// informational ledger line. Calling this on an already-settled booking
    /// fails with `InvalidState`; racing calls settle exactly once.
    pub async fn release_escrow(&self, booking_id: Uuid) -> Result<(), LedgerError> {
        let escrow = self.require_held(booking_id).await?;

        let settled = self
            .escrows
            .conditional_transition(escrow.id, EscrowStatus::Held, EscrowStatus::Released)
            .await?;
        if !settled {
            return Err(LedgerError::invalid_state(format!(
                "escrow for booking {booking_id} was already settled"
            )));
        }

        self.wallets
            .increment(escrow.payee_id, escrow.amount)
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "crediting payee after release", err))?;

        self.log
            .append(TransactionLogEntry::new(
                escrow.payee_id,
                EntryType::EscrowRelease,
                escrow.amount,
                Some(booking_id),
            ))
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "recording release entry", err))?;
        self.log
            .append(TransactionLogEntry::new(
                escrow.payee_id,
                EntryType::DebitCommission,
                escrow.commission,
                Some(booking_id),
            ))
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "recording commission entry", err))?;

        self.bookings
            .update_status(booking_id, BookingStatus::Completed, PaymentStatus::Paid)
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "completing booking", err))?;

        tracing::info!(
            "escrow released for booking {booking_id}: {} points to payee, {} withheld",
            escrow.amount,
            escrow.commission
        );
        Ok(())
    }

    /// Returns a held payment to the payer in full.
    ///
    /// The refund is gross: net amount plus commission, since the commission
    /// was withheld rather than moved and the payer originally paid both.
    pub async fn refund_escrow(&self, booking_id: Uuid) -> Result<(), LedgerError> {
        let escrow = self.require_held(booking_id).await?;
        let total_refund = escrow.amount + escrow.commission;

        let settled = self
            .escrows
            .conditional_transition(escrow.id, EscrowStatus::Held, EscrowStatus::Refunded)
            .await?;
        if !settled {
            return Err(LedgerError::invalid_state(format!(
                "escrow for booking {booking_id} was already settled"
            )));
        }

        self.wallets
            .increment(escrow.payer_id, total_refund)
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "crediting payer after refund", err))?;

        self.log
            .append(TransactionLogEntry::new(
                escrow.payer_id,
                EntryType::CreditRefund,
                total_refund,
                Some(booking_id),
            ))
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "recording refund entry", err))?;

        self.bookings
            .update_status(booking_id, BookingStatus::Cancelled, PaymentStatus::Refunded)
            .await
            .map_err(|err| LedgerError::reconciliation(booking_id, "cancelling booking", err))?;

        tracing::info!("escrow refunded for booking {booking_id}: {total_refund} points to payer");
        Ok(())
    }

    // Distinguishes "already settled" (InvalidState) from "never held"
    // (NotFound) when no held transaction exists.
    async fn require_held(&self, booking_id: Uuid) -> Result<EscrowTransaction, LedgerError> {
        if let Some(escrow) = self.escrows.find_held(booking_id).await? {
            return Ok(escrow);
        }
        let booking = self.bookings.get(booking_id).await?;
        match booking.payment_status {
            PaymentStatus::Paid | PaymentStatus::Refunded => Err(LedgerError::invalid_state(
                format!("booking {booking_id} was already settled"),
            )),
            _ => Err(LedgerError::NotFound("held escrow transaction")),
        }
    }
}
