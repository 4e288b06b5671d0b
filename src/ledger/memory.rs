//! In-memory implementation of the store traits for ledger tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::LedgerError;

use super::model::{
    Booking, BookingStatus, EscrowStatus, EscrowTransaction, PaymentStatus, TransactionLogEntry,
};
use super::store::{BookingStore, EscrowTransactionStore, TransactionLog, WalletStore};

#[derive(Default)]
struct State {
    wallets: HashMap<Uuid, i64>,
    bookings: HashMap<Uuid, Booking>,
    escrows: HashMap<Uuid, EscrowTransaction>,
    log: Vec<TransactionLogEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_log_appends: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_wallet(&self, user_id: Uuid, balance_points: i64) {
        self.state.lock().unwrap().wallets.insert(user_id, balance_points);
    }

    pub fn put_booking(&self, booking: Booking) {
        self.state.lock().unwrap().bookings.insert(booking.id, booking);
    }

    pub fn balance(&self, user_id: Uuid) -> i64 {
        self.state.lock().unwrap().wallets[&user_id]
    }

    pub fn booking(&self, booking_id: Uuid) -> Booking {
        self.state.lock().unwrap().bookings[&booking_id].clone()
    }

    pub fn escrow_for_booking(&self, booking_id: Uuid) -> Option<EscrowTransaction> {
        self.state
            .lock()
            .unwrap()
            .escrows
            .values()
            .find(|tx| tx.booking_id == booking_id)
            .cloned()
    }

    pub fn entries_for(&self, user_id: Uuid) -> Vec<TransactionLogEntry> {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Makes subsequent log appends fail, to exercise the partial-failure
    /// path behind `ReconciliationRequired`.
    pub fn fail_log_appends(&self, fail: bool) {
        self.fail_log_appends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn decrement(&self, user_id: Uuid, amount: i64) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        let balance = state
            .wallets
            .get_mut(&user_id)
            .ok_or(LedgerError::NotFound("wallet"))?;
        if *balance < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        *balance -= amount;
        Ok(())
    }

    async fn increment(&self, user_id: Uuid, amount: i64) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        let balance = state
            .wallets
            .get_mut(&user_id)
            .ok_or(LedgerError::NotFound("wallet"))?;
        *balance += amount;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn get(&self, booking_id: Uuid) -> Result<Booking, LedgerError> {
        self.state
            .lock()
            .unwrap()
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(LedgerError::NotFound("booking"))
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or(LedgerError::NotFound("booking"))?;
        booking.status = status;
        booking.payment_status = payment_status;
        booking.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl EscrowTransactionStore for MemoryStore {
    async fn insert(&self, tx: EscrowTransaction) -> Result<EscrowTransaction, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let duplicate = state
            .escrows
            .values()
            .any(|held| held.booking_id == tx.booking_id && held.status == EscrowStatus::Held);
        if duplicate {
            return Err(LedgerError::invalid_state(format!(
                "booking {} already has a hold",
                tx.booking_id
            )));
        }
        state.escrows.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn find_held(&self, booking_id: Uuid) -> Result<Option<EscrowTransaction>, LedgerError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .escrows
            .values()
            .find(|tx| tx.booking_id == booking_id && tx.status == EscrowStatus::Held)
            .cloned())
    }

    async fn conditional_transition(
        &self,
        tx_id: Uuid,
        from: EscrowStatus,
        to: EscrowStatus,
    ) -> Result<bool, LedgerError> {
        let mut state = self.state.lock().unwrap();
        match state.escrows.get_mut(&tx_id) {
            Some(tx) if tx.status == from => {
                tx.status = to;
                tx.released_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TransactionLog for MemoryStore {
    async fn append(&self, entry: TransactionLogEntry) -> Result<(), LedgerError> {
        if self.fail_log_appends.load(Ordering::SeqCst) {
            return Err(LedgerError::StoreFailure("log append rejected".to_string()));
        }
        self.state.lock().unwrap().log.push(entry);
        Ok(())
    }
}
