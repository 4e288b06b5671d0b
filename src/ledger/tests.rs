use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::LedgerError;

use super::memory::MemoryStore;
use super::model::{Booking, BookingStatus, EntryType, EscrowStatus, PaymentStatus};
use super::{commission_for, EscrowLedger};

fn ledger_over(store: &Arc<MemoryStore>) -> EscrowLedger {
    EscrowLedger::new(store.clone(), store.clone(), store.clone(), store.clone())
}

fn pending_booking(client_id: Uuid, provider_id: Uuid, total_points: i64) -> Booking {
    let now = Utc::now();
    Booking {
        id: Uuid::new_v4(),
        listing_id: Uuid::new_v4(),
        client_id,
        provider_id,
        total_points,
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

struct Scenario {
    store: Arc<MemoryStore>,
    ledger: EscrowLedger,
    client: Uuid,
    provider: Uuid,
    booking_id: Uuid,
}

fn scenario(client_balance: i64, provider_balance: i64, total_points: i64) -> Scenario {
    let store = Arc::new(MemoryStore::new());
    let client = Uuid::new_v4();
    let provider = Uuid::new_v4();
    store.put_wallet(client, client_balance);
    store.put_wallet(provider, provider_balance);
    let booking = pending_booking(client, provider, total_points);
    let booking_id = booking.id;
    store.put_booking(booking);
    Scenario {
        ledger: ledger_over(&store),
        store,
        client,
        provider,
        booking_id,
    }
}

#[test]
fn commission_rounds_half_up() {
    assert_eq!(commission_for(101), 5); // 5.05 rounds down
    assert_eq!(commission_for(10), 1); // 0.5 rounds up
    assert_eq!(commission_for(30), 2); // 1.5 rounds up
    assert_eq!(commission_for(50), 3); // 2.5 rounds up
    assert_eq!(commission_for(200), 10);
    assert_eq!(commission_for(1), 0);
    assert_eq!(commission_for(0), 0);
}

#[tokio::test]
async fn hold_debits_gross_and_confirms_booking() {
    let s = scenario(500, 0, 200);

    let escrow = s
        .ledger
        .create_hold(s.booking_id, s.client, s.provider, 200)
        .await
        .unwrap();

    assert_eq!(escrow.amount, 190);
    assert_eq!(escrow.commission, 10);
    assert_eq!(escrow.status, EscrowStatus::Held);
    assert_eq!(s.store.balance(s.client), 300);
    assert_eq!(s.store.balance(s.provider), 0);

    let booking = s.store.booking(s.booking_id);
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::HeldInEscrow);

    let entries = s.store.entries_for(s.client);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, EntryType::EscrowHold);
    assert_eq!(entries[0].amount, 200);
    assert_eq!(entries[0].booking_id, Some(s.booking_id));
}

#[tokio::test]
async fn insufficient_balance_mutates_nothing() {
    let s = scenario(50, 0, 100);

    let err = s
        .ledger
        .create_hold(s.booking_id, s.client, s.provider, 100)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientBalance));
    assert_eq!(s.store.balance(s.client), 50);
    assert!(s.store.escrow_for_booking(s.booking_id).is_none());
    let booking = s.store.booking(s.booking_id);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert!(s.store.entries_for(s.client).is_empty());
}

#[tokio::test]
async fn second_hold_is_rejected() {
    let s = scenario(1000, 0, 200);
    s.ledger
        .create_hold(s.booking_id, s.client, s.provider, 200)
        .await
        .unwrap();

    let err = s
        .ledger
        .create_hold(s.booking_id, s.client, s.provider, 200)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(s.store.balance(s.client), 800); // debited once
}

#[tokio::test]
async fn hold_rejects_bad_arguments() {
    let s = scenario(500, 0, 200);

    let err = s
        .ledger
        .create_hold(s.booking_id, s.client, s.provider, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));

    let err = s
        .ledger
        .create_hold(s.booking_id, s.client, s.client, 200)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));

    let err = s
        .ledger
        .create_hold(Uuid::new_v4(), s.client, s.provider, 200)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));

    assert_eq!(s.store.balance(s.client), 500);
}

#[tokio::test]
async fn release_credits_net_and_completes_booking() {
    let s = scenario(500, 0, 200);
    s.ledger
        .create_hold(s.booking_id, s.client, s.provider, 200)
        .await
        .unwrap();

    s.ledger.release_escrow(s.booking_id).await.unwrap();

    assert_eq!(s.store.balance(s.provider), 190);
    assert_eq!(s.store.balance(s.client), 300);

    let escrow = s.store.escrow_for_booking(s.booking_id).unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);
    assert!(escrow.released_at.is_some());

    let booking = s.store.booking(s.booking_id);
    assert_eq!(booking.status, BookingStatus::Completed);
    assert_eq!(booking.payment_status, PaymentStatus::Paid);

    // net credit plus the informational commission line, both on the payee
    let entries = s.store.entries_for(s.provider);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].entry_type, EntryType::EscrowRelease);
    assert_eq!(entries[0].amount, 190);
    assert_eq!(entries[1].entry_type, EntryType::DebitCommission);
    assert_eq!(entries[1].amount, 10);
}

#[tokio::test]
async fn release_twice_credits_once() {
    let s = scenario(500, 0, 200);
    s.ledger
        .create_hold(s.booking_id, s.client, s.provider, 200)
        .await
        .unwrap();

    s.ledger.release_escrow(s.booking_id).await.unwrap();
    let err = s.ledger.release_escrow(s.booking_id).await.unwrap_err();

    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(s.store.balance(s.provider), 190);
}

#[tokio::test]
async fn refund_restores_payer_balance_exactly() {
    let s = scenario(1000, 0, 200);
    s.ledger
        .create_hold(s.booking_id, s.client, s.provider, 200)
        .await
        .unwrap();
    assert_eq!(s.store.balance(s.client), 800);

    s.ledger.refund_escrow(s.booking_id).await.unwrap();

    assert_eq!(s.store.balance(s.client), 1000);
    assert_eq!(s.store.balance(s.provider), 0);

    let escrow = s.store.escrow_for_booking(s.booking_id).unwrap();
    assert_eq!(escrow.status, EscrowStatus::Refunded);

    let booking = s.store.booking(s.booking_id);
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.payment_status, PaymentStatus::Refunded);

    let entries = s.store.entries_for(s.client);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].entry_type, EntryType::CreditRefund);
    assert_eq!(entries[1].amount, 200); // gross, commission included
}

#[tokio::test]
async fn refund_after_release_is_rejected() {
    let s = scenario(500, 0, 200);
    s.ledger
        .create_hold(s.booking_id, s.client, s.provider, 200)
        .await
        .unwrap();
    s.ledger.release_escrow(s.booking_id).await.unwrap();

    let err = s.ledger.refund_escrow(s.booking_id).await.unwrap_err();

    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(s.store.balance(s.client), 300);
    assert_eq!(s.store.balance(s.provider), 190);
}

#[tokio::test]
async fn refund_without_hold_is_not_found() {
    let s = scenario(500, 0, 200);
    let err = s.ledger.refund_escrow(s.booking_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_releases_settle_exactly_once() {
    let s = scenario(500, 0, 200);
    s.ledger
        .create_hold(s.booking_id, s.client, s.provider, 200)
        .await
        .unwrap();

    let ledger = Arc::new(s.ledger);
    let handles: Vec<_> = (0..100)
        .map(|_| {
            let ledger = ledger.clone();
            let booking_id = s.booking_id;
            tokio::spawn(async move { ledger.release_escrow(booking_id).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut invalid = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(()) => succeeded += 1,
            Err(LedgerError::InvalidState(_)) => invalid += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(invalid, 99);
    assert_eq!(s.store.balance(s.provider), 190);
}

#[tokio::test]
async fn failure_after_serialization_point_is_flagged() {
    let s = scenario(500, 0, 200);
    s.ledger
        .create_hold(s.booking_id, s.client, s.provider, 200)
        .await
        .unwrap();

    s.store.fail_log_appends(true);
    let err = s.ledger.release_escrow(s.booking_id).await.unwrap_err();

    assert!(matches!(err, LedgerError::ReconciliationRequired { booking_id, .. } if booking_id == s.booking_id));
    // the credit before the failed append stays visible, flagged not reversed
    assert_eq!(s.store.balance(s.provider), 190);
    let escrow = s.store.escrow_for_booking(s.booking_id).unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);
    // booking never advanced, which is what the repair job keys off
    let booking = s.store.booking(s.booking_id);
    assert_eq!(booking.payment_status, PaymentStatus::HeldInEscrow);
}
