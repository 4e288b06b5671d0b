use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger::model::{Booking, BookingStatus, PaymentStatus};
use crate::ledger::store::BookingStore;

pub const BOOKING_COLUMNS: &str = "id, listing_id, client_id, provider_id, total_points, status, payment_status, created_at, updated_at";

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn get(&self, booking_id: Uuid) -> Result<Booking, LedgerError> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, Booking>(&query)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound("booking"))
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2, payment_status = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .bind(status)
        .bind(payment_status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("booking"));
        }
        Ok(())
    }
}
