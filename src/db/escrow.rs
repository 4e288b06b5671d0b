use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger::model::{EscrowStatus, EscrowTransaction};
use crate::ledger::store::EscrowTransactionStore;

const ESCROW_COLUMNS: &str =
    "id, booking_id, payer_id, payee_id, amount, commission, status, created_at, released_at";

pub struct PgEscrowStore {
    pool: PgPool,
}

impl PgEscrowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EscrowTransactionStore for PgEscrowStore {
    async fn insert(&self, tx: EscrowTransaction) -> Result<EscrowTransaction, LedgerError> {
        let query = format!(
            r#"
            INSERT INTO escrow_transactions ({ESCROW_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ESCROW_COLUMNS}
            "#
        );
        sqlx::query_as::<_, EscrowTransaction>(&query)
            .bind(tx.id)
            .bind(tx.booking_id)
            .bind(tx.payer_id)
            .bind(tx.payee_id)
            .bind(tx.amount)
            .bind(tx.commission)
            .bind(tx.status)
            .bind(tx.created_at)
            .bind(tx.released_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                // the partial unique index backs the one-hold-per-booking rule
                if err
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation())
                {
                    LedgerError::invalid_state(format!(
                        "booking {} already has a hold",
                        tx.booking_id
                    ))
                } else {
                    err.into()
                }
            })
    }

    async fn find_held(&self, booking_id: Uuid) -> Result<Option<EscrowTransaction>, LedgerError> {
        let query = format!(
            "SELECT {ESCROW_COLUMNS} FROM escrow_transactions WHERE booking_id = $1 AND status = $2"
        );
        Ok(sqlx::query_as::<_, EscrowTransaction>(&query)
            .bind(booking_id)
            .bind(EscrowStatus::Held)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn conditional_transition(
        &self,
        tx_id: Uuid,
        from: EscrowStatus,
        to: EscrowStatus,
    ) -> Result<bool, LedgerError> {
        let result = sqlx::query(
            r#"
            UPDATE escrow_transactions
            SET status = $3, released_at = now()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(tx_id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
