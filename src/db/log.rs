use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::LedgerError;
use crate::ledger::model::TransactionLogEntry;
use crate::ledger::store::TransactionLog;

pub struct PgTransactionLog {
    pool: PgPool,
}

impl PgTransactionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionLog for PgTransactionLog {
    async fn append(&self, entry: TransactionLogEntry) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, entry_type, amount, booking_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.entry_type)
        .bind(entry.amount)
        .bind(entry.booking_id)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
