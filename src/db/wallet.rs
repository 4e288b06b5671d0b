use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger::store::WalletStore;

pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn decrement(&self, user_id: Uuid, amount: i64) -> Result<(), LedgerError> {
        // single conditional statement, the balance check and the debit are
        // one atomic unit at the store
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance_points = balance_points - $1, updated_at = now()
            WHERE user_id = $2 AND balance_points >= $1
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::InsufficientBalance);
        }
        Ok(())
    }

    async fn increment(&self, user_id: Uuid, amount: i64) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance_points = balance_points + $1, updated_at = now()
            WHERE user_id = $2
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("wallet"));
        }
        Ok(())
    }
}
