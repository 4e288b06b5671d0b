use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

// Database repository
pub struct AuthRepository {
    pool: PgPool,
}

impl AuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the user row and its empty wallet together; a user without a
    /// wallet cannot take part in any point flow.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> Result<(Uuid, String), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let (id, email): (Uuid, String) = sqlx::query_as(
            r#"
            INSERT INTO users (email, password_hash, full_name)
            VALUES ($1, $2, $3)
            RETURNING id, email
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO wallets (user_id) VALUES ($1)")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((id, email))
    }

    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(Uuid, String, String)>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, email, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn wallet_balance(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (balance,): (i64,) =
            sqlx::query_as("SELECT balance_points FROM wallets WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(balance)
    }

    pub async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn verify_refresh_token(&self, token: &str) -> Result<Option<Uuid>, sqlx::Error> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT u.id
            FROM users u
            INNER JOIN refresh_tokens rt ON rt.user_id = u.id
            WHERE rt.token = $1 AND rt.expires_at > now()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }
}
