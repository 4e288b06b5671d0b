use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{sse::Event, IntoResponse, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::Deserialize;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::ledger::model::{EntryType, TransactionLogEntry, Wallet};

use super::{auth::AuthService, utils::validate_auth_token};

// Transfers and top-ups live outside the escrow ledger, but they share its
// discipline: wallet mutations are conditional single statements and every
// movement leaves a log entry.

#[derive(Debug, Deserialize)]
pub struct TopUp {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct Transfer {
    pub receiver_id: Uuid,
    pub amount: i64,
}

async fn get_wallet(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token"));
        }
    };

    match sqlx::query_as::<_, Wallet>(
        "SELECT user_id, balance_points, updated_at FROM wallets WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    {
        Ok(Some(wallet)) => Ok((StatusCode::OK, Json(wallet))),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Wallet not found")),
        Err(err) => {
            tracing::error!("Failed to load wallet for {user_id}: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to load wallet"))
        }
    }
}

async fn top_up(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Json(payload): Json<TopUp>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token"));
        }
    };

    if payload.amount <= 0 {
        return Err((StatusCode::BAD_REQUEST, "Amount must be positive"));
    }

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!("Failed to start transaction: {err}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to add points"));
        }
    };

    let credited = sqlx::query_as::<_, (i64,)>(
        r#"
        UPDATE wallets SET balance_points = balance_points + $1, updated_at = now()
        WHERE user_id = $2
        RETURNING balance_points
        "#,
    )
    .bind(payload.amount)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await;

    let balance = match credited {
        Ok(Some((balance,))) => balance,
        Ok(None) => return Err((StatusCode::NOT_FOUND, "Wallet not found")),
        Err(err) => {
            tracing::error!("Failed to top up wallet for {user_id}: {err}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to add points"));
        }
    };

    let entry = TransactionLogEntry::new(user_id, EntryType::TopUp, payload.amount, None);
    if let Err(err) = append_entry(&mut *tx, &entry).await {
        tracing::error!("Failed to record top up for {user_id}: {err}");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to add points"));
    }

    match tx.commit().await {
        Ok(_) => {
            tracing::info!("Wallet topped up for user {user_id}. New balance: {balance}");
            Ok((
                StatusCode::OK,
                format!("Points added successfully. New balance: {balance}"),
            ))
        }
        Err(err) => {
            tracing::error!("Failed to commit top up: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to add points"))
        }
    }
}

async fn transfer(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Json(payload): Json<Transfer>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    tracing::info!("Starting point transfer");

    let sender_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            tracing::error!("Invalid token: {err}");
            return Err((err, "Invalid token"));
        }
    };

    if payload.amount <= 0 {
        return Err((StatusCode::BAD_REQUEST, "Amount must be positive"));
    }
    if payload.receiver_id == sender_id {
        return Err((StatusCode::BAD_REQUEST, "Cannot transfer to yourself"));
    }

    // Begin a database transaction
    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!("Failed to start transaction: {err}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to transfer points"));
        }
    };

    // Deduct points from sender, conditional on a sufficient balance
    let debited = sqlx::query(
        r#"
        UPDATE wallets SET balance_points = balance_points - $1, updated_at = now()
        WHERE user_id = $2 AND balance_points >= $1
        "#,
    )
    .bind(payload.amount)
    .bind(sender_id)
    .execute(&mut *tx)
    .await;

    match debited {
        Ok(result) if result.rows_affected() == 1 => {}
        Ok(_) => {
            tracing::warn!("Transfer rejected for {sender_id}: insufficient balance");
            return Err((StatusCode::BAD_REQUEST, "Insufficient balance"));
        }
        Err(err) => {
            tracing::error!("Failed to debit sender: {err}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to transfer points"));
        }
    }

    // Add points to receiver
    let credited = sqlx::query(
        r#"
        UPDATE wallets SET balance_points = balance_points + $1, updated_at = now()
        WHERE user_id = $2
        "#,
    )
    .bind(payload.amount)
    .bind(payload.receiver_id)
    .execute(&mut *tx)
    .await;

    match credited {
        Ok(result) if result.rows_affected() == 1 => {}
        Ok(_) => return Err((StatusCode::NOT_FOUND, "Receiver wallet not found")),
        Err(err) => {
            tracing::error!("Failed to credit receiver: {err}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to transfer points"));
        }
    }

    // Paired log entries for both sides of the movement
    let out_entry =
        TransactionLogEntry::new(sender_id, EntryType::TransferOut, payload.amount, None);
    let in_entry = TransactionLogEntry::new(
        payload.receiver_id,
        EntryType::TransferIn,
        payload.amount,
        None,
    );
    let log_out = append_entry(&mut *tx, &out_entry).await;
    let log_in = append_entry(&mut *tx, &in_entry).await;
    match (log_out, log_in) {
        (Ok(_), Ok(_)) => {}
        _ => {
            tracing::error!("Failed to record transfer entries");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to transfer points"));
        }
    }

    // Commit the transaction
    match tx.commit().await {
        Ok(_) => {
            tracing::info!(
                "Transferred {} points from {sender_id} to {}",
                payload.amount,
                payload.receiver_id
            );
            Ok((StatusCode::OK, "Transfer successful".to_string()))
        }
        Err(err) => {
            tracing::error!("Failed to commit transfer: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to transfer points"))
        }
    }
}

// return the caller's transaction history, newest first
async fn history(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token"));
        }
    };

    let entries = match sqlx::query_as::<_, TransactionLogEntry>(
        r#"
        SELECT id, user_id, entry_type, amount, booking_id, created_at
        FROM transactions
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT 200
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    {
        Ok(entries) => entries,
        Err(err) => {
            tracing::error!("Failed to retrieve transactions: {err}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve transactions"));
        }
    };

    let stream = futures::stream::iter(entries).map(|entry| Event::default().json_data(entry));

    let sse = Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(std::time::Duration::from_secs(2))
            .text("keep-alive-text"),
    );

    Ok(sse)
}

async fn append_entry<'e, E>(executor: E, entry: &TransactionLogEntry) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
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
    .execute(executor)
    .await?;
    Ok(())
}

pub fn wallet_routes(service: Arc<AuthService>, pool: PgPool) -> Router {
    Router::new()
        .route("/wallet", get(get_wallet))
        .route("/wallet/top_up", post(top_up))
        .route("/wallet/transfer", post(transfer))
        .route("/wallet/history", get(history))
        .with_state((service, pool))
}
