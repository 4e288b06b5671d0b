use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{self, booking::BOOKING_COLUMNS};
use crate::ledger::model::{Booking, BookingStatus, PaymentStatus};
use crate::ledger::EscrowLedger;

use super::auth::AuthService;
use super::utils::{ledger_error_response, validate_auth_token};

type BookingState = (Arc<AuthService>, Arc<EscrowLedger>, PgPool);

#[derive(Debug, Deserialize)]
pub struct CreateBooking {
    pub listing_id: Uuid,
    pub total_points: i64,
}

async fn create_booking(
    headers: HeaderMap,
    State((service, _ledger, pool)): State<BookingState>,
    Json(payload): Json<CreateBooking>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let client_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    if payload.total_points <= 0 {
        return Err((StatusCode::BAD_REQUEST, "Total points must be positive".to_string()));
    }

    let listing = match db::listing::get(&pool, payload.listing_id).await {
        Ok(Some(listing)) if listing.is_active => listing,
        Ok(_) => {
            return Err((StatusCode::NOT_FOUND, "Listing not found".to_string()));
        }
        Err(err) => {
            tracing::error!("Failed to load listing {}: {err}", payload.listing_id);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to create booking".to_string()));
        }
    };

    if listing.user_id == client_id {
        return Err((StatusCode::BAD_REQUEST, "Cannot book your own listing".to_string()));
    }

    let query = format!(
        r#"
        INSERT INTO bookings (listing_id, client_id, provider_id, total_points)
        VALUES ($1, $2, $3, $4)
        RETURNING {BOOKING_COLUMNS}
        "#
    );
    match sqlx::query_as::<_, Booking>(&query)
        .bind(listing.id)
        .bind(client_id)
        .bind(listing.user_id)
        .bind(payload.total_points)
        .fetch_one(&pool)
        .await
    {
        Ok(booking) => {
            tracing::info!("Booking {} created for listing {}", booking.id, listing.id);
            Ok((StatusCode::CREATED, Json(booking)))
        }
        Err(err) => {
            tracing::error!("Failed to create booking: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to create booking".to_string()))
        }
    }
}

// return all bookings in which the user takes part, either side
async fn list_bookings(
    headers: HeaderMap,
    State((service, _ledger, pool)): State<BookingState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let query = format!(
        r#"
        SELECT {BOOKING_COLUMNS} FROM bookings
        WHERE client_id = $1 OR provider_id = $1
        ORDER BY created_at DESC
        "#
    );
    match sqlx::query_as::<_, Booking>(&query)
        .bind(user_id)
        .fetch_all(&pool)
        .await
    {
        Ok(bookings) => Ok((StatusCode::OK, Json(bookings))),
        Err(err) => {
            tracing::error!("Failed to retrieve bookings: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve bookings".to_string()))
        }
    }
}

async fn get_booking(
    headers: HeaderMap,
    State((service, _ledger, pool)): State<BookingState>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let booking = fetch_booking(&pool, booking_id).await?;
    if booking.client_id != user_id && booking.provider_id != user_id {
        tracing::warn!("Unauthorized booking access by user: {user_id}");
        return Err((StatusCode::FORBIDDEN, "Not a participant of this booking".to_string()));
    }

    Ok((StatusCode::OK, Json(booking)))
}

// provider accepts: points move into escrow
async fn accept_booking(
    headers: HeaderMap,
    State((service, ledger, pool)): State<BookingState>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let booking = fetch_booking(&pool, booking_id).await?;
    if booking.provider_id != user_id {
        return Err((StatusCode::FORBIDDEN, "Only the provider can accept a booking".to_string()));
    }
    if booking.status != BookingStatus::Pending {
        return Err((StatusCode::CONFLICT, "This booking was already processed".to_string()));
    }

    match ledger
        .create_hold(
            booking.id,
            booking.client_id,
            booking.provider_id,
            booking.total_points,
        )
        .await
    {
        Ok(escrow) => Ok((StatusCode::OK, Json(escrow))),
        Err(err) => Err(ledger_error_response(err)),
    }
}

// client confirms completion: held points are released to the provider
async fn complete_booking(
    headers: HeaderMap,
    State((service, ledger, pool)): State<BookingState>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let booking = fetch_booking(&pool, booking_id).await?;
    if booking.client_id != user_id {
        return Err((StatusCode::FORBIDDEN, "Only the client can complete a booking".to_string()));
    }
    if booking.status != BookingStatus::Confirmed {
        return Err((StatusCode::CONFLICT, "This booking was already processed".to_string()));
    }

    match ledger.release_escrow(booking.id).await {
        Ok(()) => Ok((StatusCode::OK, "Service completed, payment released".to_string())),
        Err(err) => Err(ledger_error_response(err)),
    }
}

// either side cancels; held payments are refunded in full
async fn cancel_booking(
    headers: HeaderMap,
    State((service, ledger, pool)): State<BookingState>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let booking = fetch_booking(&pool, booking_id).await?;
    if booking.client_id != user_id && booking.provider_id != user_id {
        return Err((StatusCode::FORBIDDEN, "Not a participant of this booking".to_string()));
    }
    if !matches!(booking.status, BookingStatus::Pending | BookingStatus::Confirmed) {
        return Err((StatusCode::CONFLICT, "This booking was already processed".to_string()));
    }

    // refund only applies once points are actually held
    if booking.payment_status == PaymentStatus::HeldInEscrow {
        return match ledger.refund_escrow(booking.id).await {
            Ok(()) => Ok((StatusCode::OK, "Booking cancelled, payment refunded".to_string())),
            Err(err) => Err(ledger_error_response(err)),
        };
    }

    let result = sqlx::query("UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1")
        .bind(booking.id)
        .bind(BookingStatus::Cancelled)
        .execute(&pool)
        .await;

    match result {
        Ok(_) => {
            tracing::info!("Booking {} cancelled before payment", booking.id);
            Ok((StatusCode::OK, "Booking cancelled".to_string()))
        }
        Err(err) => {
            tracing::error!("Failed to cancel booking {}: {err}", booking.id);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to cancel booking".to_string()))
        }
    }
}

async fn fetch_booking(pool: &PgPool, booking_id: Uuid) -> Result<Booking, (StatusCode, String)> {
    let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
    match sqlx::query_as::<_, Booking>(&query)
        .bind(booking_id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(booking)) => Ok(booking),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Booking not found".to_string())),
        Err(err) => {
            tracing::error!("Failed to load booking {booking_id}: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to load booking".to_string()))
        }
    }
}

pub fn booking_routes(service: Arc<AuthService>, ledger: Arc<EscrowLedger>, pool: PgPool) -> Router {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/accept", post(accept_booking))
        .route("/bookings/:id/complete", post(complete_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .with_state((service, ledger, pool))
}
