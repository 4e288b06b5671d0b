use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::db::listing::{self, ListingKind, NewListing};

use super::{auth::AuthService, utils::validate_auth_token};

#[derive(Debug, Deserialize)]
pub struct CreateListing {
    pub kind: ListingKind,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub hourly_point_rate: i64,
    pub city: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListingFilter {
    pub category: Option<String>,
    pub city: Option<String>,
}

async fn create_listing(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Json(payload): Json<CreateListing>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token"));
        }
    };

    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title is required"));
    }
    if payload.hourly_point_rate <= 0 {
        return Err((StatusCode::BAD_REQUEST, "Hourly point rate must be positive"));
    }

    let new_listing = NewListing {
        user_id,
        kind: payload.kind,
        title: payload.title,
        category: payload.category,
        description: payload.description,
        hourly_point_rate: payload.hourly_point_rate,
        city: payload.city,
        district: payload.district,
    };

    match listing::insert(&pool, new_listing).await {
        Ok(listing) => {
            tracing::info!("Listing {} created by user {user_id}", listing.id);
            Ok((StatusCode::CREATED, Json(listing)))
        }
        Err(err) => {
            tracing::error!("Failed to create listing: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to create listing"))
        }
    }
}

async fn list_listings(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Query(filter): Query<ListingFilter>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    if let Err(err) = validate_auth_token(headers, &service) {
        return Err((err, "Invalid token"));
    }

    match listing::search_active(&pool, filter.category.as_deref(), filter.city.as_deref()).await {
        Ok(listings) => Ok((StatusCode::OK, Json(listings))),
        Err(err) => {
            tracing::error!("Failed to search listings: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to search listings"))
        }
    }
}

pub fn listing_routes(service: Arc<AuthService>, pool: PgPool) -> Router {
    Router::new()
        .route("/listings", get(list_listings).post(create_listing))
        .with_state((service, pool))
}
