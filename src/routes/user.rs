use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::user::{User, USER_COLUMNS};

use super::{auth::AuthService, utils::validate_auth_token};

async fn get_me(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            tracing::error!("Token validation failed: {:?}", err);
            return Err((err, "Invalid token"));
        }
    };

    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    match sqlx::query_as::<_, User>(&query)
        .bind(user_id)
        .fetch_optional(&pool)
        .await
    {
        Ok(Some(user)) => Ok((StatusCode::OK, Json(user))),
        Ok(None) => {
            tracing::warn!("User not found: {}", user_id);
            Err((StatusCode::NOT_FOUND, "User not found"))
        }
        Err(err) => {
            tracing::error!("Failed to load user {user_id}: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to load user"))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub bio: Option<String>,
}

async fn update_me(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Json(payload): Json<UpdateProfile>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match validate_auth_token(headers, &service) {
        Ok(val) => val,
        Err(err) => {
            tracing::error!("Token validation failed: {:?}", err);
            return Err((err, "Invalid token"));
        }
    };

    let result = sqlx::query(
        r#"
        UPDATE users
        SET full_name = COALESCE($1, full_name),
            city = COALESCE($2, city),
            district = COALESCE($3, district),
            bio = COALESCE($4, bio),
            updated_at = now()
        WHERE id = $5
        "#,
    )
    .bind(payload.full_name)
    .bind(payload.city)
    .bind(payload.district)
    .bind(payload.bio)
    .bind(user_id)
    .execute(&pool)
    .await;

    match result {
        Ok(_) => {
            tracing::info!("Profile updated for user: {}", user_id);
            Ok((StatusCode::OK, "Profile updated successfully"))
        }
        Err(err) => {
            tracing::error!("Failed to update profile for {user_id}: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to update profile"))
        }
    }
}

pub fn user_routes(service: Arc<AuthService>, db_pool: PgPool) -> Router {
    Router::new()
        .route("/users/me", get(get_me).put(update_me))
        .with_state((service, db_pool))
}
