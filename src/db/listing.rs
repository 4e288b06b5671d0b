use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, QueryBuilder};
use uuid::Uuid;

const LISTING_COLUMNS: &str =
    "id, user_id, kind, title, category, description, hourly_point_rate, city, district, is_active, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "listing_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    Offer,
    Request,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: ListingKind,
    pub title: String,
    pub category: String,
    pub description: String,
    pub hourly_point_rate: i64,
    pub city: Option<String>,
    pub district: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub struct NewListing {
    pub user_id: Uuid,
    pub kind: ListingKind,
    pub title: String,
    pub category: String,
    pub description: String,
    pub hourly_point_rate: i64,
    pub city: Option<String>,
    pub district: Option<String>,
}

pub async fn insert(pool: &PgPool, new: NewListing) -> Result<Listing, sqlx::Error> {
    let query = format!(
        r#"
        INSERT INTO listings (user_id, kind, title, category, description, hourly_point_rate, city, district)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {LISTING_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Listing>(&query)
        .bind(new.user_id)
        .bind(new.kind)
        .bind(new.title)
        .bind(new.category)
        .bind(new.description)
        .bind(new.hourly_point_rate)
        .bind(new.city)
        .bind(new.district)
        .fetch_one(pool)
        .await
}

pub async fn get(pool: &PgPool, listing_id: Uuid) -> Result<Option<Listing>, sqlx::Error> {
    let query = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
    sqlx::query_as::<_, Listing>(&query)
        .bind(listing_id)
        .fetch_optional(pool)
        .await
}

// discovery search, filters are optional so the query is built dynamically
pub async fn search_active(
    pool: &PgPool,
    category: Option<&str>,
    city: Option<&str>,
) -> Result<Vec<Listing>, sqlx::Error> {
    let mut query_builder =
        QueryBuilder::new(format!("SELECT {LISTING_COLUMNS} FROM listings WHERE is_active"));
    if let Some(category) = category {
        query_builder.push(" AND category = ").push_bind(category);
    }
    if let Some(city) = city {
        query_builder.push(" AND city = ").push_bind(city);
    }
    query_builder.push(" ORDER BY created_at DESC LIMIT 50");

    query_builder
        .build_query_as::<Listing>()
        .fetch_all(pool)
        .await
}
