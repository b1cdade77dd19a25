//! Database operations for the `entities` table.

use chrono::{DateTime, Utc};
use cwatch_core::Entity;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `entities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntityRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub slug: String,
    pub website: String,
    pub careers_url: Option<String>,
    pub listings_url: Option<String>,
    pub social_handle: Option<String>,
    pub app_id: Option<String>,
    pub reviews_url: Option<String>,
    pub regulatory_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EntityRow> for Entity {
    fn from(row: EntityRow) -> Self {
        Entity {
            id: row.id,
            name: row.name,
            slug: row.slug,
            website: row.website,
            careers_url: row.careers_url,
            listings_url: row.listings_url,
            social_handle: row.social_handle,
            app_id: row.app_id,
            reviews_url: row.reviews_url,
            regulatory_id: row.regulatory_id,
            is_active: row.is_active,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all active entities, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_entities(pool: &PgPool) -> Result<Vec<Entity>, DbError> {
    let rows = sqlx::query_as::<_, EntityRow>(
        "SELECT id, public_id, name, slug, website, careers_url, listings_url, social_handle, \
                app_id, reviews_url, regulatory_id, is_active, created_at, updated_at \
         FROM entities \
         WHERE is_active = true \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Entity::from).collect())
}

/// Returns a single active entity by slug, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_entity_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Entity>, DbError> {
    let row = sqlx::query_as::<_, EntityRow>(
        "SELECT id, public_id, name, slug, website, careers_url, listings_url, social_handle, \
                app_id, reviews_url, regulatory_id, is_active, created_at, updated_at \
         FROM entities \
         WHERE slug = $1 AND is_active = true",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Entity::from))
}

/// Returns `(id, name)` pairs for every entity, active or not.
///
/// Aggregation labels historical signals with this map, so entities that were
/// deactivated after emitting signals still resolve.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_entity_names(pool: &PgPool) -> Result<Vec<(i64, String)>, DbError> {
    let rows = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM entities ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Toggles `is_active` for the entity with the given slug.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no entity has the slug, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_entity_active(pool: &PgPool, slug: &str, is_active: bool) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE entities \
         SET is_active = $1, updated_at = NOW() \
         WHERE slug = $2",
    )
    .bind(is_active)
    .bind(slug)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
