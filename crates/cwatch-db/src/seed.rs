use cwatch_core::EntityConfig;
use sqlx::PgPool;

use crate::DbError;

/// Upsert tracked entities from config, keyed by slug.
///
/// Returns the number of entities processed. All upserts share one
/// transaction; a failure rolls back the whole batch.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_entities(pool: &PgPool, entities: &[EntityConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for entity in entities {
        sqlx::query(
            "INSERT INTO entities (name, slug, website, careers_url, listings_url, social_handle, \
                                   app_id, reviews_url, regulatory_id, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 website = EXCLUDED.website, \
                 careers_url = EXCLUDED.careers_url, \
                 listings_url = EXCLUDED.listings_url, \
                 social_handle = EXCLUDED.social_handle, \
                 app_id = EXCLUDED.app_id, \
                 reviews_url = EXCLUDED.reviews_url, \
                 regulatory_id = EXCLUDED.regulatory_id, \
                 is_active = EXCLUDED.is_active, \
                 updated_at = NOW()",
        )
        .bind(&entity.name)
        .bind(entity.slug())
        .bind(&entity.website)
        .bind(&entity.careers_url)
        .bind(&entity.listings_url)
        .bind(&entity.social_handle)
        .bind(&entity.app_id)
        .bind(&entity.reviews_url)
        .bind(&entity.regulatory_id)
        .bind(entity.active)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
