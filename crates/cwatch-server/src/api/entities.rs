//! Entity listing and per-entity signal feed.
//!
//! - `GET /api/v1/entities`
//! - `GET /api/v1/entities/{slug}/signals?category=&limit=`

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use cwatch_core::{Entity, Signal, SignalCategory, SourceKind};
use serde::{Deserialize, Serialize};

use cwatch_collect::Collector;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, resolve_entity, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct EntityItem {
    pub name: String,
    pub slug: String,
    pub website: String,
    /// Source kinds with a configured endpoint.
    pub sources: Vec<SourceKind>,
}

impl From<Entity> for EntityItem {
    fn from(entity: Entity) -> Self {
        let sources = SourceKind::ALL
            .into_iter()
            .filter(|kind| Collector::new(*kind).endpoint(&entity).is_ok())
            .collect();
        Self {
            name: entity.name,
            slug: entity.slug,
            website: entity.website,
            sources,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SignalsQuery {
    pub category: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_entities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<EntityItem>>>, ApiError> {
    let entities = cwatch_db::list_active_entities(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let items = entities.into_iter().map(EntityItem::from).collect();
    Ok(ApiResponse::ok(&req_id, items))
}

pub(super) async fn list_entity_signals(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<SignalsQuery>,
) -> Result<Json<ApiResponse<Vec<Signal>>>, ApiError> {
    let category = query
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(str::parse::<SignalCategory>)
        .transpose()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let entity = resolve_entity(&state.pool, &slug, &req_id.0).await?;
    let signals = cwatch_db::list_entity_signals(
        &state.pool,
        entity.id,
        category,
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::ok(&req_id, signals))
}
