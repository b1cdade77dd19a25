//! `POST /api/v1/entities/{slug}/collect/{kind}`: collect one unit on demand.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use cwatch_collect::UnitReport;
use cwatch_core::SourceKind;

use crate::middleware::RequestId;

use super::{resolve_entity, ApiError, ApiResponse, AppState};

pub(super) async fn collect_for_entity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((slug, kind)): Path<(String, String)>,
) -> Result<Json<ApiResponse<UnitReport>>, ApiError> {
    let kind: SourceKind = kind
        .parse()
        .map_err(|e: cwatch_core::CoreError| {
            ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
        })?;
    let entity = resolve_entity(&state.pool, &slug, &req_id.0).await?;

    tracing::info!(entity = %entity.slug, %kind, "on-demand collection requested");
    let report = state.pipeline.collect_for_entity(&entity, kind).await;
    Ok(ApiResponse::ok(&req_id, report))
}
