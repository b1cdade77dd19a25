//! `GET /api/v1/insights/patterns`: cross-entity patterns and recommendations.

use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use cwatch_patterns::{compute_insights, PatternInsights};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

pub(super) async fn get_pattern_insights(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<PatternInsights>>, ApiError> {
    let now = Utc::now();
    let since = now - state.aggregation.window;

    let signals = cwatch_db::list_signals_since(&state.pool, since, state.config.pattern_signal_cap)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let names: HashMap<i64, String> = cwatch_db::list_entity_names(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .collect();

    let insights = compute_insights(&signals, &names, &state.aggregation, now);
    tracing::debug!(
        signals = signals.len(),
        patterns = insights.parallel_moves,
        pressure = insights.strategic_pressure_index,
        "pattern insights computed"
    );
    Ok(ApiResponse::ok(&req_id, insights))
}
