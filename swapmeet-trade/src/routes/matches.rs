use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use swapmeet_shared::errors::AppResult;
use swapmeet_shared::types::api::ApiResponse;
use swapmeet_shared::types::auth::AuthUser;

use crate::view::{MatchSummary, TradeView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProposeRequest {
    /// Absent or null means nothing was selected.
    #[serde(default)]
    pub post_id: Option<Uuid>,
}

pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<MatchSummary>>>> {
    let matches = state.trades.list_matches(user.id)?;
    Ok(Json(ApiResponse::ok(matches)))
}

/// The caller's most recent match, or `null` when they have none.
pub async fn current_view(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Option<TradeView>>>> {
    let view = state.trades.current_view(user.id)?;
    Ok(Json(ApiResponse::ok(view)))
}

pub async fn view(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TradeView>>> {
    let view = state.trades.view(user.id, match_id)?;
    Ok(Json(ApiResponse::ok(view)))
}

pub async fn propose(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<ProposeRequest>,
) -> AppResult<Json<ApiResponse<TradeView>>> {
    let view = state
        .guarded(user.id, match_id, "propose", async {
            state.trades.propose(user.id, match_id, req.post_id)
        })
        .await?;

    Ok(Json(ApiResponse::ok(view)))
}

pub async fn confirm_trade(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TradeView>>> {
    let view = state
        .guarded(user.id, match_id, "confirm", async {
            state.trades.confirm_trade(user.id, match_id)
        })
        .await?;

    Ok(Json(ApiResponse::ok_with_message(view, "trade created")))
}
