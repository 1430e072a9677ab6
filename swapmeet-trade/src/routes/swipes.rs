use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use swapmeet_shared::errors::AppResult;
use swapmeet_shared::types::api::ApiResponse;
use swapmeet_shared::types::auth::AuthUser;
use swapmeet_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::Post;
use crate::view::SwipeOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub post_id: Uuid,
    pub is_like: bool,
}

pub async fn record_swipe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SwipeRequest>,
) -> AppResult<Json<ApiResponse<SwipeOutcome>>> {
    let outcome = state
        .guarded(user.id, req.post_id, "swipe", async {
            state.trades.record_swipe(user.id, req.post_id, req.is_like)
        })
        .await?;

    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn swipe_deck(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Post>>>> {
    let deck = state.trades.swipe_deck(user.id, &params)?;
    Ok(Json(ApiResponse::ok(deck)))
}
