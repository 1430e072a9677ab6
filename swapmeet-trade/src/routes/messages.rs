use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use swapmeet_shared::errors::{AppError, AppResult, ErrorCode};
use swapmeet_shared::types::api::ApiResponse;
use swapmeet_shared::types::auth::AuthUser;
use swapmeet_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::Message;
use crate::view::TradeView;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, message = "message cannot be empty"))]
    pub content: String,
}

pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Message>>>> {
    let page = state.trades.list_messages(user.id, match_id, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<TradeView>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::MessageEmpty, e.to_string()))?;

    let view = state.trades.send_message(user.id, match_id, &req.content)?;
    Ok(Json(ApiResponse::ok(view)))
}
