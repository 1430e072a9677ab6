use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use swapmeet_shared::errors::{AppError, AppResult, ErrorCode};
use swapmeet_shared::types::api::ApiResponse;
use swapmeet_shared::types::auth::AuthUser;

use crate::coordinator::ShippingForm;
use crate::storage::ProofImage;
use crate::view::{TradeSummary, TradeView};
use crate::AppState;

pub async fn trade_history(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<TradeSummary>>>> {
    let history = state.trades.trade_history(user.id)?;
    Ok(Json(ApiResponse::ok(history)))
}

pub async fn accept(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(trade_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TradeView>>> {
    let view = state
        .guarded(user.id, trade_id, "accept", async {
            state.trades.accept(user.id, trade_id)
        })
        .await?;

    Ok(Json(ApiResponse::ok(view)))
}

/// Multipart fields: `courier`, `tracking`, optional `message`, and the
/// proof photo as `image`.
pub async fn submit_shipping(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(trade_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<TradeView>>> {
    let form = read_shipping_form(multipart).await?;

    let view = state
        .guarded(user.id, trade_id, "ship", async {
            state
                .trades
                .submit_shipping(&state.minio, user.id, trade_id, form)
                .await
        })
        .await?;

    Ok(Json(ApiResponse::ok(view)))
}

pub async fn confirm_receipt(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(trade_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TradeView>>> {
    let view = state
        .guarded(user.id, trade_id, "receive", async {
            state.trades.confirm_receipt(user.id, trade_id)
        })
        .await?;

    Ok(Json(ApiResponse::ok(view)))
}

/// Collect the shipping fields. Missing pieces are left as `None` for the
/// coordinator to report together; an empty file part counts as no image.
pub async fn read_shipping_form(mut multipart: Multipart) -> AppResult<ShippingForm> {
    let mut form = ShippingForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "courier" => form.courier = Some(field.text().await.map_err(multipart_error)?),
            "tracking" => form.tracking = Some(field.text().await.map_err(multipart_error)?),
            "message" => form.message = Some(field.text().await.map_err(multipart_error)?),
            "image" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !bytes.is_empty() {
                    form.image = Some(ProofImage { bytes: bytes.to_vec(), content_type });
                }
            }
            other => tracing::debug!(field = %other, "ignoring unknown shipping field"),
        }
    }

    Ok(form)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(ErrorCode::PayloadTooLarge, "proof image is too large")
    } else {
        AppError::bad_request(format!("invalid multipart body: {}", e.body_text()))
    }
}
