pub mod health;
pub mod matches;
pub mod messages;
pub mod session;
pub mod swipes;
pub mod trades;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use swapmeet_shared::middleware::metrics_middleware;

use crate::sse;
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/session", get(session::session))
        // Matching
        .route("/posts/deck", get(swipes::swipe_deck))
        .route("/swipes", post(swipes::record_swipe))
        .route("/matches", get(matches::list_matches))
        .route("/matches/current", get(matches::current_view))
        .route("/matches/:id", get(matches::view))
        .route("/matches/:id/proposal", post(matches::propose))
        .route("/matches/:id/trade", post(matches::confirm_trade))
        .route("/matches/:id/feed", get(sse::match_feed))
        // Chat
        .route("/matches/:id/messages", get(messages::list_messages).post(messages::send_message))
        // Trades
        .route("/trades", get(trades::trade_history))
        .route("/trades/:id/accept", post(trades::accept))
        .route("/trades/:id/shipping", post(trades::submit_shipping)
            .layer(DefaultBodyLimit::max(upload_limit)))
        .route("/trades/:id/receipt", post(trades::confirm_receipt))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
