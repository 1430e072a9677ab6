use axum::Json;

use swapmeet_shared::middleware::OptionalAuthUser;
use swapmeet_shared::types::api::ApiResponse;
use swapmeet_shared::types::auth::SessionInfo;

/// Who the bearer token belongs to, or `null` without a valid token.
pub async fn session(OptionalAuthUser(user): OptionalAuthUser) -> Json<ApiResponse<SessionInfo>> {
    Json(ApiResponse::ok(SessionInfo {
        user_id: user.map(|u| u.id),
    }))
}
