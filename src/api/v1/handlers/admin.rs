/*
 * Responsibility
 * - GET /admin
 * - grant の意味付け (何を許すか) は middleware ではなく handler 側で決める例
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::api::v1::extractors::AuthCtxExtractor;
use crate::error::AppError;

pub const ADMIN_GRANT: &str = "admin";

pub async fn admin(
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Result<impl IntoResponse, AppError> {
    if ctx.grant.as_deref() != Some(ADMIN_GRANT) {
        return Err(AppError::forbidden("admin grant required"));
    }

    Ok((StatusCode::OK, Json(json!({"user_id": ctx.user_id}))))
}
