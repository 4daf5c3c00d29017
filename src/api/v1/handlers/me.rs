/*
 * Responsibility
 * - GET /me: middleware が入れた AuthCtx をそのまま返す
 */
use axum::Json;
use serde::Serialize;

use crate::api::v1::extractors::AuthCtxExtractor;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub grant: Option<String>,
}

pub async fn me(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: ctx.user_id,
        grant: ctx.grant,
    })
}
