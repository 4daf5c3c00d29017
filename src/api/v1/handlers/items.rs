/*
 * Responsibility
 * - GET /items/{item_id}
 * - route parameter が認証 middleware を通っても handler に届くことの確認用
 */
use axum::{Json, extract::Path};
use serde::Serialize;

use crate::api::v1::extractors::AuthCtxExtractor;

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item_id: String,
    pub requested_by: String,
}

pub async fn get_item(
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Path(item_id): Path<String>,
) -> Json<ItemResponse> {
    Json(ItemResponse {
        item_id,
        requested_by: ctx.user_id,
    })
}
