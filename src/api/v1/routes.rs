/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は認証なし、それ以外は Authorizer を通す
 */
use axum::{Router, routing::get};

use crate::middleware::auth::access;
use crate::state::AppState;

use crate::api::v1::handlers::{admin::admin, health::health, items::get_item, me::me};

pub fn routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/items/{item_id}", get(get_item))
        .route("/admin", get(admin));

    Router::new()
        .route("/health", get(health))
        .merge(access::apply(protected, state.authorizer.clone()))
}
