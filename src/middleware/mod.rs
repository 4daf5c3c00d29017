/*
 * Responsibility
 * - middleware の公開インターフェース
 * - bearer_auth: 署名検証だけの汎用 middleware
 * - auth: claim を必須にして AuthCtx を渡す middleware
 * - http: request-id / trace / body limit / timeout
 */
pub mod auth;
pub mod bearer_auth;
pub mod http;
