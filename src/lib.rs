/*
 * Responsibility
 * - Bearer token 認証 middleware (bearer_auth) と claim 付与 adapter (auth::access)
 * - 動作確認用の axum アプリ (app / api)
 */
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;
