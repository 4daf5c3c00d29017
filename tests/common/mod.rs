#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use bearer_gate::{
    app::build_router, middleware::auth::Authorizer, middleware::http::HttpLimits,
    state::AppState,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;

pub const PRIVATE_KEY: &str = include_str!("../fixtures/ed25519_private.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/ed25519_public.pem");
pub const OTHER_PRIVATE_KEY: &str = include_str!("../fixtures/ed25519_other_private.pem");

pub fn future_exp() -> i64 {
    (Utc::now() + Duration::hours(24)).timestamp()
}

pub fn sign(private_key_pem: &str, claims: &Value) -> String {
    let key = EncodingKey::from_ed_pem(private_key_pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), claims, &key).unwrap()
}

pub fn app() -> Router {
    app_with(Authorizer::new(PUBLIC_KEY))
}

pub fn app_with(authorizer: Authorizer) -> Router {
    build_router(AppState::new(Arc::new(authorizer)), HttpLimits::default())
}

pub fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
