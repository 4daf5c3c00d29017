//! Fixture keys + token minting shared by the unit tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;

pub const PRIVATE_KEY: &str = include_str!("../tests/fixtures/ed25519_private.pem");
pub const PUBLIC_KEY: &str = include_str!("../tests/fixtures/ed25519_public.pem");
pub const OTHER_PRIVATE_KEY: &str = include_str!("../tests/fixtures/ed25519_other_private.pem");
pub const OTHER_PUBLIC_KEY: &str = include_str!("../tests/fixtures/ed25519_other_public.pem");

pub fn future_exp() -> i64 {
    (Utc::now() + Duration::hours(24)).timestamp()
}

pub fn mint_with(private_key_pem: &str, claims: &Value) -> String {
    let key = EncodingKey::from_ed_pem(private_key_pem.as_bytes()).expect("fixture private key");
    jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), claims, &key).expect("sign fixture token")
}

pub fn mint(claims: &Value) -> String {
    mint_with(PRIVATE_KEY, claims)
}

pub fn mint_hs256(secret: &[u8], claims: &Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .expect("sign fixture token")
}
