/// Factory: build `Authorizer` from application `Config`.
use std::sync::Arc;

use tracing::warn;

use crate::config::{Config, ConfigError};
use crate::middleware::auth::Authorizer;
use crate::middleware::bearer_auth::{BearerAuth, JsonUnauthorized, StaticKey};
use crate::services::auth::token::{self, ValidationPolicy};

pub fn build_authorizer(config: &Config) -> Result<Arc<Authorizer>, ConfigError> {
    let key = config.auth_public_key_pem.as_bytes();

    // Fail at startup rather than on the first request.
    let usable = config
        .allowed_algorithms
        .iter()
        .any(|alg| token::decoding_key(*alg, key).is_ok());
    if !usable {
        warn!(
            algorithms = ?config.allowed_algorithms,
            "public key cannot be loaded for any allowed algorithm"
        );
        return Err(ConfigError::Invalid("AUTH_PUBLIC_KEY_PEM"));
    }

    let policy = ValidationPolicy {
        algorithms: config.allowed_algorithms.clone(),
        leeway_seconds: config.leeway_seconds,
        ..ValidationPolicy::default()
    };
    let middleware = BearerAuth::new(
        config.auth_header.clone(),
        StaticKey::new(key),
        JsonUnauthorized,
    )
    .with_policy(policy);

    let authorizer = Authorizer::new(key)
        .with_middleware(middleware)
        .with_user_id_claim(&config.claim_user_id);

    let authorizer = if config.require_grant {
        authorizer.with_grant_claim(&config.claim_grant)
    } else {
        authorizer.without_grant_claim()
    };

    Ok(Arc::new(authorizer))
}
