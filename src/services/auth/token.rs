//! Bearer token parsing + signature verification.
//!
//! `Token::parse` only checks structure (three segments, decodable header,
//! JSON object payload). Nothing read from a parsed token is trustworthy
//! until `Token::verify` has succeeded against a resolved key.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde_json::{Map, Value};

/// Claim name -> claim value, as decoded from the payload segment.
pub type Claims = Map<String, Value>;

/// Algorithms accepted when nothing else is configured.
///
/// HMAC is left out on purpose: a public key must never double as a shared secret.
pub const ASYMMETRIC_ALGORITHMS: &[Algorithm] = &[
    Algorithm::EdDSA,
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token must have exactly three segments")]
    Segments,
    #[error("invalid token header: {0}")]
    Header(jsonwebtoken::errors::Error),
    #[error("invalid payload encoding: {0}")]
    PayloadEncoding(#[from] base64::DecodeError),
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("unusable key for {0:?}: {1}")]
    Key(Algorithm, jsonwebtoken::errors::Error),
    #[error("algorithm {0:?} is not allowed")]
    AlgorithmNotAllowed(Algorithm),
    #[error("{0}")]
    Validation(jsonwebtoken::errors::Error),
}

/// Knobs handed to `jsonwebtoken::Validation`.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub algorithms: Vec<Algorithm>,
    // Allowed clock skew for exp/nbf, seconds.
    pub leeway_seconds: u64,
    // If true, a token without `exp` is rejected.
    pub require_exp: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            algorithms: ASYMMETRIC_ALGORITHMS.to_vec(),
            leeway_seconds: 60,
            require_exp: true,
        }
    }
}

impl ValidationPolicy {
    pub fn allows(&self, alg: Algorithm) -> bool {
        self.algorithms.contains(&alg)
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = self.leeway_seconds;
        // Audience is not part of this contract; a present `aud` must not fail the token.
        validation.validate_aud = false;
        if !self.require_exp {
            validation.required_spec_claims.clear();
        }
        validation
    }
}

/// A structurally valid JWT. Owned by the request that presented it.
#[derive(Debug, Clone)]
pub struct Token {
    raw: String,
    header: Header,
    claims: Claims,
}

impl Token {
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = raw.split('.').collect();
        let [_, payload, _] = segments.as_slice() else {
            return Err(TokenError::Segments);
        };

        let header = jsonwebtoken::decode_header(raw).map_err(TokenError::Header)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        let claims: Claims = serde_json::from_slice(&bytes)?;

        Ok(Self {
            raw: raw.to_string(),
            header,
            claims,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    pub fn key_id(&self) -> Option<&str> {
        self.header.kid.as_deref()
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Check the signature (and exp/nbf) against `key`.
    pub fn verify(&self, key: &DecodingKey, policy: &ValidationPolicy) -> Result<(), TokenError> {
        let alg = self.algorithm();
        if !policy.allows(alg) {
            return Err(TokenError::AlgorithmNotAllowed(alg));
        }

        jsonwebtoken::decode::<Claims>(&self.raw, key, &policy.validation(alg))
            .map(|_| ())
            .map_err(TokenError::Validation)
    }
}

/// Load raw key bytes the way the token's algorithm expects them.
///
/// - HMAC: the bytes are the shared secret
/// - RSA / RSA-PSS / ECDSA / EdDSA: the bytes are a PEM public key
pub fn decoding_key(alg: Algorithm, key: &[u8]) -> Result<DecodingKey, TokenError> {
    let loaded = match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            Ok(DecodingKey::from_secret(key))
        }
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(key),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(key),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(key),
    };

    loaded.map_err(|e| TokenError::Key(alg, e))
}
