/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, 認証ヘッダ名, 公開鍵, claim 名など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::HeaderName;
use jsonwebtoken::Algorithm;

use crate::middleware::auth::{DEFAULT_GRANT_CLAIM, DEFAULT_USER_ID_CLAIM};
use crate::middleware::bearer_auth::DEFAULT_HEADER;
use crate::services::auth::token::ASYMMETRIC_ALGORITHMS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub auth_header: HeaderName,
    pub auth_public_key_pem: String,

    pub claim_user_id: String,
    pub claim_grant: String,
    // false = single-claim mode (grant not required)
    pub require_grant: bool,

    pub allowed_algorithms: Vec<Algorithm>,
    pub leeway_seconds: u64,

    pub http_body_limit_bytes: usize,
    pub http_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// `var` は環境変数の代わり (テストでは HashMap を渡す)
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = match var("PORT") {
            Some(s) => s.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let auth_header = match var("AUTH_HEADER") {
            Some(s) => HeaderName::from_str(s.trim())
                .map_err(|_| ConfigError::Invalid("AUTH_HEADER"))?,
            None => DEFAULT_HEADER,
        };

        let auth_public_key_pem = var("AUTH_PUBLIC_KEY_PEM")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_PUBLIC_KEY_PEM"))?
            .replace("\\n", "\n");

        let claim_user_id = non_empty(var("AUTH_CLAIM_USER_ID"))
            .unwrap_or_else(|| DEFAULT_USER_ID_CLAIM.to_string());
        let claim_grant = non_empty(var("AUTH_CLAIM_GRANT"))
            .unwrap_or_else(|| DEFAULT_GRANT_CLAIM.to_string());

        let require_grant = match var("AUTH_REQUIRE_GRANT") {
            Some(s) => parse_bool(&s).ok_or(ConfigError::Invalid("AUTH_REQUIRE_GRANT"))?,
            None => true,
        };

        let allowed_algorithms = match var("AUTH_ALLOWED_ALGS") {
            Some(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Algorithm::from_str)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ConfigError::Invalid("AUTH_ALLOWED_ALGS"))?,
            None => ASYMMETRIC_ALGORITHMS.to_vec(),
        };
        if allowed_algorithms.is_empty() {
            return Err(ConfigError::Invalid("AUTH_ALLOWED_ALGS"));
        }

        let leeway_seconds = match var("AUTH_LEEWAY_SECONDS") {
            Some(s) => s
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("AUTH_LEEWAY_SECONDS"))?,
            None => 60,
        };

        let http_body_limit_bytes = match var("HTTP_BODY_LIMIT_BYTES") {
            Some(s) => s
                .parse::<usize>()
                .map_err(|_| ConfigError::Invalid("HTTP_BODY_LIMIT_BYTES"))?,
            None => 1024 * 1024,
        };

        let http_timeout_seconds = match var("HTTP_TIMEOUT_SECONDS") {
            Some(s) => s
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid("HTTP_TIMEOUT_SECONDS"))?,
            None => 30,
        };

        Ok(Self {
            addr,
            app_env,
            auth_header,
            auth_public_key_pem,
            claim_user_id,
            claim_grant,
            require_grant,
            allowed_algorithms,
            leeway_seconds,
            http_body_limit_bytes,
            http_timeout_seconds,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
