/*
 * Responsibility
 * - Bearer トークンの検証 (ヘッダ抽出 → パース → 鍵解決 → 署名検証 → 拒否)
 * - どの claim が必要かは知らない (それは auth::access 側の責務)
 * - 失敗時のレスポンスは ErrorRenderer に完全に委ねる
 */
//! Generic bearer-token middleware.
//!
//! Per request, linear, no retries:
//! 1. extract the bearer token from the configured header
//! 2. parse it
//! 3. resolve the verification key via the `KeyResolver`
//! 4. verify the signature against that key
//! 5. hand the request and the verified token to the inner continuation
//!
//! Every failure ends in exactly one call to the `ErrorRenderer`; the inner
//! continuation is never run in that case.

use std::{fmt, future::Future, sync::Arc};

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tower::BoxError;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::services::auth::token::{self, Token, TokenError, ValidationPolicy};

pub const DEFAULT_HEADER: HeaderName = header::AUTHORIZATION;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header: '{header}'")]
    MissingHeader { header: HeaderName },
    #[error("failed to parse token: {0}")]
    Parse(TokenError),
    // Reported under the same message as a parse failure.
    #[error("failed to parse token: {0}")]
    KeyResolution(BoxError),
    #[error("invalid authorization token: {0}")]
    InvalidToken(TokenError),
}

/// Resolves the key bytes used to verify a parsed (not yet verified) token.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, token: &Token) -> Result<Vec<u8>, BoxError>;
}

/// Renders the response for a rejected request.
pub trait ErrorRenderer: Send + Sync {
    fn render(&self, err: AuthError) -> Response;
}

/// The same key for every token, regardless of its content.
#[derive(Clone)]
pub struct StaticKey(Arc<[u8]>);

impl StaticKey {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into().into())
    }
}

impl KeyResolver for StaticKey {
    fn resolve(&self, _token: &Token) -> Result<Vec<u8>, BoxError> {
        Ok(self.0.to_vec())
    }
}

/// Adapter for plain closures.
pub struct KeyFn<F>(pub F);

impl<F> KeyResolver for KeyFn<F>
where
    F: Fn(&Token) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn resolve(&self, token: &Token) -> Result<Vec<u8>, BoxError> {
        (self.0)(token)
    }
}

/// Adapter for plain closures.
pub struct ErrFn<F>(pub F);

impl<F> ErrorRenderer for ErrFn<F>
where
    F: Fn(AuthError) -> Response + Send + Sync,
{
    fn render(&self, err: AuthError) -> Response {
        (self.0)(err)
    }
}

/// 401 with the shared JSON error body; the message is the error's Display.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonUnauthorized;

impl ErrorRenderer for JsonUnauthorized {
    fn render(&self, err: AuthError) -> Response {
        AppError::unauthorized(err.to_string()).into_response()
    }
}

/// Bearer-token validation, independent of which claims matter.
///
/// Holds no per-request state; cloning is cheap and clones share the callbacks.
#[derive(Clone)]
pub struct BearerAuth {
    header: HeaderName,
    key_resolver: Arc<dyn KeyResolver>,
    error_renderer: Arc<dyn ErrorRenderer>,
    policy: ValidationPolicy,
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("BearerAuth")
            .field("header", &self.header)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BearerAuth {
    pub fn new(
        header: HeaderName,
        key_resolver: impl KeyResolver + 'static,
        error_renderer: impl ErrorRenderer + 'static,
    ) -> Self {
        Self {
            header,
            key_resolver: Arc::new(key_resolver),
            error_renderer: Arc::new(error_renderer),
            policy: ValidationPolicy::default(),
        }
    }

    pub fn with_header(mut self, header: HeaderName) -> Self {
        self.header = header;
        self
    }

    pub fn with_key_resolver(mut self, key_resolver: impl KeyResolver + 'static) -> Self {
        self.key_resolver = Arc::new(key_resolver);
        self
    }

    pub fn with_key_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Token) -> Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    {
        self.with_key_resolver(KeyFn(f))
    }

    pub fn with_error_renderer(mut self, error_renderer: impl ErrorRenderer + 'static) -> Self {
        self.error_renderer = Arc::new(error_renderer);
        self
    }

    pub fn with_err_fn<F>(self, f: F) -> Self
    where
        F: Fn(AuthError) -> Response + Send + Sync + 'static,
    {
        self.with_error_renderer(ErrFn(f))
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Returns the token after a case-insensitive `Bearer ` prefix, or `""`.
    ///
    /// Never fails: absence, a non-UTF-8 value, another scheme, and a bare
    /// `Bearer ` all come back as the empty string.
    pub fn extract<'a>(&self, headers: &'a HeaderMap) -> &'a str {
        let Some(value) = headers.get(&self.header).and_then(|v| v.to_str().ok()) else {
            return "";
        };

        match value.get(..BEARER_PREFIX.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(BEARER_PREFIX) => {
                &value[BEARER_PREFIX.len()..]
            }
            _ => "",
        }
    }

    /// Steps 1-4: extract, parse, resolve the key, verify.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Token, AuthError> {
        let bearer = self.extract(headers);
        if bearer.is_empty() {
            return Err(AuthError::MissingHeader {
                header: self.header.clone(),
            });
        }

        let token = Token::parse(bearer).map_err(AuthError::Parse)?;

        let key_bytes = self
            .key_resolver
            .resolve(&token)
            .map_err(AuthError::KeyResolution)?;
        let key = token::decoding_key(token.algorithm(), &key_bytes)
            .map_err(|e| AuthError::KeyResolution(e.into()))?;

        token
            .verify(&key, &self.policy)
            .map_err(AuthError::InvalidToken)?;

        Ok(token)
    }

    /// Run `inner` with the verified token, or render the failure.
    ///
    /// The request reaches `inner` unmodified.
    pub async fn handle<F, Fut>(&self, req: Request, inner: F) -> Response
    where
        F: FnOnce(Request, Token) -> Fut,
        Fut: Future<Output = Response>,
    {
        match self.authenticate(req.headers()) {
            Ok(token) => {
                debug!(
                    alg = ?token.algorithm(),
                    kid = token.key_id(),
                    exp = ?token.expires_at(),
                    "bearer token accepted"
                );
                inner(req, token).await
            }
            Err(err) => {
                warn!(error = %err, header = %self.header, "bearer token rejected");
                self.error_renderer.render(err)
            }
        }
    }
}

/// Guard every route of `router` with signature validation only (no claim checks).
///
/// 例：
/// ```ignore
/// let router = middleware::bearer_auth::apply(router, Arc::new(bearer));
/// ```
pub fn apply<S>(router: Router<S>, auth: Arc<BearerAuth>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(auth, bearer_middleware))
}

async fn bearer_middleware(
    State(auth): State<Arc<BearerAuth>>,
    req: Request,
    next: Next,
) -> Response {
    auth.handle(req, |req, _token| next.run(req)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{OTHER_PRIVATE_KEY, PUBLIC_KEY, future_exp, mint, mint_with};
    use axum::{
        body::Body,
        http::{HeaderValue, StatusCode},
        routing::get,
    };
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn bearer() -> BearerAuth {
        BearerAuth::new(DEFAULT_HEADER, StaticKey::new(PUBLIC_KEY), JsonUnauthorized)
    }

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn valid_token() -> String {
        mint(&json!({"uid": "u-1", "grant": "read", "exp": future_exp()}))
    }

    fn counted_router(auth: BearerAuth, hits: Arc<AtomicUsize>) -> Router {
        let router = Router::new().route(
            "/protected",
            get(move || {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "ok"
                }
            }),
        );
        apply(router, Arc::new(auth))
    }

    fn request(authorization: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn error_message(resp: Response) -> String {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["error"]["message"].as_str().unwrap().to_string()
    }

    #[test]
    fn extract_returns_token_not_prefix() {
        let auth = bearer();
        let h = headers("authorization", "Bearer abc.def.ghi");

        assert_eq!(auth.extract(&h), "abc.def.ghi");
        assert_ne!(auth.extract(&h), "Bearer ");
    }

    #[test]
    fn extract_prefix_is_case_insensitive() {
        let auth = bearer();
        assert_eq!(auth.extract(&headers("authorization", "bearer tok")), "tok");
        assert_eq!(auth.extract(&headers("authorization", "BEARER tok")), "tok");
    }

    #[test]
    fn extract_returns_empty_without_bearer_token() {
        let auth = bearer();
        assert_eq!(auth.extract(&HeaderMap::new()), "");
        assert_eq!(auth.extract(&headers("authorization", "Basic dXNlcjpwYXNz")), "");
        assert_eq!(auth.extract(&headers("authorization", "Bearer")), "");
        assert_eq!(auth.extract(&headers("authorization", "Bearer ")), "");
        assert_eq!(auth.extract(&headers("authorization", "Bearertok")), "");
    }

    #[test]
    fn extract_reads_only_the_configured_header() {
        let auth = bearer().with_header(HeaderName::from_static("x-access-token"));

        assert_eq!(auth.extract(&headers("authorization", "Bearer tok")), "");
        assert_eq!(auth.extract(&headers("x-access-token", "Bearer tok")), "tok");
    }

    #[test]
    fn authenticate_returns_verified_token() {
        let raw = valid_token();
        let token = bearer()
            .authenticate(&headers("authorization", &format!("Bearer {raw}")))
            .unwrap();

        assert_eq!(token.as_str(), raw);
        assert_eq!(token.claim("uid"), Some(&json!("u-1")));
    }

    #[test]
    fn authenticate_classifies_failures() {
        let auth = bearer();

        let err = auth.authenticate(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AuthError::MissingHeader { .. }));
        assert_eq!(err.to_string(), "missing authorization header: 'authorization'");

        let err = auth
            .authenticate(&headers("authorization", "Bearer not-a-jwt"))
            .unwrap_err();
        assert!(matches!(err, AuthError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse token: "));

        let forged = mint_with(OTHER_PRIVATE_KEY, &json!({"uid": "u-1", "exp": future_exp()}));
        let err = auth
            .authenticate(&headers("authorization", &format!("Bearer {forged}")))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
        assert!(err.to_string().starts_with("invalid authorization token: "));
    }

    #[test]
    fn key_resolution_failure_reads_as_parse_failure() {
        let auth = bearer().with_key_fn(|_token: &Token| Err("no key for you".into()));

        let err = auth
            .authenticate(&headers("authorization", &format!("Bearer {}", valid_token())))
            .unwrap_err();
        assert!(matches!(err, AuthError::KeyResolution(_)));
        assert_eq!(err.to_string(), "failed to parse token: no key for you");
    }

    #[test]
    fn unloadable_key_is_a_key_resolution_failure() {
        let auth = bearer().with_key_resolver(StaticKey::new("not a pem"));

        let err = auth
            .authenticate(&headers("authorization", &format!("Bearer {}", valid_token())))
            .unwrap_err();
        assert!(matches!(err, AuthError::KeyResolution(_)));
    }

    #[test]
    fn key_resolver_sees_the_parsed_token() {
        let auth = bearer().with_key_fn(|token: &Token| match token.claim("uid") {
            Some(v) if v == "u-1" => Ok(PUBLIC_KEY.as_bytes().to_vec()),
            _ => Err("unknown subject".into()),
        });

        assert!(
            auth.authenticate(&headers("authorization", &format!("Bearer {}", valid_token())))
                .is_ok()
        );
    }

    #[tokio::test]
    async fn valid_token_reaches_inner_handler_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counted_router(bearer(), Arc::clone(&hits));

        let resp = router
            .oneshot(request(Some(&format!("Bearer {}", valid_token()))))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_header_is_rejected_without_calling_inner() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counted_router(bearer(), Arc::clone(&hits));

        let resp = router.oneshot(request(None)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            error_message(resp).await,
            "missing authorization header: 'authorization'"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_reported_as_missing_header() {
        let router = counted_router(bearer(), Arc::new(AtomicUsize::new(0)));

        let resp = router
            .oneshot(request(Some("Basic dXNlcjpwYXNz")))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(error_message(resp).await.starts_with("missing authorization header"));
    }

    #[tokio::test]
    async fn custom_renderer_owns_every_failure_exactly_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let rendered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&rendered);
        let auth = bearer().with_err_fn(move |err: AuthError| {
            counter.fetch_add(1, Ordering::SeqCst);
            (StatusCode::IM_A_TEAPOT, err.to_string()).into_response()
        });
        let router = counted_router(auth, Arc::clone(&hits));

        let forged = mint_with(OTHER_PRIVATE_KEY, &json!({"uid": "u-1", "exp": future_exp()}));
        for value in [None, Some("Bearer garbage".to_string()), Some(format!("Bearer {forged}"))] {
            let resp = router
                .clone()
                .oneshot(request(value.as_deref()))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
        }

        assert_eq!(rendered.load(Ordering::SeqCst), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handle_passes_token_to_inner() {
        let raw = valid_token();
        let req = request(Some(&format!("Bearer {raw}")));

        let resp = bearer()
            .handle(req, |_req, token| async move {
                let uid = token.claim("uid").and_then(|v| v.as_str()).unwrap_or("");
                uid.to_string().into_response()
            })
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"u-1");
    }
}
