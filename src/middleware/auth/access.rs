//! Bearer 検証 + 必須 claim の取り出し → AuthCtx を extensions に入れる
//!
//! - 署名/構造の失敗は BearerAuth の ErrorRenderer が返す
//! - claim の形の失敗 (欠落・文字列以外・空) はここで直接 401 を返す
//!   (ErrorRenderer は通らない)
//! - token のパースは BearerAuth で 1 回だけ。検証済み token をそのまま受け取る

use std::{
    fmt,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::middleware::bearer_auth::{BearerAuth, DEFAULT_HEADER, JsonUnauthorized, StaticKey};
use crate::services::auth::{claims, token::Token};

pub const DEFAULT_USER_ID_CLAIM: &str = "uid";
pub const DEFAULT_GRANT_CLAIM: &str = "grant";

#[derive(Clone)]
struct Settings {
    middleware: Arc<BearerAuth>,
    user_id_claim: String,
    // None = single-claim mode
    grant_claim: Option<String>,
}

impl Settings {
    fn auth_ctx(&self, token: &Token) -> Result<AuthCtx, AppError> {
        let user_id = claims::string_claim(token.claims(), &self.user_id_claim).map_err(|err| {
            warn!(error = %err, "user identifier claim rejected");
            AppError::unauthorized("user identifier is missing or invalid")
        })?;

        let mut ctx = AuthCtx::new(&self.user_id_claim, user_id);

        if let Some(grant_claim) = &self.grant_claim {
            let grant = claims::string_claim(token.claims(), grant_claim).map_err(|err| {
                warn!(error = %err, "grant claim rejected");
                AppError::unauthorized("grant is missing or invalid")
            })?;
            ctx = ctx.with_grant(grant_claim, grant);
        }

        Ok(ctx)
    }
}

/// `BearerAuth` bound to the user identifier + grant claims.
///
/// Settings are swapped as a whole on every `set_*` call. A request works
/// with the snapshot it started with, so it never sees half of an update.
pub struct Authorizer {
    settings: RwLock<Arc<Settings>>,
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.snapshot();
        f.debug_struct("Authorizer")
            .field("middleware", &settings.middleware)
            .field("user_id_claim", &settings.user_id_claim)
            .field("grant_claim", &settings.grant_claim)
            .finish()
    }
}

impl Authorizer {
    /// Default policy: `Authorization` header, a single static public key,
    /// JSON 401 on failure, claims `uid` + `grant`.
    pub fn new(public_key: impl Into<Vec<u8>>) -> Self {
        let middleware = BearerAuth::new(
            DEFAULT_HEADER,
            StaticKey::new(public_key),
            JsonUnauthorized,
        );

        Self {
            settings: RwLock::new(Arc::new(Settings {
                middleware: Arc::new(middleware),
                user_id_claim: DEFAULT_USER_ID_CLAIM.to_string(),
                grant_claim: Some(DEFAULT_GRANT_CLAIM.to_string()),
            })),
        }
    }

    pub fn with_user_id_claim(self, name: impl Into<String>) -> Self {
        self.set_user_id_claim(name);
        self
    }

    pub fn with_grant_claim(self, name: impl Into<String>) -> Self {
        self.set_grant_claim(name);
        self
    }

    pub fn without_grant_claim(self) -> Self {
        self.disable_grant_claim();
        self
    }

    pub fn with_middleware(self, middleware: BearerAuth) -> Self {
        self.set_middleware(middleware);
        self
    }

    /// Replace the verification key. Keeps the header, error renderer and policy.
    pub fn set_public_key(&self, public_key: impl Into<Vec<u8>>) {
        let key = StaticKey::new(public_key);
        self.update(|s| {
            let middleware = BearerAuth::clone(&s.middleware).with_key_resolver(key);
            s.middleware = Arc::new(middleware);
        });
    }

    pub fn set_user_id_claim(&self, name: impl Into<String>) {
        let name = name.into();
        self.update(|s| s.user_id_claim = name);
    }

    pub fn set_grant_claim(&self, name: impl Into<String>) {
        let name = name.into();
        self.update(|s| s.grant_claim = Some(name));
    }

    pub fn disable_grant_claim(&self) {
        self.update(|s| s.grant_claim = None);
    }

    /// Swap the whole bearer middleware (header, key resolver, error renderer, policy).
    pub fn set_middleware(&self, middleware: BearerAuth) {
        let middleware = Arc::new(middleware);
        self.update(|s| s.middleware = middleware);
    }

    pub fn middleware(&self) -> Arc<BearerAuth> {
        Arc::clone(&self.snapshot().middleware)
    }

    pub fn user_id_claim(&self) -> String {
        self.snapshot().user_id_claim.clone()
    }

    pub fn grant_claim(&self) -> Option<String> {
        self.snapshot().grant_claim.clone()
    }

    fn snapshot(&self) -> Arc<Settings> {
        // A panic while holding the lock cannot leave a torn value behind:
        // writers only ever store a fully built Arc.
        Arc::clone(&*self.settings.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut guard = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Settings::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }

    /// Validate the bearer token, require the claims, then run `inner` with
    /// `AuthCtx` in the request extensions.
    pub async fn authorize<F, Fut>(&self, req: Request, inner: F) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let settings = self.snapshot();
        let middleware = Arc::clone(&settings.middleware);

        middleware
            .handle(req, |mut req, token| async move {
                let auth_ctx = match settings.auth_ctx(&token) {
                    Ok(ctx) => ctx,
                    Err(err) => return err.into_response(),
                };

                // middleware → extractor への受け渡し
                req.extensions_mut().insert(auth_ctx);

                inner(req).await
            })
            .await
    }
}

/// ルートに認証 (署名検証 + claim 必須) を掛ける。
///
/// 例：
/// ```ignore
/// let protected = middleware::auth::access::apply(protected, state.authorizer.clone());
/// ```
pub fn apply<S>(router: Router<S>, authorizer: Arc<Authorizer>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(authorizer, access_middleware))
}

async fn access_middleware(
    State(authorizer): State<Arc<Authorizer>>,
    req: Request,
    next: Next,
) -> Response {
    authorizer.authorize(req, |req| next.run(req)).await
}
