//! HTTP Handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use std::sync::Arc;

use platform::rate_limit::TokenBucketLimiter;

use crate::application::audit::{AuditLogger, AuditSink, ClientContext};
use crate::application::config::AuthConfig;
use crate::application::{
    AccessTokenCodec, LoginInput, LoginUseCase, LogoutUseCase, PasswordChangeInput,
    PasswordChangeUseCase, RefreshTokenStore, RefreshUseCase,
};
use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, RefreshResponse,
    RefreshTokenRequest,
};
use crate::presentation::middleware::{AuthenticatedAccount, RoleCache};
use crate::presentation::token_source::TokenSourceChain;

/// Shared state for auth handlers and middleware
pub struct AuthAppState<R>
where
    R: AuthStore,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub codec: Arc<AccessTokenCodec>,
    pub limiter: Arc<TokenBucketLimiter>,
    pub audit: AuditLogger,
    pub token_sources: Arc<TokenSourceChain>,
    pub role_cache: Arc<RoleCache>,
}

impl<R> Clone for AuthAppState<R>
where
    R: AuthStore,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
            codec: self.codec.clone(),
            limiter: self.limiter.clone(),
            audit: self.audit.clone(),
            token_sources: self.token_sources.clone(),
            role_cache: self.role_cache.clone(),
        }
    }
}

impl<R> AuthAppState<R>
where
    R: AuthStore,
{
    pub fn new(repo: R, config: AuthConfig) -> Self {
        let codec = AccessTokenCodec::new(&config.signing_secret, config.access_token_ttl);
        let limiter = TokenBucketLimiter::new(config.refresh_rate_limit.clone());
        let role_cache = RoleCache::new(config.role_cache_ttl);

        Self {
            repo: Arc::new(repo),
            config: Arc::new(config),
            codec: Arc::new(codec),
            limiter: Arc::new(limiter),
            audit: AuditLogger::default(),
            token_sources: Arc::new(TokenSourceChain::default()),
            role_cache: Arc::new(role_cache),
        }
    }

    /// Send audit events somewhere other than the tracing log
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = AuditLogger::new(sink);
        self
    }

    pub fn with_token_sources(mut self, sources: TokenSourceChain) -> Self {
        self.token_sources = Arc::new(sources);
        self
    }

    pub fn refresh_token_store(&self) -> RefreshTokenStore<R> {
        RefreshTokenStore::new(self.repo.clone(), self.config.clone())
    }
}

// ============================================================================
// Login
// ============================================================================

/// POST /login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    client: ClientContext,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<Json<LoginResponse>>
where
    R: AuthStore,
{
    let Json(req) = payload.map_err(malformed)?;

    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.refresh_token_store(),
        state.codec.clone(),
        state.config.clone(),
    );

    // req のムーブ後も監査ログに使う
    let username = req.username.clone();
    let remember_me = req.remember_me;

    let input = LoginInput {
        username: req.username,
        password: req.password,
        remember_me,
    };

    match use_case.execute(input).await {
        Ok(pair) => {
            state
                .audit
                .login_success(&pair.account_id, &username, &client, remember_me);

            Ok(Json(LoginResponse {
                token: pair.access_token.clone(),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
                access_expires_in: pair.access_expires_in,
                refresh_expires_in: pair.refresh_expires_in,
            }))
        }
        Err(e) => {
            state.audit.login_failed(&username, &client, failure_reason(&e));
            Err(e)
        }
    }
}

// ============================================================================
// Refresh
// ============================================================================

/// POST /auth/refresh
pub async fn refresh<R>(
    State(state): State<AuthAppState<R>>,
    client: ClientContext,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> AuthResult<Json<RefreshResponse>>
where
    R: AuthStore,
{
    let Json(req) = payload.map_err(malformed)?;

    let use_case = RefreshUseCase::new(state.refresh_token_store(), state.codec.clone());

    match use_case.execute(&req.refresh_token).await {
        Ok(output) => {
            state.audit.refresh_success(&output.account_id, &client);
            Ok(Json(RefreshResponse {
                access_token: output.access_token,
                expires_in: output.expires_in,
            }))
        }
        Err(e) => {
            state.audit.refresh_failed(&client, failure_reason(&e));
            Err(e)
        }
    }
}

// ============================================================================
// Logout
// ============================================================================

/// POST /logout
pub async fn logout<R>(
    State(state): State<AuthAppState<R>>,
    client: ClientContext,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
{
    let Json(req) = payload.map_err(malformed)?;

    let account_id = LogoutUseCase::new(state.refresh_token_store())
        .execute(&req.refresh_token)
        .await?;

    state.audit.logout(&account_id, &client);

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Password change (requires authentication)
// ============================================================================

/// POST /auth/password
pub async fn change_password<R>(
    State(state): State<AuthAppState<R>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
{
    let Json(req) = payload.map_err(malformed)?;

    let use_case = PasswordChangeUseCase::new(
        state.repo.clone(),
        state.refresh_token_store(),
        state.config.clone(),
    );

    let revoked = use_case
        .execute(PasswordChangeInput {
            account_id: caller.account_id,
            current_password: req.current_password,
            new_password: req.new_password,
        })
        .await?;

    tracing::info!(account_id = %caller.account_id, revoked, "Password changed");

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Caller info
// ============================================================================

/// GET /auth/me, GET /auth/admin/me
pub async fn me(Extension(caller): Extension<AuthenticatedAccount>) -> Json<MeResponse> {
    Json(MeResponse {
        account_id: caller.account_id.to_string(),
    })
}

// ============================================================================
// Helper Functions
// ============================================================================

fn malformed(rejection: JsonRejection) -> AuthError {
    AuthError::MalformedRequest(rejection.body_text())
}

/// Audit message for a failed login or refresh; never echoes secrets
fn failure_reason(error: &AuthError) -> &'static str {
    match error {
        AuthError::InvalidCredentials => "invalid credentials",
        AuthError::PendingActivation => "account pending activation",
        AuthError::TokenInvalid => "invalid refresh token",
        AuthError::TokenExpired => "refresh token expired",
        AuthError::TokenRevoked => "refresh token revoked",
        e if e.is_internal() => "internal error",
        _ => "rejected",
    }
}
