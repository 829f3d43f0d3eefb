//! Auth Router

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::application::config::AuthConfig;
use crate::domain::repository::AuthStore;
use crate::infra::postgres::PgAuthRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware;

/// Create the Auth router with PostgreSQL repository
pub fn auth_router(repo: PgAuthRepository, config: AuthConfig) -> Router {
    auth_router_generic(repo, config)
}

/// Create a generic Auth router for any repository implementation
pub fn auth_router_generic<R>(repo: R, config: AuthConfig) -> Router
where
    R: AuthStore,
{
    auth_router_with_state(AuthAppState::new(repo, config))
}

/// Build the router around an existing state (custom audit sink, token sources)
pub fn auth_router_with_state<R>(state: AuthAppState<R>) -> Router
where
    R: AuthStore,
{
    let refresh: Router<AuthAppState<R>> = Router::new()
        .route("/auth/refresh", post(handlers::refresh::<R>))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit_refresh::<R>,
        ));

    let authenticated: Router<AuthAppState<R>> = Router::new()
        .route("/auth/me", get(handlers::me))
        .route("/auth/password", post(handlers::change_password::<R>))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_access_token::<R>,
        ));

    let admin: Router<AuthAppState<R>> = Router::new()
        .route("/auth/admin/me", get(handlers::me))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_admin::<R>,
        ));

    Router::new()
        .route("/login", post(handlers::login::<R>))
        .route("/logout", post(handlers::logout::<R>))
        .merge(refresh)
        .merge(authenticated)
        .merge(admin)
        .with_state(state)
}
