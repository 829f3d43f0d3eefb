//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases, token codec, refresh token store, audit log
//! - `infra/` - PostgreSQL and in-memory repository implementations
//! - `presentation/` - HTTP handlers, DTOs, middleware, router
//!
//! ## Features
//! - Username + password login issuing an access/refresh token pair
//! - Access token refresh, rate limited per client IP
//! - Logout (refresh token revocation) and password change
//! - Bearer / query-parameter access token middleware, admin gate
//! - Structured security audit events (`tracing` target `audit`)
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional pepper
//! - Access tokens: HS256 JWS, short-lived, verified without store access
//! - Refresh tokens: 256-bit random opaque strings, stored server-side
//! - Unknown users and wrong passwords are indistinguishable to the caller

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{AuthConfig, SigningSecret};
pub use application::{RefreshTokenStore, spawn_refresh_token_sweeper};
pub use error::{AuthError, AuthResult};
pub use infra::memory::InMemoryAuthRepository;
pub use infra::postgres::PgAuthRepository;
pub use presentation::handlers::AuthAppState;
pub use presentation::router::{auth_router, auth_router_generic, auth_router_with_state};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
