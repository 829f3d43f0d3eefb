//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod client;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod token_source;

pub use handlers::AuthAppState;
pub use middleware::{
    AuthenticatedAccount, RoleCache, rate_limit_refresh, require_access_token, require_admin,
};
pub use router::{auth_router, auth_router_generic, auth_router_with_state};
pub use token_source::{BearerHeaderSource, QueryParamSource, TokenSource, TokenSourceChain};
