//! Application Layer
//!
//! Use cases and application services.

pub mod access_token;
pub mod audit;
pub mod change_password;
pub mod config;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod refresh_token_store;
pub mod sweep;

// Re-exports
pub use access_token::{AccessClaims, AccessTokenCodec};
pub use audit::{AuditEvent, AuditEventType, AuditLogger, AuditSink, ClientContext, MemoryAuditSink, TracingAuditSink};
pub use change_password::{PasswordChangeInput, PasswordChangeUseCase};
pub use config::{AuthConfig, SigningSecret};
pub use login::{LoginInput, LoginUseCase, TokenPair};
pub use logout::LogoutUseCase;
pub use refresh::{RefreshOutput, RefreshUseCase};
pub use refresh_token_store::RefreshTokenStore;
pub use sweep::spawn_refresh_token_sweeper;
