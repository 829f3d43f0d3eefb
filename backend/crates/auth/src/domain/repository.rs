//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, RefreshTokenId};

use crate::domain::entity::{Account, Credential, RefreshToken};
use crate::error::AuthResult;

/// Account lookups (accounts are managed elsewhere)
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Find account by exact user name
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Account>>;

    /// Find account by ID
    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>>;
}

/// Password credential repository trait
#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    /// Find credential by account ID
    async fn find_by_account_id(&self, account_id: &AccountId) -> AuthResult<Option<Credential>>;

    /// Persist a changed password hash
    async fn update(&self, credential: &Credential) -> AuthResult<()>;
}

/// Refresh token repository trait
#[trait_variant::make(RefreshTokenRepository: Send)]
pub trait LocalRefreshTokenRepository {
    /// Insert a new token
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Exact-match lookup by token value
    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>>;

    /// Set `last_used_at`
    async fn touch(&self, id: &RefreshTokenId, used_at: DateTime<Utc>) -> AuthResult<()>;

    /// Delete by token value, returning the owner if a row was removed
    async fn delete_by_token(&self, token: &str) -> AuthResult<Option<AccountId>>;

    /// Delete every token with `expires_at < now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;

    /// Mark every live token of an account as revoked
    async fn revoke_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64>;
}

/// Everything the HTTP layer needs from one backing store
pub trait AuthStore:
    AccountRepository + CredentialRepository + RefreshTokenRepository + Send + Sync + 'static
{
}

impl<T> AuthStore for T where
    T: AccountRepository + CredentialRepository + RefreshTokenRepository + Send + Sync + 'static
{
}
