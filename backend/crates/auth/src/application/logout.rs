//! Logout Use Case
//!
//! Deletes the presented refresh token. Access tokens already issued stay
//! valid until they expire.

use kernel::id::AccountId;

use crate::application::refresh_token_store::RefreshTokenStore;
use crate::domain::repository::RefreshTokenRepository;
use crate::error::AuthResult;

pub struct LogoutUseCase<T> {
    refresh_tokens: RefreshTokenStore<T>,
}

impl<T> LogoutUseCase<T>
where
    T: RefreshTokenRepository + Send + Sync + 'static,
{
    pub fn new(refresh_tokens: RefreshTokenStore<T>) -> Self {
        Self { refresh_tokens }
    }

    /// Returns the owner of the revoked token
    pub async fn execute(&self, refresh_token: &str) -> AuthResult<AccountId> {
        let account_id = self.refresh_tokens.revoke(refresh_token).await?;

        tracing::info!(account_id = %account_id, "User logged out");

        Ok(account_id)
    }
}
