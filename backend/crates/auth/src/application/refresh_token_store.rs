//! Refresh Token Store
//!
//! Lifecycle of refresh tokens on top of [`RefreshTokenRepository`]:
//! create, lookup, best-effort touch, revoke, and the expiry sweep.
//!
//! Every repository call runs under the configured store deadline. Dropping
//! the returned future (client disconnect or deadline) drops the in-flight
//! query with it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kernel::id::{AccountId, RefreshTokenId};

use crate::application::config::AuthConfig;
use crate::domain::entity::RefreshToken;
use crate::domain::repository::RefreshTokenRepository;
use crate::error::{AuthError, AuthResult};

/// Size of the random part of a refresh token (256 bits)
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Run a store operation under `deadline`
pub(crate) async fn with_deadline<T, F>(
    deadline: Duration,
    operation: &'static str,
    fut: F,
) -> AuthResult<T>
where
    F: Future<Output = AuthResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = deadline.as_millis() as u64, "Store deadline exceeded");
            Err(AuthError::StoreTimeout)
        }
    }
}

pub struct RefreshTokenStore<R> {
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> Clone for RefreshTokenStore<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            config: Arc::clone(&self.config),
        }
    }
}

impl<R> RefreshTokenStore<R>
where
    R: RefreshTokenRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    fn chrono_ttl(&self, extended: bool) -> AuthResult<chrono::Duration> {
        chrono::Duration::from_std(self.config.refresh_ttl(extended))
            .map_err(|e| AuthError::Internal(format!("refresh token TTL out of range: {e}")))
    }

    /// Issue and persist a new refresh token
    pub async fn create(&self, account_id: AccountId, extended: bool) -> AuthResult<RefreshToken> {
        let token = RefreshToken::new(
            account_id,
            platform::crypto::random_token(REFRESH_TOKEN_BYTES),
            self.chrono_ttl(extended)?,
        )
        .ok_or_else(|| AuthError::Internal("refresh token expiry out of range".into()))?;

        with_deadline(
            self.config.store_timeout,
            "refresh_token.create",
            self.repo.create(&token),
        )
        .await?;

        tracing::debug!(
            account_id = %token.account_id,
            refresh_token_id = %token.id,
            extended,
            "Refresh token created"
        );

        Ok(token)
    }

    /// Look up a token, [`AuthError::NotFound`] when absent
    pub async fn get(&self, token: &str) -> AuthResult<RefreshToken> {
        with_deadline(
            self.config.store_timeout,
            "refresh_token.get",
            self.repo.find_by_token(token),
        )
        .await?
        .ok_or(AuthError::NotFound)
    }

    /// Record use of a token; failures are logged and swallowed
    pub async fn touch(&self, id: RefreshTokenId) {
        let result = with_deadline(
            self.config.store_timeout,
            "refresh_token.touch",
            self.repo.touch(&id, Utc::now()),
        )
        .await;

        if let Err(e) = result {
            tracing::warn!(refresh_token_id = %id, error = %e, "Failed to touch refresh token");
        }
    }

    /// Delete a token, [`AuthError::NotFound`] when nothing was deleted
    pub async fn revoke(&self, token: &str) -> AuthResult<AccountId> {
        with_deadline(
            self.config.store_timeout,
            "refresh_token.revoke",
            self.repo.delete_by_token(token),
        )
        .await?
        .ok_or(AuthError::NotFound)
    }

    /// Mark every token of an account revoked
    pub async fn revoke_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64> {
        with_deadline(
            self.config.store_timeout,
            "refresh_token.revoke_all",
            self.repo.revoke_all_for_account(account_id),
        )
        .await
    }

    /// Delete every token whose `expires_at` has passed
    pub async fn sweep(&self) -> AuthResult<u64> {
        let deleted = with_deadline(
            self.config.store_timeout,
            "refresh_token.sweep",
            self.repo.delete_expired(Utc::now()),
        )
        .await?;

        tracing::info!(refresh_tokens_deleted = deleted, "Swept expired refresh tokens");

        Ok(deleted)
    }
}
