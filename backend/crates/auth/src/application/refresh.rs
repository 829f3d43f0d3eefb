//! Refresh Use Case
//!
//! Exchanges a refresh token for a new access token. The refresh token is
//! not rotated: it stays valid until it expires or is revoked.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::AccountId;

use crate::application::access_token::AccessTokenCodec;
use crate::application::refresh_token_store::RefreshTokenStore;
use crate::domain::repository::RefreshTokenRepository;
use crate::error::{AuthError, AuthResult};

#[derive(Debug)]
pub struct RefreshOutput {
    pub account_id: AccountId,
    pub access_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

pub struct RefreshUseCase<T> {
    refresh_tokens: RefreshTokenStore<T>,
    codec: Arc<AccessTokenCodec>,
}

impl<T> RefreshUseCase<T>
where
    T: RefreshTokenRepository + Send + Sync + 'static,
{
    pub fn new(refresh_tokens: RefreshTokenStore<T>, codec: Arc<AccessTokenCodec>) -> Self {
        Self {
            refresh_tokens,
            codec,
        }
    }

    pub async fn execute(&self, refresh_token: &str) -> AuthResult<RefreshOutput> {
        if refresh_token.is_empty() {
            return Err(AuthError::TokenInvalid);
        }

        let stored = match self.refresh_tokens.get(refresh_token).await {
            Ok(stored) => stored,
            Err(AuthError::NotFound) => return Err(AuthError::TokenInvalid),
            Err(e) => return Err(e),
        };

        if stored.revoked {
            return Err(AuthError::TokenRevoked);
        }
        if stored.is_expired_at(Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        let access_token = self.codec.mint(&stored.account_id)?;

        // Best effort, the response does not wait for it
        let store = self.refresh_tokens.clone();
        let id = stored.id;
        tokio::spawn(async move {
            store.touch(id).await;
        });

        tracing::debug!(account_id = %stored.account_id, "Access token refreshed");

        Ok(RefreshOutput {
            account_id: stored.account_id,
            access_token,
            expires_in: self.codec.ttl_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::AuthConfig;
    use crate::domain::entity::RefreshToken;
    use crate::infra::memory::InMemoryAuthRepository;
    use std::time::Duration;

    fn setup() -> (InMemoryAuthRepository, RefreshTokenStore<InMemoryAuthRepository>, RefreshUseCase<InMemoryAuthRepository>, Arc<AccessTokenCodec>) {
        let config = Arc::new(AuthConfig::default());
        let repo = InMemoryAuthRepository::new();
        let store = RefreshTokenStore::new(Arc::new(repo.clone()), config.clone());
        let codec = Arc::new(AccessTokenCodec::new(&config.signing_secret, config.access_token_ttl));
        let use_case = RefreshUseCase::new(store.clone(), codec.clone());
        (repo, store, use_case, codec)
    }

    #[tokio::test]
    async fn test_refresh_mints_for_same_account_without_rotation() {
        let (repo, store, use_case, codec) = setup();
        let account_id = AccountId::new();
        let created = store.create(account_id, false).await.unwrap();

        let first = use_case.execute(&created.token).await.unwrap();
        let second = use_case.execute(&created.token).await.unwrap();

        assert_eq!(first.account_id, account_id);
        assert_eq!(first.expires_in, 900);
        assert_ne!(first.access_token, second.access_token);
        assert_eq!(codec.extract_subject(&second.access_token).unwrap(), account_id);

        // touch runs in the background
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stored = repo.refresh_token(&created.token).unwrap();
        assert!(stored.last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_token_is_invalid() {
        let (_, _, use_case, _) = setup();
        assert!(matches!(use_case.execute("nope").await, Err(AuthError::TokenInvalid)));
        assert!(matches!(use_case.execute("").await, Err(AuthError::TokenInvalid)));
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let (repo, _, use_case, _) = setup();
        let mut token = RefreshToken::new(AccountId::new(), "revoked".into(), chrono::Duration::hours(1)).unwrap();
        token.revoked = true;
        repo.insert_refresh_token(token);

        assert!(matches!(use_case.execute("revoked").await, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (repo, _, use_case, _) = setup();
        let mut token = RefreshToken::new(AccountId::new(), "expired".into(), chrono::Duration::hours(1)).unwrap();
        token.expires_at = Utc::now() - chrono::Duration::seconds(1);
        repo.insert_refresh_token(token);

        assert!(matches!(use_case.execute("expired").await, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_revoked_wins_over_expired() {
        let (repo, _, use_case, _) = setup();
        let mut token = RefreshToken::new(AccountId::new(), "both".into(), chrono::Duration::hours(1)).unwrap();
        token.expires_at = Utc::now() - chrono::Duration::seconds(1);
        token.revoked = true;
        repo.insert_refresh_token(token);

        assert!(matches!(use_case.execute("both").await, Err(AuthError::TokenRevoked)));
    }
}
