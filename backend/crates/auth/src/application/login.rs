//! Login Use Case
//!
//! Authenticates a user and issues an access + refresh token pair.

use std::sync::Arc;

use kernel::id::AccountId;
use platform::password::{ClearTextPassword, PasswordHashError, verify_against_dummy};

use crate::application::access_token::AccessTokenCodec;
use crate::application::config::AuthConfig;
use crate::application::refresh_token_store::{RefreshTokenStore, with_deadline};
use crate::domain::repository::{AccountRepository, CredentialRepository, RefreshTokenRepository};
use crate::error::{AuthError, AuthResult};

/// Login input
pub struct LoginInput {
    pub username: String,
    pub password: String,
    /// Issue a long-lived refresh token
    pub remember_me: bool,
}

/// Tokens issued at login
#[derive(Debug)]
pub struct TokenPair {
    pub account_id: AccountId,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub access_expires_in: u64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: u64,
}

/// Login use case
pub struct LoginUseCase<A, C, T>
where
    A: AccountRepository,
    C: CredentialRepository,
    T: RefreshTokenRepository,
{
    account_repo: Arc<A>,
    credential_repo: Arc<C>,
    refresh_tokens: RefreshTokenStore<T>,
    codec: Arc<AccessTokenCodec>,
    config: Arc<AuthConfig>,
}

impl<A, C, T> LoginUseCase<A, C, T>
where
    A: AccountRepository,
    C: CredentialRepository,
    T: RefreshTokenRepository + Send + Sync + 'static,
{
    pub fn new(
        account_repo: Arc<A>,
        credential_repo: Arc<C>,
        refresh_tokens: RefreshTokenStore<T>,
        codec: Arc<AccessTokenCodec>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            account_repo,
            credential_repo,
            refresh_tokens,
            codec,
            config,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> AuthResult<TokenPair> {
        let password = ClearTextPassword::for_verification(input.password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let deadline = self.config.store_timeout;
        let account = with_deadline(
            deadline,
            "account.find_by_username",
            self.account_repo.find_by_username(&input.username),
        )
        .await?;

        let credential = match &account {
            Some(account) => {
                with_deadline(
                    deadline,
                    "credential.find_by_account_id",
                    self.credential_repo.find_by_account_id(&account.id),
                )
                .await?
            }
            None => None,
        };

        let pepper = self.config.password_pepper.clone();

        let (account, credential) = match (account, credential) {
            (Some(account), Some(credential)) => (account, credential),
            _ => {
                // Same Argon2 cost as a real check
                tokio::task::spawn_blocking(move || {
                    verify_against_dummy(&password, pepper.as_deref())
                })
                .await?;
                return Err(AuthError::InvalidCredentials);
            }
        };

        let hash = credential.password_hash.clone();
        let verified =
            tokio::task::spawn_blocking(move || hash.verify(&password, pepper.as_deref())).await?;

        match verified {
            Ok(()) => {}
            Err(PasswordHashError::Mismatch) => return Err(AuthError::InvalidCredentials),
            Err(e) => {
                return Err(AuthError::Internal(format!(
                    "stored password hash for account {} is unusable: {e}",
                    account.id
                )));
            }
        }

        if !account.can_login() {
            tracing::info!(account_id = %account.id, status = %account.status, "Login refused for inactive account");
            return Err(AuthError::PendingActivation);
        }

        let access_token = self.codec.mint(&account.id)?;
        let refresh_token = self
            .refresh_tokens
            .create(account.id, input.remember_me)
            .await?;

        tracing::info!(
            account_id = %account.id,
            remember_me = input.remember_me,
            "User logged in"
        );

        Ok(TokenPair {
            account_id: account.id,
            access_token,
            refresh_token: refresh_token.token,
            access_expires_in: self.codec.ttl_secs(),
            refresh_expires_in: self.config.refresh_ttl(input.remember_me).as_secs(),
        })
    }
}
