//! Password Change Use Case
//!
//! Replaces the password of an authenticated account and revokes all of its
//! refresh tokens. Neither the current nor the previous password may be
//! reused.

use std::sync::Arc;

use kernel::id::AccountId;
use platform::password::{ClearTextPassword, HashedPassword, PasswordHashError};

use crate::application::config::AuthConfig;
use crate::application::refresh_token_store::{RefreshTokenStore, with_deadline};
use crate::domain::repository::{CredentialRepository, RefreshTokenRepository};
use crate::error::{AuthError, AuthResult};

pub struct PasswordChangeInput {
    pub account_id: AccountId,
    pub current_password: String,
    pub new_password: String,
}

pub struct PasswordChangeUseCase<C, T>
where
    C: CredentialRepository,
    T: RefreshTokenRepository,
{
    credential_repo: Arc<C>,
    refresh_tokens: RefreshTokenStore<T>,
    config: Arc<AuthConfig>,
}

impl<C, T> PasswordChangeUseCase<C, T>
where
    C: CredentialRepository,
    T: RefreshTokenRepository + Send + Sync + 'static,
{
    pub fn new(
        credential_repo: Arc<C>,
        refresh_tokens: RefreshTokenStore<T>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            credential_repo,
            refresh_tokens,
            config,
        }
    }

    /// Returns the number of refresh tokens revoked
    pub async fn execute(&self, input: PasswordChangeInput) -> AuthResult<u64> {
        let deadline = self.config.store_timeout;

        let mut credential = with_deadline(
            deadline,
            "credential.find_by_account_id",
            self.credential_repo.find_by_account_id(&input.account_id),
        )
        .await?
        .ok_or(AuthError::Unauthorized)?;

        let current = ClearTextPassword::for_verification(input.current_password)
            .map_err(|_| AuthError::InvalidCredentials)?;
        let new = ClearTextPassword::new(input.new_password)
            .map_err(|e| AuthError::PasswordPolicy(e.to_string()))?;

        let current_hash = credential.password_hash.clone();
        let last_hash = credential.last_password.clone();
        let pepper = self.config.password_pepper.clone();

        let new_hash = tokio::task::spawn_blocking(move || {
            rehash_checked(&current, &new, &current_hash, last_hash.as_ref(), pepper.as_deref())
        })
        .await??;

        credential.rotate(new_hash);
        with_deadline(deadline, "credential.update", self.credential_repo.update(&credential))
            .await?;

        let revoked = self
            .refresh_tokens
            .revoke_all_for_account(&input.account_id)
            .await?;

        tracing::info!(
            account_id = %input.account_id,
            refresh_tokens_revoked = revoked,
            "Password changed"
        );

        Ok(revoked)
    }
}

/// Verify `current`, refuse reuse, then hash `new`
fn rehash_checked(
    current: &ClearTextPassword,
    new: &ClearTextPassword,
    current_hash: &HashedPassword,
    last_hash: Option<&HashedPassword>,
    pepper: Option<&[u8]>,
) -> AuthResult<HashedPassword> {
    match current_hash.verify(current, pepper) {
        Ok(()) => {}
        Err(PasswordHashError::Mismatch) => return Err(AuthError::InvalidCredentials),
        Err(e) => return Err(AuthError::Internal(format!("stored password hash is unusable: {e}"))),
    }

    if current_hash.verify(new, pepper).is_ok() {
        return Err(AuthError::PasswordPolicy(
            "New password must differ from the current password".into(),
        ));
    }

    if let Some(last) = last_hash {
        match last.verify(new, pepper) {
            Ok(()) => {
                return Err(AuthError::PasswordPolicy(
                    "New password must not reuse the previous password".into(),
                ));
            }
            Err(PasswordHashError::Mismatch) => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unusable previous password hash"),
        }
    }

    new.hash(pepper)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
}
