//! In-Memory Repository
//!
//! Implements every auth repository trait over process memory. Used by the
//! test suites and handy for running the router without a database. Cheap
//! to clone; clones share state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, RefreshTokenId};
use parking_lot::RwLock;
use platform::password::{ClearTextPassword, HashedPassword};

use crate::domain::entity::{Account, Credential, RefreshToken};
use crate::domain::repository::{AccountRepository, CredentialRepository, RefreshTokenRepository};
use crate::domain::value_object::{AccountRole, AccountStatus};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    credentials: HashMap<AccountId, Credential>,
    /// Keyed by token value
    refresh_tokens: HashMap<String, RefreshToken>,
    latency: Duration,
    unavailable: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryAuthRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Seeding and inspection
    // ========================================================================

    /// Create an account with a hashed password
    pub fn register(
        &self,
        username: &str,
        password: &str,
        role: AccountRole,
        status: AccountStatus,
    ) -> AuthResult<AccountId> {
        let hash = ClearTextPassword::for_verification(password.to_string())
            .map_err(|e| AuthError::PasswordPolicy(e.to_string()))?
            .hash(None)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let account = Account::new(username, role, status);
        let account_id = account.id;

        let mut state = self.state.write();
        state
            .credentials
            .insert(account_id, Credential::new(account_id, hash));
        state.accounts.insert(account_id, account);
        Ok(account_id)
    }

    pub fn set_status(&self, account_id: &AccountId, status: AccountStatus) {
        if let Some(account) = self.state.write().accounts.get_mut(account_id) {
            account.status = status;
        }
    }

    pub fn set_role(&self, account_id: &AccountId, role: AccountRole) {
        if let Some(account) = self.state.write().accounts.get_mut(account_id) {
            account.role = role;
        }
    }

    pub fn remove_account(&self, account_id: &AccountId) {
        let mut state = self.state.write();
        state.accounts.remove(account_id);
        state.credentials.remove(account_id);
        state.refresh_tokens.retain(|_, t| t.account_id != *account_id);
    }

    /// Replace the stored hash with something that is not a PHC string
    pub fn corrupt_password_hash(&self, account_id: &AccountId) {
        if let Some(credential) = self.state.write().credentials.get_mut(account_id) {
            credential.password_hash = HashedPassword::from_stored("not-a-phc-string");
        }
    }

    pub fn insert_refresh_token(&self, token: RefreshToken) {
        self.state
            .write()
            .refresh_tokens
            .insert(token.token.clone(), token);
    }

    pub fn refresh_token(&self, token: &str) -> Option<RefreshToken> {
        self.state.read().refresh_tokens.get(token).cloned()
    }

    pub fn refresh_token_count(&self) -> usize {
        self.state.read().refresh_tokens.len()
    }

    pub fn credential(&self, account_id: &AccountId) -> Option<Credential> {
        self.state.read().credentials.get(account_id).cloned()
    }

    /// Delay every repository call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state.write().latency = latency;
    }

    /// Make every repository call fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }

    async fn io(&self) -> AuthResult<()> {
        let (latency, unavailable) = {
            let state = self.state.read();
            (state.latency, state.unavailable)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if unavailable {
            return Err(AuthError::Internal("in-memory store unavailable".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for InMemoryAuthRepository {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Account>> {
        self.io().await?;
        Ok(self
            .state
            .read()
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>> {
        self.io().await?;
        Ok(self.state.read().accounts.get(account_id).cloned())
    }
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for InMemoryAuthRepository {
    async fn find_by_account_id(&self, account_id: &AccountId) -> AuthResult<Option<Credential>> {
        self.io().await?;
        Ok(self.state.read().credentials.get(account_id).cloned())
    }

    async fn update(&self, credential: &Credential) -> AuthResult<()> {
        self.io().await?;
        self.state
            .write()
            .credentials
            .insert(credential.account_id, credential.clone());
        Ok(())
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

impl RefreshTokenRepository for InMemoryAuthRepository {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.io().await?;
        let mut state = self.state.write();
        if state.refresh_tokens.contains_key(&token.token) {
            return Err(AuthError::Internal("duplicate refresh token".into()));
        }
        state
            .refresh_tokens
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        self.io().await?;
        Ok(self.state.read().refresh_tokens.get(token).cloned())
    }

    async fn touch(&self, id: &RefreshTokenId, used_at: DateTime<Utc>) -> AuthResult<()> {
        self.io().await?;
        if let Some(token) = self
            .state
            .write()
            .refresh_tokens
            .values_mut()
            .find(|t| t.id == *id)
        {
            token.last_used_at = Some(used_at);
        }
        Ok(())
    }

    async fn delete_by_token(&self, token: &str) -> AuthResult<Option<AccountId>> {
        self.io().await?;
        Ok(self
            .state
            .write()
            .refresh_tokens
            .remove(token)
            .map(|t| t.account_id))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        self.io().await?;
        let mut state = self.state.write();
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - state.refresh_tokens.len()) as u64)
    }

    async fn revoke_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64> {
        self.io().await?;
        let mut revoked = 0;
        for token in self.state.write().refresh_tokens.values_mut() {
            if token.account_id == *account_id && !token.revoked {
                token.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}
