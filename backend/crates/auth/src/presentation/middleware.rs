//! Auth Middleware
//!
//! Request gates for protected routes and the refresh endpoint. Use with
//! `axum::middleware::from_fn_with_state` and an [`AuthAppState`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use kernel::id::AccountId;
use parking_lot::Mutex;

use crate::application::audit::ClientContext;
use crate::application::refresh_token_store::with_deadline;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::AccountRole;
use crate::error::{AuthError, AuthResult};
use crate::presentation::handlers::AuthAppState;

/// Verified caller, stored in request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub account_id: AccountId,
}

/// Middleware that requires a valid access token
pub async fn require_access_token<R>(
    State(state): State<AuthAppState<R>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
{
    let account_id = authenticate(&state, &req)?;
    req.extensions_mut()
        .insert(AuthenticatedAccount { account_id });

    Ok(next.run(req).await)
}

/// Middleware that requires a valid access token for an admin account
///
/// The role is read from the store (or the role cache) on every request so a
/// demoted admin loses access without waiting for the token to expire.
pub async fn require_admin<R>(
    State(state): State<AuthAppState<R>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
{
    let account_id = authenticate(&state, &req)?;

    let role = lookup_role(&state, &account_id).await?;
    if !role.is_admin() {
        tracing::info!(account_id = %account_id, role = role.code(), "Admin route denied");
        return Err(AuthError::Unauthorized);
    }

    req.extensions_mut()
        .insert(AuthenticatedAccount { account_id });

    Ok(next.run(req).await)
}

/// Per-client token bucket in front of the refresh endpoint
pub async fn rate_limit_refresh<R>(
    State(state): State<AuthAppState<R>>,
    client: ClientContext,
    req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
{
    let decision = state.limiter.check(&client.rate_limit_key());
    if !decision.allowed {
        let retry_after_secs = decision.retry_after_secs();
        state.audit.rate_limit_exceeded(&client, retry_after_secs);
        return Err(AuthError::RateLimited { retry_after_secs });
    }

    Ok(next.run(req).await)
}

fn authenticate<R>(state: &AuthAppState<R>, req: &Request) -> AuthResult<AccountId>
where
    R: AuthStore,
{
    let token = state
        .token_sources
        .extract(req.uri(), req.headers())
        .ok_or(AuthError::Unauthorized)?;

    state.codec.extract_subject(&token)
}

async fn lookup_role<R>(state: &AuthAppState<R>, account_id: &AccountId) -> AuthResult<AccountRole>
where
    R: AuthStore,
{
    if let Some(role) = state.role_cache.get(account_id) {
        return Ok(role);
    }

    let account = with_deadline(
        state.config.store_timeout,
        "account.find_by_id",
        state.repo.find_by_id(account_id),
    )
    .await?
    .ok_or(AuthError::Unauthorized)?;

    state.role_cache.insert(*account_id, account.role);
    Ok(account.role)
}

// ============================================================================
// Role cache
// ============================================================================

/// Short-lived cache of account roles for admin checks
///
/// A zero TTL disables it. A role change takes effect after at most one TTL.
#[derive(Debug)]
pub struct RoleCache {
    ttl: Duration,
    entries: Mutex<HashMap<AccountId, (AccountRole, Instant)>>,
}

impl RoleCache {
    /// Entries kept before expired ones are pruned on insert
    const PRUNE_THRESHOLD: usize = 1024;

    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, account_id: &AccountId) -> Option<AccountRole> {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.lock();
        let (role, cached_at) = entries.get(account_id)?;
        (cached_at.elapsed() < self.ttl).then_some(*role)
    }

    pub fn insert(&self, account_id: AccountId, role: AccountRole) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.entries.lock();
        if entries.len() >= Self::PRUNE_THRESHOLD {
            let ttl = self.ttl;
            entries.retain(|_, (_, cached_at)| cached_at.elapsed() < ttl);
        }
        entries.insert(account_id, (role, Instant::now()));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = RoleCache::new(Duration::ZERO);
        let id = AccountId::new();
        cache.insert(id, AccountRole::Admin);

        assert!(cache.is_empty());
        assert_eq!(cache.get(&id), None);
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let cache = RoleCache::new(Duration::from_secs(60));
        let id = AccountId::new();
        cache.insert(id, AccountRole::Admin);

        assert_eq!(cache.get(&id), Some(AccountRole::Admin));
        assert_eq!(cache.get(&AccountId::new()), None);
    }

    #[test]
    fn test_cache_entry_expires() {
        let cache = RoleCache::new(Duration::from_millis(20));
        let id = AccountId::new();
        cache.insert(id, AccountRole::Admin);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&id), None);
    }
}
