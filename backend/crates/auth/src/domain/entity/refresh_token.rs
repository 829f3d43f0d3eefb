//! Refresh Token Entity
//!
//! Opaque, server-stored credential used only to obtain new access tokens.
//! The token value is a bearer secret and never appears in `Debug` output.

use chrono::{DateTime, Duration, Utc};
use kernel::id::{AccountId, RefreshTokenId};
use std::fmt;

#[derive(Clone)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    /// Opaque value handed to the client
    pub token: String,
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Updated best-effort on each successful refresh
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

impl RefreshToken {
    /// Create a new refresh token valid for `ttl`
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    /// Returns `None` when the expiry falls outside the representable range.
    pub fn new(account_id: AccountId, token: String, ttl: Duration) -> Option<Self> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl)?;

        Some(Self {
            id: RefreshTokenId::new(),
            token,
            account_id,
            expires_at,
            created_at: now,
            last_used_at: None,
            revoked: false,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Not revoked and not expired
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }

    /// Seconds from creation to expiry
    pub fn lifetime_secs(&self) -> i64 {
        (self.expires_at - self.created_at).num_seconds()
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshToken")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("last_used_at", &self.last_used_at)
            .field("revoked", &self.revoked)
            .finish()
    }
}
