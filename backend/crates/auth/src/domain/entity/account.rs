//! Account Entity
//!
//! Owned by account management; this service only reads it.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;

use crate::domain::value_object::{AccountRole, AccountStatus};

#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub role: AccountRole,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(username: impl Into<String>, role: AccountRole, status: AccountStatus) -> Self {
        Self {
            id: AccountId::new(),
            username: username.into(),
            role,
            status,
            created_at: Utc::now(),
        }
    }

    pub fn can_login(&self) -> bool {
        self.status.can_login()
    }
}
