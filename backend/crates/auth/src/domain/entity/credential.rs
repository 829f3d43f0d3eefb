//! Credential Entity
//!
//! Password hash of an account plus the one it replaced.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;
use platform::password::HashedPassword;

#[derive(Debug, Clone)]
pub struct Credential {
    pub account_id: AccountId,
    pub password_hash: HashedPassword,
    /// Hash in use before the last change
    pub last_password: Option<HashedPassword>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(account_id: AccountId, password_hash: HashedPassword) -> Self {
        Self {
            account_id,
            password_hash,
            last_password: None,
            updated_at: Utc::now(),
        }
    }

    /// Install a new hash, keeping the current one as `last_password`
    pub fn rotate(&mut self, new_hash: HashedPassword) {
        let previous = std::mem::replace(&mut self.password_hash, new_hash);
        self.last_password = Some(previous);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_keeps_one_previous_hash() {
        let first = HashedPassword::from_stored("$argon2id$first");
        let second = HashedPassword::from_stored("$argon2id$second");
        let third = HashedPassword::from_stored("$argon2id$third");

        let mut credential = Credential::new(AccountId::new(), first);
        credential.rotate(second.clone());
        assert_eq!(
            credential.last_password.as_ref().map(|h| h.as_phc_string()),
            Some("$argon2id$first")
        );

        credential.rotate(third);
        assert_eq!(credential.last_password, Some(second));
        assert_eq!(credential.password_hash.as_phc_string(), "$argon2id$third");
    }
}
