use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    #[default]
    User,
    Admin,
}

impl AccountRole {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            AccountRole::User => "user",
            AccountRole::Admin => "admin",
        }
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, AccountRole::Admin)
    }

    /// `None` for codes this service does not know
    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "user" => Some(AccountRole::User),
            "admin" => Some(AccountRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_role_from_code() {
        assert_eq!(AccountRole::from_code("user"), Some(AccountRole::User));
        assert_eq!(AccountRole::from_code("admin"), Some(AccountRole::Admin));
        assert_eq!(AccountRole::from_code("super_admin"), None);
        assert_eq!(AccountRole::from_code("Admin"), None);
    }

    #[test]
    fn test_account_role_display() {
        assert_eq!(AccountRole::User.to_string(), "user");
        assert_eq!(AccountRole::Admin.to_string(), "admin");
    }

    #[test]
    fn test_account_role_checks() {
        assert!(!AccountRole::User.is_admin());
        assert!(AccountRole::Admin.is_admin());
    }
}
