//! Value Object Module

pub mod account_role;
pub mod account_status;

pub use account_role::AccountRole;
pub use account_status::AccountStatus;
