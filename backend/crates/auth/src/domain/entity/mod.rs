//! Entity Module

pub mod account;
pub mod credential;
pub mod refresh_token;

pub use account::Account;
pub use credential::Credential;
pub use refresh_token::RefreshToken;
