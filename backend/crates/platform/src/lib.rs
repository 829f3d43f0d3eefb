//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Random token generation and URL-safe Base64
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Client identification from request headers
//! - Per-client token bucket rate limiting

pub mod client;
pub mod crypto;
pub mod password;
pub mod rate_limit;
