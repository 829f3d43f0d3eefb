//! Access Token Codec
//!
//! Short-lived, stateless access tokens: compact JWS signed with HS256.
//! Verification accepts only the HMAC family and applies no leeway.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use kernel::id::AccountId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::config::SigningSecret;
use crate::error::{AuthError, AuthResult};

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account ID
    pub sub: String,
    pub authorized: bool,
    /// Expiry (Unix seconds)
    pub exp: i64,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Unique token ID
    pub jti: String,
}

/// Mints and verifies access tokens with a secret injected at construction
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl AccessTokenCodec {
    pub fn new(secret: &SigningSecret, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Token lifetime in whole seconds
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Issue a token for `account_id` expiring after the configured TTL
    pub fn mint(&self, account_id: &AccountId) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| AuthError::Internal("access token expiry out of range".into()))?;
        let claims = AccessClaims {
            sub: account_id.to_string(),
            authorized: true,
            exp,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign access token: {e}")))
    }

    /// Verify signature, algorithm, expiry and the `authorized` flag
    pub fn decode(&self, token: &str) -> AuthResult<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })?;

        if !data.claims.authorized {
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims)
    }

    pub fn verify(&self, token: &str) -> AuthResult<()> {
        self.decode(token).map(|_| ())
    }

    /// Account ID of a verified token
    pub fn extract_subject(&self, token: &str) -> AuthResult<AccountId> {
        let claims = self.decode(token)?;
        claims.sub.parse().map_err(|_| AuthError::TokenInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::crypto::to_base64_url;

    fn codec() -> AccessTokenCodec {
        AccessTokenCodec::new(&SigningSecret::new(b"0123456789abcdef0123456789abcdef".to_vec()), Duration::from_secs(900))
    }

    fn sign(codec: &AccessTokenCodec, alg: Algorithm, claims: &AccessClaims) -> String {
        encode(&Header::new(alg), claims, &codec.encoding_key).unwrap()
    }

    fn claims_for(account_id: &AccountId, exp_offset: i64, authorized: bool) -> AccessClaims {
        let now = Utc::now().timestamp();
        AccessClaims {
            sub: account_id.to_string(),
            authorized,
            exp: now + exp_offset,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_mint_then_extract_subject() {
        let codec = codec();
        let account_id = AccountId::new();

        let token = codec.mint(&account_id).unwrap();
        assert!(codec.verify(&token).is_ok());
        assert_eq!(codec.extract_subject(&token).unwrap(), account_id);

        let claims = codec.decode(&token).unwrap();
        assert!(claims.authorized);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_tokens_minted_together_differ() {
        let codec = codec();
        let account_id = AccountId::new();
        assert_ne!(codec.mint(&account_id).unwrap(), codec.mint(&account_id).unwrap());
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = codec();
        let token = sign(&codec, Algorithm::HS256, &claims_for(&AccountId::new(), -5, true));
        assert!(matches!(codec.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_out_of_range_ttl_is_internal_error() {
        let secret = SigningSecret::new(b"0123456789abcdef0123456789abcdef".to_vec());
        let codec = AccessTokenCodec::new(&secret, Duration::from_secs(u64::MAX));
        assert!(matches!(codec.mint(&AccountId::new()), Err(AuthError::Internal(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = AccessTokenCodec::new(&SigningSecret::new(b"another-secret-another-secret-!!".to_vec()), Duration::from_secs(900));
        let token = other.mint(&AccountId::new()).unwrap();
        assert!(matches!(codec().verify(&token), Err(AuthError::TokenInvalid)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = codec();
        let token = codec.mint(&AccountId::new()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = to_base64_url(
            serde_json::to_string(&claims_for(&AccountId::new(), 900, true))
                .unwrap()
                .as_bytes(),
        );
        parts[1] = &forged;
        assert!(codec.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn test_other_hmac_algorithms_accepted() {
        let codec = codec();
        let account_id = AccountId::new();
        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let token = sign(&codec, alg, &claims_for(&account_id, 60, true));
            assert_eq!(codec.extract_subject(&token).unwrap(), account_id);
        }
    }

    #[test]
    fn test_none_and_asymmetric_algorithms_rejected() {
        let codec = codec();
        let payload = to_base64_url(
            serde_json::to_string(&claims_for(&AccountId::new(), 60, true))
                .unwrap()
                .as_bytes(),
        );

        for header in [r#"{"alg":"none","typ":"JWT"}"#, r#"{"alg":"RS256","typ":"JWT"}"#] {
            let token = format!("{}.{}.{}", to_base64_url(header.as_bytes()), payload, "c2ln");
            assert!(matches!(codec.verify(&token), Err(AuthError::TokenInvalid)), "{header}");
        }

        let unsigned = format!("{}.{}.", to_base64_url(br#"{"alg":"none"}"#), payload);
        assert!(codec.verify(&unsigned).is_err());
    }

    #[test]
    fn test_unauthorized_claim_rejected() {
        let codec = codec();
        let token = sign(&codec, Algorithm::HS256, &claims_for(&AccountId::new(), 60, false));
        assert!(matches!(codec.verify(&token), Err(AuthError::TokenInvalid)));
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let codec = codec();
        let mut claims = claims_for(&AccountId::new(), 60, true);
        claims.sub = "42".into();
        let token = sign(&codec, Algorithm::HS256, &claims);
        assert!(codec.verify(&token).is_ok());
        assert!(matches!(codec.extract_subject(&token), Err(AuthError::TokenInvalid)));
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = codec();
        for token in ["", "abc", "a.b.c", "Bearer x.y.z"] {
            assert!(codec.verify(token).is_err(), "{token}");
        }
    }
}
