//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, RefreshTokenId};
use platform::password::HashedPassword;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{Account, Credential, RefreshToken};
use crate::domain::repository::{AccountRepository, CredentialRepository, RefreshTokenRepository};
use crate::domain::value_object::{AccountRole, AccountStatus};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgAuthRepository {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT
                id,
                username,
                role,
                status,
                created_at
            FROM accounts
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_account()).transpose()
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT
                id,
                username,
                role,
                status,
                created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_account()).transpose()
    }
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for PgAuthRepository {
    async fn find_by_account_id(&self, account_id: &AccountId) -> AuthResult<Option<Credential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT
                account_id,
                password_hash,
                last_password,
                updated_at
            FROM credentials
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_credential()))
    }

    async fn update(&self, credential: &Credential) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE credentials SET
                password_hash = $2,
                last_password = $3,
                updated_at = $4
            WHERE account_id = $1
            "#,
        )
        .bind(credential.account_id.as_uuid())
        .bind(credential.password_hash.as_phc_string())
        .bind(credential.last_password.as_ref().map(|h| h.as_phc_string()))
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

impl RefreshTokenRepository for PgAuthRepository {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id,
                token,
                account_id,
                expires_at,
                created_at,
                last_used_at,
                revoked
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id.as_uuid())
        .bind(&token.token)
        .bind(token.account_id.as_uuid())
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.last_used_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT
                id,
                token,
                account_id,
                expires_at,
                created_at,
                last_used_at,
                revoked
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_refresh_token()))
    }

    async fn touch(&self, id: &RefreshTokenId, used_at: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE refresh_tokens SET last_used_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(used_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_by_token(&self, token: &str) -> AuthResult<Option<AccountId>> {
        let account_id = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM refresh_tokens WHERE token = $1 RETURNING account_id",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account_id.map(AccountId::from_uuid))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn revoke_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64> {
        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE account_id = $1 AND revoked = FALSE",
        )
        .bind(account_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(revoked)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> AuthResult<Account> {
        let role = AccountRole::from_code(&self.role)
            .ok_or_else(|| AuthError::Internal(format!("Invalid account role: {}", self.role)))?;
        let status = AccountStatus::from_code(&self.status).ok_or_else(|| {
            AuthError::Internal(format!("Invalid account status: {}", self.status))
        })?;

        Ok(Account {
            id: AccountId::from_uuid(self.id),
            username: self.username,
            role,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    account_id: Uuid,
    password_hash: String,
    last_password: Option<String>,
    updated_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credential(self) -> Credential {
        // PHC parsing happens at verification time
        Credential {
            account_id: AccountId::from_uuid(self.account_id),
            password_hash: HashedPassword::from_stored(self.password_hash),
            last_password: self.last_password.map(HashedPassword::from_stored),
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    token: String,
    account_id: Uuid,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
    revoked: bool,
}

impl RefreshTokenRow {
    fn into_refresh_token(self) -> RefreshToken {
        RefreshToken {
            id: RefreshTokenId::from_uuid(self.id),
            token: self.token,
            account_id: AccountId::from_uuid(self.account_id),
            expires_at: self.expires_at,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
            revoked: self.revoked,
        }
    }
}
