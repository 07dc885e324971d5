use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

use crate::auth::errors::RepoError;
use crate::auth::repo_types::{BankingUpdate, NewUser, ProfileUpdate, User};
use crate::config::EmailUniqueness;

/// Data access for users. Every method only sees non-deleted rows, except
/// `soft_delete`, which accepts an already deleted row.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert and return the stored row. `Conflict` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepoError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepoError>;

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<(), RepoError>;

    async fn update_banking(&self, id: Uuid, update: &BankingUpdate) -> Result<(), RepoError>;

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepoError>;
}

pub type DynAccountRepository = Arc<dyn AccountRepository>;

#[derive(Clone)]
pub struct PgAccountRepository {
    db: PgPool,
    uniqueness: EmailUniqueness,
}

impl PgAccountRepository {
    pub fn new(db: PgPool, uniqueness: EmailUniqueness) -> Self {
        Self { db, uniqueness }
    }

    /// Deleted rows only block an email under the all-time rule.
    fn active_scope(&self) -> bool {
        self.uniqueness == EmailUniqueness::Active
    }

    /// Does any row (deleted or not) with this id exist?
    async fn row_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        let found: Option<(Uuid,)> = sqlx::query_as(r#"SELECT id FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(storage_err)?;
        Ok(found.is_some())
    }

    async fn active_row_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        let found: Option<(Uuid,)> =
            sqlx::query_as(r#"SELECT id FROM users WHERE id = $1 AND deleted_at IS NULL"#)
                .bind(id)
                .fetch_optional(&self.db)
                .await
                .map_err(storage_err)?;
        Ok(found.is_some())
    }
}

/// Unique violations become `Conflict`; the rest is opaque storage failure.
fn write_err(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("users_email_active_key");
            debug!(constraint, "unique violation");
            return RepoError::Conflict(format!("email already in use ({constraint})"));
        }
    }
    storage_err(e)
}

fn storage_err(e: sqlx::Error) -> RepoError {
    error!(error = %e, "users query failed");
    RepoError::Storage(e)
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, address, phone,
                               bank_name, bank_account_name, bank_account_number)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8
            WHERE $9 OR NOT EXISTS (SELECT 1 FROM users WHERE email = $2)
            RETURNING id, name, email, password_hash, address, phone,
                      bank_name, bank_account_name, bank_account_number,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.address)
        .bind(&user.phone)
        .bind(&user.bank.bank_name)
        .bind(&user.bank.bank_account_name)
        .bind(&user.bank.bank_account_number)
        .bind(self.active_scope())
        .fetch_optional(&self.db)
        .await
        .map_err(write_err)?;

        // no row: the all-time guard found a deleted owner of this email
        row.ok_or_else(|| RepoError::Conflict("email was used by a deactivated account".into()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, address, phone,
                   bank_name, bank_account_name, bank_account_number,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(storage_err)?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, address, phone,
                   bank_name, bank_account_name, bank_account_number,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(storage_err)?
        .ok_or(RepoError::NotFound)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepoError> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await
        .map_err(storage_err)?;

        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<(), RepoError> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET name       = COALESCE($2, name),
                   email      = COALESCE($3, email),
                   address    = COALESCE($4, address),
                   phone      = COALESCE($5, phone),
                   updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
               AND ($6 OR $3::TEXT IS NULL
                    OR NOT EXISTS (SELECT 1 FROM users o WHERE o.email = $3 AND o.id <> $1))
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.address)
        .bind(&update.phone)
        .bind(self.active_scope())
        .execute(&self.db)
        .await
        .map_err(write_err)?;

        if res.rows_affected() == 0 {
            // either the user is gone or the all-time guard rejected the email
            if self.active_row_exists(id).await? {
                return Err(RepoError::Conflict(
                    "email was used by a deactivated account".into(),
                ));
            }
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_banking(&self, id: Uuid, update: &BankingUpdate) -> Result<(), RepoError> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET bank_name           = COALESCE($2, bank_name),
                   bank_account_name   = COALESCE($3, bank_account_name),
                   bank_account_number = COALESCE($4, bank_account_number),
                   updated_at          = now()
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(&update.bank_name)
        .bind(&update.bank_account_name)
        .bind(&update.bank_account_number)
        .execute(&self.db)
        .await
        .map_err(storage_err)?;

        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepoError> {
        // COALESCE keeps the first deletion time on repeated calls
        let res = sqlx::query(
            r#"
            UPDATE users
               SET deleted_at = COALESCE(deleted_at, now())
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(storage_err)?;

        if res.rows_affected() == 0 && !self.row_exists(id).await? {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
