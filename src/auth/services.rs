use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    dto::SignUpRequest,
    errors::{AccountError, RepoError},
    password::{hash_password, verify_password},
    repo::DynAccountRepository,
    repo_types::{BankingUpdate, NewUser, ProfileUpdate, User},
};

/// Emails are compared trimmed and lowercased everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account operations on top of an [`AccountRepository`](crate::auth::repo::AccountRepository).
///
/// Holds no state besides the repository handle, so clones are cheap and
/// share the same storage.
#[derive(Clone)]
pub struct AccountService {
    repo: DynAccountRepository,
}

impl AccountService {
    pub fn new(repo: DynAccountRepository) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn sign_up(&self, req: &SignUpRequest) -> Result<User, AccountError> {
        let email = normalize_email(&req.email);

        if self.repo.find_by_email(&email).await?.is_some() {
            warn!(%email, "email already registered");
            return Err(AccountError::UserAlreadyExists);
        }

        let password_hash = hash_password(&req.password)?;

        let new_user = NewUser {
            name: req.name.trim().to_string(),
            email,
            password_hash,
            address: req.address.clone(),
            phone: req.phone.clone(),
            bank: req.bank.clone(),
        };

        // a concurrent sign-up may win between the lookup and the insert;
        // the storage constraint turns that into a conflict here
        let user = match self.repo.create(new_user).await {
            Ok(u) => u,
            Err(RepoError::Conflict(what)) => {
                warn!(%what, "sign-up lost on email uniqueness");
                return Err(AccountError::UserAlreadyExists);
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = normalize_email(email);

        let Some(user) = self.repo.find_by_email(&email).await? else {
            warn!(%email, "login unknown email");
            return Err(AccountError::LoginFailed);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AccountError::LoginFailed);
        }

        info!(user_id = %user.id, "user signed in");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: Uuid) -> Result<User, AccountError> {
        Ok(self.repo.find_by_id(id).await?)
    }

    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let user = self.repo.find_by_id(id).await.map_err(user_not_found)?;

        if !verify_password(old_password, &user.password_hash)? {
            warn!(user_id = %id, "change password with wrong old password");
            return Err(AccountError::InvalidOldPassword);
        }

        let password_hash = hash_password(new_password)?;
        self.repo
            .update_password(id, &password_hash)
            .await
            .map_err(user_not_found)?;

        info!(user_id = %id, "password changed");
        Ok(())
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<(), AccountError> {
        if update.is_empty() {
            debug!(user_id = %id, "empty profile update");
        }
        let update = ProfileUpdate {
            email: update.email.as_deref().map(normalize_email),
            ..update
        };
        self.repo.update_profile(id, &update).await?;
        info!(user_id = %id, "profile updated");
        Ok(())
    }

    #[instrument(skip(self, update))]
    pub async fn update_banking(&self, id: Uuid, update: BankingUpdate) -> Result<(), AccountError> {
        if update.is_empty() {
            debug!(user_id = %id, "empty banking update");
        }
        self.repo.update_banking(id, &update).await?;
        info!(user_id = %id, "banking details updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn deactivate_user(&self, id: Uuid) -> Result<(), AccountError> {
        self.repo.soft_delete(id).await?;
        info!(user_id = %id, "user deactivated");
        Ok(())
    }
}

fn user_not_found(e: RepoError) -> AccountError {
    match e {
        RepoError::NotFound => AccountError::UserNotFound,
        other => other.into(),
    }
}
