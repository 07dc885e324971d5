//! In-process [`AccountRepository`] used as faked storage in tests.
//!
//! A single mutex guards all rows, so each call is atomic the same way a
//! single SQL statement is, and the email uniqueness check happens inside the
//! insert rather than before it.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::errors::RepoError;
use crate::auth::repo::AccountRepository;
use crate::auth::repo_types::{BankingUpdate, NewUser, ProfileUpdate, User};
use crate::config::EmailUniqueness;

#[derive(Default)]
pub struct MemoryAccountRepository {
    users: Mutex<Vec<User>>,
    uniqueness: EmailUniqueness,
}

impl MemoryAccountRepository {
    pub fn new(uniqueness: EmailUniqueness) -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            uniqueness,
        }
    }

    /// Every row, deleted ones included.
    pub fn all_rows(&self) -> Vec<User> {
        self.users.lock().expect("users lock").clone()
    }

    fn email_taken(&self, users: &[User], email: &str, except: Option<Uuid>) -> bool {
        users.iter().any(|u| {
            u.email == email
                && Some(u.id) != except
                && (u.deleted_at.is_none() || self.uniqueness == EmailUniqueness::AllTime)
        })
    }
}

fn active_mut(users: &mut [User], id: Uuid) -> Result<&mut User, RepoError> {
    users
        .iter_mut()
        .find(|u| u.id == id && u.deleted_at.is_none())
        .ok_or(RepoError::NotFound)
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.lock().expect("users lock");
        if self.email_taken(&users, &user.email, None) {
            return Err(RepoError::Conflict("email already in use".into()));
        }
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            address: user.address,
            phone: user.phone,
            bank_name: user.bank.bank_name,
            bank_account_name: user.bank.bank_account_name,
            bank_account_number: user.bank.bank_account_number,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        users.push(row.clone());
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.lock().expect("users lock");
        Ok(users
            .iter()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepoError> {
        let users = self.users.lock().expect("users lock");
        users
            .iter()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepoError> {
        let mut users = self.users.lock().expect("users lock");
        let user = active_mut(&mut users, id)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<(), RepoError> {
        let mut users = self.users.lock().expect("users lock");
        active_mut(&mut users, id)?;
        if let Some(email) = &update.email {
            if self.email_taken(&users, email, Some(id)) {
                return Err(RepoError::Conflict("email already in use".into()));
            }
        }
        let user = active_mut(&mut users, id)?;
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(address) = &update.address {
            user.address = Some(address.clone());
        }
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn update_banking(&self, id: Uuid, update: &BankingUpdate) -> Result<(), RepoError> {
        let mut users = self.users.lock().expect("users lock");
        let user = active_mut(&mut users, id)?;
        if let Some(v) = &update.bank_name {
            user.bank_name = Some(v.clone());
        }
        if let Some(v) = &update.bank_account_name {
            user.bank_account_name = Some(v.clone());
        }
        if let Some(v) = &update.bank_account_number {
            user.bank_account_number = Some(v.clone());
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut users = self.users.lock().expect("users lock");
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepoError::NotFound)?;
        if user.deleted_at.is_none() {
            user.deleted_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::BankingDetails;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "A".into(),
            email: email.into(),
            password_hash: "hash".into(),
            address: None,
            phone: Some("1".into()),
            bank: BankingDetails {
                bank_name: Some("First Bank".into()),
                bank_account_name: None,
                bank_account_number: None,
            },
        }
    }

    #[tokio::test]
    async fn create_rejects_active_duplicate() {
        let repo = MemoryAccountRepository::new(EmailUniqueness::Active);
        repo.create(new_user("a@example.com")).await.unwrap();
        let err = repo.create(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
        assert_eq!(repo.all_rows().len(), 1);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let repo = MemoryAccountRepository::new(EmailUniqueness::Active);
        let id = Uuid::new_v4();
        assert!(matches!(repo.find_by_id(id).await, Err(RepoError::NotFound)));
        assert!(matches!(repo.update_password(id, "h").await, Err(RepoError::NotFound)));
        assert!(matches!(
            repo.update_profile(id, &ProfileUpdate::default()).await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            repo.update_banking(id, &BankingUpdate::default()).await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(repo.soft_delete(id).await, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn banking_update_only_touches_provided_fields() {
        let repo = MemoryAccountRepository::new(EmailUniqueness::Active);
        let user = repo.create(new_user("b@example.com")).await.unwrap();
        let upd = BankingUpdate {
            bank_account_number: Some("12345678".into()),
            ..Default::default()
        };
        repo.update_banking(user.id, &upd).await.unwrap();
        let after = repo.find_by_id(user.id).await.unwrap();
        assert_eq!(after.bank_name.as_deref(), Some("First Bank"));
        assert_eq!(after.bank_account_number.as_deref(), Some("12345678"));
        assert_eq!(after.bank_account_name, None);
    }

    #[tokio::test]
    async fn soft_delete_twice_keeps_first_timestamp() {
        let repo = MemoryAccountRepository::new(EmailUniqueness::Active);
        let user = repo.create(new_user("c@example.com")).await.unwrap();
        repo.soft_delete(user.id).await.unwrap();
        let first = repo.all_rows()[0].deleted_at;
        repo.soft_delete(user.id).await.unwrap();
        assert_eq!(repo.all_rows()[0].deleted_at, first);
        assert!(first.is_some());
    }

    #[tokio::test]
    async fn active_scope_frees_email_after_delete() {
        let repo = MemoryAccountRepository::new(EmailUniqueness::Active);
        let user = repo.create(new_user("d@example.com")).await.unwrap();
        repo.soft_delete(user.id).await.unwrap();
        let again = repo.create(new_user("d@example.com")).await.unwrap();
        assert_ne!(again.id, user.id);
        assert_eq!(repo.all_rows().len(), 2);
    }

    #[tokio::test]
    async fn all_time_scope_keeps_email_taken() {
        let repo = MemoryAccountRepository::new(EmailUniqueness::AllTime);
        let user = repo.create(new_user("e@example.com")).await.unwrap();
        repo.soft_delete(user.id).await.unwrap();
        let err = repo.create(new_user("e@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));

        let other = repo.create(new_user("f@example.com")).await.unwrap();
        let upd = ProfileUpdate {
            email: Some("e@example.com".into()),
            ..Default::default()
        };
        let err = repo.update_profile(other.id, &upd).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn keeping_own_email_is_not_a_conflict() {
        let repo = MemoryAccountRepository::new(EmailUniqueness::Active);
        let user = repo.create(new_user("g@example.com")).await.unwrap();
        let upd = ProfileUpdate {
            email: Some("g@example.com".into()),
            ..Default::default()
        };
        repo.update_profile(user.id, &upd).await.unwrap();
    }
}
