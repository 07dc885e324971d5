use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string, never exposed in JSON
    pub address: Option<String>,
    pub phone: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account_name: Option<String>,
    pub bank_account_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>, // set => soft deleted
}

/// Row to insert on sign-up; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub bank: BankingDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BankingDetails {
    pub bank_name: Option<String>,
    pub bank_account_name: Option<String>,
    pub bank_account_number: Option<String>,
}

/// Partial profile update. `None` leaves the column alone, `Some("")` writes
/// an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.address.is_none() && self.phone.is_none()
    }
}

/// Partial banking update, same rules as [`ProfileUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BankingUpdate {
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub bank_account_name: Option<String>,
    #[serde(default)]
    pub bank_account_number: Option<String>,
}

impl BankingUpdate {
    pub fn is_empty(&self) -> bool {
        self.bank_name.is_none()
            && self.bank_account_name.is_none()
            && self.bank_account_number.is_none()
    }
}
