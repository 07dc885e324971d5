use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{BankingDetails, BankingUpdate, ProfileUpdate, User};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\d{10,15}$").unwrap();
    static ref ACCOUNT_NUMBER_RE: Regex = Regex::new(r"^\d{8,20}$").unwrap();
}

const MIN_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Request body for sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub bank: BankingDetails,
}

/// Request body for sign-in.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Request body for password change.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account_name: Option<String>,
    pub bank_account_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            address: u.address,
            phone: u.phone,
            bank_name: u.bank_name,
            bank_account_name: u.bank_account_name,
            bank_account_number: u.bank_account_number,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

// Shape checks run in the handlers before anything reaches the service.

fn check_name(name: &str) -> Result<(), String> {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(format!("name must be at least {MIN_NAME_LEN} characters"));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), String> {
    if !is_valid_email(email) {
        return Err("invalid email".into());
    }
    Ok(())
}

fn check_password(field: &str, password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("{field} must be at least {MIN_PASSWORD_LEN} characters"));
    }
    Ok(())
}

fn check_phone(phone: &str) -> Result<(), String> {
    if !PHONE_RE.is_match(phone) {
        return Err("phone number must be 10-15 digits".into());
    }
    Ok(())
}

fn check_banking(bank_name: Option<&str>, account_number: Option<&str>) -> Result<(), String> {
    if let Some(name) = bank_name {
        if name.trim().chars().count() < MIN_NAME_LEN {
            return Err(format!("bank name must be at least {MIN_NAME_LEN} characters"));
        }
    }
    if let Some(number) = account_number {
        if !ACCOUNT_NUMBER_RE.is_match(number) {
            return Err("bank account number must be 8-20 digits".into());
        }
    }
    Ok(())
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<(), String> {
        check_name(&self.name)?;
        check_email(&self.email)?;
        check_password("password", &self.password)?;
        if let Some(phone) = &self.phone {
            check_phone(phone)?;
        }
        check_banking(
            self.bank.bank_name.as_deref(),
            self.bank.bank_account_number.as_deref(),
        )
    }
}

impl SignInRequest {
    /// Only the shape of the email is checked; a short password simply fails to log in.
    pub fn validate(&self) -> Result<(), String> {
        check_email(&self.email)
    }
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.old_password.is_empty() {
            return Err("old password is required".into());
        }
        check_password("new password", &self.new_password)
    }
}

/// Rules only apply to the fields that are present.
pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), String> {
    if let Some(name) = &update.name {
        check_name(name)?;
    }
    if let Some(email) = &update.email {
        check_email(email)?;
    }
    if let Some(phone) = &update.phone {
        check_phone(phone)?;
    }
    Ok(())
}

pub fn validate_banking_update(update: &BankingUpdate) -> Result<(), String> {
    check_banking(
        update.bank_name.as_deref(),
        update.bank_account_number.as_deref(),
    )
}
