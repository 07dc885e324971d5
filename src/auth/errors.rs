use thiserror::Error;

/// Failures of the password hashing library (RNG, parameter or encoding
/// errors, unparseable stored hash). A wrong password is not one of these.
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashingError(pub String);

/// Errors raised by an [`AccountRepository`](super::repo::AccountRepository).
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Everything the account service can report to its caller.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("user already exists")]
    UserAlreadyExists,

    /// Unknown email and wrong password on purpose look the same.
    #[error("invalid email or password")]
    LoginFailed,

    #[error("user not found")]
    UserNotFound,

    #[error("old password is incorrect")]
    InvalidOldPassword,

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Hashing(#[from] HashingError),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),
}

impl From<RepoError> for AccountError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => AccountError::NotFound,
            RepoError::Conflict(what) => AccountError::Conflict(what),
            RepoError::Storage(err) => AccountError::Storage(err),
        }
    }
}
