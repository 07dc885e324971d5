use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{
            validate_banking_update, validate_profile_update, ChangePasswordRequest, PublicUser,
            SignInRequest, SignUpRequest,
        },
        errors::AccountError,
        extractors::AuthUser,
        repo_types::{BankingUpdate, ProfileUpdate},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).delete(deactivate_me))
        .route("/me/profile", put(update_profile))
        .route("/me/banking", put(update_banking))
        .route("/me/password", put(change_password))
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

/// Everything a handler can fail with: bad input or an account error.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Account(AccountError),
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        ApiError::Account(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Account(e) => {
                let status = match &e {
                    AccountError::UserAlreadyExists | AccountError::Conflict(_) => {
                        StatusCode::CONFLICT
                    }
                    AccountError::LoginFailed => StatusCode::UNAUTHORIZED,
                    AccountError::UserNotFound | AccountError::NotFound => StatusCode::NOT_FOUND,
                    AccountError::InvalidOldPassword => StatusCode::BAD_REQUEST,
                    AccountError::Hashing(_) | AccountError::Storage(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                if status.is_server_error() {
                    error!(error = %e, "request failed");
                    (status, "internal error".to_string())
                } else {
                    (status, e.to_string())
                }
            }
        };
        (
            status,
            Json(ErrorBody {
                status: "error",
                message,
            }),
        )
            .into_response()
    }
}

fn validated(check: Result<(), String>) -> Result<(), ApiError> {
    check.map_err(|msg| {
        warn!(%msg, "request validation failed");
        ApiError::Validation(msg)
    })
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    validated(payload.validate())?;
    let user = state.accounts.sign_up(&payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    validated(payload.validate())?;
    let user = state
        .accounts
        .sign_in(&payload.email, &payload.password)
        .await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state.accounts.get_user_by_id(user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<PublicUser>, ApiError> {
    validated(validate_profile_update(&payload))?;
    state.accounts.update_profile(user_id, payload).await?;
    let user = state.accounts.get_user_by_id(user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_banking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<BankingUpdate>,
) -> Result<Json<PublicUser>, ApiError> {
    validated(validate_banking_update(&payload))?;
    state.accounts.update_banking(user_id, payload).await?;
    let user = state.accounts.get_user_by_id(user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    validated(payload.validate())?;
    state
        .accounts
        .change_password(user_id, &payload.old_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn deactivate_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, ApiError> {
    state.accounts.deactivate_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
