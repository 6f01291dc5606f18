//! Auth endpoints over the configured [`AuthProvider`].
//!
//! Provider rejections answer 401 with the provider's message; any other
//! provider failure is a 500.
//!
//! Sign-in and sign-up hand the session tokens to the caller and keep
//! nothing. The other endpoints act on the caller's own
//! `Authorization: Bearer` token.

use crate::error::AppError;
use crate::extractors::BearerToken;
use crate::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;
use todolist_auth::{AuthProvider, AuthResponse, Credentials, User};
use todolist_core::DomainError;

/// Session view answered by `GET /api/auth/session`. Tokens stay with the
/// caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallerSession {
    /// Owner of the presented token.
    pub user: User,
}

/// `POST /api/auth/sign-in`
///
/// # Errors
///
/// `UNAUTHORIZED` for wrong credentials.
pub async fn sign_in<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError>
where
    A: AuthProvider + 'static,
{
    let Json(credentials) = payload?;
    let response = state.auth.sign_in_with_password(&credentials).await?;
    tracing::info!(email = %credentials.email, "Signed in");
    Ok(Json(response))
}

/// `POST /api/auth/sign-up`
///
/// # Errors
///
/// `UNAUTHORIZED` when the provider refuses the account.
pub async fn sign_up<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError>
where
    A: AuthProvider + 'static,
{
    let Json(credentials) = payload?;
    let response = state.auth.sign_up(&credentials).await?;
    tracing::info!(
        email = %credentials.email,
        confirmed = response.session.is_some(),
        "Signed up"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/auth/sign-out`: revoke the caller's token. Callers without a
/// token have nothing to end.
///
/// # Errors
///
/// `INTERNAL_ERROR` when the provider cannot be reached.
pub async fn sign_out<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, AppError>
where
    A: AuthProvider + 'static,
{
    if let Some(token) = token {
        state.auth.sign_out_with_token(&token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/session`: the caller's session, or `null` without a valid
/// token.
///
/// # Errors
///
/// `INTERNAL_ERROR` when the provider fails.
pub async fn session<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    token: BearerToken,
) -> Result<Json<Option<CallerSession>>, AppError>
where
    A: AuthProvider + 'static,
{
    let user = caller(&state, token).await?;
    Ok(Json(user.map(|user| CallerSession { user })))
}

/// `GET /api/auth/user`: the caller's user.
///
/// # Errors
///
/// `UNAUTHORIZED` without a valid token.
pub async fn user<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    token: BearerToken,
) -> Result<Json<User>, AppError>
where
    A: AuthProvider + 'static,
{
    caller(&state, token)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::new(DomainError::unauthorized(None)))
}

async fn caller<B, A, L>(
    state: &AppState<B, A, L>,
    BearerToken(token): BearerToken,
) -> Result<Option<User>, AppError>
where
    A: AuthProvider + 'static,
{
    match token {
        Some(token) => Ok(state.auth.get_user_with_token(&token).await?),
        None => Ok(None),
    }
}
