//! Connected social and event-platform accounts.
//!
//! Responses carry the computed token health; stored tokens never leave
//! the server.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::social_account::{ConnectSocialAccountRequest, SocialAccountResponse},
    services::social_service,
    state::AppState,
};

/// Store an account after the OAuth flow completed on the client side.
///
/// # Request Body
///
/// ```json
/// {
///   "platform": "eventbrite",
///   "external_account_id": "123456789",
///   "account_name": "Loft Co Events",
///   "access_token": "...",
///   "refresh_token": "...",
///   "expires_in": 5184000,
///   "scopes": ["event:write"]
/// }
/// ```
///
/// Connecting the same platform account again replaces its tokens.
pub async fn connect_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ConnectSocialAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_write()?;
    let account =
        social_service::connect_account(&state.pool, &state.cipher, auth.business_id, request)
            .await?;
    let response =
        SocialAccountResponse::new(account, Utc::now(), state.config.token_warning_window());

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<SocialAccountResponse>>, AppError> {
    let now = Utc::now();
    let window = state.config.token_warning_window();
    let accounts = social_service::list_accounts(&state.pool, auth.business_id)
        .await?
        .into_iter()
        .map(|account| SocialAccountResponse::new(account, now, window))
        .collect();

    Ok(Json(accounts))
}

pub async fn get_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<SocialAccountResponse>, AppError> {
    let account = social_service::get_account(&state.pool, auth.business_id, account_id).await?;
    Ok(Json(SocialAccountResponse::new(
        account,
        Utc::now(),
        state.config.token_warning_window(),
    )))
}

/// Exchange the stored refresh token for a new access token.
///
/// # Response
///
/// - **200 OK**: the account with its new expiry
/// - **422**: disconnected, no refresh token, or no client credentials
/// - **502**: the platform refused; the error is stored on the account
pub async fn refresh_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<SocialAccountResponse>, AppError> {
    auth.require_write()?;
    let account = social_service::refresh_account(
        &state.pool,
        &state.cipher,
        &state.config,
        state.platforms.as_ref(),
        auth.business_id,
        account_id,
    )
    .await?;

    Ok(Json(SocialAccountResponse::new(
        account,
        Utc::now(),
        state.config.token_warning_window(),
    )))
}

/// Wipe the tokens. The record stays so past event syncs keep their account.
pub async fn disconnect_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_write()?;
    social_service::disconnect_account(&state.pool, auth.business_id, account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
