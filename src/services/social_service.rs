//! Connected social accounts: storing, refreshing and revoking OAuth tokens.
//!
//! Tokens are encrypted with the shared [`TokenCipher`] before they touch the
//! database and decrypted only right before an outbound platform call.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::Config,
    crypto::TokenCipher,
    db::DbPool,
    error::AppError,
    models::social_account::{ConnectSocialAccountRequest, SocialAccount},
    services::platform_client::PlatformClient,
};

/// Store a newly authorised account.
///
/// Reconnecting an account that already exists (same platform and external
/// id) replaces its tokens and clears any error or disconnection.
pub async fn connect_account(
    pool: &DbPool,
    cipher: &TokenCipher,
    business_id: Uuid,
    mut request: ConnectSocialAccountRequest,
) -> Result<SocialAccount, AppError> {
    request.validate()?;

    let now = Utc::now();
    let access_token_enc = cipher.encrypt(&request.access_token)?;
    let refresh_token_enc = cipher.encrypt_opt(request.refresh_token.as_deref())?;

    let account = sqlx::query_as::<_, SocialAccount>(
        r#"
        INSERT INTO social_accounts (
            business_id, platform, external_account_id, account_name,
            access_token_enc, refresh_token_enc, scopes, expires_at, connected_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (business_id, platform, external_account_id) DO UPDATE
        SET account_name = EXCLUDED.account_name,
            access_token_enc = EXCLUDED.access_token_enc,
            refresh_token_enc = EXCLUDED.refresh_token_enc,
            scopes = EXCLUDED.scopes,
            expires_at = EXCLUDED.expires_at,
            connected_at = EXCLUDED.connected_at,
            last_error = NULL,
            last_error_at = NULL,
            disconnected_at = NULL,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(request.platform.as_str())
    .bind(&request.external_account_id)
    .bind(&request.account_name)
    .bind(&access_token_enc)
    .bind(&refresh_token_enc)
    .bind(&request.scopes)
    .bind(request.expiry(now))
    .bind(now)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        business_id = %business_id,
        account_id = %account.id,
        platform = %account.platform,
        "social account connected"
    );

    Ok(account)
}

pub async fn list_accounts(pool: &DbPool, business_id: Uuid) -> Result<Vec<SocialAccount>, AppError> {
    let accounts = sqlx::query_as::<_, SocialAccount>(
        "SELECT * FROM social_accounts WHERE business_id = $1 ORDER BY platform, account_name",
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(accounts)
}

pub async fn get_account(
    pool: &DbPool,
    business_id: Uuid,
    account_id: Uuid,
) -> Result<SocialAccount, AppError> {
    sqlx::query_as::<_, SocialAccount>(
        "SELECT * FROM social_accounts WHERE id = $1 AND business_id = $2",
    )
    .bind(account_id)
    .bind(business_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Social account"))
}

/// Renew the access token with the OAuth2 `refresh_token` grant.
///
/// # Errors
///
/// - `Unprocessable`: account disconnected, no refresh token stored, or no
///   client credentials configured for the platform
/// - `Upstream`: the platform rejected the refresh; the failure is recorded
///   on the account before the error is returned
///
/// A response without `expires_in` keeps the previous expiry.
pub async fn refresh_account(
    pool: &DbPool,
    cipher: &TokenCipher,
    config: &Config,
    platforms: &dyn PlatformClient,
    business_id: Uuid,
    account_id: Uuid,
) -> Result<SocialAccount, AppError> {
    let account = get_account(pool, business_id, account_id).await?;
    let platform = account.social_platform()?;

    if account.disconnected_at.is_some() {
        return Err(AppError::unprocessable("Account is disconnected; connect it again"));
    }
    let refresh_token_enc = account
        .refresh_token_enc
        .as_deref()
        .ok_or_else(|| AppError::unprocessable("Account has no refresh token"))?;
    let client = config.oauth_client(platform).ok_or_else(|| {
        AppError::unprocessable(format!("No OAuth client configured for {platform}"))
    })?;

    let refresh_token = cipher.decrypt(refresh_token_enc)?;

    match platforms.refresh_token(platform, &client, &refresh_token).await {
        Ok(token) => {
            let now = Utc::now();
            let access_token_enc = cipher.encrypt(&token.access_token)?;
            let rotated_refresh = cipher.encrypt_opt(token.refresh_token.as_deref())?;
            let expires_at = token.expires_in.map(|secs| now + Duration::seconds(secs));

            let account = sqlx::query_as::<_, SocialAccount>(
                r#"
                UPDATE social_accounts
                SET access_token_enc = $2,
                    refresh_token_enc = COALESCE($3, refresh_token_enc),
                    expires_at = COALESCE($4, expires_at),
                    last_refreshed_at = $5,
                    last_error = NULL,
                    last_error_at = NULL,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(account.id)
            .bind(&access_token_enc)
            .bind(&rotated_refresh)
            .bind(expires_at)
            .bind(now)
            .fetch_one(pool)
            .await?;

            tracing::info!(account_id = %account.id, platform = %platform, "token refreshed");

            Ok(account)
        }
        Err(e) => {
            record_error(pool, account.id, &e.to_string()).await?;
            tracing::warn!(account_id = %account.id, platform = %platform, error = %e, "token refresh failed");
            Err(e.into())
        }
    }
}

/// Wipe the tokens and mark the account disconnected.
pub async fn disconnect_account(
    pool: &DbPool,
    business_id: Uuid,
    account_id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE social_accounts
        SET access_token_enc = NULL,
            refresh_token_enc = NULL,
            disconnected_at = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND business_id = $2 AND disconnected_at IS NULL
        "#,
    )
    .bind(account_id)
    .bind(business_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Social account"));
    }

    tracing::info!(business_id = %business_id, account_id = %account_id, "social account disconnected");

    Ok(())
}

/// Record a failed refresh on the account.
async fn record_error(pool: &DbPool, account_id: Uuid, message: &str) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE social_accounts SET last_error = $2, last_error_at = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(account_id)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(())
}
