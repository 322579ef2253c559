//! Login, logout, and the admin's own password change.

use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::auth;
use crate::database::models::UserAuthRow;
use crate::database::{DatabaseError, DatabaseManager};
use crate::envelope::{ApiResult, Envelope};
use crate::error::ApiError;
use crate::session::{self, RequireSession, SessionContext};
use crate::validate;

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordBody {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub async fn login(
    jar: CookieJar,
    body: Option<Json<LoginBody>>,
) -> Result<(CookieJar, Envelope), ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let (Some(email), Some(password)) = (body.email.as_deref(), body.password.as_deref()) else {
        return Err(ApiError::bad_request("Email and password are required."));
    };

    let email = email.trim();
    if !validate::is_valid_email(email) {
        return Err(ApiError::bad_request("Invalid email format."));
    }
    if password.len() < auth::MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters long.",
        ));
    }

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, UserAuthRow>(
        "SELECT id, name, email, password_hash FROM users WHERE email = $1 LIMIT 1",
    )
    .bind(email)
    .fetch_optional(&pool)
    .await
    .map_err(DatabaseError::from)?;

    // One neutral failure message whether the account or the password is wrong
    let Some(user) = user else {
        return Err(ApiError::unauthorized("Invalid email or password."));
    };
    if !auth::verify_password(password, &user.password_hash).await? {
        return Err(ApiError::unauthorized("Invalid email or password."));
    }

    let session = session::create_session(&pool, user.id).await?;
    let jar = jar.add(session::session_cookie(session.id));
    Ok((
        jar,
        Envelope::message("Login Successful").with_data(json!({ "user": user.public() })),
    ))
}

pub async fn logout(
    context: SessionContext,
    jar: CookieJar,
) -> Result<(CookieJar, Envelope), ApiError> {
    if let Some(session_id) = context.session_id {
        let pool = DatabaseManager::pool().await?;
        session::delete_session(&pool, session_id).await?;
    }
    let jar = jar.remove(session::clear_session_cookie());
    Ok((jar, Envelope::message("Logged out successfully.")))
}

pub async fn change_password(
    session: RequireSession,
    body: Option<Json<ChangePasswordBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let (Some(current_password), Some(new_password)) = (
        body.current_password.as_deref().filter(|p| !p.is_empty()),
        body.new_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "current_password and new_password are required.",
        ));
    };

    if new_password.len() < auth::MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(
            "New password must be at least 8 characters long.",
        ));
    }

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, UserAuthRow>(
        "SELECT id, name, email, password_hash FROM users WHERE id = $1 LIMIT 1",
    )
    .bind(session.user_id)
    .fetch_optional(&pool)
    .await
    .map_err(DatabaseError::from)?
    .ok_or_else(|| ApiError::not_found("User not found."))?;

    if !auth::verify_password(current_password, &user.password_hash).await? {
        return Err(ApiError::unauthorized("Current password is incorrect."));
    }

    let new_hash = auth::hash_password(new_password).await?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&new_hash)
        .bind(user.id)
        .execute(&pool)
        .await
        .map_err(DatabaseError::from)?;

    Ok(Envelope::message("Password updated successfully."))
}
