//! Server-side sessions.
//!
//! Login creates a row in `sessions` and hands the browser an HttpOnly
//! cookie holding the session id. Every request rebuilds its auth state from
//! that cookie via [`SessionContext`]; there is no process-global login
//! state. Expiry is enforced server-side, so the cookie itself carries no
//! lifetime claims.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::models::SessionRow;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;

/// Per-request auth state. Anonymous requests get `user_id: None`.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext {
    pub session_id: Option<Uuid>,
    pub user_id: Option<i64>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self {
            session_id: None,
            user_id: None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .unwrap_or_default();

        let cookie_name = &config::config().security.session_cookie_name;
        let Some(cookie) = jar.get(cookie_name) else {
            return Ok(Self::anonymous());
        };
        // A malformed cookie value is just an anonymous request
        let Ok(session_id) = Uuid::parse_str(cookie.value()) else {
            return Ok(Self::anonymous());
        };

        let pool = DatabaseManager::pool().await?;
        match lookup(&pool, session_id).await? {
            Some(row) => Ok(Self {
                session_id: Some(row.id),
                user_id: Some(row.user_id),
            }),
            None => Ok(Self::anonymous()),
        }
    }
}

/// Gate extractor: rejects with 401 unless the request carries a live
/// session.
#[derive(Debug, Clone, Copy)]
pub struct RequireSession {
    pub session_id: Uuid,
    pub user_id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = SessionContext::from_request_parts(parts, state).await?;
        match (context.session_id, context.user_id) {
            (Some(session_id), Some(user_id)) => Ok(Self {
                session_id,
                user_id,
            }),
            _ => Err(ApiError::unauthorized("Authentication required.")),
        }
    }
}

/// Fetch a session row, dropping it if past its expiry.
async fn lookup(pool: &PgPool, session_id: Uuid) -> Result<Option<SessionRow>, DatabaseError> {
    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = $1",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) if row.is_expired(Utc::now()) => {
            delete_session(pool, row.id).await?;
            Ok(None)
        }
        other => Ok(other),
    }
}

/// Create a session row for `user_id` with the configured TTL.
pub async fn create_session(pool: &PgPool, user_id: i64) -> Result<SessionRow, DatabaseError> {
    let now = Utc::now();
    let ttl = Duration::hours(config::config().security.session_ttl_hours);
    let row = SessionRow {
        id: Uuid::new_v4(),
        user_id,
        created_at: now,
        expires_at: now + ttl,
    };
    sqlx::query(
        "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(row.id)
    .bind(row.user_id)
    .bind(row.created_at)
    .bind(row.expires_at)
    .execute(pool)
    .await?;
    Ok(row)
}

pub async fn delete_session(pool: &PgPool, session_id: Uuid) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// HttpOnly cookie carrying the session id.
pub fn session_cookie(session_id: Uuid) -> Cookie<'static> {
    Cookie::build((
        config::config().security.session_cookie_name.clone(),
        session_id.to_string(),
    ))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .build()
}

/// Removal cookie for logout.
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(config::config().security.session_cookie_name.clone());
    cookie.set_path("/");
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_context_has_no_identity() {
        let context = SessionContext::anonymous();
        assert!(context.user_id.is_none());
        assert!(context.session_id.is_none());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let id = Uuid::new_v4();
        let cookie = session_cookie(id);
        assert_eq!(cookie.value(), id.to_string());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
