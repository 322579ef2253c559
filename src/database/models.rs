//! Typed rows for the credential paths.
//!
//! Resource reads go through the generic engine as JSON rows; only the auth
//! lookups use concrete structs, so the hash column stays out of anything
//! serializable. `password_hash` lives in rows that derive no `Serialize`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Portal account row for login and password changes. Never serialized.
#[derive(Debug, FromRow)]
pub struct UserAuthRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl UserAuthRow {
    /// Public view returned by login; drops the hash by construction.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The user object carried in the login envelope.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Credential slice of a student row, for the self-service password change.
#[derive(Debug, FromRow)]
pub struct StudentAuthRow {
    pub password_hash: String,
}

/// Server-side session row backing the cookie.
#[derive(Debug, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRow {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
