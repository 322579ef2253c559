//! Student management endpoints.
//!
//! `student_id` is the natural key throughout; the database id is only ever
//! surfaced in list/get payloads. POST doubles as the self-service password
//! change when `action=change_password` is present, mirroring the admin UI.

use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::auth;
use crate::database::engine::{self, EntityDescriptor};
use crate::database::models::StudentAuthRow;
use crate::database::update::UpdateBuilder;
use crate::database::DatabaseManager;
use crate::envelope::{ApiResult, Envelope};
use crate::error::ApiError;
use crate::validate::{self, SortDirection, SortSpec};

const STUDENTS: EntityDescriptor = EntityDescriptor {
    table: "students",
    key_column: "student_id",
    columns: &["id", "student_id", "name", "email", "created_at"],
    searchable: &["name", "student_id", "email"],
    sortable: &["name", "student_id", "email"],
    default_sort: SortSpec {
        field: "name",
        direction: SortDirection::Asc,
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct StudentQuery {
    pub student_id: Option<String>,
    pub action: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// One body shape for the whole family; each operation reads the fields it
/// needs and required-field checks do the rest.
#[derive(Debug, Default, Deserialize)]
pub struct StudentBody {
    pub student_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub async fn get(Query(params): Query<StudentQuery>) -> ApiResult {
    let pool = DatabaseManager::pool().await?;
    match params.student_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(student_id) => get_one(&pool, student_id).await,
        None => list(&pool, &params).await,
    }
}

async fn list(pool: &PgPool, params: &StudentQuery) -> ApiResult {
    let rows = STUDENTS
        .list(
            pool,
            params.search.as_deref(),
            params.sort.as_deref(),
            params.order.as_deref(),
        )
        .await?;
    Ok(Envelope::data(rows))
}

async fn get_one(pool: &PgPool, student_id: &str) -> ApiResult {
    let key = json!(validate::sanitize(student_id));
    match STUDENTS.fetch_by_key(pool, &key).await? {
        Some(row) => Ok(Envelope::data(row)),
        None => Err(ApiError::not_found("Student not found.")),
    }
}

pub async fn post(
    Query(params): Query<StudentQuery>,
    body: Option<Json<StudentBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let pool = DatabaseManager::pool().await?;
    if params.action.as_deref() == Some("change_password") {
        change_password(&pool, body).await
    } else {
        create(&pool, body).await
    }
}

async fn create(pool: &PgPool, body: StudentBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        ("student_id", body.student_id.as_deref()),
        ("name", body.name.as_deref()),
        ("email", body.email.as_deref()),
        ("password", body.password.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let student_id = validate::sanitize(body.student_id.as_deref().unwrap_or_default());
    let name = validate::sanitize(body.name.as_deref().unwrap_or_default());
    let email = body.email.as_deref().unwrap_or_default().trim().to_string();
    if !validate::is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }

    let duplicate = engine::exists_where(pool, STUDENTS.table, "student_id", &json!(student_id))
        .await?
        || engine::exists_where(pool, STUDENTS.table, "email", &json!(email)).await?;
    if duplicate {
        return Err(ApiError::conflict("Student ID or email already exists."));
    }

    let hash = auth::hash_password(body.password.as_deref().unwrap_or_default()).await?;
    let id = engine::insert_returning_id(
        pool,
        STUDENTS.table,
        &[
            ("student_id", json!(student_id)),
            ("name", json!(name)),
            ("email", json!(email)),
            ("password_hash", json!(hash)),
        ],
    )
    .await?;

    Ok(Envelope::created("Student created successfully.", id))
}

pub async fn put(body: Option<Json<StudentBody>>) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let missing = validate::missing_fields(&[("student_id", body.student_id.as_deref())]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }
    let student_id = validate::sanitize(body.student_id.as_deref().unwrap_or_default());

    let pool = DatabaseManager::pool().await?;
    if !STUDENTS.exists(&pool, &json!(student_id)).await? {
        return Err(ApiError::not_found("Student not found."));
    }

    let mut update = UpdateBuilder::new();
    if let Some(name) = body.name.as_deref().filter(|n| !n.trim().is_empty()) {
        update.set("name", validate::sanitize(name));
    }
    if let Some(email) = body.email.as_deref().filter(|e| !e.trim().is_empty()) {
        let email = email.trim().to_string();
        if !validate::is_valid_email(&email) {
            return Err(ApiError::bad_request("Invalid email format"));
        }
        let taken = engine::exists_where_excluding(
            &pool,
            STUDENTS.table,
            "email",
            &json!(email),
            STUDENTS.key_column,
            &json!(student_id),
        )
        .await?;
        if taken {
            return Err(ApiError::conflict(
                "Email is already in use by another student.",
            ));
        }
        update.set("email", email);
    }

    STUDENTS
        .update_by_key(&pool, json!(student_id), update)
        .await?;
    Ok(Envelope::message("Student updated successfully."))
}

pub async fn delete(
    Query(params): Query<StudentQuery>,
    body: Option<Json<StudentBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let student_id = params
        .student_id
        .or(body.student_id)
        .map(|id| validate::sanitize(&id))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::missing_fields(&["student_id".to_string()]))?;

    let pool = DatabaseManager::pool().await?;
    if !STUDENTS.exists(&pool, &json!(student_id)).await? {
        return Err(ApiError::not_found("Student not found."));
    }

    STUDENTS.delete_by_key(&pool, &json!(student_id)).await?;
    Ok(Envelope::message("Student deleted successfully."))
}

/// Self-service password change, authenticated by the current password
/// rather than a session.
async fn change_password(pool: &PgPool, body: StudentBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        ("student_id", body.student_id.as_deref()),
        ("current_password", body.current_password.as_deref()),
        ("new_password", body.new_password.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let student_id = validate::sanitize(body.student_id.as_deref().unwrap_or_default());
    let current_password = body.current_password.as_deref().unwrap_or_default();
    let new_password = body.new_password.as_deref().unwrap_or_default();

    if new_password.len() < auth::MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(
            "New password must be at least 8 characters long.",
        ));
    }

    let student = sqlx::query_as::<_, StudentAuthRow>(
        "SELECT password_hash FROM students WHERE student_id = $1 LIMIT 1",
    )
    .bind(&student_id)
    .fetch_optional(pool)
    .await
    .map_err(crate::database::DatabaseError::from)?
    .ok_or_else(|| ApiError::not_found("Student not found."))?;

    if !auth::verify_password(current_password, &student.password_hash).await? {
        return Err(ApiError::unauthorized("Current password is incorrect."));
    }

    let new_hash = auth::hash_password(new_password).await?;
    let mut update = UpdateBuilder::new();
    update.set("password_hash", new_hash);
    STUDENTS
        .update_by_key(pool, json!(student_id), update)
        .await?;

    Ok(Envelope::message("Password updated successfully."))
}
