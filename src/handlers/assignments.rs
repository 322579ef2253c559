//! Assignments and their comments.
//!
//! Attachment handling is filenames only: the `files` column stores a JSON
//! array of names as text and every read path decodes it back to an array.

use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::engine::{self, EntityDescriptor, SubResourceDescriptor};
use crate::database::update::UpdateBuilder;
use crate::database::DatabaseManager;
use crate::envelope::{ApiResult, Envelope};
use crate::error::ApiError;
use crate::handlers::{numeric_id, numeric_id_str};
use crate::validate::{self, SortDirection, SortSpec};

const ASSIGNMENTS: EntityDescriptor = EntityDescriptor {
    table: "assignments",
    key_column: "id",
    columns: &["id", "title", "description", "due_date", "files", "created_at"],
    searchable: &["title", "description"],
    sortable: &["due_date", "title", "created_at"],
    default_sort: SortSpec {
        field: "due_date",
        direction: SortDirection::Asc,
    },
};

const COMMENTS: SubResourceDescriptor = SubResourceDescriptor {
    table: "assignment_comments",
    parent_column: "assignment_id",
    columns: &["id", "assignment_id", "author", "text", "created_at"],
};

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentQuery {
    pub id: Option<String>,
    pub action: Option<String>,
    pub assignment_id: Option<String>,
    pub comment_id: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentBody {
    pub id: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub files: Option<Vec<String>>,
    // Comment fields
    pub assignment_id: Option<Value>,
    pub comment_id: Option<Value>,
    pub author: Option<String>,
    pub text: Option<String>,
}

fn encode_files(files: Option<&[String]>) -> String {
    let files: Vec<String> = files
        .unwrap_or_default()
        .iter()
        .map(|name| validate::sanitize(name))
        .collect();
    json!(files).to_string()
}

pub async fn get(Query(params): Query<AssignmentQuery>) -> ApiResult {
    let pool = DatabaseManager::pool().await?;
    if params.action.as_deref() == Some("comments") {
        return list_comments(&pool, params.assignment_id.as_deref()).await;
    }
    match params.id.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => match numeric_id_str(Some(raw)) {
            Some(id) => get_one(&pool, id).await,
            None => Err(ApiError::bad_request("Invalid or missing assignment ID.")),
        },
        None => {
            let mut rows = ASSIGNMENTS
                .list(
                    &pool,
                    params.search.as_deref(),
                    params.sort.as_deref(),
                    params.order.as_deref(),
                )
                .await?;
            for row in &mut rows {
                engine::decode_json_text_field(row, "files");
            }
            Ok(Envelope::data(rows))
        }
    }
}

async fn get_one(pool: &PgPool, id: i64) -> ApiResult {
    match ASSIGNMENTS.fetch_by_key(pool, &json!(id)).await? {
        Some(mut row) => {
            engine::decode_json_text_field(&mut row, "files");
            Ok(Envelope::data(row))
        }
        None => Err(ApiError::not_found("Assignment not found.")),
    }
}

async fn list_comments(pool: &PgPool, assignment_id: Option<&str>) -> ApiResult {
    let assignment_id = numeric_id_str(assignment_id)
        .ok_or_else(|| ApiError::bad_request("Invalid assignment_id"))?;
    let rows = COMMENTS.list_for_parent(pool, &json!(assignment_id)).await?;
    Ok(Envelope::data(rows))
}

pub async fn post(
    Query(params): Query<AssignmentQuery>,
    body: Option<Json<AssignmentBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let pool = DatabaseManager::pool().await?;
    if params.action.as_deref() == Some("comment") {
        create_comment(&pool, body).await
    } else {
        create(&pool, body).await
    }
}

async fn create(pool: &PgPool, body: AssignmentBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        ("title", body.title.as_deref()),
        ("description", body.description.as_deref()),
        ("due_date", body.due_date.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let title = validate::sanitize(body.title.as_deref().unwrap_or_default());
    let description = validate::sanitize(body.description.as_deref().unwrap_or_default());
    let due_date = body.due_date.as_deref().unwrap_or_default().trim().to_string();
    if !validate::is_valid_date(&due_date) {
        return Err(ApiError::bad_request(
            "due_date must be in YYYY-MM-DD format",
        ));
    }

    let id = engine::insert_returning_id(
        pool,
        ASSIGNMENTS.table,
        &[
            ("title", json!(title)),
            ("description", json!(description)),
            ("due_date", json!(due_date)),
            ("files", json!(encode_files(body.files.as_deref()))),
        ],
    )
    .await?;
    Ok(Envelope::created("Assignment created successfully.", id))
}

async fn create_comment(pool: &PgPool, body: AssignmentBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        (
            "assignment_id",
            body.assignment_id.as_ref().map(|_| "present"),
        ),
        ("author", body.author.as_deref()),
        ("text", body.text.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let assignment_id = numeric_id(body.assignment_id.as_ref())
        .ok_or_else(|| ApiError::bad_request("assignment_id must be numeric"))?;
    if !ASSIGNMENTS.exists(pool, &json!(assignment_id)).await? {
        return Err(ApiError::not_found("Assignment not found"));
    }

    let author = validate::sanitize(body.author.as_deref().unwrap_or_default());
    let text = validate::sanitize(body.text.as_deref().unwrap_or_default());
    let id = engine::insert_returning_id(
        pool,
        COMMENTS.table,
        &[
            ("assignment_id", json!(assignment_id)),
            ("author", json!(author)),
            ("text", json!(text)),
        ],
    )
    .await?;
    Ok(Envelope::created("Comment created successfully.", id))
}

pub async fn put(body: Option<Json<AssignmentBody>>) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let id = numeric_id(body.id.as_ref())
        .ok_or_else(|| ApiError::bad_request("Missing or invalid assignment ID."))?;

    let pool = DatabaseManager::pool().await?;
    if !ASSIGNMENTS.exists(&pool, &json!(id)).await? {
        return Err(ApiError::not_found("Assignment not found."));
    }

    let mut update = UpdateBuilder::new();
    if let Some(title) = body.title.as_deref().filter(|t| !t.is_empty()) {
        update.set("title", validate::sanitize(title));
    }
    if let Some(description) = body.description.as_deref() {
        update.set("description", validate::sanitize(description));
    }
    if let Some(due_date) = body.due_date.as_deref().filter(|d| !d.trim().is_empty()) {
        let due_date = due_date.trim().to_string();
        if !validate::is_valid_date(&due_date) {
            return Err(ApiError::bad_request(
                "due_date must be in YYYY-MM-DD format",
            ));
        }
        update.set("due_date", due_date);
    }
    if let Some(files) = body.files.as_deref() {
        update.set("files", encode_files(Some(files)));
    }

    ASSIGNMENTS.update_by_key(&pool, json!(id), update).await?;
    Ok(Envelope::message("Assignment updated successfully."))
}

pub async fn delete(
    Query(params): Query<AssignmentQuery>,
    body: Option<Json<AssignmentBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let pool = DatabaseManager::pool().await?;
    if params.action.as_deref() == Some("delete_comment") {
        let comment_id = numeric_id_str(params.comment_id.as_deref())
            .or_else(|| numeric_id(body.comment_id.as_ref()))
            .ok_or_else(|| ApiError::bad_request("Invalid comment_id"))?;
        return delete_comment(&pool, comment_id).await;
    }

    let id = numeric_id_str(params.id.as_deref())
        .or_else(|| numeric_id(body.id.as_ref()))
        .ok_or_else(|| ApiError::bad_request("Missing or invalid assignment ID."))?;
    if !ASSIGNMENTS.exists(&pool, &json!(id)).await? {
        return Err(ApiError::not_found("Assignment not found."));
    }

    ASSIGNMENTS
        .delete_cascade(&pool, &COMMENTS, &json!(id))
        .await?;
    Ok(Envelope::message("Assignment and comments deleted."))
}

async fn delete_comment(pool: &PgPool, comment_id: i64) -> ApiResult {
    if !engine::exists_where(pool, COMMENTS.table, "id", &json!(comment_id)).await? {
        return Err(ApiError::not_found("Comment not found"));
    }
    engine::delete_sub_by_id(pool, &COMMENTS, comment_id).await?;
    Ok(Envelope::message("Comment deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_encode_sanitizes_and_defaults_empty() {
        assert_eq!(encode_files(None), "[]");
        let files = vec!["notes.pdf".to_string(), "<b>evil</b>.txt".to_string()];
        assert_eq!(encode_files(Some(&files)), r#"["notes.pdf","evil.txt"]"#);
    }
}
