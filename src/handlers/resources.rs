//! Course resources and their comments.
//!
//! Resources are keyed by the database id. Comments ride the same route with
//! `action=comments|comment|delete_comment` markers.

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

const RESOURCES: EntityDescriptor = EntityDescriptor {
    table: "resources",
    key_column: "id",
    columns: &["id", "title", "description", "link", "created_at"],
    searchable: &["title", "description"],
    sortable: &["title", "created_at"],
    default_sort: SortSpec {
        field: "created_at",
        direction: SortDirection::Desc,
    },
};

const COMMENTS: SubResourceDescriptor = SubResourceDescriptor {
    table: "resource_comments",
    parent_column: "resource_id",
    columns: &["id", "resource_id", "author", "text", "created_at"],
};

#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    pub id: Option<String>,
    pub action: Option<String>,
    pub resource_id: Option<String>,
    pub comment_id: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceBody {
    pub id: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    // Comment fields
    pub resource_id: Option<Value>,
    pub comment_id: Option<Value>,
    pub author: Option<String>,
    pub text: Option<String>,
}

pub async fn get(Query(params): Query<ResourceQuery>) -> ApiResult {
    let pool = DatabaseManager::pool().await?;
    if params.action.as_deref() == Some("comments") {
        return list_comments(&pool, params.resource_id.as_deref()).await;
    }
    match params.id.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => match numeric_id_str(Some(raw)) {
            Some(id) => get_one(&pool, id).await,
            None => Err(ApiError::bad_request("Invalid or missing resource ID.")),
        },
        None => {
            let rows = RESOURCES
                .list(
                    &pool,
                    params.search.as_deref(),
                    params.sort.as_deref(),
                    params.order.as_deref(),
                )
                .await?;
            Ok(Envelope::data(rows))
        }
    }
}

async fn get_one(pool: &PgPool, id: i64) -> ApiResult {
    match RESOURCES.fetch_by_key(pool, &json!(id)).await? {
        Some(row) => Ok(Envelope::data(row)),
        None => Err(ApiError::not_found("Resource not found.")),
    }
}

async fn list_comments(pool: &PgPool, resource_id: Option<&str>) -> ApiResult {
    let resource_id =
        numeric_id_str(resource_id).ok_or_else(|| ApiError::bad_request("Invalid resource_id"))?;
    let rows = COMMENTS.list_for_parent(pool, &json!(resource_id)).await?;
    Ok(Envelope::data(rows))
}

pub async fn post(
    Query(params): Query<ResourceQuery>,
    body: Option<Json<ResourceBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let pool = DatabaseManager::pool().await?;
    if params.action.as_deref() == Some("comment") {
        create_comment(&pool, body).await
    } else {
        create(&pool, body).await
    }
}

async fn create(pool: &PgPool, body: ResourceBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        ("title", body.title.as_deref()),
        ("link", body.link.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let title = validate::sanitize(body.title.as_deref().unwrap_or_default());
    let description = validate::sanitize(body.description.as_deref().unwrap_or_default());
    let link = body.link.as_deref().unwrap_or_default().trim().to_string();
    if !validate::is_valid_url(&link) {
        return Err(ApiError::bad_request("Invalid URL format."));
    }

    let id = engine::insert_returning_id(
        pool,
        RESOURCES.table,
        &[
            ("title", json!(title)),
            ("description", json!(description)),
            ("link", json!(link)),
        ],
    )
    .await?;
    Ok(Envelope::created("Resource created successfully.", id))
}

async fn create_comment(pool: &PgPool, body: ResourceBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        (
            "resource_id",
            body.resource_id.as_ref().map(|_| "present"),
        ),
        ("author", body.author.as_deref()),
        ("text", body.text.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let resource_id = numeric_id(body.resource_id.as_ref())
        .ok_or_else(|| ApiError::bad_request("resource_id must be numeric"))?;
    if !RESOURCES.exists(pool, &json!(resource_id)).await? {
        return Err(ApiError::not_found("Resource not found"));
    }

    let author = validate::sanitize(body.author.as_deref().unwrap_or_default());
    let text = validate::sanitize(body.text.as_deref().unwrap_or_default());
    let id = engine::insert_returning_id(
        pool,
        COMMENTS.table,
        &[
            ("resource_id", json!(resource_id)),
            ("author", json!(author)),
            ("text", json!(text)),
        ],
    )
    .await?;
    Ok(Envelope::created("Comment created successfully.", id))
}

pub async fn put(body: Option<Json<ResourceBody>>) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let id = numeric_id(body.id.as_ref())
        .ok_or_else(|| ApiError::bad_request("Missing or invalid resource ID."))?;

    let pool = DatabaseManager::pool().await?;
    if !RESOURCES.exists(&pool, &json!(id)).await? {
        return Err(ApiError::not_found("Resource not found."));
    }

    let mut update = UpdateBuilder::new();
    if let Some(title) = body.title.as_deref().filter(|t| !t.is_empty()) {
        update.set("title", validate::sanitize(title));
    }
    // Description may be cleared on purpose; present-but-empty still counts
    if let Some(description) = body.description.as_deref() {
        update.set("description", validate::sanitize(description));
    }
    if let Some(link) = body.link.as_deref().filter(|l| !l.is_empty()) {
        if !validate::is_valid_url(link.trim()) {
            return Err(ApiError::bad_request("Invalid URL format."));
        }
        update.set("link", link.trim().to_string());
    }

    RESOURCES.update_by_key(&pool, json!(id), update).await?;
    Ok(Envelope::message("Resource updated successfully."))
}

pub async fn delete(
    Query(params): Query<ResourceQuery>,
    body: Option<Json<ResourceBody>>,
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
        .ok_or_else(|| ApiError::bad_request("Missing or invalid resource ID."))?;
    if !RESOURCES.exists(&pool, &json!(id)).await? {
        return Err(ApiError::not_found("Resource not found."));
    }

    RESOURCES.delete_cascade(&pool, &COMMENTS, &json!(id)).await?;
    Ok(Envelope::message("Resource and comments deleted."))
}

async fn delete_comment(pool: &PgPool, comment_id: i64) -> ApiResult {
    if !engine::exists_where(pool, COMMENTS.table, "id", &json!(comment_id)).await? {
        return Err(ApiError::not_found("Comment not found"));
    }
    engine::delete_sub_by_id(pool, &COMMENTS, comment_id).await?;
    Ok(Envelope::message("Comment deleted successfully"))
}
