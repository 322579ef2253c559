//! Weekly course breakdowns and their comments.
//!
//! Weeks are keyed by `week_id` and store `links` as JSON text, decoded back
//! to an array on every read. Unlike the other families, create and update
//! echo the full stored row, and updates stamp `updated_at`.

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

const WEEKS: EntityDescriptor = EntityDescriptor {
    table: "weeks",
    key_column: "week_id",
    columns: &[
        "week_id",
        "title",
        "start_date",
        "description",
        "links",
        "created_at",
        "updated_at",
    ],
    searchable: &["title", "description"],
    sortable: &["title", "start_date", "created_at", "updated_at"],
    default_sort: SortSpec {
        field: "start_date",
        direction: SortDirection::Asc,
    },
};

const COMMENTS: SubResourceDescriptor = SubResourceDescriptor {
    table: "week_comments",
    parent_column: "week_id",
    columns: &["id", "week_id", "author", "text", "created_at"],
};

#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    pub resource: Option<String>,
    pub week_id: Option<String>,
    pub id: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeekBody {
    pub week_id: Option<String>,
    pub title: Option<String>,
    pub start_date: Option<String>,
    pub description: Option<String>,
    pub links: Option<Vec<String>>,
    // Comment fields
    pub id: Option<Value>,
    pub author: Option<String>,
    pub text: Option<String>,
}

enum Resource {
    Weeks,
    Comments,
}

// Absent resource defaults to weeks
fn resolve_resource(resource: Option<&str>) -> Result<Resource, ApiError> {
    match resource.map(str::trim) {
        None | Some("") | Some("weeks") => Ok(Resource::Weeks),
        Some("comments") => Ok(Resource::Comments),
        Some(_) => Err(ApiError::bad_request(
            "Invalid resource. Use 'weeks' or 'comments'",
        )),
    }
}

fn encode_links(links: Option<&[String]>) -> String {
    let links: Vec<String> = links
        .unwrap_or_default()
        .iter()
        .map(|link| link.trim().to_string())
        .collect();
    json!(links).to_string()
}

async fn fetch_week(pool: &PgPool, week_id: &str) -> Result<Option<Value>, ApiError> {
    let row = WEEKS.fetch_by_key(pool, &json!(week_id)).await?;
    Ok(row.map(|mut row| {
        engine::decode_json_text_field(&mut row, "links");
        row
    }))
}

pub async fn get(Query(params): Query<WeekQuery>) -> ApiResult {
    let resource = resolve_resource(params.resource.as_deref())?;
    let pool = DatabaseManager::pool().await?;
    match resource {
        Resource::Weeks => match params.week_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(week_id) => match fetch_week(&pool, week_id.trim()).await? {
                Some(row) => Ok(Envelope::data(row)),
                None => Err(ApiError::not_found("Week not found")),
            },
            None => {
                let mut rows = WEEKS
                    .list(
                        &pool,
                        params.search.as_deref(),
                        params.sort.as_deref(),
                        params.order.as_deref(),
                    )
                    .await?;
                for row in &mut rows {
                    engine::decode_json_text_field(row, "links");
                }
                Ok(Envelope::data(rows))
            }
        },
        Resource::Comments => {
            let week_id = params
                .week_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| ApiError::bad_request("week_id is required"))?;
            let rows = COMMENTS.list_for_parent(&pool, &json!(week_id.trim())).await?;
            Ok(Envelope::data(rows))
        }
    }
}

pub async fn post(Query(params): Query<WeekQuery>, body: Option<Json<WeekBody>>) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let resource = resolve_resource(params.resource.as_deref())?;
    let pool = DatabaseManager::pool().await?;
    match resource {
        Resource::Weeks => create_week(&pool, body).await,
        Resource::Comments => create_comment(&pool, body).await,
    }
}

async fn create_week(pool: &PgPool, body: WeekBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        ("week_id", body.week_id.as_deref()),
        ("title", body.title.as_deref()),
        ("start_date", body.start_date.as_deref()),
        ("description", body.description.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let week_id = validate::sanitize(body.week_id.as_deref().unwrap_or_default());
    let title = validate::sanitize(body.title.as_deref().unwrap_or_default());
    let start_date = validate::sanitize(body.start_date.as_deref().unwrap_or_default());
    let description = validate::sanitize(body.description.as_deref().unwrap_or_default());

    if !validate::is_valid_date(&start_date) {
        return Err(ApiError::bad_request(
            "start_date must be in YYYY-MM-DD format",
        ));
    }
    if WEEKS.exists(pool, &json!(week_id)).await? {
        return Err(ApiError::conflict("week_id already exists"));
    }

    engine::insert_returning_id(
        pool,
        WEEKS.table,
        &[
            ("week_id", json!(week_id)),
            ("title", json!(title)),
            ("start_date", json!(start_date)),
            ("description", json!(description)),
            ("links", json!(encode_links(body.links.as_deref()))),
        ],
    )
    .await?;

    match fetch_week(pool, &week_id).await? {
        Some(row) => Ok(Envelope::created_data(row)),
        None => Err(ApiError::internal("Internal server error.")),
    }
}

pub async fn put(Query(params): Query<WeekQuery>, body: Option<Json<WeekBody>>) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    match resolve_resource(params.resource.as_deref())? {
        Resource::Weeks => {}
        Resource::Comments => {
            return Err(ApiError::method_not_allowed("Method not allowed for comments"));
        }
    }

    let missing = validate::missing_fields(&[("week_id", body.week_id.as_deref())]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }
    let week_id = validate::sanitize(body.week_id.as_deref().unwrap_or_default());

    let pool = DatabaseManager::pool().await?;
    if !WEEKS.exists(&pool, &json!(week_id)).await? {
        return Err(ApiError::not_found("Week not found"));
    }

    let mut update = UpdateBuilder::new();
    if let Some(title) = body.title.as_deref().filter(|t| !t.trim().is_empty()) {
        update.set("title", validate::sanitize(title));
    }
    if let Some(start_date) = body.start_date.as_deref().filter(|d| !d.trim().is_empty()) {
        let start_date = validate::sanitize(start_date);
        if !validate::is_valid_date(&start_date) {
            return Err(ApiError::bad_request(
                "start_date must be in YYYY-MM-DD format",
            ));
        }
        update.set("start_date", start_date);
    }
    if let Some(description) = body.description.as_deref() {
        update.set("description", validate::sanitize(description));
    }
    if let Some(links) = body.links.as_deref() {
        update.set("links", encode_links(Some(links)));
    }
    update.set_raw("updated_at = CURRENT_TIMESTAMP");

    WEEKS.update_by_key(&pool, json!(week_id), update).await?;

    match fetch_week(&pool, &week_id).await? {
        Some(row) => Ok(Envelope::data(row)),
        None => Err(ApiError::internal("Internal server error.")),
    }
}

pub async fn delete(Query(params): Query<WeekQuery>, body: Option<Json<WeekBody>>) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let resource = resolve_resource(params.resource.as_deref())?;
    let pool = DatabaseManager::pool().await?;
    match resource {
        Resource::Weeks => {
            let week_id = params
                .week_id
                .or(body.week_id)
                .map(|id| validate::sanitize(&id))
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ApiError::bad_request("week_id is required"))?;
            if !WEEKS.exists(&pool, &json!(week_id)).await? {
                return Err(ApiError::not_found("Week not found"));
            }
            WEEKS
                .delete_cascade(&pool, &COMMENTS, &json!(week_id))
                .await?;
            Ok(Envelope::message("Week and associated comments deleted"))
        }
        Resource::Comments => {
            let comment_id = numeric_id_str(params.id.as_deref())
                .or_else(|| numeric_id(body.id.as_ref()))
                .ok_or_else(|| ApiError::bad_request("id is required"))?;
            if !engine::exists_where(&pool, COMMENTS.table, "id", &json!(comment_id)).await? {
                return Err(ApiError::not_found("Comment not found"));
            }
            engine::delete_sub_by_id(&pool, &COMMENTS, comment_id).await?;
            Ok(Envelope::message("Comment deleted"))
        }
    }
}

async fn create_comment(pool: &PgPool, body: WeekBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        ("week_id", body.week_id.as_deref()),
        ("author", body.author.as_deref()),
        ("text", body.text.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let week_id = validate::sanitize(body.week_id.as_deref().unwrap_or_default());
    let author = validate::sanitize(body.author.as_deref().unwrap_or_default());
    let text = validate::sanitize(body.text.as_deref().unwrap_or_default());
    if text.is_empty() {
        return Err(ApiError::bad_request("text cannot be empty"));
    }

    if !WEEKS.exists(pool, &json!(week_id)).await? {
        return Err(ApiError::not_found("Associated week not found"));
    }

    let id = engine::insert_returning_id(
        pool,
        COMMENTS.table,
        &[
            ("week_id", json!(week_id)),
            ("author", json!(author)),
            ("text", json!(text)),
        ],
    )
    .await?;

    match engine::fetch_sub_by_id(pool, &COMMENTS, id).await? {
        Some(comment) => Ok(Envelope::created_data(comment)),
        None => Err(ApiError::internal("Internal server error.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_encode_trims_and_defaults_empty() {
        assert_eq!(encode_links(None), "[]");
        let links = vec![" https://a ".to_string(), "https://b".to_string()];
        assert_eq!(encode_links(Some(&links)), r#"["https://a","https://b"]"#);
    }

    #[test]
    fn resource_marker_defaults_to_weeks() {
        assert!(matches!(resolve_resource(None), Ok(Resource::Weeks)));
        assert!(matches!(resolve_resource(Some("weeks")), Ok(Resource::Weeks)));
        assert!(matches!(
            resolve_resource(Some("comments")),
            Ok(Resource::Comments)
        ));
        assert!(resolve_resource(Some("wks")).is_err());
    }
}
