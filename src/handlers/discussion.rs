//! Discussion board: topics and replies.
//!
//! Both carry caller-supplied natural keys (`topic_id`, `reply_id`), so
//! creation runs duplicate pre-checks and replies additionally require a
//! live parent topic. The `resource` query parameter selects the family.

use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::database::engine::{self, EntityDescriptor, SubResourceDescriptor};
use crate::database::update::UpdateBuilder;
use crate::database::DatabaseManager;
use crate::envelope::{ApiResult, Envelope};
use crate::error::ApiError;
use crate::validate::{self, SortDirection, SortSpec};

const TOPICS: EntityDescriptor = EntityDescriptor {
    table: "topics",
    key_column: "topic_id",
    columns: &["topic_id", "subject", "message", "author", "created_at"],
    searchable: &["subject", "message", "author"],
    sortable: &["subject", "author", "created_at"],
    default_sort: SortSpec {
        field: "created_at",
        direction: SortDirection::Desc,
    },
};

const REPLIES: SubResourceDescriptor = SubResourceDescriptor {
    table: "replies",
    parent_column: "topic_id",
    columns: &["reply_id", "topic_id", "text", "author", "created_at"],
};

#[derive(Debug, Default, Deserialize)]
pub struct DiscussionQuery {
    pub resource: Option<String>,
    pub id: Option<String>,
    pub topic_id: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscussionBody {
    pub topic_id: Option<String>,
    pub reply_id: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub text: Option<String>,
    pub author: Option<String>,
}

enum Resource {
    Topics,
    Replies,
}

fn resolve_resource(resource: Option<&str>) -> Result<Resource, ApiError> {
    match resource {
        Some("topics") => Ok(Resource::Topics),
        Some("replies") => Ok(Resource::Replies),
        _ => Err(ApiError::bad_request("Invalid resource")),
    }
}

pub async fn get(Query(params): Query<DiscussionQuery>) -> ApiResult {
    let resource = resolve_resource(params.resource.as_deref())?;
    let pool = DatabaseManager::pool().await?;
    match resource {
        Resource::Topics => match params.id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(topic_id) => get_topic(&pool, topic_id).await,
            None => {
                let rows = TOPICS
                    .list(
                        &pool,
                        params.search.as_deref(),
                        params.sort.as_deref(),
                        params.order.as_deref(),
                    )
                    .await?;
                Ok(Envelope::data(rows))
            }
        },
        Resource::Replies => {
            let topic_id = params
                .topic_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| ApiError::bad_request("topic_id required"))?;
            let rows = REPLIES.list_for_parent(&pool, &json!(topic_id.trim())).await?;
            Ok(Envelope::data(rows))
        }
    }
}

async fn get_topic(pool: &PgPool, topic_id: &str) -> ApiResult {
    match TOPICS.fetch_by_key(pool, &json!(topic_id.trim())).await? {
        Some(row) => Ok(Envelope::data(row)),
        None => Err(ApiError::not_found("Topic not found")),
    }
}

pub async fn post(
    Query(params): Query<DiscussionQuery>,
    body: Option<Json<DiscussionBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let resource = resolve_resource(params.resource.as_deref())?;
    let pool = DatabaseManager::pool().await?;
    match resource {
        Resource::Topics => create_topic(&pool, body).await,
        Resource::Replies => create_reply(&pool, body).await,
    }
}

async fn create_topic(pool: &PgPool, body: DiscussionBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        ("topic_id", body.topic_id.as_deref()),
        ("subject", body.subject.as_deref()),
        ("message", body.message.as_deref()),
        ("author", body.author.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let topic_id = validate::sanitize(body.topic_id.as_deref().unwrap_or_default());
    let subject = validate::sanitize(body.subject.as_deref().unwrap_or_default());
    let message = validate::sanitize(body.message.as_deref().unwrap_or_default());
    let author = validate::sanitize(body.author.as_deref().unwrap_or_default());

    if TOPICS.exists(pool, &json!(topic_id)).await? {
        return Err(ApiError::conflict("Duplicate topic_id"));
    }

    engine::insert_returning_id(
        pool,
        TOPICS.table,
        &[
            ("topic_id", json!(topic_id)),
            ("subject", json!(subject)),
            ("message", json!(message)),
            ("author", json!(author)),
        ],
    )
    .await?;
    Ok(Envelope::created("Topic created", topic_id))
}

async fn create_reply(pool: &PgPool, body: DiscussionBody) -> ApiResult {
    let missing = validate::missing_fields(&[
        ("reply_id", body.reply_id.as_deref()),
        ("topic_id", body.topic_id.as_deref()),
        ("text", body.text.as_deref()),
        ("author", body.author.as_deref()),
    ]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let reply_id = validate::sanitize(body.reply_id.as_deref().unwrap_or_default());
    let topic_id = validate::sanitize(body.topic_id.as_deref().unwrap_or_default());
    let text = validate::sanitize(body.text.as_deref().unwrap_or_default());
    let author = validate::sanitize(body.author.as_deref().unwrap_or_default());

    if !TOPICS.exists(pool, &json!(topic_id)).await? {
        return Err(ApiError::not_found("Parent topic not found"));
    }
    if engine::exists_where(pool, REPLIES.table, "reply_id", &json!(reply_id)).await? {
        return Err(ApiError::conflict("Duplicate reply_id"));
    }

    engine::insert_returning_id(
        pool,
        REPLIES.table,
        &[
            ("reply_id", json!(reply_id)),
            ("topic_id", json!(topic_id)),
            ("text", json!(text)),
            ("author", json!(author)),
        ],
    )
    .await?;
    Ok(Envelope::created("Reply created", reply_id))
}

pub async fn put(
    Query(params): Query<DiscussionQuery>,
    body: Option<Json<DiscussionBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    match resolve_resource(params.resource.as_deref())? {
        Resource::Topics => {}
        Resource::Replies => {
            return Err(ApiError::method_not_allowed("Method not allowed"));
        }
    }

    let missing = validate::missing_fields(&[("topic_id", body.topic_id.as_deref())]);
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }
    let topic_id = validate::sanitize(body.topic_id.as_deref().unwrap_or_default());

    let pool = DatabaseManager::pool().await?;
    if !TOPICS.exists(&pool, &json!(topic_id)).await? {
        return Err(ApiError::not_found("Topic not found"));
    }

    let mut update = UpdateBuilder::new();
    if let Some(subject) = body.subject.as_deref().filter(|s| !s.trim().is_empty()) {
        update.set("subject", validate::sanitize(subject));
    }
    if let Some(message) = body.message.as_deref().filter(|m| !m.trim().is_empty()) {
        update.set("message", validate::sanitize(message));
    }

    TOPICS.update_by_key(&pool, json!(topic_id), update).await?;
    Ok(Envelope::message("Topic updated"))
}

pub async fn delete(
    Query(params): Query<DiscussionQuery>,
    body: Option<Json<DiscussionBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let resource = resolve_resource(params.resource.as_deref())?;
    let pool = DatabaseManager::pool().await?;
    match resource {
        Resource::Topics => {
            let topic_id = params
                .id
                .or(body.topic_id)
                .map(|id| validate::sanitize(&id))
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ApiError::bad_request("Topic ID required"))?;
            if !TOPICS.exists(&pool, &json!(topic_id)).await? {
                return Err(ApiError::not_found("Topic not found"));
            }
            TOPICS
                .delete_cascade(&pool, &REPLIES, &json!(topic_id))
                .await?;
            Ok(Envelope::message("Topic deleted"))
        }
        Resource::Replies => {
            let reply_id = params
                .id
                .or(body.reply_id)
                .map(|id| validate::sanitize(&id))
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ApiError::bad_request("reply_id required"))?;
            if !engine::exists_where(&pool, REPLIES.table, "reply_id", &json!(reply_id)).await? {
                return Err(ApiError::not_found("Reply not found"));
            }
            sqlx::query("DELETE FROM replies WHERE reply_id = $1")
                .bind(&reply_id)
                .execute(&pool)
                .await
                .map_err(crate::database::DatabaseError::from)?;
            Ok(Envelope::message("Reply deleted"))
        }
    }
}
