mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn unique_week() -> String {
    format!("week_{}", uuid::Uuid::new_v4().simple())
}

async fn create_week(
    client: &reqwest::Client,
    base_url: &str,
    week_id: &str,
) -> Result<Value> {
    let res = client
        .post(format!("{}/api/weeks", base_url))
        .json(&json!({
            "week_id": week_id,
            "title": "Introduction",
            "start_date": "2026-01-05",
            "description": "Course kickoff",
            "links": ["https://example.com/syllabus"]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    Ok(res.json::<Value>().await?)
}

#[tokio::test]
async fn create_echoes_stored_row_with_decoded_links() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let week_id = unique_week();

    let body = create_week(&client, &server.base_url, &week_id).await?;
    assert_eq!(body["data"]["week_id"], json!(week_id));
    assert_eq!(body["data"]["title"], "Introduction");
    // Links come back as an array, not the stored JSON text
    assert_eq!(body["data"]["links"], json!(["https://example.com/syllabus"]));
    Ok(())
}

#[tokio::test]
async fn duplicate_week_id_conflicts() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let week_id = unique_week();
    create_week(&client, &server.base_url, &week_id).await?;

    let res = client
        .post(format!("{}/api/weeks", server.base_url))
        .json(&json!({
            "week_id": week_id,
            "title": "Again",
            "start_date": "2026-01-12",
            "description": "Second attempt"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn malformed_start_date_is_rejected() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/weeks", server.base_url))
        .json(&json!({
            "week_id": unique_week(),
            "title": "Bad date",
            "start_date": "05/01/2026",
            "description": "Wrong format"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Impossible calendar dates fail too, not just wrong shapes
    let res = client
        .post(format!("{}/api/weeks", server.base_url))
        .json(&json!({
            "week_id": unique_week(),
            "title": "Bad date",
            "start_date": "2026-02-30",
            "description": "No such day"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn update_returns_row_and_stamps_updated_at() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let week_id = unique_week();
    let created = create_week(&client, &server.base_url, &week_id).await?;

    let res = client
        .put(format!("{}/api/weeks", server.base_url))
        .json(&json!({
            "week_id": week_id,
            "title": "Revised intro",
            "links": ["https://example.com/v2"]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["title"], "Revised intro");
    assert_eq!(body["data"]["links"], json!(["https://example.com/v2"]));
    // Untouched fields survive the partial update
    assert_eq!(body["data"]["description"], "Course kickoff");
    assert_ne!(
        body["data"]["updated_at"], created["data"]["updated_at"],
        "updated_at should move on update"
    );
    Ok(())
}

#[tokio::test]
async fn put_against_comments_is_405() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{}/api/weeks?resource=comments", server.base_url))
        .json(&json!({"id": 1, "text": "edited"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn comment_create_echoes_stored_comment() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let week_id = unique_week();
    create_week(&client, &server.base_url, &week_id).await?;

    let res = client
        .post(format!("{}/api/weeks?resource=comments", server.base_url))
        .json(&json!({"week_id": week_id, "author": "Ann", "text": "Looks good"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["week_id"], json!(week_id));
    assert_eq!(body["data"]["text"], "Looks good");
    assert!(body["data"]["id"].is_number());
    Ok(())
}

#[tokio::test]
async fn comment_on_missing_week_is_404() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/weeks?resource=comments", server.base_url))
        .json(&json!({"week_id": unique_week(), "author": "Ann", "text": "Hello?"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn week_delete_cascades_comments() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let week_id = unique_week();
    create_week(&client, &server.base_url, &week_id).await?;

    for text in ["first", "second"] {
        client
            .post(format!("{}/api/weeks?resource=comments", server.base_url))
            .json(&json!({"week_id": week_id, "author": "Ann", "text": text}))
            .send()
            .await?;
    }

    let res = client
        .delete(format!(
            "{}/api/weeks?week_id={}",
            server.base_url, week_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!(
            "{}/api/weeks?week_id={}",
            server.base_url, week_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!(
            "{}/api/weeks?resource=comments&week_id={}",
            server.base_url, week_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"], json!([]));
    Ok(())
}
