mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn create_resource(
    client: &reqwest::Client,
    base_url: &str,
    title: &str,
) -> Result<i64> {
    let res = client
        .post(format!("{}/api/resources", base_url))
        .json(&json!({
            "title": title,
            "description": "Reference material",
            "link": "https://example.com/reading"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<Value>().await?;
    Ok(body["id"].as_i64().expect("resource id"))
}

#[tokio::test]
async fn create_requires_valid_url() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/resources", server.base_url))
        .json(&json!({"title": "Notes", "link": "not-a-url"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn comment_on_missing_resource_is_404() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/resources?action=comment", server.base_url))
        .json(&json!({
            "resource_id": 999999999,
            "author": "Ann",
            "text": "Hello?"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn delete_cascades_comments() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let id = create_resource(&client, &server.base_url, "Cascade target").await?;

    for text in ["first", "second", "third"] {
        let res = client
            .post(format!("{}/api/resources?action=comment", server.base_url))
            .json(&json!({"resource_id": id, "author": "Ann", "text": text}))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .get(format!(
            "{}/api/resources?action=comments&resource_id={}",
            server.base_url, id
        ))
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(3));

    let res = client
        .delete(format!("{}/api/resources?id={}", server.base_url, id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Parent gone
    let res = client
        .get(format!("{}/api/resources?id={}", server.base_url, id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Children gone too; listing them is an empty success
    let res = client
        .get(format!(
            "{}/api/resources?action=comments&resource_id={}",
            server.base_url, id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn update_is_partial_and_sanitizes() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let id = create_resource(&client, &server.base_url, "Before update").await?;

    let res = client
        .put(format!("{}/api/resources", server.base_url))
        .json(&json!({"id": id, "title": "<script>alert(1)</script>After"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/resources?id={}", server.base_url, id))
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    // Markup stripped before storage
    assert_eq!(body["data"]["title"], "alert(1)After");
    // Untouched fields survive
    assert_eq!(body["data"]["link"], "https://example.com/reading");
    Ok(())
}

#[tokio::test]
async fn delete_single_comment() -> Result<()> {
    if !common::db_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let id = create_resource(&client, &server.base_url, "Comment host").await?;

    let res = client
        .post(format!("{}/api/resources?action=comment", server.base_url))
        .json(&json!({"resource_id": id, "author": "Ann", "text": "bye"}))
        .send()
        .await?;
    let comment_id = res.json::<Value>().await?["id"].as_i64().expect("comment id");

    let res = client
        .delete(format!(
            "{}/api/resources?action=delete_comment&comment_id={}",
            server.base_url, comment_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Gone now
    let res = client
        .delete(format!(
            "{}/api/resources?action=delete_comment&comment_id={}",
            server.base_url, comment_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
