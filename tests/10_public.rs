mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn root_describes_the_api() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Visa Intake API");
    Ok(())
}

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/health")).await?;
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );

    let body: Value = res.json().await?;
    if res_ok(&body) {
        assert_eq!(body["data"]["database"], "connected");
    } else {
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    }
    Ok(())
}

fn res_ok(body: &Value) -> bool {
    body["success"] == true
}

#[tokio::test]
async fn category_list_is_static() -> Result<()> {
    let server = common::ensure_server().await?;

    let body: Value = reqwest::get(server.url("/api/v1/categories")).await?.json().await?;
    let categories = body["data"].as_array().expect("data array");
    assert_eq!(categories.len(), 12);
    assert_eq!(categories[0], "Pasaporte");
    Ok(())
}

#[tokio::test]
async fn register_rejects_bad_input_before_touching_the_database() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/v1/register"))
        .json(&json!({ "email": "not-an-email", "password": "long-enough" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["email"].is_string());

    let res = client
        .post(server.url("/api/v1/register"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}
