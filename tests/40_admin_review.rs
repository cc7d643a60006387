mod common;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

const PDF: &[u8] = b"%PDF-1.4\n%admin review\n%%EOF\n";

async fn get_json(client: &reqwest::Client, url: String, token: &str) -> Result<Value> {
    let res = client.get(url).bearer_auth(token).send().await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "GET returned {}", res.status());
    Ok(res.json().await?)
}

#[tokio::test]
async fn bootstrap_admin_can_log_in() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await {
        return Ok(());
    }
    let client = reqwest::Client::new();
    let token = common::admin_token(server).await?;

    let me = get_json(&client, server.url("/api/v1/me"), &token).await?;
    assert_eq!(me["data"]["email"], common::ADMIN_EMAIL);
    assert_eq!(me["data"]["role"], "admin");

    let stats = get_json(&client, server.url("/api/v1/admin/users/stats"), &token).await?;
    assert!(stats["data"].is_object());
    Ok(())
}

#[tokio::test]
async fn review_updates_counters_and_logs_activity() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await {
        return Ok(());
    }
    let client = reqwest::Client::new();
    let admin = common::admin_token(server).await?;
    let email = common::unique_email("review");
    let customer = common::register(server, &email, "password-123").await?;

    // Profile first so the counters have a row to land in
    let profile = get_json(&client, server.url("/api/v1/clients/me/profile"), &customer).await?;
    let client_id = profile["data"]["id"].as_i64().context("profile id")?;
    assert_eq!(profile["data"]["total_documents"], 0);

    let part = Part::bytes(PDF.to_vec())
        .file_name("pasaporte.pdf")
        .mime_str("application/pdf")?;
    let res = client
        .post(server.url("/api/v1/documents"))
        .bearer_auth(&customer)
        .multipart(Form::new().text("category", "Pasaporte").part("file", part))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let uploaded: Value = res.json().await?;
    let document_id = uploaded["data"]["id"].as_i64().context("document id")?;

    let before = get_json(&client, server.url(&format!("/api/v1/admin/clients/{}", client_id)), &admin).await?;
    assert_eq!(before["data"]["email"], email);
    assert_eq!(before["data"]["total_documents"], 1);
    assert_eq!(before["data"]["pending_documents"], 1);

    // Pending is not a review outcome
    let res = client
        .patch(server.url(&format!("/api/v1/admin/documents/{}", document_id)))
        .bearer_auth(&admin)
        .json(&json!({ "status": "pending" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(server.url(&format!("/api/v1/admin/documents/{}", document_id)))
        .bearer_auth(&admin)
        .json(&json!({ "status": "approved", "admin_notes": "Legible" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let reviewed: Value = res.json().await?;
    assert_eq!(reviewed["data"]["status"], "approved");
    assert_eq!(reviewed["data"]["admin_notes"], "Legible");

    let after = get_json(&client, server.url(&format!("/api/v1/admin/clients/{}", client_id)), &admin).await?;
    assert_eq!(after["data"]["total_documents"], 1);
    assert_eq!(after["data"]["pending_documents"], 0);

    let activities = get_json(
        &client,
        server.url("/api/v1/admin/activities?activity_type=document_approved&limit=100"),
        &admin,
    )
    .await?;
    let user_id = before["data"]["user_id"].as_i64();
    let logged = activities["data"]
        .as_array()
        .context("activities array")?
        .iter()
        .any(|a| a["user_id"].as_i64() == user_id && a["performed_by_email"] == common::ADMIN_EMAIL);
    assert!(logged, "no document_approved entry for the customer: {}", activities);

    // The owner sees the outcome
    let mine = get_json(&client, server.url("/api/v1/documents"), &customer).await?;
    assert_eq!(mine["data"][0]["status"], "approved");
    Ok(())
}

#[tokio::test]
async fn admin_downloads_any_document() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await {
        return Ok(());
    }
    let client = reqwest::Client::new();
    let admin = common::admin_token(server).await?;
    let customer = common::register(server, &common::unique_email("download"), "password-123").await?;

    let part = Part::bytes(PDF.to_vec()).file_name("dni.pdf").mime_str("application/pdf")?;
    let uploaded: Value = client
        .post(server.url("/api/v1/documents"))
        .bearer_auth(&customer)
        .multipart(Form::new().text("category", "DNI").part("file", part))
        .send()
        .await?
        .json()
        .await?;
    let document_id = uploaded["data"]["id"].as_i64().context("document id")?;

    let res = client
        .get(server.url(&format!("/api/v1/admin/documents/{}/download", document_id)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("dni.pdf"), "{}", disposition);
    assert_eq!(res.bytes().await?.as_ref(), PDF);

    // The owner-facing route still hides it from others
    let other = common::register(server, &common::unique_email("stranger"), "password-123").await?;
    let res = client
        .get(server.url(&format!("/api/v1/documents/{}", document_id)))
        .bearer_auth(&other)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

/// Upload one uniquely named file for `token`, returning the name's suffix
async fn upload_marked(server: &common::TestServer, token: &str) -> Result<String> {
    let name = format!("{}.pdf", uuid::Uuid::new_v4().simple());
    let part = Part::bytes(PDF.to_vec()).file_name(name.clone()).mime_str("application/pdf")?;
    let res = reqwest::Client::new()
        .post(server.url("/api/v1/documents"))
        .bearer_auth(token)
        .multipart(Form::new().text("category", "DNI").part("file", part))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "upload returned {}", res.status());
    Ok(name)
}

#[tokio::test]
async fn deleting_accounts_removes_their_documents_and_files() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await {
        return Ok(());
    }
    let client = reqwest::Client::new();
    let admin = common::admin_token(server).await?;

    // Through the users endpoint
    let customer = common::register(server, &common::unique_email("gone-user"), "password-123").await?;
    let marker = upload_marked(server, &customer).await?;
    assert_eq!(server.stored_files_ending_with(&marker).len(), 1);
    let me = get_json(&client, server.url("/api/v1/me"), &customer).await?;
    let user_id = me["data"]["id"].as_i64().context("user id")?;

    let res = client
        .delete(server.url(&format!("/api/v1/admin/users/{}", user_id)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(server.stored_files_ending_with(&marker).is_empty());

    let res = client
        .delete(server.url(&format!("/api/v1/admin/users/{}", user_id)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Through the clients endpoint
    let customer = common::register(server, &common::unique_email("gone-client"), "password-123").await?;
    let profile = get_json(&client, server.url("/api/v1/clients/me/profile"), &customer).await?;
    let client_id = profile["data"]["id"].as_i64().context("profile id")?;
    let marker = upload_marked(server, &customer).await?;
    assert_eq!(server.stored_files_ending_with(&marker).len(), 1);

    let res = client
        .delete(server.url(&format!("/api/v1/admin/clients/{}", client_id)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(server.stored_files_ending_with(&marker).is_empty());

    // The token now names a missing account
    let res = client.get(server.url("/api/v1/me")).bearer_auth(&customer).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
