mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use bytes::Bytes;
use helpers::{api_path, bearer, TestApp, PNG};
use quire_core::models::ResourceType;
use serde_json::{json, Value};
use uuid::Uuid;

fn group_body(main: Uuid, members: &[Uuid], read: &str, write: &str) -> Value {
    json!({
        "name": "Book1",
        "group_type": "art_book",
        "description": "sketches",
        "read_permission": read,
        "write_permission": write,
        "main_resource_id": main,
        "resource_ids": members,
    })
}

#[tokio::test]
async fn test_missing_bearer_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app.server.get(&api_path("/groups")).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_session_is_no_user() {
    let app = TestApp::new();

    let response = app
        .server
        .get(&api_path("/users/me"))
        .add_header("Authorization", "Bearer not-a-session")
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_users_me_and_roster() {
    let app = TestApp::new();
    let (alice, session) = app.user("alice");
    app.user("bob");

    let me: Value = app
        .server
        .get(&api_path("/users/me"))
        .add_header("Authorization", bearer(&session))
        .await
        .json();
    assert_eq!(me["id"], json!(alice.id));
    assert_eq!(me["name"], "alice");

    let roster: Vec<Value> = app
        .server
        .get(&api_path("/users"))
        .add_header("Authorization", bearer(&session))
        .await
        .json();
    assert_eq!(roster.len(), 2);
}

#[tokio::test]
async fn test_warm_roster_is_not_served_to_unknown_token() {
    let app = TestApp::new();
    let (alice, session) = app.user("alice");
    app.ctx.db.insert_resource(alice.id, "cover", ResourceType::Image);

    let response = app
        .server
        .get(&api_path("/users"))
        .add_header("Authorization", bearer(&session))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    for path in ["/users", "/resources"] {
        let response = app
            .server
            .get(&api_path(path))
            .add_header("Authorization", "Bearer not-a-real-token")
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{path}");
        let body: Value = response.json();
        assert_eq!(body["code"], "USER_NOT_FOUND");
    }
}

#[tokio::test]
async fn test_identity_outage_is_bad_gateway() {
    let app = TestApp::new();
    let (_, session) = app.user("alice");
    app.ctx.directory.set_unavailable(true);

    let response = app
        .server
        .get(&api_path("/users/me"))
        .add_header("Authorization", bearer(&session))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["code"], "IDENTITY_PROVIDER_ERROR");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_group_lifecycle() {
    let app = TestApp::new();
    let (alice, alice_session) = app.user("alice");
    let (_, bob_session) = app.user("bob");
    let cover = app.ctx.db.insert_resource(alice.id, "cover", ResourceType::Image);
    let sketch = app.ctx.db.insert_resource(alice.id, "sketch", ResourceType::Image);
    let notes = app.ctx.db.insert_resource(alice.id, "notes", ResourceType::Other);

    let response = app
        .server
        .post(&api_path("/groups"))
        .add_header("Authorization", bearer(&alice_session))
        .json(&group_body(cover.id, &[sketch.id], "public", "private"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created: Value = response.json();
    let group_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["administrators"][0]["id"], json!(alice.id));
    assert_eq!(created["main_resource"]["id"], json!(cover.id));

    let response = app
        .server
        .post(&api_path(&format!("/groups/{}/resources", group_id)))
        .add_header("Authorization", bearer(&alice_session))
        .json(&json!({ "resource_id": notes.id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let members: Vec<Value> = response.json();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["id"], json!(notes.id));

    let response = app
        .server
        .post(&api_path(&format!("/groups/{}/resources", group_id)))
        .add_header("Authorization", bearer(&alice_session))
        .json(&json!({ "resource_id": notes.id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "RESOURCE_ALREADY_EXISTS");

    let response = app
        .server
        .delete(&api_path(&format!("/groups/{}", group_id)))
        .add_header("Authorization", bearer(&bob_session))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .delete(&api_path(&format!("/groups/{}", group_id)))
        .add_header("Authorization", bearer(&alice_session))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = app
        .server
        .get(&api_path(&format!("/groups/{}", group_id)))
        .add_header("Authorization", bearer(&alice_session))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "GROUP_NOT_FOUND");
}

#[tokio::test]
async fn test_edit_to_private_read_public_write_is_rejected() {
    let app = TestApp::new();
    let (alice, session) = app.user("alice");
    let cover = app.ctx.db.insert_resource(alice.id, "cover", ResourceType::Image);

    let created: Value = app
        .server
        .post(&api_path("/groups"))
        .add_header("Authorization", bearer(&session))
        .json(&group_body(cover.id, &[], "private", "private"))
        .await
        .json();
    let group_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .put(&api_path(&format!("/groups/{}", group_id)))
        .add_header("Authorization", bearer(&session))
        .json(&group_body(cover.id, &[], "private", "public"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_PERMISSION");

    let fetched: Value = app
        .server
        .get(&api_path(&format!("/groups/{}", group_id)))
        .add_header("Authorization", bearer(&session))
        .await
        .json();
    assert_eq!(fetched["write_permission"], "private");
}

#[tokio::test]
async fn test_malformed_json_body_is_invalid_input() {
    let app = TestApp::new();
    let (_, session) = app.user("alice");

    let response = app
        .server
        .post(&api_path("/groups"))
        .add_header("Authorization", bearer(&session))
        .json(&json!({ "name": "Book1", "main_resource_id": 42 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_wrap_and_download() {
    let app = TestApp::new();
    let (alice, session) = app.user("alice");

    let response = app
        .server
        .post(&api_path("/files"))
        .add_header("Authorization", bearer(&session))
        .content_type("application/octet-stream")
        .bytes(Bytes::from_static(PNG))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let file: Value = response.json();
    assert_eq!(file["file_type"], "png");
    assert_eq!(file["creator"]["id"], json!(alice.id));
    let file_id = file["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .post(&api_path("/resources"))
        .add_header("Authorization", bearer(&session))
        .json(&json!({
            "file_id": file_id,
            "name": "cover",
            "resource_type": "image",
            "comment": "first draft",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let resource: Value = response.json();
    let resource_id = resource["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&api_path(&format!("/resources/{}/file", resource_id)))
        .add_header("Authorization", bearer(&session))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(response.as_bytes().as_ref(), PNG);

    let response = app
        .server
        .get(&api_path(&format!("/files/{}", file_id)))
        .add_header("Authorization", bearer(&session))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.as_bytes().as_ref(), PNG);
}

#[tokio::test]
async fn test_multipart_upload() {
    let app = TestApp::new();
    let (_, session) = app.user("alice");

    let part = Part::bytes(Bytes::from_static(PNG))
        .file_name("cover.png")
        .mime_type("image/png");
    let response = app
        .server
        .post(&api_path("/files"))
        .add_header("Authorization", bearer(&session))
        .multipart(MultipartForm::new().add_part("file", part))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let file: Value = response.json();
    assert_eq!(file["file_type"], "png");

    let response = app
        .server
        .post(&api_path("/files"))
        .add_header("Authorization", bearer(&session))
        .multipart(MultipartForm::new().add_text("comment", "no file here"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resource_list_filters() {
    let app = TestApp::new();
    let (alice, session) = app.user("alice");
    app.ctx.db.insert_resource(alice.id, "cover", ResourceType::Image);
    app.ctx.db.insert_resource(alice.id, "notes", ResourceType::Other);

    let images: Vec<Value> = app
        .server
        .get(&api_path("/resources?type=image&user=alice"))
        .add_header("Authorization", bearer(&session))
        .await
        .json();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["name"], "cover");

    let response = app
        .server
        .get(&api_path("/resources?type=video"))
        .add_header("Authorization", bearer(&session))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .get(&api_path("/resources?user=mallory"))
        .add_header("Authorization", bearer(&session))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.server.get(&api_path("/health")).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["database"], "healthy");
}
