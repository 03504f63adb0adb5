//! Client, session and service behaviour against a local test server.

use std::time::Duration;

use axum::extract::{Multipart, Path};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::{Value, json};

use catalog_common::{
    ApiClient, ApiError, AuthService, CatalogError, CollectingNotifier, ListParams, Product,
    ProductService, Session, Severity, UploadService, UserRequestService,
};
use catalog_editor_core::{CodeEditor, ImageFile, MemorySurface, Selection, UploadOutcome};

const TOKEN: &str = "test-token";
const XLSX: &[u8] = b"PK\x03\x04fake-workbook";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "message": "jwt expired"})),
    )
        .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "hunter2" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "Invalid credentials"})),
        )
            .into_response();
    }
    Json(json!({
        "success": true,
        "data": {
            "user": {"_id": "u1", "email": body["email"], "name": "Admin"},
            "token": TOKEN,
        }
    }))
    .into_response()
}

async fn logout() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn list_products(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "success": true,
        "data": {
            "data": [
                {"_id": "p1", "title": "Ball valve", "image": "images/valve.png",
                 "description": "Forged steel", "range": ["valves"], "position": 1}
            ],
            "total": 1,
            "page": 1,
            "totalPages": 1
        }
    }))
    .into_response()
}

async fn get_product(Path(id): Path<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "message": format!("Product {id} not found")})),
    )
        .into_response()
}

async fn delete_blog() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn upload(mut multipart: Multipart) -> Response {
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let _data = field.bytes().await.unwrap();
        if name.starts_with("fail") {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "Upload failed"})))
                .into_response();
        }
        return Json(json!({"path": format!("images/{name}")})).into_response();
    }
    (StatusCode::BAD_REQUEST, Json(json!({"error": "No file provided"}))).into_response()
}

async fn upload_multiple(mut multipart: Multipart) -> Response {
    let mut urls = Vec::new();
    let mut names = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let expected = format!("files[{}]", names.len());
        if field.name() != Some(expected.as_str()) {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "unexpected field"})))
                .into_response();
        }
        let name = field.file_name().unwrap_or_default().to_string();
        urls.push(format!("images/{name}"));
        names.push(name);
    }
    Json(json!({"success": true, "data": {"urls": urls, "fileNames": names}})).into_response()
}

async fn export() -> Response {
    (
        [(
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )],
        Bytes::from_static(XLSX),
    )
        .into_response()
}

fn app() -> Router {
    Router::new()
        .route("/api/auth/local/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/blogs/{id}", delete(delete_blog))
        .route("/api/upload", post(upload))
        .route("/api/upload/multiple", post(upload_multiple))
        .route("/api/user-requests/export", get(export))
}

async fn serve() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app()).await.unwrap() });
    format!("http://{addr}/api")
}

fn client(base: &str, session: Session, notifier: &CollectingNotifier) -> ApiClient {
    ApiClient::with_base_url(base, Duration::from_secs(5), session)
        .unwrap()
        .with_notifier(notifier.clone())
}

#[tokio::test]
async fn login_persists_session_and_authorizes_requests() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("admin_user.json");
    let notifier = CollectingNotifier::new();
    let client = client(&base, Session::init(&session_path).await.unwrap(), &notifier);

    let user = AuthService::new(client.clone())
        .login("admin@example.com", "hunter2")
        .await
        .unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.token.as_deref(), Some(TOKEN));
    assert!(session_path.exists());

    let page = ProductService::new(client.clone())
        .list(&ListParams::page(1))
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, "p1");
    assert_eq!(page.data[0].range, ["valves"]);

    // A fresh process picks the session back up
    let restored = Session::init(&session_path).await.unwrap();
    assert_eq!(restored.token().await.as_deref(), Some(TOKEN));

    let titles: Vec<_> = notifier.drain().into_iter().map(|n| n.title).collect();
    assert_eq!(titles, ["Welcome!"]);
}

#[tokio::test]
async fn bad_credentials_show_server_message() {
    let base = serve().await;
    let notifier = CollectingNotifier::new();
    let client = client(&base, Session::in_memory(), &notifier);

    let err = AuthService::new(client.clone())
        .login("admin@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Api(ApiError::Status { status: 400, .. })
    ));
    assert!(!client.session().is_authenticated().await);

    let notes = notifier.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "Bad Request");
    assert_eq!(notes[0].description, "Invalid credentials");
    assert_eq!(notes[0].severity, Severity::Error);
}

#[tokio::test]
async fn unauthorized_response_tears_down_session() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("admin_user.json");
    std::fs::write(
        &session_path,
        r#"{"id":"u1","email":"a@example.com","name":"A","token":"stale"}"#,
    )
    .unwrap();

    let notifier = CollectingNotifier::new();
    let session = Session::init(&session_path).await.unwrap();
    assert!(session.is_authenticated().await);
    let client = client(&base, session, &notifier);

    let err = ProductService::new(client.clone())
        .list(&ListParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(!client.session().is_authenticated().await);
    assert!(!session_path.exists());
    assert_eq!(notifier.drain()[0].description, "Please log in to continue");
}

#[tokio::test]
async fn not_found_uses_server_message() {
    let base = serve().await;
    let notifier = CollectingNotifier::new();
    let client = client(&base, Session::in_memory(), &notifier);

    let err = ProductService::new(client).get("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    let notes = notifier.drain();
    assert_eq!(notes[0].title, "Not Found");
    assert_eq!(notes[0].description, "Product missing not found");
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let base = serve().await;
    let notifier = CollectingNotifier::new();
    let client = client(&base, Session::in_memory(), &notifier);
    let auth = AuthService::new(client.clone());

    auth.login("admin@example.com", "hunter2").await.unwrap();
    auth.logout().await.unwrap();
    assert!(!client.session().is_authenticated().await);

    let titles: Vec<_> = notifier.drain().into_iter().map(|n| n.title).collect();
    assert_eq!(titles, ["Welcome!", "Server Error", "Goodbye!"]);
}

#[tokio::test]
async fn empty_delete_response_is_accepted() {
    let base = serve().await;
    let notifier = CollectingNotifier::new();
    let client = client(&base, Session::in_memory(), &notifier);

    catalog_common::BlogService::new(client)
        .delete("b1")
        .await
        .unwrap();
    assert_eq!(notifier.drain()[0].description, "Blog deleted successfully");
}

#[tokio::test]
async fn export_returns_workbook_bytes() {
    let base = serve().await;
    let notifier = CollectingNotifier::new();
    let client = client(&base, Session::in_memory(), &notifier);

    let bytes = UserRequestService::new(client).export_xlsx().await.unwrap();
    assert_eq!(&bytes[..], XLSX);
}

#[tokio::test]
async fn network_failure_is_reported() {
    // Bind and release a port so nothing is listening on it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let notifier = CollectingNotifier::new();
    let client = client(&format!("http://{addr}/api"), Session::in_memory(), &notifier);
    let err = ProductService::new(client)
        .list(&ListParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network { .. }));
    assert_eq!(notifier.drain()[0].title, "Network Error");
}

#[tokio::test]
async fn editor_uploads_through_upload_service() {
    let base = serve().await;
    let notifier = CollectingNotifier::new();
    let client = client(&base, Session::in_memory(), &notifier);

    let mut editor = CodeEditor::new(MemorySurface::new(Selection::collapsed(0)), String::new())
        .with_uploader(UploadService::new(client))
        .with_base_url("https://cdn.example.com");

    let outcomes = editor
        .on_files_selected([ImageFile::new(
            "cat.png",
            "image/png",
            Bytes::from_static(b"\x89PNG"),
        )])
        .await;
    assert_eq!(editor.host(), "![](https://cdn.example.com/images/cat.png)");
    assert!(matches!(outcomes[0], UploadOutcome::Uploaded { .. }));
    assert!(!editor.is_uploading());
}

#[tokio::test]
async fn editor_falls_back_to_placeholder_when_upload_fails() {
    let base = serve().await;
    let notifier = CollectingNotifier::new();
    let client = client(&base, Session::in_memory(), &notifier);

    let mut editor = CodeEditor::new(MemorySurface::new(Selection::collapsed(5)), "Intro".to_string())
        .with_uploader(UploadService::new(client));

    editor
        .on_files_selected([ImageFile::new(
            "fail.png",
            "image/png",
            Bytes::from_static(b"\x89PNG"),
        )])
        .await;
    assert_eq!(editor.host(), "Intro![](image-url)");
    assert!(!editor.is_uploading());
    assert_eq!(notifier.drain()[0].title, "Server Error");
}

#[tokio::test]
async fn multiple_files_upload_in_one_request() {
    let base = serve().await;
    let notifier = CollectingNotifier::new();
    let client = client(&base, Session::in_memory(), &notifier);

    let files = [
        ImageFile::new("a.png", "image/png", Bytes::from_static(b"\x89PNG")),
        ImageFile::new("b.jpg", "image/jpeg", Bytes::from_static(b"\xFF\xD8\xFF")),
    ];
    let uploaded = UploadService::new(client).upload_files(&files).await.unwrap();
    assert_eq!(uploaded.urls, ["images/a.png", "images/b.jpg"]);
    assert_eq!(uploaded.file_names, ["a.png", "b.jpg"]);

    let notes = notifier.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].description, "2 files uploaded successfully");
}

#[test]
fn product_drafts_serialize_without_id() {
    let draft = Product {
        id: String::new(),
        title: "Gate valve".into(),
        image: String::new(),
        description: String::new(),
        content: "## Specs".into(),
        range: vec![],
        position: 3,
    };
    let json = serde_json::to_value(&draft).unwrap();
    assert!(json.get("id").is_none());
    assert_eq!(json["position"], 3);
}
