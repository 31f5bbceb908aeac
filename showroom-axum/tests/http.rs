use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use showroom_axum::{Access, ShowroomApp, ShowroomState, TokenGate};
use showroom_blob::legacy::LEGACY_HERO_KEY;
use showroom_blob::{
    DefaultUrlStrategy, HeroResolver, ImageAdapter, ImageConfig, ImageIngestor, MemoryStore,
    OwnerKey, SettingsStore, MAX_IMAGE_BYTES,
};
use tower::ServiceExt;

const ADMIN: &str = "Bearer admin-token";
const VIEWER: &str = "Bearer viewer-token";
const BOUNDARY: &str = "showroom-test-boundary";
const MAX_BYTES: u64 = 64;

fn app_with_store() -> (ShowroomApp, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.add_owner(&OwnerKey::parse("golf-7").unwrap());

    let config = ImageConfig::default().with_max_image_bytes(MAX_BYTES);
    let images = ImageAdapter::new(store.clone(), config.clone()).unwrap();
    let hero = HeroResolver::new(
        store.clone(),
        store.clone(),
        Arc::new(DefaultUrlStrategy::default()),
        ImageIngestor::new(&config).unwrap(),
    );
    let gate = TokenGate::new()
        .with_token("admin-token", Access::ReadWrite)
        .with_token("viewer-token", Access::ReadOnly);

    let app = ShowroomApp::new(ShowroomState::new(images, hero), Arc::new(gate));
    (app, store)
}

fn app() -> ShowroomApp {
    app_with_store().0
}

/// `(field, content type, bytes)`; a `None` content type makes a text field
fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, ct, data) in parts {
        out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let head = match ct {
            Some(ct) => format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"photo\"\r\nContent-Type: {ct}\r\n\r\n"
            ),
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
        };
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    out
}

fn upload(uri: &str, auth: Option<&str>, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(multipart(parts))).unwrap()
}

fn png(bytes: &[u8]) -> (&'static str, Option<&'static str>, &[u8]) {
    ("file", Some("image/png"), bytes)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", ADMIN)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &ShowroomApp, req: Request<Body>) -> axum::response::Response {
    app.router.clone().oneshot(req).await.unwrap()
}

#[tokio::test]
async fn health_ok_with_request_id() {
    let res = send(&app(), get("/health")).await;

    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().get("x-request-id").is_some());
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), "ok");
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-test-123")
        .body(Body::empty())
        .unwrap();
    let res = send(&app(), req).await;
    assert_eq!(res.headers()["x-request-id"], "req-test-123");
}

#[tokio::test]
async fn writes_require_a_read_write_credential() {
    let app = app();

    let res = send(&app, upload("/images?owner=golf-7", None, &[png(b"abc")])).await;
    assert_eq!(res.status().as_u16(), 401);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotAuthenticated");
    assert_eq!(body["className"], "not-authenticated");

    let res = send(&app, upload("/images?owner=golf-7", Some(VIEWER), &[png(b"abc")])).await;
    assert_eq!(res.status().as_u16(), 403);
    assert_eq!(json_body(res).await["name"], "Forbidden");

    // reads stay open
    let res = send(&app, get("/images?owner=golf-7")).await;
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn upload_then_fetch_with_revalidation() {
    let app = app();

    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(b"\x89PNG-bytes")])).await;
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["sortOrder"], json!(0));
    let url = body["url"].as_str().unwrap().to_string();
    assert_eq!(body["imageUrlList"], json!(url));

    let res = send(&app, get("/images?owner=golf-7")).await;
    let listed = json_body(res).await;
    assert_eq!(listed["images"][0]["url"], json!(url));
    assert_eq!(listed["images"][0]["mimeType"], "image/png");

    let res = send(&app, get(&url)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        res.headers()[header::CACHE_CONTROL],
        "private, no-cache, must-revalidate"
    );
    let etag = res.headers()[header::ETAG].to_str().unwrap().to_string();
    assert!(res.headers().get(header::LAST_MODIFIED).is_some());
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"\x89PNG-bytes");

    let req = Request::builder()
        .uri(&url)
        .header("if-none-match", &etag)
        .body(Body::empty())
        .unwrap();
    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(res.headers()[header::ETAG], etag.as_str());
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn explicit_sort_order_from_a_form_field() {
    let app = app();
    let parts = [png(b"abc"), ("sortOrder", None, &b"3"[..])];
    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &parts)).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await["sortOrder"], json!(3));

    let parts = [png(b"abc"), ("sortOrder", None, &b"5"[..])];
    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &parts)).await;
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn oversized_upload_is_413_and_not_stored() {
    let (app, store) = app_with_store();
    let big = vec![0u8; MAX_BYTES as usize + 1];

    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(&big)])).await;
    assert_eq!(res.status().as_u16(), 413);
    let body = json_body(res).await;
    assert_eq!(body["name"], "PayloadTooLarge");
    assert_eq!(body["className"], "payload-too-large");
    assert_eq!(store.image_count(), 0);

    let exact = vec![0u8; MAX_BYTES as usize];
    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(&exact)])).await;
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn default_limits_accept_exactly_four_mebibytes() {
    let store = Arc::new(MemoryStore::new());
    store.add_owner(&OwnerKey::parse("golf-7").unwrap());
    let config = ImageConfig::default();
    let images = ImageAdapter::new(store.clone(), config.clone()).unwrap();
    let hero = HeroResolver::new(
        store.clone(),
        store.clone(),
        Arc::new(DefaultUrlStrategy::default()),
        ImageIngestor::new(&config).unwrap(),
    );
    let gate = TokenGate::new().with_token("admin-token", Access::ReadWrite);
    let app = ShowroomApp::new(ShowroomState::new(images, hero), Arc::new(gate));

    let limit = MAX_IMAGE_BYTES as usize;
    let over = vec![1u8; limit + 1];
    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(&over)])).await;
    assert_eq!(res.status().as_u16(), 413);
    assert_eq!(json_body(res).await["name"], "PayloadTooLarge");
    assert_eq!(store.image_count(), 0);

    let exact = vec![1u8; limit];
    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(&exact)])).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(store.image_count(), 1);
}

#[tokio::test]
async fn non_image_upload_is_400() {
    let app = app();
    let parts = [("file", Some("text/plain"), &b"hello"[..])];
    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &parts)).await;
    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(json_body(res).await["name"], "BadRequest");
}

#[tokio::test]
async fn owner_errors() {
    let app = app();

    let res = send(&app, upload("/images?owner=ghost", Some(ADMIN), &[png(b"abc")])).await;
    assert_eq!(res.status().as_u16(), 404);

    let res = send(&app, get("/images")).await;
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn sixth_image_is_409() {
    let app = app();
    for _ in 0..5 {
        let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(b"abc")])).await;
        assert_eq!(res.status().as_u16(), 200);
    }

    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(b"abc")])).await;
    assert_eq!(res.status().as_u16(), 409);
    let body = json_body(res).await;
    assert_eq!(body["name"], "Conflict");
    assert_eq!(body["data"]["maxSlots"], json!(5));
}

#[tokio::test]
async fn delete_all_twice_succeeds() {
    let app = app();
    send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(b"abc")])).await;

    for _ in 0..2 {
        let res = send(&app, delete("/images?owner=golf-7")).await;
        assert_eq!(res.status().as_u16(), 200);
        let body = json_body(res).await;
        assert_eq!(body, json!({ "success": true, "imageUrlList": null }));
    }
}

#[tokio::test]
async fn delete_one_updates_the_projection() {
    let app = app();
    let first = json_body(send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(b"a")])).await).await;
    let second = json_body(send(&app, upload("/images?owner=golf-7", Some(ADMIN), &[png(b"b")])).await).await;

    let uri = format!("/images/{}?owner=golf-7", first["imageId"]);
    let body = json_body(send(&app, delete(&uri)).await).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["imageUrlList"], second["url"]);

    // a second delete of the same id is a no-op
    let body = json_body(send(&app, delete(&uri)).await).await;
    assert_eq!(body["imageUrlList"], second["url"]);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_404() {
    let app = app();
    for uri in ["/images/999?owner=golf-7", "/images/abc?owner=golf-7"] {
        let res = send(&app, get(uri)).await;
        assert_eq!(res.status().as_u16(), 404, "{uri}");
        assert_eq!(json_body(res).await["name"], "NotFound");
    }
}

#[tokio::test]
async fn batch_upload_reports_each_file() {
    let app = app();
    let parts = [
        png(b"one"),
        ("file", Some("application/pdf"), &b"%PDF"[..]),
        png(b"three"),
    ];

    let res = send(&app, upload("/images?owner=golf-7", Some(ADMIN), &parts)).await;
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["success"], json!(true));

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["success"], json!(true));
    assert_eq!(results[1]["success"], json!(false));
    assert!(results[1]["error"].is_string());
    assert_eq!(results[2]["success"], json!(true));

    let expected = format!(
        "{}|{}",
        results[0]["url"].as_str().unwrap(),
        results[2]["url"].as_str().unwrap()
    );
    assert_eq!(body["imageUrlList"], json!(expected));
}

#[tokio::test]
async fn json_source_url_with_bad_scheme_is_400() {
    let req = Request::builder()
        .method("POST")
        .uri("/images?owner=golf-7")
        .header("authorization", ADMIN)
        .header("content-type", "application/json")
        .body(Body::from(r#"{"sourceUrl":"ftp://cars.example/a.png"}"#))
        .unwrap();
    let res = send(&app(), req).await;
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn json_source_url_is_fetched() {
    let upstream = axum::Router::new().route(
        "/car.jpg",
        axum::routing::get(|| async {
            ([(header::CONTENT_TYPE, "image/jpeg")], &b"\xff\xd8jpeg"[..]).into_response()
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/images?owner=golf-7")
        .header("authorization", ADMIN)
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "sourceUrl": format!("http://{addr}/car.jpg"), "sortOrder": 2 }).to_string(),
        ))
        .unwrap();
    let res = send(&app, req).await;
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["sortOrder"], json!(2));

    let res = send(&app, get(body["url"].as_str().unwrap())).await;
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/jpeg");
}

#[tokio::test]
async fn json_source_url_upstream_404_is_422() {
    let upstream = axum::Router::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let req = Request::builder()
        .method("POST")
        .uri("/images?owner=golf-7")
        .header("authorization", ADMIN)
        .header("content-type", "application/json")
        .body(Body::from(json!({ "sourceUrl": format!("http://{addr}/missing.png") }).to_string()))
        .unwrap();
    let res = send(&app(), req).await;
    assert_eq!(res.status().as_u16(), 422);
    assert_eq!(json_body(res).await["name"], "Unprocessable");
}

#[tokio::test]
async fn hero_image_lifecycle() {
    let app = app();

    let res = send(&app, get("/hero-image")).await;
    assert_eq!(res.status().as_u16(), 404);

    let res = send(&app, upload("/hero-image", Some(ADMIN), &[("file", Some("image/webp"), &b"RIFFwebp"[..])])).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(
        json_body(res).await,
        json!({ "success": true, "imageUrl": "/hero-image" })
    );

    let res = send(&app, get("/hero-image")).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/webp");
    let etag = res.headers()[header::ETAG].to_str().unwrap().to_string();

    let req = Request::builder()
        .uri("/hero-image")
        .header("if-none-match", etag)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn legacy_hero_is_served_until_replaced() {
    let (app, store) = app_with_store();
    store
        .set_setting(LEGACY_HERO_KEY, r#"{"mimeType":"image/gif","data":"R0lGODlh"}"#)
        .await
        .unwrap();

    let res = send(&app, get("/hero-image")).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/gif");
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"GIF89a");

    send(&app, upload("/hero-image", Some(ADMIN), &[png(b"new")])).await;
    let res = send(&app, get("/hero-image")).await;
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn hero_write_needs_credentials() {
    let res = send(&app(), upload("/hero-image", None, &[png(b"x")])).await;
    assert_eq!(res.status().as_u16(), 401);
}
