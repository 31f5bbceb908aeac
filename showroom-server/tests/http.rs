use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use showroom_core::ShowroomConfig;
use showroom_server::build;
use tower::ServiceExt;

const BOUNDARY: &str = "server-test";

fn config(tokens: &str) -> ShowroomConfig {
    let mut config = ShowroomConfig::new();
    config.set("catalog.owners", "golf-7, polo");
    config.set("auth.tokens", tokens);
    config.set("images.max_slots", "2");
    config.set("images.public_base", "https://cars.example/");
    showroom_server::config::defaults(&mut config);
    config
}

fn upload(owner: &str, auth: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\npng-bytes\r\n--{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri(format!("/images?owner={owner}"))
        .header("authorization", auth)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_ok() {
    let ax = build(&config("admin")).await.unwrap();

    let res = ax
        .router
        .oneshot(Request::builder().method("GET").uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), "ok");
}

#[tokio::test]
async fn configured_limits_and_base_are_applied() {
    let ax = build(&config("admin:rw")).await.unwrap();

    let res = ax.router.clone().oneshot(upload("polo", "Bearer admin")).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["url"], json!(format!("https://cars.example/images/{}?owner=polo", body["imageId"])));

    ax.router.clone().oneshot(upload("polo", "Bearer admin")).await.unwrap();
    let res = ax.router.clone().oneshot(upload("polo", "Bearer admin")).await.unwrap();
    assert_eq!(res.status().as_u16(), 409);
    assert_eq!(json_body(res).await["data"]["maxSlots"], json!(2));
}

#[tokio::test]
async fn unknown_vehicle_is_404() {
    let ax = build(&config("admin")).await.unwrap();
    let res = ax.router.oneshot(upload("passat", "Bearer admin")).await.unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn no_tokens_means_no_writes() {
    let ax = build(&config("")).await.unwrap();
    let res = ax.router.oneshot(upload("golf-7", "Bearer admin")).await.unwrap();
    assert_eq!(res.status().as_u16(), 401);
}
