mod common;

use common::{expect_json, start_with_config, test_config};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

fn file_form(name: &str, bytes: Vec<u8>) -> Form {
    Form::new().part("file", Part::bytes(bytes).file_name(name.to_string()))
}

async fn small_limit_server() -> common::TestServer {
    let uploads = tempfile::tempdir().unwrap();
    let mut cfg = test_config(&uploads);
    cfg.uploads.max_bytes = 1024;
    start_with_config(cfg, uploads).await
}

#[tokio::test]
async fn upload_is_stored_and_served() {
    let srv = small_limit_server().await;
    let content = b"\x89PNG fake image bytes".to_vec();

    let res = srv
        .client
        .post(srv.url("/api/upload"))
        .multipart(file_form("Scan.PNG", content.clone()))
        .send()
        .await
        .unwrap();
    let body = expect_json(res, StatusCode::CREATED).await;
    let filename = body["filename"].as_str().unwrap().to_string();
    assert!(filename.ends_with(".png"));
    assert_eq!(body["url"], format!("/uploads/{filename}"));
    assert_eq!(body["size"], content.len() as u64);
    assert!(srv.uploads.path().join(&filename).exists());

    let res = srv.get(&format!("/uploads/{filename}")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await.unwrap().to_vec(), content);
}

#[tokio::test]
async fn upload_rejections() {
    let srv = small_limit_server().await;

    let res = srv
        .client
        .post(srv.url("/api/upload"))
        .multipart(file_form("tool.exe", vec![1, 2, 3]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let res = srv
        .client
        .post(srv.url("/api/upload"))
        .multipart(file_form("big.pdf", vec![0u8; 4096]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    // Nothing is left behind.
    assert_eq!(std::fs::read_dir(srv.uploads.path()).unwrap().count(), 0);

    let res = srv
        .client
        .post(srv.url("/api/upload"))
        .multipart(file_form("empty.jpg", Vec::new()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/api/upload"))
        .multipart(Form::new().text("note", "no file here"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
