mod common;

use common::{expect_json, id_of, start_server, start_with_config, test_config};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn template_generator_is_used_by_default() {
    let srv = start_server().await;

    let blog = srv
        .post_ok(
            "/api/blogs/generate",
            json!({"topic": "sleep hygiene", "authorId": "doc-1", "tags": ["Sleep", "sleep", " wellness "]}),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(blog["generated"], true);
    assert_eq!(
        blog["title"],
        "Understanding Sleep Hygiene: A Practical Guide"
    );
    assert_eq!(blog["tags"], json!(["Sleep", "wellness"]));

    let res = srv.post("/api/blogs/generate", json!({"topic": "  "})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let manual = srv
        .post_ok(
            "/api/blogs",
            json!({"title": "Hydration", "content": "Drink water.", "generated": true, "tags": ["diet"]}),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(manual["generated"], false);

    let by_author = expect_json(srv.get("/api/blogs?authorId=doc-1").await, StatusCode::OK).await;
    assert_eq!(by_author.as_array().unwrap().len(), 1);

    let tagged = expect_json(srv.get("/api/blogs?tag=DIET").await, StatusCode::OK).await;
    assert_eq!(tagged[0]["title"], "Hydration");

    let all = expect_json(srv.get("/api/blogs").await, StatusCode::OK).await;
    assert_eq!(all[0]["title"], "Hydration");

    srv.delete(&format!("/api/blogs/{}", id_of(&manual))).await;
    assert_eq!(
        srv.get(&format!("/api/blogs/{}", id_of(&manual))).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn remote_generator_is_called() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "# Title: Eating for a Healthy Heart\nFill half the plate with vegetables."
                }
            }]
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let uploads = tempfile::tempdir().unwrap();
    let mut cfg = test_config(&uploads);
    cfg.blog_generator.enabled = true;
    cfg.blog_generator.endpoint = format!("{}/v1/chat/completions", mock.uri());
    cfg.blog_generator.api_key = Some("test-key".into());
    let srv = start_with_config(cfg, uploads).await;

    let blog = srv
        .post_ok(
            "/api/blogs/generate",
            json!({"topic": "heart health"}),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(blog["title"], "Eating for a Healthy Heart");
    assert_eq!(blog["content"], "Fill half the plate with vegetables.");
    assert_eq!(blog["topic"], "heart health");
}

#[tokio::test]
async fn remote_generator_failure_is_bad_gateway() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&mock)
        .await;

    let uploads = tempfile::tempdir().unwrap();
    let mut cfg = test_config(&uploads);
    cfg.blog_generator.enabled = true;
    cfg.blog_generator.endpoint = format!("{}/v1/chat/completions", mock.uri());
    let srv = start_with_config(cfg, uploads).await;

    let res = srv
        .post("/api/blogs/generate", json!({"topic": "diabetes"}))
        .await;
    let body = expect_json(res, StatusCode::BAD_GATEWAY).await;
    assert_eq!(body["error"], "bad_gateway");

    let all = expect_json(srv.get("/api/blogs").await, StatusCode::OK).await;
    assert!(all.as_array().unwrap().is_empty());
}
