mod common;

use common::{ADMIN_EMAIL, expect_json, start_server};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn register_login_and_me() {
    let srv = start_server().await;

    let reg = srv
        .post_ok(
            "/api/auth/register",
            json!({
                "role": "patient",
                "email": "Asha@Example.com",
                "password": "correct-horse",
                "name": "Asha Rao"
            }),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(reg["role"], "patient");
    assert_eq!(reg["profile"]["email"], "asha@example.com");
    assert!(reg["profile"].get("password").is_none());
    let subject = reg["subjectId"].as_str().unwrap().to_string();

    // The profile is a regular patient document.
    let patient = expect_json(
        srv.get(&format!("/api/patients/{subject}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(patient["name"], "Asha Rao");

    let login = srv
        .post_ok(
            "/api/auth/login",
            json!({"email": "asha@example.com", "password": "correct-horse"}),
            StatusCode::OK,
        )
        .await;
    assert_eq!(login["subjectId"], subject.as_str());
    let token = login["token"].as_str().unwrap();

    let me = srv
        .client
        .get(srv.url("/api/auth/me"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let me = expect_json(me, StatusCode::OK).await;
    assert_eq!(me["sub"], subject.as_str());
    assert_eq!(me["role"], "patient");
    assert_eq!(me["iss"], "medimart");
}

#[tokio::test]
async fn registration_errors() {
    let srv = start_server().await;

    // Short password
    let res = srv
        .post(
            "/api/auth/register",
            json!({"role": "doctor", "email": "d@x.io", "password": "short", "name": "D", "specialization": "ENT"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Missing profile fields
    let res = srv
        .post(
            "/api/auth/register",
            json!({"role": "retailer", "email": "r@x.io", "password": "long-enough-1"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Admins cannot self-register
    let res = srv
        .post(
            "/api/auth/register",
            json!({"role": "admin", "email": "boss@x.io", "password": "long-enough-1"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body = json!({
        "role": "retailer",
        "email": "shop@x.io",
        "password": "long-enough-1",
        "shopName": "Green Cross"
    });
    srv.post_ok("/api/auth/register", body.clone(), StatusCode::CREATED)
        .await;
    let res = srv.post("/api/auth/register", body).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // The same email may hold a different role.
    srv.post_ok(
        "/api/auth/register",
        json!({"role": "patient", "email": "shop@x.io", "password": "long-enough-1", "name": "Owner"}),
        StatusCode::CREATED,
    )
    .await;
}

#[tokio::test]
async fn bad_credentials_and_tokens_are_401() {
    let srv = start_server().await;
    srv.post_ok(
        "/api/auth/register",
        json!({"email": "p@x.io", "password": "long-enough-1", "name": "Pat"}),
        StatusCode::CREATED,
    )
    .await;

    let res = srv
        .post(
            "/api/auth/login",
            json!({"email": "p@x.io", "password": "wrong-password"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .post(
            "/api/auth/login",
            json!({"email": "nobody@x.io", "password": "long-enough-1"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.get("/api/auth/me").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/api/auth/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let srv = start_server().await;

    let res = srv.get("/api/admin/stats").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let reg = srv
        .post_ok(
            "/api/auth/register",
            json!({"email": "p@x.io", "password": "long-enough-1", "name": "Pat"}),
            StatusCode::CREATED,
        )
        .await;
    let res = srv
        .client
        .get(srv.url("/api/admin/stats"))
        .bearer_auth(reg["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let token = srv.admin_token().await;
    let res = srv
        .client
        .get(srv.url("/api/admin/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let stats = expect_json(res, StatusCode::OK).await;
    assert_eq!(stats["counts"]["patients"], 1);
    // Bootstrap admin plus the registered patient
    assert_eq!(stats["counts"]["credentials"], 2);
    assert_eq!(stats["revenue"], 0.0);

    let me = srv
        .client
        .get(srv.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let me = expect_json(me, StatusCode::OK).await;
    assert_eq!(me["email"], ADMIN_EMAIL);
}
