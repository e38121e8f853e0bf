//! Shared harness: runs the app on an ephemeral port with in-memory storage.
#![allow(dead_code)]

use medimart_core::time::format_date;
use medimart_core::now_utc;
use medimart_server::config::{AdminUserConfig, StorageBackend};
use medimart_server::{AppConfig, build_app};
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const ADMIN_EMAIL: &str = "admin@medimart.test";
pub const ADMIN_PASSWORD: &str = "admin-password-1";

pub struct TestServer {
    pub base: String,
    pub client: Client,
    pub uploads: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

pub fn test_config(uploads: &TempDir) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.backend = StorageBackend::Memory;
    cfg.auth.jwt_secret = Some("integration-test-secret-0123456789abcdef".into());
    cfg.uploads.dir = uploads.path().to_path_buf();
    cfg.bootstrap.admin_user = Some(AdminUserConfig {
        email: ADMIN_EMAIL.into(),
        password: ADMIN_PASSWORD.into(),
    });
    cfg
}

pub async fn start_server() -> TestServer {
    let uploads = tempfile::tempdir().expect("temp uploads dir");
    let cfg = test_config(&uploads);
    start_with_config(cfg, uploads).await
}

pub async fn start_with_config(cfg: AppConfig, uploads: TempDir) -> TestServer {
    let app = build_app(&cfg).await.expect("build app");
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        client: Client::new(),
        uploads,
        shutdown: Some(tx),
        handle: Some(handle),
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.expect("GET")
    }

    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("POST")
    }

    pub async fn put(&self, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("PUT")
    }

    pub async fn patch(&self, path: &str, body: Value) -> Response {
        self.client
            .patch(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("PATCH")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client.delete(self.url(path)).send().await.expect("DELETE")
    }

    /// POSTs and asserts the status, returning the JSON body.
    pub async fn post_ok(&self, path: &str, body: Value, expected: StatusCode) -> Value {
        let res = self.post(path, body).await;
        expect_json(res, expected).await
    }

    pub async fn create_patient(&self, name: &str) -> String {
        let body = self
            .post_ok(
                "/api/patients",
                json!({"name": name, "email": format!("{}@example.com", name.to_lowercase().replace(' ', "."))}),
                StatusCode::CREATED,
            )
            .await;
        id_of(&body)
    }

    pub async fn create_doctor(&self, name: &str, specialization: &str, fees: f64) -> String {
        let body = self
            .post_ok(
                "/api/doctors",
                json!({
                    "name": name,
                    "email": format!("{}@clinic.example", name.to_lowercase().replace([' ', '.'], "")),
                    "specialization": specialization,
                    "experienceYears": 8,
                    "fees": fees
                }),
                StatusCode::CREATED,
            )
            .await;
        id_of(&body)
    }

    pub async fn create_retailer(&self, shop: &str) -> String {
        let body = self
            .post_ok(
                "/api/retailers",
                json!({"shopName": shop, "email": "shop@pharma.example"}),
                StatusCode::CREATED,
            )
            .await;
        id_of(&body)
    }

    pub async fn create_product(&self, retailer_id: &str, name: &str, price: f64, stock: u32) -> String {
        let body = self
            .post_ok(
                &format!("/api/retailers/{retailer_id}/products"),
                json!({"name": name, "category": "Pain relief", "price": price, "stock": stock}),
                StatusCode::CREATED,
            )
            .await;
        id_of(&body)
    }

    pub async fn admin_token(&self) -> String {
        let body = self
            .post_ok(
                "/api/auth/login",
                json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD, "role": "admin"}),
                StatusCode::OK,
            )
            .await;
        body["token"].as_str().expect("token").to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub async fn expect_json(res: Response, expected: StatusCode) -> Value {
    let status = res.status();
    let body: Value = res.json().await.unwrap_or(Value::Null);
    assert_eq!(status, expected, "unexpected status, body: {body}");
    body
}

pub fn id_of(body: &Value) -> String {
    body["id"].as_str().expect("document id").to_string()
}

/// `YYYY-MM-DD` for `days` days from today (UTC).
pub fn date_in(days: i64) -> String {
    format_date((now_utc() + time::Duration::days(days)).date())
}
