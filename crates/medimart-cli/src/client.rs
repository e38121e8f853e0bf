use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

pub struct MedimartClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl MedimartClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let req = self.http.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn get<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Value> {
        let resp = self
            .request(reqwest::Method::GET, &self.api_url(path))
            .query(query)
            .send()
            .await
            .context("Failed to connect to server")?;
        handle_response(resp).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let resp = self
            .request(reqwest::Method::POST, &self.api_url(path))
            .json(body)
            .send()
            .await
            .context("Failed to connect to server")?;
        handle_response(resp).await
    }

    pub async fn health(&self) -> Result<(u16, String)> {
        let url = format!("{}/healthz", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to connect to server")?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

/// Turns an `{error, message}` body into a readable failure.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body)
        && let Some(message) = json.get("message").and_then(Value::as_str)
    {
        let kind = json.get("error").and_then(Value::as_str).unwrap_or("error");
        return format!("HTTP {status} ({kind}): {message}");
    }
    format!("HTTP {status}: {body}")
}

async fn handle_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        anyhow::bail!(error_message(status, &body));
    }
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).context("Failed to parse response JSON")
}
