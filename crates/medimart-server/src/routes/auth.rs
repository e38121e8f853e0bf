//! Registration, login and token introspection.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use medimart_api::{ApiError, ApiJson, ApiResult};
use medimart_auth::{
    AuthError, AuthUser, Claims, check_password_strength, hash_password, verify_password,
};
use medimart_core::models::{Credential, Doctor, Document, Patient, Retailer, Role};
use medimart_core::validation;
use medimart_storage::{DocumentStorage, FindQuery, Repository};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_model, to_json};
use crate::locks::account_key;
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub token: String,
    pub role: Role,
    pub subject_id: String,
    pub profile: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub subject_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

fn take_string(body: &mut Value, key: &str) -> Option<String> {
    body.as_object_mut()
        .and_then(|obj| obj.remove(key))
        .and_then(|v| v.as_str().map(str::to_string))
}

async fn create_profile<T: Document>(
    storage: &dyn DocumentStorage,
    body: Value,
) -> ApiResult<(String, Value)> {
    let profile: T = parse_model(body)?;
    profile.validate()?;
    let created = Repository::<T>::new(storage).create(&profile).await?;
    Ok((created.id().to_string(), to_json(&created)?))
}

/// `{role, email, password, ...profile}`. The profile fields are those of the
/// role's document (`name` for patients and doctors, `shopName` for retailers).
async fn register(
    State(state): State<AppState>,
    ApiJson(mut body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<RegisterResponse>)> {
    if !body.is_object() {
        return Err(ApiError::bad_request("registration body must be a JSON object"));
    }
    let role: Role = match take_string(&mut body, "role") {
        Some(raw) => raw.parse()?,
        None => Role::default(),
    };
    if role == Role::Admin {
        return Err(AuthError::forbidden("admin accounts cannot be registered").into());
    }
    let password = take_string(&mut body, "password").unwrap_or_default();
    validation::require("password", &password)?;
    check_password_strength(&password)?;

    let raw_email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    validation::require_email("email", raw_email)?;
    let email = Credential::normalize_email(raw_email);
    if let Some(obj) = body.as_object_mut() {
        obj.insert("email".into(), Value::String(email.clone()));
    }

    let storage = state.storage();
    let _guard = state.locks.lock(account_key(role.as_str(), &email)).await;

    let credentials = Repository::<Credential>::new(storage);
    let existing = FindQuery::new()
        .eq("email", email.as_str())
        .eq("role", role.as_str());
    if credentials.find_one(&existing).await?.is_some() {
        return Err(ApiError::conflict(format!(
            "{email} is already registered as a {role}"
        )));
    }

    let (subject_id, profile) = match role {
        Role::Patient => create_profile::<Patient>(storage, body).await?,
        Role::Doctor => create_profile::<Doctor>(storage, body).await?,
        Role::Retailer => create_profile::<Retailer>(storage, body).await?,
        Role::Admin => {
            return Err(AuthError::forbidden("admin accounts cannot be registered").into());
        }
    };

    let credential = Credential {
        email: email.clone(),
        role,
        subject_id: subject_id.clone(),
        password_hash: hash_password(&password)?,
        ..Default::default()
    };
    if let Err(e) = credentials.create(&credential).await {
        // Do not leave a profile nobody can log into.
        if let Some(collection) = role.profile_collection()
            && let Err(cleanup) = storage.delete(collection, &subject_id).await
        {
            tracing::warn!(error = %cleanup, id = %subject_id, "failed to remove orphaned profile");
        }
        return Err(e.into());
    }

    let token = state.jwt.issue(&subject_id, role, &email)?;
    tracing::info!(role = %role, subject_id = %subject_id, "account registered");

    Ok((
        StatusCode::CREATED,
        ApiJson(RegisterResponse {
            token,
            role,
            subject_id,
            profile,
        }),
    ))
}

/// Without a role, the oldest account for the email is used.
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<ApiJson<LoginResponse>> {
    validation::require("email", &req.email)?;
    validation::require("password", &req.password)?;
    let role: Option<Role> = match req.role.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(raw.parse()?),
        _ => None,
    };

    let email = Credential::normalize_email(&req.email);
    let query = FindQuery::new()
        .eq("email", email.as_str())
        .eq_opt("role", role.map(|r| r.as_str()));
    let credential = Repository::<Credential>::new(state.storage())
        .find_one(&query)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&req.password, &credential.password_hash)? {
        tracing::debug!(email = %email, "password mismatch");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state
        .jwt
        .issue(&credential.subject_id, credential.role, &credential.email)?;
    Ok(ApiJson(LoginResponse {
        token,
        role: credential.role,
        subject_id: credential.subject_id,
    }))
}

async fn me(AuthUser(claims): AuthUser) -> ApiJson<Claims> {
    ApiJson(claims)
}
