//! Patient profiles and medical records.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use medimart_api::{ApiJson, ApiQuery, ApiResult};
use medimart_core::models::{
    Doctor, NotificationKind, Patient, PatientRecord, PrescribedMedicine, Prescription, Role,
};
use medimart_core::{now_utc, validation};
use medimart_storage::{DocumentStorage, FindQuery, Repository};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Deleted, create_document, delete_document, get_document, parse_model, update_document};
use crate::locks::patient_key;
use crate::notifier;
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_patient).get(list_patients))
        .route(
            "/{id}",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route("/{id}/record", get(get_record))
        .route("/{id}/record/doctors", post(connect_doctor))
        .route(
            "/{id}/record/doctors/{doctor_id}/prescriptions",
            post(add_prescription),
        )
        .route("/{id}/prescriptions", get(list_prescriptions))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Name substring
    pub q: Option<String>,
}

async fn create_patient(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<Patient>)> {
    create_document(state.storage(), parse_model::<Patient>(body)?).await
}

async fn list_patients(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<ApiJson<Vec<Patient>>> {
    let mut query = FindQuery::new().sort_asc("name");
    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query = query.contains("name", q);
    }
    let patients = Repository::<Patient>::new(state.storage()).find(&query).await?;
    Ok(ApiJson(patients))
}

async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Patient>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<ApiJson<Patient>> {
    Ok(ApiJson(update_document(state.storage(), &id, body, &["email"]).await?))
}

async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Deleted>> {
    Ok(ApiJson(delete_document::<Patient>(state.storage(), &id).await?))
}

// =============================================================================
// Medical record
// =============================================================================

async fn load_record(storage: &dyn DocumentStorage, patient_id: &str) -> ApiResult<PatientRecord> {
    let query = FindQuery::new().eq("patientId", patient_id);
    Ok(Repository::<PatientRecord>::new(storage)
        .find_one(&query)
        .await?
        .unwrap_or_else(|| PatientRecord::empty(patient_id)))
}

/// Inserts the record on first write, replaces it afterwards.
async fn store_record(storage: &dyn DocumentStorage, record: &PatientRecord) -> ApiResult<PatientRecord> {
    record.validate()?;
    let repo = Repository::<PatientRecord>::new(storage);
    let stored = if record.meta.id.is_empty() {
        repo.create(record).await?
    } else {
        repo.save(record).await?
    };
    Ok(stored)
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<PatientRecord>> {
    let storage = state.storage();
    get_document::<Patient>(storage, &id).await?;
    Ok(ApiJson(load_record(storage, &id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectDoctorRequest {
    #[serde(default)]
    pub doctor_id: String,
}

async fn connect_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ConnectDoctorRequest>,
) -> ApiResult<ApiJson<PatientRecord>> {
    validation::require("doctorId", &req.doctor_id)?;
    let storage = state.storage();
    let _guard = state.locks.lock(patient_key(&id)).await;

    get_document::<Patient>(storage, &id).await?;
    get_document::<Doctor>(storage, &req.doctor_id).await?;

    let mut record = load_record(storage, &id).await?;
    if !record.connect(&req.doctor_id, now_utc()) {
        return Ok(ApiJson(record));
    }
    let record = store_record(storage, &record).await?;
    tracing::info!(patient_id = %id, doctor_id = %req.doctor_id, "doctor connected to patient record");
    Ok(ApiJson(record))
}

#[derive(Debug, Deserialize)]
pub struct PrescriptionRequest {
    #[serde(default)]
    pub medicines: Vec<PrescribedMedicine>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A prescription together with the doctor who issued it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedPrescription {
    pub doctor_id: String,
    #[serde(flatten)]
    pub prescription: Prescription,
}

async fn add_prescription(
    State(state): State<AppState>,
    Path((id, doctor_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<PrescriptionRequest>,
) -> ApiResult<(StatusCode, ApiJson<IssuedPrescription>)> {
    let prescription = Prescription::new(req.medicines, req.notes, now_utc())?;

    let storage = state.storage();
    let _guard = state.locks.lock(patient_key(&id)).await;
    get_document::<Patient>(storage, &id).await?;
    let doctor = get_document::<Doctor>(storage, &doctor_id).await?;

    let mut record = load_record(storage, &id).await?;
    record.add_prescription(&doctor_id, prescription.clone());
    store_record(storage, &record).await?;

    notifier::notify(
        storage,
        &id,
        Role::Patient,
        NotificationKind::Prescription,
        "New prescription",
        format!(
            "{} prescribed {} medicine(s)",
            doctor.name,
            prescription.medicines.len()
        ),
        Some(format!("/api/patients/{id}/prescriptions")),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        ApiJson(IssuedPrescription {
            doctor_id,
            prescription,
        }),
    ))
}

async fn list_prescriptions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Vec<IssuedPrescription>>> {
    let storage = state.storage();
    get_document::<Patient>(storage, &id).await?;
    let record = load_record(storage, &id).await?;
    let list = record
        .prescriptions()
        .into_iter()
        .map(|(doctor_id, p)| IssuedPrescription {
            doctor_id: doctor_id.to_string(),
            prescription: p.clone(),
        })
        .collect();
    Ok(ApiJson(list))
}
