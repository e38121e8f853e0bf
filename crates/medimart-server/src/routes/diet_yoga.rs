//! Diet and yoga plans attached to a booking.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use medimart_api::{ApiJson, ApiResult};
use medimart_core::models::{Booking, DietYoga, NotificationKind, Role};
use medimart_core::validation;
use medimart_storage::{FindQuery, Repository};
use serde_json::Value;

use super::{Deleted, create_document, delete_document, get_document, parse_model, update_document};
use crate::notifier;
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_plan))
        .route(
            "/{id}",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
        .route("/booking/{booking_id}", get(plans_for_booking))
        .route("/patient/{patient_id}", get(plans_for_patient))
}

/// The patient and doctor are taken from the booking, whatever the body says.
async fn create_plan(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<DietYoga>)> {
    let mut plan: DietYoga = parse_model(body)?;
    validation::require("bookingId", &plan.booking_id)?;

    let storage = state.storage();
    let booking: Booking = get_document(storage, &plan.booking_id).await?;
    plan.patient_id = booking.patient_id;
    plan.doctor_id = booking.doctor_id;

    let (status, ApiJson(plan)) = create_document(storage, plan).await?;
    tracing::info!(plan_id = %plan.meta.id, booking_id = %plan.booking_id, "diet and yoga plan created");

    notifier::notify(
        storage,
        &plan.patient_id,
        Role::Patient,
        NotificationKind::Booking,
        "New diet and yoga plan",
        format!(
            "Your doctor shared a plan with {} meal(s) and {} yoga session(s)",
            plan.diet_plan.len(),
            plan.yoga_plan.len()
        ),
        Some(format!("/api/diet-yoga/{}", plan.meta.id)),
    )
    .await;

    Ok((status, ApiJson(plan)))
}

async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<DietYoga>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<ApiJson<DietYoga>> {
    Ok(ApiJson(
        update_document(
            state.storage(),
            &id,
            body,
            &["bookingId", "patientId", "doctorId"],
        )
        .await?,
    ))
}

async fn delete_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Deleted>> {
    Ok(ApiJson(delete_document::<DietYoga>(state.storage(), &id).await?))
}

async fn plans_for_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> ApiResult<ApiJson<Vec<DietYoga>>> {
    let query = FindQuery::new()
        .eq("bookingId", booking_id.as_str())
        .newest_first();
    Ok(ApiJson(
        Repository::<DietYoga>::new(state.storage()).find(&query).await?,
    ))
}

async fn plans_for_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<ApiJson<Vec<DietYoga>>> {
    let query = FindQuery::new()
        .eq("patientId", patient_id.as_str())
        .newest_first();
    Ok(ApiJson(
        Repository::<DietYoga>::new(state.storage()).find(&query).await?,
    ))
}
