//! Appointment booking, status and payment lifecycle, reviews.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use medimart_api::{ApiError, ApiJson, ApiQuery, ApiResult};
use medimart_core::models::{
    Booking, BookingStatus, Doctor, NotificationKind, Patient, PaymentStatus, Role, Supplement,
    Transaction, TransactionPurpose,
};
use medimart_core::time::{format_date, format_slot, parse_date, parse_slot, slot_start};
use medimart_core::{now_utc, validation};
use medimart_storage::{DocumentStorage, FindQuery, Repository};
use serde::Deserialize;
use serde_json::json;

use super::doctors::{average_rating, reviewed_bookings, taken_slots};
use super::{Deleted, delete_document, get_document, parse_enum, round_money};
use crate::locks::{booking_key, doctor_key};
use crate::server::AppState;
use crate::{metrics, notifier};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/{id}", get(get_booking).delete(delete_booking))
        .route("/patient/{patient_id}", get(patient_bookings))
        .route("/doctor/{doctor_id}", get(doctor_bookings))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/payment", patch(update_payment))
        .route("/{id}/review", post(review_booking))
        .route("/{id}/supplements", post(add_supplements))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub doctor_id: String,
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time_slot: String,
    #[serde(default)]
    pub reason: Option<String>,
    /// Defaults to the doctor's fees
    #[serde(default)]
    pub amount: Option<f64>,
}

async fn create_booking(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> ApiResult<(StatusCode, ApiJson<Booking>)> {
    validation::require("doctorId", &req.doctor_id)?;
    validation::require("patientId", &req.patient_id)?;
    validation::require("date", &req.date)?;
    validation::require("timeSlot", &req.time_slot)?;
    let date = parse_date(&req.date)?;
    let slot = parse_slot(&req.time_slot)?;
    if let Some(amount) = req.amount {
        validation::require_non_negative("amount", amount)?;
    }

    let storage = state.storage();
    // Serialises the availability check with the insert for this doctor.
    let _guard = state.locks.lock(doctor_key(&req.doctor_id)).await;

    let doctor: Doctor = get_document(storage, &req.doctor_id).await?;
    get_document::<Patient>(storage, &req.patient_id).await?;

    if slot_start(date, slot) <= now_utc() {
        return Err(ApiError::bad_request(format!(
            "{} {} is in the past",
            req.date, req.time_slot
        )));
    }
    if !doctor.schedule()?.contains(&slot) {
        return Err(ApiError::bad_request(format!(
            "{} is not one of the doctor's slots",
            format_slot(slot)
        )));
    }

    let date_str = format_date(date);
    let slot_str = format_slot(slot);
    if taken_slots(storage, &req.doctor_id, &date_str)
        .await?
        .contains(&slot)
    {
        return Err(ApiError::conflict(format!(
            "slot {date_str} {slot_str} is already booked"
        )));
    }

    let booking = Booking {
        doctor_id: req.doctor_id,
        patient_id: req.patient_id,
        date: date_str,
        time_slot: slot_str,
        reason: req.reason,
        amount: req.amount.unwrap_or(doctor.fees),
        ..Default::default()
    };
    booking.validate()?;
    let booking = Repository::<Booking>::new(storage).create(&booking).await?;
    metrics::record_booking_created();
    tracing::info!(
        booking_id = %booking.meta.id,
        doctor_id = %booking.doctor_id,
        date = %booking.date,
        time_slot = %booking.time_slot,
        "booking created"
    );

    notifier::notify(
        storage,
        &booking.doctor_id,
        Role::Doctor,
        NotificationKind::Booking,
        "New appointment",
        format!("New booking on {} at {}", booking.date, booking.time_slot),
        Some(format!("/api/bookings/{}", booking.meta.id)),
    )
    .await;

    Ok((StatusCode::CREATED, ApiJson(booking)))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Booking>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Deleted>> {
    Ok(ApiJson(delete_document::<Booking>(state.storage(), &id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

/// Newest appointment first.
async fn list_bookings(
    storage: &dyn DocumentStorage,
    field: &str,
    id: &str,
    filter: StatusFilter,
) -> ApiResult<Vec<Booking>> {
    let status: Option<BookingStatus> = match filter.status.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(parse_enum("status", s)?),
        _ => None,
    };
    let query = FindQuery::new()
        .eq(field, id)
        .eq_opt("status", status.map(|s| s.to_string()))
        .sort_desc("date")
        .sort_desc("timeSlot");
    Ok(Repository::<Booking>::new(storage).find(&query).await?)
}

async fn patient_bookings(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    ApiQuery(filter): ApiQuery<StatusFilter>,
) -> ApiResult<ApiJson<Vec<Booking>>> {
    Ok(ApiJson(
        list_bookings(state.storage(), "patientId", &patient_id, filter).await?,
    ))
}

async fn doctor_bookings(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
    ApiQuery(filter): ApiQuery<StatusFilter>,
) -> ApiResult<ApiJson<Vec<Booking>>> {
    Ok(ApiJson(
        list_bookings(state.storage(), "doctorId", &doctor_id, filter).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<ApiJson<Booking>> {
    validation::require("status", &req.status)?;
    let next: BookingStatus = req.status.trim().parse()?;

    let storage = state.storage();
    let _guard = state.locks.lock(booking_key(&id)).await;
    let repo = Repository::<Booking>::new(storage);
    let mut booking = repo.require(&id).await?;

    booking.status = booking.status.transition_to(next)?;
    if next == BookingStatus::Cancelled && booking.payment_status == PaymentStatus::Paid {
        booking.payment_status = PaymentStatus::Refunded;
    }
    let booking = repo.save(&booking).await?;
    tracing::info!(booking_id = %id, status = %booking.status, "booking status changed");

    notifier::notify(
        storage,
        &booking.patient_id,
        Role::Patient,
        NotificationKind::Booking,
        "Appointment update",
        format!(
            "Your appointment on {} at {} is now {}",
            booking.date, booking.time_slot, booking.status
        ),
        Some(format!("/api/bookings/{id}")),
    )
    .await;

    Ok(ApiJson(booking))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub method: Option<String>,
}

/// Moving to `paid` records the payment as a transaction. A paid booking
/// can only move on to `refunded`.
async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PaymentRequest>,
) -> ApiResult<ApiJson<Booking>> {
    validation::require("paymentStatus", &req.payment_status)?;
    let next: PaymentStatus = parse_enum("paymentStatus", req.payment_status.trim())?;

    let storage = state.storage();
    let _guard = state.locks.lock(booking_key(&id)).await;
    let repo = Repository::<Booking>::new(storage);
    let mut booking = repo.require(&id).await?;

    let newly_paid = next == PaymentStatus::Paid && booking.payment_status != PaymentStatus::Paid;
    if newly_paid && booking.status == BookingStatus::Cancelled {
        return Err(ApiError::bad_request("a cancelled booking cannot be paid"));
    }
    booking.payment_status = booking.payment_status.transition_to(next)?;
    let booking = repo.save(&booking).await?;

    if newly_paid && booking.amount > 0.0 {
        let txn = Transaction::settled(
            TransactionPurpose::Booking,
            booking.patient_id.as_str(),
            booking.doctor_id.as_str(),
            booking.meta.id.as_str(),
            round_money(booking.amount),
            req.method,
        );
        Repository::<Transaction>::new(storage).create(&txn).await?;
        metrics::record_payment("booking");

        notifier::notify(
            storage,
            &booking.doctor_id,
            Role::Doctor,
            NotificationKind::Payment,
            "Payment received",
            format!(
                "Payment of {:.2} received for the appointment on {} at {}",
                booking.amount, booking.date, booking.time_slot
            ),
            Some(format!("/api/bookings/{id}")),
        )
        .await;
    }
    tracing::info!(booking_id = %id, payment_status = %booking.payment_status, "booking payment updated");

    Ok(ApiJson(booking))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: Option<u8>,
    #[serde(default)]
    pub review: Option<String>,
}

/// Also refreshes the doctor's average rating.
async fn review_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> ApiResult<ApiJson<Booking>> {
    let rating = req
        .rating
        .ok_or_else(|| ApiError::bad_request("Missing required field: rating"))?;
    validation::require_rating(rating)?;

    let storage = state.storage();
    let _guard = state.locks.lock(booking_key(&id)).await;
    let repo = Repository::<Booking>::new(storage);
    let mut booking = repo.require(&id).await?;

    if booking.status != BookingStatus::Completed {
        return Err(ApiError::bad_request(format!(
            "only completed bookings can be reviewed (status is {})",
            booking.status
        )));
    }
    if booking.is_reviewed() {
        return Err(ApiError::conflict("booking has already been reviewed"));
    }

    booking.rating = Some(rating);
    booking.review = req.review.filter(|r| !r.trim().is_empty());
    booking.reviewed_at = Some(now_utc());
    let booking = repo.save(&booking).await?;

    {
        let _doctor_guard = state.locks.lock(doctor_key(&booking.doctor_id)).await;
        let ratings: Vec<u8> = reviewed_bookings(storage, &booking.doctor_id)
            .await?
            .iter()
            .filter_map(|b| b.rating)
            .collect();
        let patch = json!({
            "rating": average_rating(&ratings),
            "ratingCount": ratings.len(),
        });
        match Repository::<Doctor>::new(storage)
            .patch(&booking.doctor_id, patch)
            .await
        {
            Ok(_) => {}
            // The review stands even if the doctor profile is gone.
            Err(e) if e.is_not_found() => {
                tracing::warn!(doctor_id = %booking.doctor_id, "reviewed booking refers to a missing doctor");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(ApiJson(booking))
}

#[derive(Debug, Deserialize)]
pub struct SupplementsRequest {
    #[serde(default)]
    pub supplements: Vec<Supplement>,
}

async fn add_supplements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SupplementsRequest>,
) -> ApiResult<ApiJson<Booking>> {
    if req.supplements.is_empty() {
        return Err(ApiError::bad_request("supplements must not be empty"));
    }
    for s in &req.supplements {
        s.validate()?;
    }

    let storage = state.storage();
    let _guard = state.locks.lock(booking_key(&id)).await;
    let repo = Repository::<Booking>::new(storage);
    let mut booking = repo.require(&id).await?;
    let added = req.supplements.len();
    booking.recommended_supplements.extend(req.supplements);
    let booking = repo.save(&booking).await?;

    notifier::notify(
        storage,
        &booking.patient_id,
        Role::Patient,
        NotificationKind::Booking,
        "Supplements recommended",
        format!("Your doctor recommended {added} supplement(s)"),
        Some(format!("/api/bookings/{id}")),
    )
    .await;

    Ok(ApiJson(booking))
}
