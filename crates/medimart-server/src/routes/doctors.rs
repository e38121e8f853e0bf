//! Doctor profiles, the legacy directory schema, availability and reviews.

use std::collections::{HashMap, HashSet};

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use medimart_api::{ApiError, ApiJson, ApiQuery, ApiResult};
use medimart_core::models::{Booking, BookingStatus, Doctor, DoctorData, DoctorSummary, Patient};
use medimart_core::time::{format_slot, parse_date, slot_start};
use medimart_core::{TimeWindow, now_utc};
use medimart_storage::{DocumentStorage, FindQuery, Repository};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Date, OffsetDateTime, Time};

use super::{Deleted, create_document, delete_document, get_document, parse_enum, parse_model, update_document};
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_doctor).get(list_doctors))
        .route("/data", post(create_doctor_data))
        .route("/data/{id}", get(get_doctor_data))
        .route("/all-data", get(all_doctors))
        .route(
            "/{id}",
            get(get_doctor).put(update_doctor).delete(delete_doctor),
        )
        .route("/{id}/slots", get(available_slots))
        .route("/{id}/patients", get(doctor_patients))
        .route("/{id}/reviews", get(doctor_reviews))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Case-insensitive exact match
    pub specialization: Option<String>,
    /// Name substring
    pub q: Option<String>,
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

async fn create_doctor(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<Doctor>)> {
    create_document(state.storage(), parse_model::<Doctor>(body)?).await
}

async fn list_doctors(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<ApiJson<Vec<Doctor>>> {
    let mut query = FindQuery::new().sort_asc("name");
    if let Some(q) = non_blank(&params.q) {
        query = query.contains("name", q);
    }
    let specialization = non_blank(&params.specialization);
    if let Some(s) = specialization {
        // Narrow in storage, then require the whole value to match.
        query = query.contains("specialization", s);
    }
    let mut doctors = Repository::<Doctor>::new(state.storage()).find(&query).await?;
    if let Some(s) = specialization {
        doctors.retain(|d| d.specialization.trim().eq_ignore_ascii_case(s));
    }
    Ok(ApiJson(doctors))
}

async fn get_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Doctor>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

/// Ratings are derived from reviews and cannot be set directly.
async fn update_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<ApiJson<Doctor>> {
    Ok(ApiJson(
        update_document(state.storage(), &id, body, &["email", "rating", "ratingCount"]).await?,
    ))
}

async fn delete_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Deleted>> {
    Ok(ApiJson(delete_document::<Doctor>(state.storage(), &id).await?))
}

async fn create_doctor_data(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<DoctorData>)> {
    create_document(state.storage(), parse_model::<DoctorData>(body)?).await
}

async fn get_doctor_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<DoctorData>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

/// Both doctor schemas in one listing, sorted by name.
async fn all_doctors(State(state): State<AppState>) -> ApiResult<ApiJson<Vec<DoctorSummary>>> {
    let storage = state.storage();
    let doctors = Repository::<Doctor>::new(storage).find(&FindQuery::new()).await?;
    let legacy = Repository::<DoctorData>::new(storage)
        .find(&FindQuery::new())
        .await?;

    let mut all: Vec<DoctorSummary> = doctors
        .iter()
        .map(DoctorSummary::from)
        .chain(legacy.iter().map(DoctorSummary::from))
        .collect();
    all.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(ApiJson(all))
}

// =============================================================================
// Availability
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotParams {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub doctor_id: String,
    pub date: String,
    pub slots: Vec<String>,
    pub booked: Vec<String>,
}

/// Schedule minus slots held by live bookings, minus slots already started
/// when the date is today.
pub(crate) fn open_slots(
    schedule: &[Time],
    taken: &HashSet<Time>,
    date: Date,
    now: OffsetDateTime,
) -> Vec<Time> {
    schedule
        .iter()
        .copied()
        .filter(|slot| !taken.contains(slot))
        .filter(|slot| slot_start(date, *slot) > now)
        .collect()
}

/// Slots on `date` held by bookings that are not cancelled.
pub(crate) async fn taken_slots(
    storage: &dyn DocumentStorage,
    doctor_id: &str,
    date: &str,
) -> ApiResult<HashSet<Time>> {
    let query = FindQuery::new().eq("doctorId", doctor_id).eq("date", date);
    let bookings = Repository::<Booking>::new(storage).find(&query).await?;
    Ok(bookings
        .iter()
        .filter(|b| b.status.holds_slot())
        .filter_map(|b| b.appointment().ok().map(|(_, slot)| slot))
        .collect())
}

async fn available_slots(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<SlotParams>,
) -> ApiResult<ApiJson<SlotAvailability>> {
    let raw = params
        .date
        .ok_or_else(|| ApiError::bad_request("query parameter 'date' is required"))?;
    let date = parse_date(&raw)?;
    let now = now_utc();
    if date < now.date() {
        return Err(ApiError::bad_request(format!("{raw} is in the past")));
    }

    let storage = state.storage();
    let doctor: Doctor = get_document(storage, &id).await?;
    let schedule = doctor.schedule()?;
    let date_str = medimart_core::time::format_date(date);
    let taken = taken_slots(storage, &id, &date_str).await?;

    let mut booked: Vec<Time> = taken.iter().copied().collect();
    booked.sort();
    Ok(ApiJson(SlotAvailability {
        doctor_id: id,
        date: date_str,
        slots: open_slots(&schedule, &taken, date, now)
            .into_iter()
            .map(format_slot)
            .collect(),
        booked: booked.into_iter().map(format_slot).collect(),
    }))
}

// =============================================================================
// Patients of a doctor
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PatientsParams {
    pub window: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPatient {
    pub booking_id: String,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub date: String,
    pub time_slot: String,
    pub status: BookingStatus,
    pub payment_status: medimart_core::models::PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

async fn doctor_patients(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<PatientsParams>,
) -> ApiResult<ApiJson<Vec<DoctorPatient>>> {
    let window: Option<TimeWindow> = match non_blank(&params.window) {
        Some(w) => Some(w.parse()?),
        None => None,
    };
    let status: Option<BookingStatus> = match non_blank(&params.status) {
        Some(s) => Some(parse_enum("status", s)?),
        None => None,
    };

    let storage = state.storage();
    get_document::<Doctor>(storage, &id).await?;

    let query = FindQuery::new()
        .eq("doctorId", id.as_str())
        .eq_opt("status", status.map(|s| s.to_string()));
    let bookings = Repository::<Booking>::new(storage).find(&query).await?;

    let now = now_utc();
    let mut rows: Vec<((Date, Time), Booking)> = bookings
        .into_iter()
        .filter_map(|b| match b.appointment() {
            Ok(at) => Some((at, b)),
            Err(e) => {
                tracing::warn!(booking_id = %b.meta.id, error = %e, "skipping booking with bad date");
                None
            }
        })
        .filter(|((date, slot), _)| window.is_none_or(|w| w.contains(*date, *slot, now)))
        .collect();
    if window == Some(TimeWindow::Past) {
        rows.sort_by(|a, b| b.0.cmp(&a.0));
    } else {
        rows.sort_by(|a, b| a.0.cmp(&b.0));
    }

    let names = patient_names(storage, rows.iter().map(|(_, b)| b.patient_id.as_str())).await?;
    let out = rows
        .into_iter()
        .map(|(_, b)| DoctorPatient {
            patient_name: names.get(&b.patient_id).cloned(),
            booking_id: b.meta.id,
            patient_id: b.patient_id,
            date: b.date,
            time_slot: b.time_slot,
            status: b.status,
            payment_status: b.payment_status,
            reason: b.reason,
        })
        .collect();
    Ok(ApiJson(out))
}

async fn patient_names<'a>(
    storage: &dyn DocumentStorage,
    ids: impl Iterator<Item = &'a str>,
) -> ApiResult<HashMap<String, String>> {
    let ids: HashSet<&str> = ids.collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let query = FindQuery::new().one_of("id", ids);
    let patients = Repository::<Patient>::new(storage).find(&query).await?;
    Ok(patients.into_iter().map(|p| (p.meta.id, p.name)).collect())
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub booking_id: String,
    pub patient_id: String,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reviewed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct ReviewSummary {
    pub average: Option<f64>,
    pub count: usize,
    pub reviews: Vec<Review>,
}

/// Average of the ratings to two decimals, `None` without any.
pub(crate) fn average_rating(ratings: &[u8]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: u32 = ratings.iter().map(|r| u32::from(*r)).sum();
    Some(super::round_money(f64::from(sum) / ratings.len() as f64))
}

pub(crate) async fn reviewed_bookings(
    storage: &dyn DocumentStorage,
    doctor_id: &str,
) -> ApiResult<Vec<Booking>> {
    let query = FindQuery::new()
        .eq("doctorId", doctor_id)
        .ne("rating", Value::Null)
        .sort_desc("reviewedAt");
    Ok(Repository::<Booking>::new(storage).find(&query).await?)
}

async fn doctor_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<ReviewSummary>> {
    let storage = state.storage();
    get_document::<Doctor>(storage, &id).await?;

    let reviews: Vec<Review> = reviewed_bookings(storage, &id)
        .await?
        .into_iter()
        .filter_map(|b| {
            Some(Review {
                rating: b.rating?,
                booking_id: b.meta.id,
                patient_id: b.patient_id,
                review: b.review,
                reviewed_at: b.reviewed_at,
            })
        })
        .collect();
    let ratings: Vec<u8> = reviews.iter().map(|r| r.rating).collect();

    Ok(ApiJson(ReviewSummary {
        average: average_rating(&ratings),
        count: reviews.len(),
        reviews,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use medimart_core::models::doctor::default_schedule;
    use time::macros::{date, datetime, time};

    #[test]
    fn open_slots_drop_taken_and_started() {
        let schedule = default_schedule();
        let taken: HashSet<Time> = [time!(09:30)].into_iter().collect();
        let now = datetime!(2030-05-01 10:15 UTC);

        let today = open_slots(&schedule, &taken, date!(2030 - 05 - 01), now);
        assert_eq!(today.first(), Some(&time!(10:30)));
        assert!(!today.contains(&time!(10:00)));

        let tomorrow = open_slots(&schedule, &taken, date!(2030 - 05 - 02), now);
        assert_eq!(tomorrow.len(), schedule.len() - 1);
        assert!(!tomorrow.contains(&time!(09:30)));
    }

    #[test]
    fn average_is_rounded() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[5, 4, 4]), Some(4.33));
        assert_eq!(average_rating(&[3]), Some(3.0));
    }
}
