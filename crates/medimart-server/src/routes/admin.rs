//! Operator endpoints. Every route requires an admin token.

use std::collections::BTreeMap;

use axum::{Router, extract::State, routing::get};
use medimart_api::{ApiJson, ApiResult};
use medimart_auth::AdminUser;
use medimart_core::Collection;
use medimart_core::models::{Booking, Order};
use medimart_storage::{FindQuery, Repository};
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use super::round_money;
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/feedback", get(feedback))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub counts: BTreeMap<&'static str, u64>,
    pub paid_orders: usize,
    pub revenue: f64,
}

async fn stats(
    AdminUser(claims): AdminUser,
    State(state): State<AppState>,
) -> ApiResult<ApiJson<Stats>> {
    let storage = state.storage();
    let mut counts = BTreeMap::new();
    for collection in Collection::ALL {
        let n = storage.count(collection, &FindQuery::new()).await?;
        counts.insert(collection.as_str(), n);
    }

    let paid = Repository::<Order>::new(storage)
        .find(&FindQuery::new().eq("paymentStatus", "paid"))
        .await?;
    let revenue = round_money(paid.iter().map(|o| o.total_amount).sum());
    tracing::debug!(admin = %claims.sub, "stats requested");

    Ok(ApiJson(Stats {
        counts,
        paid_orders: paid.len(),
        revenue,
    }))
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSource {
    Booking,
    Order,
}

/// A review of a consultation or feedback on a delivered order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub source: FeedbackSource,
    pub reference_id: String,
    pub author_id: String,
    /// Doctor or retailer the feedback is about
    pub subject_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn from_booking(b: Booking) -> Option<FeedbackEntry> {
    Some(FeedbackEntry {
        source: FeedbackSource::Booking,
        rating: b.rating?,
        created_at: b.reviewed_at.or(b.meta.updated_at)?,
        reference_id: b.meta.id,
        author_id: b.patient_id,
        subject_id: b.doctor_id,
        comment: b.review,
    })
}

fn from_order(o: Order) -> Option<FeedbackEntry> {
    let fb = o.feedback?;
    Some(FeedbackEntry {
        source: FeedbackSource::Order,
        reference_id: o.meta.id,
        author_id: o.buyer_id,
        subject_id: o.retailer_id,
        rating: fb.rating,
        comment: Some(fb.comment).filter(|c| !c.is_empty()),
        created_at: fb.created_at,
    })
}

async fn feedback(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
) -> ApiResult<ApiJson<Vec<FeedbackEntry>>> {
    let storage = state.storage();
    let reviews = Repository::<Booking>::new(storage)
        .find(&FindQuery::new().ne("rating", Value::Null))
        .await?;
    let order_feedback = Repository::<Order>::new(storage)
        .find(&FindQuery::new().ne("feedback", Value::Null))
        .await?;

    let mut entries: Vec<FeedbackEntry> = reviews
        .into_iter()
        .filter_map(from_booking)
        .chain(order_feedback.into_iter().filter_map(from_order))
        .collect();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(ApiJson(entries))
}
