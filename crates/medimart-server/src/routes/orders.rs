//! Medicine orders: placement with stock reservation, fulfilment status,
//! cancellation and buyer feedback.

use std::collections::{HashMap, HashSet};

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use medimart_api::{ApiError, ApiJson, ApiResult};
use medimart_core::models::{
    NotificationKind, Order, OrderFeedback, OrderItem, OrderPaymentStatus, OrderStatus, Patient,
    Product, Retailer, RetailerStatus, Role, Transaction, TransactionPurpose,
};
use medimart_core::{now_utc, validation};
use medimart_storage::{DocumentStorage, FindQuery, Repository};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{get_document, parse_enum, round_money};
use crate::locks::{order_key, retailer_key};
use crate::server::AppState;
use crate::{metrics, notifier};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/{id}", get(get_order))
        .route("/buyer/{buyer_id}", get(buyer_orders))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/feedback", post(leave_feedback))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub buyer_id: String,
    #[serde(default)]
    pub retailer_id: String,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub shipping_address: String,
}

/// Sums quantities of repeated products, keeping first-seen order.
fn aggregate_lines(lines: &[OrderLine]) -> Vec<(String, u32)> {
    let mut out: Vec<(String, u32)> = Vec::with_capacity(lines.len());
    for line in lines {
        let id = line.product_id.trim();
        match out.iter_mut().find(|(pid, _)| pid == id) {
            Some((_, qty)) => *qty = qty.saturating_add(line.quantity),
            None => out.push((id.to_string(), line.quantity)),
        }
    }
    out
}

async fn adjust_stock(
    storage: &dyn DocumentStorage,
    product_id: &str,
    delta: i64,
) -> ApiResult<Product> {
    let repo = Repository::<Product>::new(storage);
    let product = repo.require(product_id).await?;
    let stock = (i64::from(product.stock) + delta).max(0);
    Ok(repo.patch(product_id, json!({ "stock": stock })).await?)
}

/// Puts reserved quantities back. Failures are logged, not returned.
async fn restore_stock(storage: &dyn DocumentStorage, reserved: &[(String, u32)]) {
    for (product_id, qty) in reserved {
        if let Err(e) = adjust_stock(storage, product_id, i64::from(*qty)).await {
            tracing::warn!(product_id = %product_id, quantity = qty, error = %e, "failed to restore stock");
        }
    }
}

async fn place_order(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, ApiJson<Order>)> {
    validation::require("buyerId", &req.buyer_id)?;
    validation::require("retailerId", &req.retailer_id)?;
    validation::require("shippingAddress", &req.shipping_address)?;
    if req.items.is_empty() {
        return Err(ApiError::bad_request("an order needs at least one item"));
    }
    for line in &req.items {
        validation::require("items.productId", &line.product_id)?;
        if line.quantity == 0 {
            return Err(ApiError::bad_request(format!(
                "quantity for product {} must be at least 1",
                line.product_id
            )));
        }
    }

    let storage = state.storage();
    get_document::<Patient>(storage, &req.buyer_id).await?;
    get_document::<Retailer>(storage, &req.retailer_id).await?;

    let _guard = state.locks.lock(retailer_key(&req.retailer_id)).await;
    let lines = aggregate_lines(&req.items);
    let products = Repository::<Product>::new(storage);

    let mut items = Vec::with_capacity(lines.len());
    for (product_id, qty) in &lines {
        let product = products.require(product_id).await?;
        if product.retailer_id != req.retailer_id {
            return Err(ApiError::bad_request(format!(
                "product {product_id} is not sold by retailer {}",
                req.retailer_id
            )));
        }
        if product.stock < *qty {
            return Err(ApiError::conflict(format!(
                "insufficient stock for {}: {} requested, {} available",
                product.name, qty, product.stock
            )));
        }
        items.push(OrderItem {
            product_id: product_id.clone(),
            name: product.name,
            quantity: *qty,
            unit_price: product.price,
        });
    }

    let mut reserved: Vec<(String, u32)> = Vec::with_capacity(lines.len());
    for (product_id, qty) in &lines {
        if let Err(e) = adjust_stock(storage, product_id, -i64::from(*qty)).await {
            restore_stock(storage, &reserved).await;
            return Err(e);
        }
        reserved.push((product_id.clone(), *qty));
    }

    let mut order = Order {
        buyer_id: req.buyer_id,
        retailer_id: req.retailer_id,
        items,
        shipping_address: req.shipping_address,
        ..Default::default()
    };
    order.total_amount = round_money(order.compute_total());

    let created = match order.validate() {
        Ok(()) => Repository::<Order>::new(storage).create(&order).await.map_err(ApiError::from),
        Err(e) => Err(e.into()),
    };
    let order = match created {
        Ok(order) => order,
        Err(e) => {
            restore_stock(storage, &reserved).await;
            return Err(e);
        }
    };

    metrics::record_order_placed(order.items.len());
    tracing::info!(
        order_id = %order.meta.id,
        retailer_id = %order.retailer_id,
        items = order.items.len(),
        total = order.total_amount,
        "order placed"
    );

    notifier::notify(
        storage,
        &order.retailer_id,
        Role::Retailer,
        NotificationKind::Order,
        "New order",
        format!(
            "New order with {} item(s) totalling {:.2}",
            order.items.len(),
            order.total_amount
        ),
        Some(format!("/api/orders/{}", order.meta.id)),
    )
    .await;

    Ok((StatusCode::CREATED, ApiJson(order)))
}

async fn list_orders(State(state): State<AppState>) -> ApiResult<ApiJson<Vec<Order>>> {
    let query = FindQuery::new().newest_first();
    Ok(ApiJson(
        Repository::<Order>::new(state.storage()).find(&query).await?,
    ))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Order>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerOrder {
    #[serde(flatten)]
    pub order: Order,
    pub retailer_name: Option<String>,
}

async fn buyer_orders(
    State(state): State<AppState>,
    Path(buyer_id): Path<String>,
) -> ApiResult<ApiJson<Vec<BuyerOrder>>> {
    let storage = state.storage();
    let query = FindQuery::new()
        .eq("buyerId", buyer_id.as_str())
        .newest_first();
    let orders = Repository::<Order>::new(storage).find(&query).await?;

    let retailer_ids: HashSet<&str> = orders.iter().map(|o| o.retailer_id.as_str()).collect();
    let names: HashMap<String, String> = if retailer_ids.is_empty() {
        HashMap::new()
    } else {
        Repository::<Retailer>::new(storage)
            .find(&FindQuery::new().one_of("id", retailer_ids))
            .await?
            .into_iter()
            .map(|r| (r.meta.id, r.shop_name))
            .collect()
    };

    let out = orders
        .into_iter()
        .map(|order| BuyerOrder {
            retailer_name: names.get(&order.retailer_id).cloned(),
            order,
        })
        .collect();
    Ok(ApiJson(out))
}

/// Marks the order cancelled and refunds a paid order. Nothing is persisted;
/// the caller saves the order and then calls `return_stock`.
fn mark_cancelled(order: &mut Order) -> ApiResult<()> {
    if !order.order_status.is_cancellable() {
        return Err(ApiError::bad_request(format!(
            "an order that is {} can no longer be cancelled",
            order.order_status
        )));
    }
    order.order_status = order.order_status.transition_to(OrderStatus::Cancelled)?;
    if order.payment_status == OrderPaymentStatus::Paid {
        order.payment_status = OrderPaymentStatus::Refunded;
    }
    Ok(())
}

/// Puts a saved cancellation's items back on the shelf.
/// The caller holds the order lock.
async fn return_stock(state: &AppState, order: &Order) {
    let _guard = state.locks.lock(retailer_key(&order.retailer_id)).await;
    let reserved: Vec<(String, u32)> = order
        .items
        .iter()
        .map(|i| (i.product_id.clone(), i.quantity))
        .collect();
    restore_stock(state.storage(), &reserved).await;
}

async fn record_order_payment(
    storage: &dyn DocumentStorage,
    order: &Order,
    method: Option<String>,
) -> ApiResult<()> {
    if order.total_amount <= 0.0 {
        return Ok(());
    }
    let txn = Transaction::settled(
        TransactionPurpose::Order,
        order.buyer_id.as_str(),
        order.retailer_id.as_str(),
        order.meta.id.as_str(),
        round_money(order.total_amount),
        method,
    );
    Repository::<Transaction>::new(storage).create(&txn).await?;
    metrics::record_payment("order");
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub order_status: Option<String>,
    pub payment_status: Option<String>,
    pub retailer_status: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusUpdate>,
) -> ApiResult<ApiJson<Order>> {
    let order_status: Option<OrderStatus> = req
        .order_status
        .as_deref()
        .map(|s| s.trim().parse())
        .transpose()?;
    let payment_status: Option<OrderPaymentStatus> = req
        .payment_status
        .as_deref()
        .map(|s| parse_enum("paymentStatus", s.trim()))
        .transpose()?;
    let retailer_status: Option<RetailerStatus> = req
        .retailer_status
        .as_deref()
        .map(|s| parse_enum("retailerStatus", s.trim()))
        .transpose()?;
    if order_status.is_none() && payment_status.is_none() && retailer_status.is_none() {
        return Err(ApiError::bad_request(
            "one of orderStatus, paymentStatus or retailerStatus is required",
        ));
    }

    let storage = state.storage();
    let _guard = state.locks.lock(order_key(&id)).await;
    let repo = Repository::<Order>::new(storage);
    let mut order = repo.require(&id).await?;

    let was_paid = order.payment_status == OrderPaymentStatus::Paid;
    let mut cancelled_now = false;

    if let Some(next) = order_status
        && next != order.order_status
    {
        if next == OrderStatus::Cancelled {
            mark_cancelled(&mut order)?;
            cancelled_now = true;
        } else {
            order.order_status = order.order_status.transition_to(next)?;
        }
    }
    if let Some(next) = payment_status {
        if next == OrderPaymentStatus::Paid && order.order_status == OrderStatus::Cancelled {
            return Err(ApiError::bad_request("a cancelled order cannot be paid"));
        }
        order.payment_status = order.payment_status.transition_to(next)?;
    }
    if let Some(next) = retailer_status {
        order.retailer_status = next;
    }
    let newly_paid = !was_paid && order.payment_status == OrderPaymentStatus::Paid;

    let order = repo.save(&order).await?;
    if cancelled_now {
        return_stock(&state, &order).await;
    }
    if newly_paid {
        record_order_payment(storage, &order, req.method).await?;
    }
    tracing::info!(
        order_id = %id,
        order_status = %order.order_status,
        payment_status = %order.payment_status,
        "order updated"
    );

    notifier::notify(
        storage,
        &order.buyer_id,
        Role::Patient,
        if newly_paid {
            NotificationKind::Payment
        } else {
            NotificationKind::Order
        },
        "Order update",
        format!(
            "Your order is {} (payment {})",
            order.order_status, order.payment_status
        ),
        Some(format!("/api/orders/{id}")),
    )
    .await;

    Ok(ApiJson(order))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Order>> {
    let storage = state.storage();
    let _guard = state.locks.lock(order_key(&id)).await;
    let repo = Repository::<Order>::new(storage);
    let mut order = repo.require(&id).await?;

    mark_cancelled(&mut order)?;
    let order = repo.save(&order).await?;
    return_stock(&state, &order).await;
    tracing::info!(order_id = %id, "order cancelled");

    notifier::notify(
        storage,
        &order.retailer_id,
        Role::Retailer,
        NotificationKind::Order,
        "Order cancelled",
        format!("Order {id} was cancelled by the buyer"),
        Some(format!("/api/orders/{id}")),
    )
    .await;

    Ok(ApiJson(order))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: String,
}

async fn leave_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<FeedbackRequest>,
) -> ApiResult<ApiJson<Order>> {
    let rating = req
        .rating
        .ok_or_else(|| ApiError::bad_request("Missing required field: rating"))?;
    validation::require_rating(rating)?;

    let storage = state.storage();
    let _guard = state.locks.lock(order_key(&id)).await;
    let repo = Repository::<Order>::new(storage);
    let mut order = repo.require(&id).await?;

    if order.order_status != OrderStatus::Delivered {
        return Err(ApiError::bad_request(format!(
            "feedback is only accepted for delivered orders (status is {})",
            order.order_status
        )));
    }
    if order.feedback.is_some() {
        return Err(ApiError::conflict("feedback was already left for this order"));
    }

    order.feedback = Some(OrderFeedback {
        rating,
        comment: req.comment.trim().to_string(),
        created_at: now_utc(),
    });
    Ok(ApiJson(repo.save(&order).await?))
}
