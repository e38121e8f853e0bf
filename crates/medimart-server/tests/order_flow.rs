mod common;

use common::{expect_json, id_of, start_server};
use reqwest::StatusCode;
use serde_json::json;

async fn stock_of(srv: &common::TestServer, product: &str) -> u64 {
    let p = expect_json(srv.get(&format!("/api/products/{product}")).await, StatusCode::OK).await;
    p["stock"].as_u64().unwrap()
}

#[tokio::test]
async fn order_lifecycle() {
    let srv = start_server().await;
    let buyer = srv.create_patient("Asha Rao").await;
    let retailer = srv.create_retailer("Green Cross Pharmacy").await;
    let paracetamol = srv.create_product(&retailer, "Paracetamol 500mg", 25.5, 10).await;
    let ors = srv.create_product(&retailer, "ORS Sachet", 12.0, 5).await;

    let order = srv
        .post_ok(
            "/api/orders",
            json!({
                "buyerId": buyer,
                "retailerId": retailer,
                "shippingAddress": "12 MG Road, Pune",
                "items": [
                    {"productId": paracetamol, "quantity": 2},
                    {"productId": ors, "quantity": 3},
                    {"productId": paracetamol, "quantity": 1}
                ]
            }),
            StatusCode::CREATED,
        )
        .await;
    let order_id = id_of(&order);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["items"][0]["quantity"], 3);
    assert_eq!(order["items"][0]["unitPrice"], 25.5);
    assert_eq!(order["totalAmount"], 112.5);
    assert_eq!(order["orderStatus"], "placed");
    assert_eq!(stock_of(&srv, &paracetamol).await, 7);
    assert_eq!(stock_of(&srv, &ors).await, 2);

    let retailer_inbox = expect_json(
        srv.get(&format!("/api/notifications/{retailer}?unread=true")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(retailer_inbox.as_array().unwrap().len(), 1);

    let mine = expect_json(
        srv.get(&format!("/api/orders/buyer/{buyer}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(mine[0]["retailerName"], "Green Cross Pharmacy");

    let updated = expect_json(
        srv.patch(
            &format!("/api/orders/{order_id}/status"),
            json!({"orderStatus": "shipped", "paymentStatus": "paid", "retailerStatus": "accepted"}),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["orderStatus"], "shipped");
    assert_eq!(updated["retailerStatus"], "accepted");

    let txns = expect_json(
        srv.get(&format!("/api/transactions/user/{retailer}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(txns.as_array().unwrap().len(), 1);
    assert_eq!(txns[0]["purpose"], "order");
    assert_eq!(txns[0]["amount"], 112.5);

    // Shipped orders cannot be cancelled.
    let res = srv
        .post(&format!("/api/orders/{order_id}/cancel"), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Feedback only once the order is delivered.
    let res = srv
        .post(
            &format!("/api/orders/{order_id}/feedback"),
            json!({"rating": 5, "comment": "Fast"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    srv.patch(
        &format!("/api/orders/{order_id}/status"),
        json!({"orderStatus": "delivered"}),
    )
    .await;
    let with_feedback = srv
        .post_ok(
            &format!("/api/orders/{order_id}/feedback"),
            json!({"rating": 5, "comment": "Fast"}),
            StatusCode::OK,
        )
        .await;
    assert_eq!(with_feedback["feedback"]["rating"], 5);

    let res = srv
        .post(
            &format!("/api/orders/{order_id}/feedback"),
            json!({"rating": 4}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Delivered is final.
    let res = srv
        .patch(
            &format!("/api/orders/{order_id}/status"),
            json!({"orderStatus": "processing"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let feedback = expect_json(
        srv.get(&format!("/api/retailers/{retailer}/feedback")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(feedback[0]["comment"], "Fast");

    let token = srv.admin_token().await;
    let res = srv
        .client
        .get(srv.url("/api/admin/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let stats = expect_json(res, StatusCode::OK).await;
    assert_eq!(stats["paidOrders"], 1);
    assert_eq!(stats["revenue"], 112.5);

    let res = srv
        .client
        .get(srv.url("/api/admin/feedback"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let all = expect_json(res, StatusCode::OK).await;
    assert_eq!(all[0]["source"], "order");
    assert_eq!(all[0]["subjectId"], retailer.as_str());
}

#[tokio::test]
async fn order_validation_and_stock() {
    let srv = start_server().await;
    let buyer = srv.create_patient("Ravi Kumar").await;
    let retailer = srv.create_retailer("City Meds").await;
    let other = srv.create_retailer("Other Meds").await;
    let product = srv.create_product(&retailer, "Cetirizine", 8.0, 2).await;
    let foreign = srv.create_product(&other, "Ibuprofen", 15.0, 50).await;

    let order = |items: serde_json::Value| {
        json!({
            "buyerId": buyer,
            "retailerId": retailer,
            "shippingAddress": "4 Park Street",
            "items": items
        })
    };

    let res = srv.post("/api/orders", order(json!([]))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .post("/api/orders", order(json!([{"productId": product, "quantity": 0}])))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .post("/api/orders", order(json!([{"productId": foreign, "quantity": 1}])))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .post("/api/orders", order(json!([{"productId": "ghost", "quantity": 1}])))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .post("/api/orders", order(json!([{"productId": product, "quantity": 3}])))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(stock_of(&srv, &product).await, 2);

    let mut unknown_buyer = order(json!([{"productId": product, "quantity": 1}]));
    unknown_buyer["buyerId"] = json!("nobody");
    let res = srv.post("/api/orders", unknown_buyer).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Cancelling returns the stock.
    let placed = srv
        .post_ok(
            "/api/orders",
            order(json!([{"productId": product, "quantity": 2}])),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(stock_of(&srv, &product).await, 0);

    let cancelled = srv
        .post_ok(
            &format!("/api/orders/{}/cancel", id_of(&placed)),
            json!({}),
            StatusCode::OK,
        )
        .await;
    assert_eq!(cancelled["orderStatus"], "cancelled");
    assert_eq!(stock_of(&srv, &product).await, 2);

    let res = srv
        .patch(&format!("/api/orders/{}/status", id_of(&placed)), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let listed = expect_json(
        srv.get(&format!("/api/retailers/{retailer}/orders?status=cancelled")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn paid_orders_are_refunded_on_cancel_and_never_repaid() {
    let srv = start_server().await;
    let buyer = srv.create_patient("Nisha Iyer").await;
    let retailer = srv.create_retailer("Lotus Pharmacy").await;
    let product = srv.create_product(&retailer, "Vitamin D3", 40.0, 5).await;

    let placed = srv
        .post_ok(
            "/api/orders",
            json!({
                "buyerId": buyer,
                "retailerId": retailer,
                "shippingAddress": "8 Lake View, Kochi",
                "items": [{"productId": product, "quantity": 2}]
            }),
            StatusCode::CREATED,
        )
        .await;
    let order_id = id_of(&placed);
    let status_url = format!("/api/orders/{order_id}/status");

    srv.patch(&status_url, json!({"paymentStatus": "paid"})).await;

    // Cancelling while insisting on `paid` is rejected and changes nothing.
    let res = srv
        .patch(
            &status_url,
            json!({"orderStatus": "cancelled", "paymentStatus": "paid"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let unchanged = expect_json(
        srv.get(&format!("/api/orders/{order_id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(unchanged["orderStatus"], "placed");
    assert_eq!(unchanged["paymentStatus"], "paid");
    assert_eq!(stock_of(&srv, &product).await, 3);

    let res = srv
        .patch(&status_url, json!({"paymentStatus": "pending"}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let cancelled = expect_json(
        srv.patch(&status_url, json!({"orderStatus": "cancelled"})).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(cancelled["orderStatus"], "cancelled");
    assert_eq!(cancelled["paymentStatus"], "refunded");
    assert_eq!(stock_of(&srv, &product).await, 5);

    let res = srv
        .patch(&status_url, json!({"paymentStatus": "paid"}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let txns = expect_json(
        srv.get(&format!("/api/transactions/user/{buyer}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(txns.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn shipped_orders_do_not_move_backwards() {
    let srv = start_server().await;
    let buyer = srv.create_patient("Arjun Pillai").await;
    let retailer = srv.create_retailer("Care Chemists").await;
    let product = srv.create_product(&retailer, "Amoxicillin", 60.0, 4).await;

    let placed = srv
        .post_ok(
            "/api/orders",
            json!({
                "buyerId": buyer,
                "retailerId": retailer,
                "shippingAddress": "3 Hill Road, Shimla",
                "items": [{"productId": product, "quantity": 1}]
            }),
            StatusCode::CREATED,
        )
        .await;
    let order_id = id_of(&placed);
    let status_url = format!("/api/orders/{order_id}/status");

    let shipped = expect_json(
        srv.patch(&status_url, json!({"orderStatus": "shipped"})).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(shipped["orderStatus"], "shipped");

    for earlier in ["placed", "processing"] {
        let res = srv
            .patch(&status_url, json!({"orderStatus": earlier}))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    let res = srv
        .post(&format!("/api/orders/{order_id}/cancel"), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&srv, &product).await, 3);

    let current = expect_json(
        srv.get(&format!("/api/orders/{order_id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(current["orderStatus"], "shipped");
}
