use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delivery_dispatch::api::rest::router;
use delivery_dispatch::config::Config;
use delivery_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(&Config::default()).unwrap());
    (router(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn create_driver(app: &axum::Router, name: &str, lat: f64, lng: f64) -> Value {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/drivers",
            json!({
                "user_id": uuid::Uuid::new_v4(),
                "name": name,
                "vehicle_number": "GP 123-456",
                "location": { "lat": lat, "lng": lng }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn create_order(app: &axum::Router, destination: Value, payment_method: &str) -> Value {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/orders",
            json!({
                "customer_id": uuid::Uuid::new_v4(),
                "destination": destination,
                "destination_address": "1 Main Rd, Johannesburg",
                "payment_method": payment_method
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn johannesburg() -> Value {
    json!({ "lat": -26.20, "lng": 28.05 })
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["drivers"], 0);
    assert_eq!(body["orders"], 0);
    assert_eq!(body["claims"], 0);
}

#[tokio::test]
async fn metrics_report_created_claims() {
    let (app, _state) = setup();
    create_driver(&app, "Thandi", -26.21, 28.06).await;
    create_order(&app, johannesburg(), "card").await;

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("claims_created_total"));
}

#[tokio::test]
async fn create_driver_returns_available_driver() {
    let (app, _state) = setup();
    let body = create_driver(&app, "Thandi", -26.21, 28.06).await;

    assert_eq!(body["name"], "Thandi");
    assert_eq!(body["status"], "available");
    assert_eq!(body["vehicle_number"], "GP 123-456");
    assert_eq!(body["location"]["lat"], -26.21);
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn create_driver_empty_name_returns_400() {
    let (app, _state) = setup();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/drivers",
            json!({ "user_id": uuid::Uuid::new_v4(), "name": "  " }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn create_driver_with_invalid_location_returns_400() {
    let (app, _state) = setup();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/drivers",
            json!({
                "user_id": uuid::Uuid::new_v4(),
                "name": "Lost",
                "location": { "lat": 123.0, "lng": 28.0 }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_coordinate");
}

#[tokio::test]
async fn update_driver_status_and_location() {
    let (app, _state) = setup();
    let driver = create_driver(&app, "Sipho", -26.21, 28.06).await;
    let id = driver["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/drivers/{id}/status"),
            json!({ "status": "offline" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "offline");

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/drivers/{id}/location"),
            json!({ "location": { "lat": -26.0, "lng": 28.2 } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"]["lng"], 28.2);

    let (status, drivers) = send(&app, get_request("/drivers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(drivers.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_resources_return_404() {
    let (app, _state) = setup();
    let missing = uuid::Uuid::new_v4();

    for uri in [
        format!("/drivers/{missing}"),
        format!("/orders/{missing}"),
        format!("/orders/{missing}/dispatch"),
        format!("/claims/{missing}"),
        format!("/drivers/{missing}/claims"),
    ] {
        let (status, body) = send(&app, get_request(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["code"], "not_found");
    }

    let (status, _) = send(&app, post_empty(&format!("/claims/{missing}/approve"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_creation_offers_system_claims_to_nearby_drivers() {
    let (app, _state) = setup();
    let near = create_driver(&app, "D1", -26.21, 28.06).await;
    create_driver(&app, "D2", -26.50, 28.50).await;

    let outcome = create_order(&app, johannesburg(), "card").await;
    let claims = outcome["claims"].as_array().unwrap();

    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0]["driver_id"], near["id"]);
    assert_eq!(claims[0]["claim_type"], "system");
    assert_eq!(claims[0]["status"], "pending");
    assert_eq!(outcome["candidates"][0]["distance_km"], 1.49);
    assert_eq!(outcome["order"]["delivery_status"], "pending");
    assert_eq!(outcome["order"]["payment_status"], "unpaid");

    let order_id = outcome["order"]["id"].as_str().unwrap();
    let (status, view) = send(&app, get_request(&format!("/orders/{order_id}/dispatch"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "dispatched");
    assert_eq!(view["pending_claims"], 1);
}

#[tokio::test]
async fn order_with_invalid_destination_is_stored_without_claims() {
    let (app, _state) = setup();
    create_driver(&app, "D1", -26.21, 28.06).await;

    let outcome = create_order(&app, json!({ "lat": -26.2, "lng": 190.0 }), "card").await;
    assert!(outcome["claims"].as_array().unwrap().is_empty());
    assert!(outcome["candidates"].as_array().unwrap().is_empty());

    let order_id = outcome["order"]["id"].as_str().unwrap();
    let (status, view) = send(&app, get_request(&format!("/orders/{order_id}/dispatch"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "unassigned");
}

#[tokio::test]
async fn approving_claim_assigns_driver() {
    let (app, _state) = setup();
    let driver = create_driver(&app, "D1", -26.21, 28.06).await;
    let outcome = create_order(&app, johannesburg(), "cash").await;
    let claim_id = outcome["claims"][0]["id"].as_str().unwrap();
    let order_id = outcome["order"]["id"].as_str().unwrap();
    let driver_id = driver["id"].as_str().unwrap();

    let (status, resolution) = send(&app, post_empty(&format!("/claims/{claim_id}/approve"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolution["claim"]["status"], "approved");
    assert_eq!(resolution["assignment"]["source"], "claim");

    let (_, order) = send(&app, get_request(&format!("/orders/{order_id}"))).await;
    assert_eq!(order["delivery_status"], "shipped");
    assert_eq!(order["driver_id"], driver_id);

    let (_, driver) = send(&app, get_request(&format!("/drivers/{driver_id}"))).await;
    assert_eq!(driver["status"], "busy");

    let (status, body) = send(&app, post_empty(&format!("/claims/{claim_id}/approve"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_resolved");
}

#[tokio::test]
async fn duplicate_claim_returns_409() {
    let (app, _state) = setup();
    let driver = create_driver(&app, "Far", -25.0, 27.0).await;
    let outcome = create_order(&app, johannesburg(), "card").await;
    let order_id = outcome["order"]["id"].as_str().unwrap();
    let driver_id = driver["id"].as_str().unwrap();
    let uri = format!("/drivers/{driver_id}/orders/{order_id}/claim");

    let (status, claim) = send(&app, post_empty(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claim["claim_type"], "driver");

    let (status, body) = send(&app, post_empty(&uri)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_claim");
}

#[tokio::test]
async fn rejecting_claim_keeps_order_open() {
    let (app, _state) = setup();
    create_driver(&app, "D1", -26.21, 28.06).await;
    create_driver(&app, "D2", -26.19, 28.04).await;
    let outcome = create_order(&app, johannesburg(), "card").await;
    let order_id = outcome["order"]["id"].as_str().unwrap();
    let first = outcome["claims"][0]["id"].as_str().unwrap();

    let (status, resolution) = send(&app, post_empty(&format!("/claims/{first}/reject"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolution["claim"]["status"], "rejected");
    assert!(resolution["assignment"].is_null());

    let (_, pending) = send(&app, get_request(&format!("/orders/{order_id}/claims"))).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (_, order) = send(&app, get_request(&format!("/orders/{order_id}"))).await;
    assert!(order["driver_id"].is_null());
}

#[tokio::test]
async fn forced_assignment_cancels_pending_claims() {
    let (app, _state) = setup();
    create_driver(&app, "D1", -26.21, 28.06).await;
    let outsider = create_driver(&app, "Outsider", -25.0, 27.0).await;
    let outcome = create_order(&app, johannesburg(), "card").await;
    let order_id = outcome["order"]["id"].as_str().unwrap();
    let claim_id = outcome["claims"][0]["id"].as_str().unwrap();

    let (status, resolution) = send(
        &app,
        json_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            json!({ "driver_id": outsider["id"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolution["assignment"]["source"], "forced");
    assert_eq!(resolution["cancelled"].as_array().unwrap().len(), 1);

    let (_, claim) = send(&app, get_request(&format!("/claims/{claim_id}"))).await;
    assert_eq!(claim["status"], "cancelled");

    let (status, body) = send(&app, post_empty(&format!("/claims/{claim_id}/approve"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_resolved");

    let (_, view) = send(&app, get_request(&format!("/orders/{order_id}/dispatch"))).await;
    assert_eq!(view["state"], "assigned");
}

#[tokio::test]
async fn driver_can_only_approve_own_claim() {
    let (app, _state) = setup();
    let d1 = create_driver(&app, "D1", -26.21, 28.06).await;
    let d2 = create_driver(&app, "D2", -26.19, 28.04).await;
    let outcome = create_order(&app, johannesburg(), "card").await;

    let claims = outcome["claims"].as_array().unwrap();
    let d1_claim = claims
        .iter()
        .find(|claim| claim["driver_id"] == d1["id"])
        .unwrap()["id"]
        .as_str()
        .unwrap();
    let d1_id = d1["id"].as_str().unwrap();
    let d2_id = d2["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        post_empty(&format!("/drivers/{d2_id}/claims/{d1_claim}/approve")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, resolution) = send(
        &app,
        post_empty(&format!("/drivers/{d1_id}/claims/{d1_claim}/approve")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolution["assignment"]["driver"]["id"], d1["id"]);

    let (_, d2_claims) = send(
        &app,
        get_request(&format!("/drivers/{d2_id}/claims?claim_type=system")),
    )
    .await;
    assert_eq!(d2_claims[0]["status"], "cancelled");
}

#[tokio::test]
async fn claim_events_land_in_notification_inbox() {
    let (app, _state) = setup();
    let driver = create_driver(&app, "D1", -26.21, 28.06).await;
    create_order(&app, johannesburg(), "card").await;
    let user_id = driver["user_id"].as_str().unwrap();

    let (status, unseen) = send(
        &app,
        get_request(&format!("/notifications/user/{user_id}/unseen")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let unseen = unseen.as_array().unwrap();
    assert_eq!(unseen.len(), 1);
    assert_eq!(unseen[0]["header"], "Claim Creation");
    assert_eq!(unseen[0]["event_type"], "claim");

    let notification_id = unseen[0]["id"].as_str().unwrap();
    let (status, seen) = send(
        &app,
        json_request(
            "PUT",
            &format!("/notifications/{notification_id}/mark-seen"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen["status"], "seen");

    let (_, all_unseen) = send(&app, get_request("/notifications/unseen")).await;
    assert!(all_unseen.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cash_delivery_settles_payment_and_frees_driver() {
    let (app, _state) = setup();
    let driver = create_driver(&app, "D1", -26.21, 28.06).await;
    let outcome = create_order(&app, johannesburg(), "cash").await;
    let order_id = outcome["order"]["id"].as_str().unwrap();
    let claim_id = outcome["claims"][0]["id"].as_str().unwrap();
    let driver_id = driver["id"].as_str().unwrap();

    send(&app, post_empty(&format!("/claims/{claim_id}/approve"))).await;

    let (status, order) = send(
        &app,
        json_request(
            "POST",
            &format!("/orders/{order_id}/complete"),
            json!({ "status": "delivered" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["delivery_status"], "delivered");
    assert_eq!(order["payment_status"], "paid");

    let (_, driver) = send(&app, get_request(&format!("/drivers/{driver_id}"))).await;
    assert_eq!(driver["status"], "available");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/orders/{order_id}/payment"),
            json!({ "outcome": "failed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn completing_unassigned_order_returns_409() {
    let (app, _state) = setup();
    let outcome = create_order(&app, johannesburg(), "card").await;
    let order_id = outcome["order"]["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/orders/{order_id}/complete"),
            json!({ "status": "completed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn updating_destination_replaces_coordinates() {
    let (app, _state) = setup();
    let outcome = create_order(&app, Value::Null, "credit").await;
    let order_id = outcome["order"]["id"].as_str().unwrap();
    assert_eq!(outcome["order"]["payment_status"], "credit");
    assert!(outcome["claims"].as_array().unwrap().is_empty());

    let (status, order) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/orders/{order_id}/destination"),
            json!({ "destination": johannesburg(), "destination_address": "2 Main Rd" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["destination"]["lat"], -26.20);
    assert_eq!(order["destination_address"], "2 Main Rd");
}

#[tokio::test]
async fn address_only_destination_update_keeps_coordinates() {
    let (app, _state) = setup();
    let outcome = create_order(&app, johannesburg(), "card").await;
    let order_id = outcome["order"]["id"].as_str().unwrap();

    let (status, order) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/orders/{order_id}/destination"),
            json!({ "destination_address": "2 Main Rd" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["destination_address"], "2 Main Rd");
    assert_eq!(order["destination"]["lat"], -26.20);
    assert_eq!(order["destination"]["lng"], 28.05);

    let (_, stored) = send(&app, get_request(&format!("/orders/{order_id}"))).await;
    assert_eq!(stored["destination"]["lat"], -26.20);

    let (status, body) = send(
        &app,
        json_request("PATCH", &format!("/orders/{order_id}/destination"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}
