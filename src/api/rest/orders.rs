use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::dispatch::DispatchView;
use crate::engine::{DispatchOutcome, NewOrder, Resolution};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::claim::Claim;
use crate::models::order::{DeliveryStatus, Order, PaymentOutcome};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/destination", patch(update_destination))
        .route("/orders/:id/claims", get(list_pending_claims))
        .route("/orders/:id/dispatch", get(get_dispatch_state))
        .route("/orders/:id/assign", post(assign_driver))
        .route("/orders/:id/complete", post(complete_delivery))
        .route("/orders/:id/payment", post(record_payment))
}

#[derive(Deserialize)]
pub struct UpdateDestinationRequest {
    pub destination: Option<GeoPoint>,
    pub destination_address: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct CompleteDeliveryRequest {
    pub status: DeliveryStatus,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub outcome: PaymentOutcome,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewOrder>,
) -> Result<Json<DispatchOutcome>, AppError> {
    let outcome = state.dispatcher.create_order(payload).await?;
    Ok(Json(outcome))
}

async fn list_orders(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.repo.list_orders().await?))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .repo
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}

async fn update_destination(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDestinationRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .dispatcher
        .coordinator()
        .update_destination(id, payload.destination, payload.destination_address)
        .await?;
    Ok(Json(order))
}

async fn list_pending_claims(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Claim>>, AppError> {
    Ok(Json(state.dispatcher.claims().list_pending(id).await?))
}

async fn get_dispatch_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DispatchView>, AppError> {
    Ok(Json(state.dispatcher.dispatch_view(id).await?))
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignDriverRequest>,
) -> Result<Json<Resolution>, AppError> {
    let resolution = state.dispatcher.assign_driver(id, payload.driver_id).await?;
    Ok(Json(resolution))
}

async fn complete_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteDeliveryRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .dispatcher
        .coordinator()
        .complete_delivery(id, payload.status)
        .await?;
    Ok(Json(order))
}

async fn record_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PaymentRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .dispatcher
        .coordinator()
        .record_payment(id, payload.outcome)
        .await?;
    Ok(Json(order))
}
