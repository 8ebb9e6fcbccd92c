use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::Resolution;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::claim::{Claim, ClaimType};
use crate::models::driver::{Driver, DriverStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id", get(get_driver))
        .route("/drivers/:id/status", patch(update_driver_status))
        .route("/drivers/:id/location", patch(update_driver_location))
        .route("/drivers/:id/claims", get(list_driver_claims))
        .route("/drivers/:id/orders/:order_id/claim", post(claim_order))
        .route("/drivers/:id/claims/:claim_id/approve", post(approve_own_claim))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub user_id: Uuid,
    pub name: String,
    pub vehicle_number: Option<String>,
    pub push_token: Option<String>,
    pub location: Option<GeoPoint>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: DriverStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct ClaimFilter {
    pub claim_type: Option<ClaimType>,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let mut driver = Driver::new(payload.user_id, payload.name, payload.location);
    driver.vehicle_number = payload.vehicle_number;
    driver.push_token = payload.push_token;

    let driver = state.dispatcher.coordinator().register_driver(driver).await?;
    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Driver>>, AppError> {
    Ok(Json(state.repo.list_drivers().await?))
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    let driver = state
        .repo
        .get_driver(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    Ok(Json(driver))
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Driver>, AppError> {
    let driver = state
        .dispatcher
        .coordinator()
        .set_driver_status(id, payload.status)
        .await?;
    Ok(Json(driver))
}

async fn update_driver_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Driver>, AppError> {
    let driver = state
        .dispatcher
        .coordinator()
        .set_driver_location(id, payload.location)
        .await?;
    Ok(Json(driver))
}

async fn list_driver_claims(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(filter): Query<ClaimFilter>,
) -> Result<Json<Vec<Claim>>, AppError> {
    let claims = state
        .dispatcher
        .claims()
        .list_by_driver(id, filter.claim_type)
        .await?;
    Ok(Json(claims))
}

async fn claim_order(
    State(state): State<Arc<AppState>>,
    Path((id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Claim>, AppError> {
    let claim = state.dispatcher.claim_order(order_id, id).await?;
    Ok(Json(claim))
}

async fn approve_own_claim(
    State(state): State<Arc<AppState>>,
    Path((id, claim_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Resolution>, AppError> {
    let resolution = state.dispatcher.approve_as_driver(id, claim_id).await?;
    Ok(Json(resolution))
}
