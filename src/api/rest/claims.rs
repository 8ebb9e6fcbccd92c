use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::engine::Resolution;
use crate::error::AppError;
use crate::models::claim::Claim;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/claims", get(list_claims))
        .route("/claims/:id", get(get_claim))
        .route("/claims/:id/approve", post(approve_claim))
        .route("/claims/:id/reject", post(reject_claim))
}

async fn list_claims(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Claim>>, AppError> {
    Ok(Json(state.dispatcher.claims().list_all().await?))
}

async fn get_claim(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Claim>, AppError> {
    Ok(Json(state.dispatcher.claims().get(id).await?))
}

async fn approve_claim(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Resolution>, AppError> {
    Ok(Json(state.dispatcher.approve(id).await?))
}

async fn reject_claim(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Resolution>, AppError> {
    Ok(Json(state.dispatcher.reject(id).await?))
}
