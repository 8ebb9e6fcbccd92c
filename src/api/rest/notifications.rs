use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::Notification;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications/unseen", get(list_unseen))
        .route("/notifications/user/:user_id/unseen", get(list_unseen_for_user))
        .route("/notifications/:id/mark-seen", put(mark_seen))
}

async fn list_unseen(State(state): State<Arc<AppState>>) -> Json<Vec<Notification>> {
    Json(state.inbox.unseen())
}

async fn list_unseen_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Json<Vec<Notification>> {
    Json(state.inbox.unseen_for_user(user_id))
}

async fn mark_seen(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    Ok(Json(state.inbox.mark_seen(id)?))
}
