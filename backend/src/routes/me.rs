use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{routing::get, Json, Router};

use crate::error::Result;
use crate::models::user::User;
use crate::routes::current_user;
use crate::AppState;

/// GET /api/me - current user with tier, quota and entitlement state.
async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<User>> {
    let user = current_user(&state, &headers).await?;
    Ok(Json(user))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/api/me", get(me)).with_state(state)
}
