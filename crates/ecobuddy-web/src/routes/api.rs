use std::sync::Arc;

use axum::extract::State;
use axum::response::{Json, Redirect};
use axum::routing::{get, post};
use axum::{Form, Router};
use ecobuddy_core::model::{UserStats, UserStatsPatch};
use ecobuddy_core::sync::lock_store;
use serde::{Deserialize, Serialize};

use super::local_redirect;
use crate::error::{ApiError, AppError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/stats", get(get_stats).patch(patch_stats))
        .route("/api/v1/theme/toggle", post(toggle_theme))
        .route("/theme/toggle", post(toggle_theme_form))
}

#[derive(Serialize)]
struct ThemeResponse {
    dark_mode: bool,
}

#[derive(Deserialize)]
pub struct ThemeForm {
    next: Option<String>,
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(lock_store(&state.store)?.stats().clone()))
}

async fn patch_stats(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<UserStatsPatch>,
) -> Result<Json<UserStats>, ApiError> {
    let stats = state
        .sync
        .update_user_stats(&state.scope(), &state.store, &patch)
        .await?;
    Ok(Json(stats))
}

async fn toggle_theme(State(state): State<Arc<AppState>>) -> Result<Json<ThemeResponse>, ApiError> {
    let dark_mode = lock_store(&state.store)?.toggle_dark_mode();
    Ok(Json(ThemeResponse { dark_mode }))
}

async fn toggle_theme_form(
    State(state): State<Arc<AppState>>,
    Form(input): Form<ThemeForm>,
) -> Result<Redirect, AppError> {
    lock_store(&state.store)?.toggle_dark_mode();
    Ok(local_redirect(input.next.as_deref(), "/"))
}
