use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, Json, Redirect};
use axum::routing::{get, post};
use axum::{Form, Router};
use ecobuddy_core::filter;
use ecobuddy_core::model::Challenge;
use ecobuddy_core::sync::lock_store;
use serde::{Deserialize, Serialize};

use super::{local_redirect, select_options, selector, Layout, SelectOption};
use crate::error::{ApiError, AppError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/challenges", get(list_challenges))
        .route("/challenges/{id}/join", post(join_form))
        .route("/challenges/{id}/complete", post(complete_form))
        .route("/api/v1/challenges", get(api_list))
        .route("/api/v1/challenges/active", get(api_active))
        .route("/api/v1/challenges/{id}/join", post(api_join))
        .route("/api/v1/challenges/{id}/complete", post(api_complete))
        .route("/api/v1/challenges/{id}/progress", post(api_progress))
}

// -- Templates --

#[derive(Template)]
#[template(path = "challenges.html")]
struct ChallengesTemplate {
    layout: Layout,
    cards: Vec<ChallengeCard>,
    search: String,
    categories: Vec<SelectOption>,
}

struct ChallengeCard {
    challenge: Challenge,
    progress: Option<u8>,
}

// -- Params --

#[derive(Deserialize)]
pub struct ListParams {
    search: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
pub struct NextInput {
    next: Option<String>,
}

#[derive(Deserialize)]
pub struct ProgressInput {
    progress: i64,
}

impl ProgressInput {
    fn percent(&self) -> u8 {
        self.progress.clamp(0, 100) as u8
    }
}

#[derive(Serialize)]
struct ChangeResponse {
    changed: bool,
    active: Vec<Challenge>,
}

#[derive(Serialize)]
struct CompletionResponse {
    was_active: bool,
    rewarded: bool,
    stats: ecobuddy_core::model::UserStats,
}

// -- HTML handlers --

async fn list_challenges(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, AppError> {
    let layout = Layout::new(&state, "challenges")?;
    let search = params.search.unwrap_or_default();
    let category = selector(params.category);

    let tmpl = {
        let store = lock_store(&state.store)?;
        let cards = filter::filter_challenges(store.challenges(), &search, &category)
            .into_iter()
            .map(|c| ChallengeCard {
                progress: store
                    .active_challenges()
                    .iter()
                    .find(|a| a.id == c.id)
                    .and_then(|a| a.progress),
                challenge: c.clone(),
            })
            .collect();
        ChallengesTemplate {
            layout,
            cards,
            categories: select_options(filter::categories(store.challenges()), &category),
            search,
        }
    };
    Ok(Html(tmpl.render()?))
}

async fn join_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(input): Form<NextInput>,
) -> Result<Redirect, AppError> {
    state.sync.join_challenge(&state.scope(), &state.store, &id).await?;
    Ok(local_redirect(input.next.as_deref(), "/challenges"))
}

async fn complete_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(input): Form<NextInput>,
) -> Result<Redirect, AppError> {
    state
        .sync
        .complete_challenge(&state.scope(), &state.store, &id)
        .await?;
    Ok(local_redirect(input.next.as_deref(), "/dashboard"))
}

// -- JSON handlers --

async fn api_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Challenge>>, ApiError> {
    let search = params.search.unwrap_or_default();
    let category = selector(params.category);
    let store = lock_store(&state.store)?;
    let list = filter::filter_challenges(store.challenges(), &search, &category)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(list))
}

async fn api_active(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Challenge>>, ApiError> {
    let store = lock_store(&state.store)?;
    Ok(Json(store.active_challenges().to_vec()))
}

async fn api_join(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ChangeResponse>, ApiError> {
    let changed = state.sync.join_challenge(&state.scope(), &state.store, &id).await?;
    let active = lock_store(&state.store)?.active_challenges().to_vec();
    Ok(Json(ChangeResponse { changed, active }))
}

async fn api_complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let completion = state
        .sync
        .complete_challenge(&state.scope(), &state.store, &id)
        .await?;
    Ok(Json(CompletionResponse {
        was_active: completion.was_active,
        rewarded: completion.rewarded,
        stats: completion.stats,
    }))
}

async fn api_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<ProgressInput>,
) -> Result<Json<ChangeResponse>, ApiError> {
    let changed = state
        .sync
        .set_progress(&state.scope(), &state.store, &id, input.percent())
        .await?;
    let active = lock_store(&state.store)?.active_challenges().to_vec();
    Ok(Json(ChangeResponse { changed, active }))
}
