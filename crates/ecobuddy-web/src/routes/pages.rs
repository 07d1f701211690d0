use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, Json};
use axum::routing::get;
use axum::Router;
use ecobuddy_core::filter;
use ecobuddy_core::model::*;
use ecobuddy_core::seed;
use ecobuddy_core::sync::lock_store;
use serde::Deserialize;

use super::{select_options, selector, Layout, SelectOption};
use crate::error::AppError;
use crate::AppState;

/// Challenges shown on the landing page.
const FEATURED: usize = 3;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/dashboard", get(dashboard))
        .route("/community", get(community))
        .route("/resources", get(resources))
        .route("/local-services", get(local_services))
        .route("/health", get(health))
}

// -- Templates --

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    layout: Layout,
    featured: Vec<Challenge>,
    action_count: usize,
    challenge_count: usize,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    layout: Layout,
    gauges: Vec<Gauge>,
    score: i64,
    completed: u32,
    streak: u32,
    recommended: Vec<ActionCard>,
    active: Vec<Challenge>,
    tips: Vec<EcoTip>,
}

struct Gauge {
    label: &'static str,
    value: String,
    unit: &'static str,
}

struct ActionCard {
    title: String,
    description: String,
    difficulty: String,
    category: String,
    carbon: String,
}

#[derive(Template)]
#[template(path = "community.html")]
struct CommunityTemplate {
    layout: Layout,
    posts: Vec<PostCard>,
}

struct PostCard {
    author: String,
    title: String,
    content: String,
    likes: u32,
    comments: u32,
    tags: Vec<String>,
    date: String,
}

#[derive(Template)]
#[template(path = "resources.html")]
struct ResourcesTemplate {
    layout: Layout,
    resources: Vec<Resource>,
    search: String,
    kinds: Vec<SelectOption>,
    categories: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "local_services.html")]
struct LocalServicesTemplate {
    layout: Layout,
    services: Vec<ServiceCard>,
    search: String,
    categories: Vec<SelectOption>,
}

struct ServiceCard {
    service: LocalService,
    stars: String,
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {
    layout: Layout,
}

// -- Query params --

#[derive(Deserialize)]
pub struct ResourceParams {
    search: Option<String>,
    kind: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
pub struct ServiceParams {
    search: Option<String>,
    category: Option<String>,
}

// -- Handlers --

async fn home(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let layout = Layout::new(&state, "home")?;
    let tmpl = {
        let store = lock_store(&state.store)?;
        HomeTemplate {
            layout,
            featured: store.challenges().iter().take(FEATURED).cloned().collect(),
            action_count: store.eco_actions().len(),
            challenge_count: store.challenges().len(),
        }
    };
    Ok(Html(tmpl.render()?))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let layout = Layout::new(&state, "dashboard")?;
    let tmpl = {
        let store = lock_store(&state.store)?;
        let stats = store.stats();
        let recommended = filter::recommended_actions(stats, store.eco_actions())
            .into_iter()
            .map(|a| ActionCard {
                title: a.title.clone(),
                description: a.description.clone(),
                difficulty: a.difficulty.to_string(),
                category: a.category.to_string(),
                carbon: format!("{:.1}", a.impact.carbon),
            })
            .collect();
        DashboardTemplate {
            layout,
            gauges: gauges(stats),
            score: stats.sustainability_score,
            completed: stats.completed_challenges,
            streak: stats.streak,
            recommended,
            active: store.active_challenges().to_vec(),
            tips: store.eco_tips().to_vec(),
        }
    };
    Ok(Html(tmpl.render()?))
}

fn gauges(stats: &UserStats) -> Vec<Gauge> {
    vec![
        Gauge {
            label: "Carbon footprint",
            value: format!("{:.1}", stats.carbon_footprint),
            unit: "tons CO₂/yr",
        },
        Gauge {
            label: "Water usage",
            value: format!("{:.0}", stats.water_usage),
            unit: "L/day",
        },
        Gauge {
            label: "Waste reduction",
            value: format!("{:.0}", stats.waste_reduction),
            unit: "%",
        },
        Gauge {
            label: "Energy saved",
            value: format!("{:.0}", stats.energy_saved),
            unit: "kWh",
        },
    ]
}

async fn community(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let layout = Layout::new(&state, "community")?;
    let posts = state
        .posts
        .lock()
        .map_err(|_| AppError::internal("post cache poisoned"))?
        .iter()
        .map(|p| PostCard {
            author: p.user_name.clone(),
            title: p.title.clone(),
            content: p.content.clone(),
            likes: p.likes,
            comments: p.comments,
            tags: p.tags.clone(),
            date: p.created_at.format("%b %d, %Y").to_string(),
        })
        .collect();
    let tmpl = CommunityTemplate { layout, posts };
    Ok(Html(tmpl.render()?))
}

async fn resources(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResourceParams>,
) -> Result<Html<String>, AppError> {
    let layout = Layout::new(&state, "resources")?;
    let all = seed::resources();
    let search = params.search.unwrap_or_default();
    let kind = selector(params.kind);
    let category = selector(params.category);

    let resources = filter::filter_resources(&all, &search, &kind, &category)
        .into_iter()
        .cloned()
        .collect();
    let tmpl = ResourcesTemplate {
        layout,
        resources,
        kinds: select_options(filter::resource_kinds(&all), &kind),
        categories: select_options(filter::categories(&all), &category),
        search,
    };
    Ok(Html(tmpl.render()?))
}

async fn local_services(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ServiceParams>,
) -> Result<Html<String>, AppError> {
    let layout = Layout::new(&state, "local-services")?;
    let all = seed::local_services();
    let search = params.search.unwrap_or_default();
    let category = selector(params.category);

    let services = filter::filter_services(&all, &search, &category)
        .into_iter()
        .map(|s| {
            let full = s.full_stars();
            ServiceCard {
                stars: format!("{}{}", "★".repeat(full), "☆".repeat(5 - full)),
                service: s.clone(),
            }
        })
        .collect();
    let tmpl = LocalServicesTemplate {
        layout,
        services,
        categories: select_options(filter::categories(&all), &category),
        search,
    };
    Ok(Html(tmpl.render()?))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "backend": state.sync.backend().kind(),
    }))
}

pub async fn not_found(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Html<String>), AppError> {
    let tmpl = NotFoundTemplate {
        layout: Layout::new(&state, "")?,
    };
    Ok((StatusCode::NOT_FOUND, Html(tmpl.render()?)))
}
