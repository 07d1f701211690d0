mod api;
mod auth;
mod challenges;
mod chat;
mod pages;
mod profile;

use std::sync::Arc;

use axum::response::Redirect;
use axum::Router;
use ecobuddy_core::error::Result;
use ecobuddy_core::sync::lock_store;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(pages::routes())
        .merge(challenges::routes())
        .merge(chat::routes())
        .merge(auth::routes())
        .merge(profile::routes())
        .merge(api::routes())
        .fallback(pages::not_found)
}

/// Shared page chrome: theme, session badge, current nav entry.
pub struct Layout {
    pub dark_mode: bool,
    pub signed_in: bool,
    pub user_name: String,
    pub active: &'static str,
}

impl Layout {
    pub fn new(state: &AppState, active: &'static str) -> Result<Self> {
        let store = lock_store(&state.store)?;
        let user_name = match (store.profile(), store.identity()) {
            (Some(profile), _) => profile.name.clone(),
            (None, Some(identity)) => identity.email.clone(),
            (None, None) => String::new(),
        };
        Ok(Self {
            dark_mode: store.dark_mode(),
            signed_in: store.identity().is_some(),
            user_name,
            active,
        })
    }

    pub fn is(&self, nav: &str) -> bool {
        self.active == nav
    }

    /// Where the theme toggle returns to.
    pub fn path(&self) -> String {
        match self.active {
            "" | "home" => "/".to_string(),
            nav => format!("/{nav}"),
        }
    }
}

/// One `<option>` in a filter dropdown.
pub struct SelectOption {
    pub name: String,
    pub selected: bool,
}

pub fn select_options(names: Vec<String>, current: &str) -> Vec<SelectOption> {
    names
        .into_iter()
        .map(|name| SelectOption {
            selected: name == current,
            name,
        })
        .collect()
}

/// Redirect target from a form's `next` field. Only local paths are followed.
pub fn local_redirect(next: Option<&str>, fallback: &str) -> Redirect {
    match next {
        Some(path) if is_local_path(path) => Redirect::to(path),
        _ => Redirect::to(fallback),
    }
}

/// Browsers read `\` as `/`, so `/\host` is protocol-relative too.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

/// Empty or missing selector means "all".
pub fn selector(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| ecobuddy_core::filter::ALL.to_string())
}
