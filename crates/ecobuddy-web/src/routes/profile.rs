use std::sync::Arc;

use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use ecobuddy_core::error::{EcoError, Result};
use ecobuddy_core::model::{Identity, ProfileEdit, UserProfile, UserStats};
use ecobuddy_core::sync::lock_store;
use serde::Deserialize;

use super::Layout;
use crate::error::{ApiError, AppError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(show_profile).post(save_form))
        .route("/api/v1/profile", get(api_get).put(api_save))
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    layout: Layout,
    email: String,
    member_since: String,
    form: ProfileForm,
    stats: UserStats,
    error: Option<String>,
}

/// Current values of the edit form. Also the HTML form body.
#[derive(Deserialize, Default)]
pub struct ProfileForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    avatar_url: String,
}

impl ProfileForm {
    fn from_profile(profile: &UserProfile) -> Self {
        Self {
            name: profile.name.clone(),
            bio: profile.bio.clone().unwrap_or_default(),
            location: profile.location.clone().unwrap_or_default(),
            avatar_url: profile.avatar_url.clone().unwrap_or_default(),
        }
    }

    /// A blank name keeps the stored one; other fields may be cleared.
    fn to_edit(&self) -> ProfileEdit {
        let name = self.name.trim();
        ProfileEdit {
            name: (!name.is_empty()).then(|| name.to_string()),
            bio: Some(self.bio.clone()),
            location: Some(self.location.clone()),
            avatar_url: Some(self.avatar_url.clone()),
        }
    }
}

fn signed_in(state: &AppState) -> Result<Option<Identity>> {
    Ok(lock_store(&state.store)?.identity().cloned())
}

fn render_profile(
    state: &AppState,
    form: Option<ProfileForm>,
    error: Option<String>,
) -> std::result::Result<Html<String>, AppError> {
    let layout = Layout::new(state, "profile")?;
    let tmpl = {
        let store = lock_store(&state.store)?;
        let profile = store.profile();
        ProfileTemplate {
            layout,
            email: profile.map(|p| p.email.clone()).unwrap_or_default(),
            member_since: profile
                .map(|p| p.created_at.format("%B %Y").to_string())
                .unwrap_or_default(),
            form: form
                .or_else(|| profile.map(ProfileForm::from_profile))
                .unwrap_or_default(),
            stats: store.stats().clone(),
            error,
        }
    };
    Ok(Html(tmpl.render()?))
}

async fn show_profile(State(state): State<Arc<AppState>>) -> std::result::Result<Response, AppError> {
    if signed_in(&state)?.is_none() {
        return Ok(Redirect::to("/auth").into_response());
    }
    Ok(render_profile(&state, None, None)?.into_response())
}

/// A failed save re-renders the form with the user's edit intact.
async fn save_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ProfileForm>,
) -> std::result::Result<Response, AppError> {
    let Some(identity) = signed_in(&state)? else {
        return Ok(Redirect::to("/auth").into_response());
    };
    let edit = form.to_edit();
    match state
        .sync
        .save_profile(&state.scope(), &state.store, &identity, &edit)
        .await
    {
        Ok(_) => Ok(Redirect::to("/profile").into_response()),
        Err(EcoError::Backend(message)) => {
            Ok(render_profile(&state, Some(form), Some(message))?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn api_get(State(state): State<Arc<AppState>>) -> std::result::Result<Json<Option<UserProfile>>, ApiError> {
    Ok(Json(lock_store(&state.store)?.profile().cloned()))
}

async fn api_save(
    State(state): State<Arc<AppState>>,
    Json(edit): Json<ProfileEdit>,
) -> std::result::Result<Json<UserProfile>, ApiError> {
    let identity = signed_in(&state)?.ok_or_else(|| ApiError::unauthorized("not signed in"))?;
    if edit.is_empty() {
        return Err(ApiError::bad_request("no profile fields to update"));
    }
    let profile = state
        .sync
        .save_profile(&state.scope(), &state.store, &identity, &edit)
        .await?;
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ecobuddy_core::model::Identity;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::*;

    async fn signed_up_app() -> (std::sync::Arc<crate::AppState>, axum::Router) {
        let state = test_app_state();
        let app = test_router(state.clone());
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/sign-up")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"email": "rae@example.com", "password": "pw", "name": "Rae"}).to_string(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        (state, app)
    }

    fn put_profile(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri("/api/v1/profile")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_profile_null_when_signed_out() {
        let app = test_router(test_app_state());
        let resp = app
            .oneshot(Request::get("/api/v1/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_json(resp.into_body()).await.is_null());
    }

    #[tokio::test]
    async fn test_save_requires_session() {
        let app = test_router(test_app_state());
        let resp = app.oneshot(put_profile(json!({"bio": "hi"}))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_save_profile_round_trip() {
        let (_state, app) = signed_up_app().await;
        let resp = app
            .clone()
            .oneshot(put_profile(json!({"bio": "Composting fan", "location": "Leeds"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["bio"], "Composting fan");
        assert_eq!(json["name"], "Rae");

        let resp = app
            .oneshot(Request::get("/api/v1/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["location"], "Leeds");
    }

    #[tokio::test]
    async fn test_empty_edit_is_400() {
        let (_state, app) = signed_up_app().await;
        let resp = app.oneshot(put_profile(json!({}))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_profile_page_redirects_when_signed_out() {
        let app = test_router(test_app_state());
        let resp = app
            .oneshot(Request::get("/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()["location"], "/auth");
    }

    #[tokio::test]
    async fn test_failed_save_keeps_edit_on_page() {
        let (state, app) = signed_up_app().await;
        // a session the backend no longer accepts
        {
            let mut store = state.store.lock().unwrap();
            let identity = store.identity().cloned().unwrap();
            store.set_identity(Some(Identity {
                access_token: "revoked".into(),
                ..identity
            }));
        }

        let req = Request::builder()
            .method("POST")
            .uri("/profile")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("name=Rae&bio=Unsaved+draft&location=&avatar_url="))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("Unsaved draft"));
        assert!(html.contains("failed to update profile"));

        let store = state.store.lock().unwrap();
        assert!(store.profile().unwrap().bio.is_none());
    }
}
