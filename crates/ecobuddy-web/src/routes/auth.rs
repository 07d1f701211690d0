use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use ecobuddy_core::error::{EcoError, Result};
use ecobuddy_core::model::Identity;
use ecobuddy_core::sync::lock_store;
use serde::{Deserialize, Serialize};

use super::Layout;
use crate::error::{ApiError, AppError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth", get(show_auth))
        .route("/auth/sign-in", post(sign_in_form))
        .route("/auth/sign-up", post(sign_up_form))
        .route("/sign-out", post(sign_out_form))
        .route("/api/v1/session", get(api_session))
        .route("/api/v1/auth/sign-in", post(api_sign_in))
        .route("/api/v1/auth/sign-up", post(api_sign_up))
        .route("/api/v1/auth/sign-out", post(api_sign_out))
}

#[derive(Template)]
#[template(path = "auth.html")]
struct AuthTemplate {
    layout: Layout,
    sign_up: bool,
    email: String,
    name: String,
    error: Option<String>,
}

#[derive(Deserialize)]
pub struct AuthParams {
    mode: Option<String>,
}

#[derive(Deserialize)]
pub struct CredentialsInput {
    email: String,
    password: String,
    #[serde(default)]
    name: String,
}

#[derive(Serialize)]
struct SessionView {
    signed_in: bool,
    user_id: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

#[derive(Serialize)]
struct SignOutView {
    redirect: &'static str,
}

fn session_view(state: &AppState) -> Result<SessionView> {
    let store = lock_store(&state.store)?;
    Ok(SessionView {
        signed_in: store.identity().is_some(),
        user_id: store.identity().map(|i| i.user_id.clone()),
        email: store.identity().map(|i| i.email.clone()),
        name: store.profile().map(|p| p.name.clone()),
    })
}

async fn sign_in(state: &AppState, input: &CredentialsInput) -> Result<Identity> {
    let scope = state.scope();
    let identity = state
        .sync
        .sign_in(&scope, &input.email, &input.password)
        .await?;
    state
        .sync
        .on_identity_change(&scope, &state.store, Some(identity.clone()))
        .await?;
    Ok(identity)
}

async fn sign_up(state: &AppState, input: &CredentialsInput) -> Result<Identity> {
    let scope = state.scope();
    let identity = state
        .sync
        .sign_up(&scope, &input.email, &input.password, &input.name)
        .await?;
    state
        .sync
        .on_identity_change(&scope, &state.store, Some(identity.clone()))
        .await?;
    Ok(identity)
}

fn render_auth(
    state: &AppState,
    sign_up: bool,
    input: Option<&CredentialsInput>,
    error: Option<String>,
) -> std::result::Result<Html<String>, AppError> {
    let tmpl = AuthTemplate {
        layout: Layout::new(state, "auth")?,
        sign_up,
        email: input.map(|i| i.email.clone()).unwrap_or_default(),
        name: input.map(|i| i.name.clone()).unwrap_or_default(),
        error,
    };
    Ok(Html(tmpl.render()?))
}

/// Auth failures stay on the form with a message; anything else is an error page.
fn auth_failure(
    state: &AppState,
    sign_up: bool,
    input: &CredentialsInput,
    e: EcoError,
) -> std::result::Result<Response, AppError> {
    match e {
        EcoError::Auth(_) | EcoError::InvalidInput(_) => {
            tracing::warn!("authentication failed: {e}");
            Ok(render_auth(state, sign_up, Some(input), Some(e.to_string()))?.into_response())
        }
        other => Err(other.into()),
    }
}

// -- HTML handlers --

async fn show_auth(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthParams>,
) -> std::result::Result<Html<String>, AppError> {
    let sign_up = params.mode.as_deref() == Some("sign-up");
    render_auth(&state, sign_up, None, None)
}

async fn sign_in_form(
    State(state): State<Arc<AppState>>,
    Form(input): Form<CredentialsInput>,
) -> std::result::Result<Response, AppError> {
    match sign_in(&state, &input).await {
        Ok(_) => Ok(Redirect::to("/dashboard").into_response()),
        Err(e) => auth_failure(&state, false, &input, e),
    }
}

async fn sign_up_form(
    State(state): State<Arc<AppState>>,
    Form(input): Form<CredentialsInput>,
) -> std::result::Result<Response, AppError> {
    match sign_up(&state, &input).await {
        Ok(_) => Ok(Redirect::to("/dashboard").into_response()),
        Err(e) => auth_failure(&state, true, &input, e),
    }
}

async fn sign_out_form(State(state): State<Arc<AppState>>) -> std::result::Result<Redirect, AppError> {
    let nav = state.sync.sign_out(&state.scope(), &state.store).await?;
    Ok(Redirect::to(nav.path()))
}

// -- JSON handlers --

async fn api_session(State(state): State<Arc<AppState>>) -> std::result::Result<Json<SessionView>, ApiError> {
    Ok(Json(session_view(&state)?))
}

async fn api_sign_in(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CredentialsInput>,
) -> std::result::Result<Json<SessionView>, ApiError> {
    sign_in(&state, &input).await?;
    Ok(Json(session_view(&state)?))
}

async fn api_sign_up(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CredentialsInput>,
) -> std::result::Result<Json<SessionView>, ApiError> {
    sign_up(&state, &input).await?;
    Ok(Json(session_view(&state)?))
}

async fn api_sign_out(State(state): State<Arc<AppState>>) -> std::result::Result<Json<SignOutView>, ApiError> {
    let nav = state.sync.sign_out(&state.scope(), &state.store).await?;
    Ok(Json(SignOutView { redirect: nav.path() }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::*;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn session(app: &axum::Router) -> serde_json::Value {
        let resp = app
            .clone()
            .oneshot(Request::get("/api/v1/session").body(Body::empty()).unwrap())
            .await
            .unwrap();
        body_json(resp.into_body()).await
    }

    #[tokio::test]
    async fn test_signed_out_by_default() {
        let app = test_router(test_app_state());
        let json = session(&app).await;
        assert_eq!(json["signed_in"], false);
        assert!(json["user_id"].is_null());
    }

    #[tokio::test]
    async fn test_sign_up_hydrates_profile() {
        let app = test_router(test_app_state());
        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/sign-up",
                json!({"email": "alex@example.com", "password": "pw-123", "name": "Alex"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["signed_in"], true);
        assert_eq!(json["email"], "alex@example.com");
        assert_eq!(json["name"], "Alex");

        // fresh profile counters replace the local defaults
        let resp = app
            .oneshot(Request::get("/api/v1/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let stats = body_json(resp.into_body()).await;
        assert_eq!(stats["sustainabilityScore"], 0);
        assert_eq!(stats["carbonFootprint"], 12.5);
    }

    #[tokio::test]
    async fn test_sign_out_then_sign_in_same_user() {
        let app = test_router(test_app_state());
        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/sign-up",
                json!({"email": "sam@example.com", "password": "secret", "name": "Sam"}),
            ))
            .await
            .unwrap();
        let user_id = body_json(resp.into_body()).await["user_id"].clone();

        let resp = app
            .clone()
            .oneshot(post_json("/api/v1/auth/sign-out", json!({})))
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["redirect"], "/auth");
        assert_eq!(session(&app).await["signed_in"], false);

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/sign-in",
                json!({"email": "sam@example.com", "password": "secret"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["user_id"], user_id);
    }

    #[tokio::test]
    async fn test_wrong_password_is_401() {
        let app = test_router(test_app_state());
        app.clone()
            .oneshot(post_json(
                "/api/v1/auth/sign-up",
                json!({"email": "kim@example.com", "password": "right", "name": "Kim"}),
            ))
            .await
            .unwrap();
        app.clone()
            .oneshot(post_json("/api/v1/auth/sign-out", json!({})))
            .await
            .unwrap();

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/sign-in",
                json!({"email": "kim@example.com", "password": "wrong"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(resp.into_body()).await;
        assert!(json["error"].is_string());
        assert_eq!(session(&app).await["signed_in"], false);
    }

    #[tokio::test]
    async fn test_empty_credentials_is_400() {
        let app = test_router(test_app_state());
        let resp = app
            .oneshot(post_json(
                "/api/v1/auth/sign-in",
                json!({"email": "", "password": ""}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sign_in_form_failure_keeps_email() {
        let app = test_router(test_app_state());
        let req = Request::builder()
            .method("POST")
            .uri("/auth/sign-in")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("email=nobody%40example.com&password=x"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("nobody@example.com"));
        assert!(html.contains("class=\"error\""));
    }

    #[tokio::test]
    async fn test_sign_out_form_redirects_to_auth() {
        let app = test_router(test_app_state());
        let req = Request::builder()
            .method("POST")
            .uri("/sign-out")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()["location"], "/auth");
    }
}
