use std::sync::{Arc, MutexGuard};

use askama::Template;
use axum::extract::State;
use axum::response::{Html, Json, Redirect};
use axum::routing::get;
use axum::{Form, Router};
use ecobuddy_core::chat::Conversation;
use ecobuddy_core::error::EcoError;
use ecobuddy_core::model::{ChatMessage, Sender};
use ecobuddy_core::sync::lock_store;
use serde::{Deserialize, Serialize};

use super::Layout;
use crate::error::{ApiError, AppError};
use crate::AppState;

const SUGGESTIONS: &[&str] = &[
    "How can I reduce my carbon footprint?",
    "Tips for saving water",
    "How do I recycle properly?",
    "Give me an eco tip",
];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chatbot", get(show_chat).post(send_form))
        .route("/api/v1/chat", get(api_transcript).post(api_send))
}

#[derive(Template)]
#[template(path = "chatbot.html")]
struct ChatTemplate {
    layout: Layout,
    bubbles: Vec<Bubble>,
    typing: bool,
    suggestions: Vec<&'static str>,
}

struct Bubble {
    from_user: bool,
    content: String,
    time: String,
}

#[derive(Deserialize)]
pub struct ChatInput {
    message: String,
}

#[derive(Serialize)]
struct ChatExchange {
    user: Option<ChatMessage>,
    reply: Option<ChatMessage>,
}

#[derive(Serialize)]
struct Transcript {
    messages: Vec<ChatMessage>,
    typing: bool,
}

fn conversation(state: &AppState) -> Result<MutexGuard<'_, Conversation>, EcoError> {
    state
        .conversation
        .lock()
        .map_err(|_| EcoError::Storage("conversation lock poisoned".to_string()))
}

/// Post `input` to the transcript and wait for the bot. Blank input is
/// ignored. If the request scope ends before the reply, the typing flag is
/// cleared and nothing is appended.
async fn exchange(state: &AppState, input: &str) -> Result<ChatExchange, EcoError> {
    let posted = conversation(state)?.push_user(input);
    let Some(user) = posted else {
        return Ok(ChatExchange {
            user: None,
            reply: None,
        });
    };
    let actions = lock_store(&state.store)?.eco_actions().to_vec();

    match state.chatbot.reply(&state.scope(), input, &actions).await {
        Ok(reply) => {
            conversation(state)?.push_bot(reply.clone());
            Ok(ChatExchange {
                user: Some(user),
                reply: Some(reply),
            })
        }
        Err(e) => {
            conversation(state)?.abandon_reply();
            Err(e)
        }
    }
}

async fn show_chat(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let layout = Layout::new(&state, "chatbot")?;
    let tmpl = {
        let convo = conversation(&state)?;
        ChatTemplate {
            layout,
            bubbles: convo
                .messages()
                .iter()
                .map(|m| Bubble {
                    from_user: m.sender == Sender::User,
                    content: m.content.clone(),
                    time: m.time_label(),
                })
                .collect(),
            typing: convo.is_typing(),
            suggestions: SUGGESTIONS.to_vec(),
        }
    };
    Ok(Html(tmpl.render()?))
}

async fn send_form(
    State(state): State<Arc<AppState>>,
    Form(input): Form<ChatInput>,
) -> Result<Redirect, AppError> {
    exchange(&state, &input.message).await?;
    Ok(Redirect::to("/chatbot"))
}

async fn api_transcript(State(state): State<Arc<AppState>>) -> Result<Json<Transcript>, ApiError> {
    let convo = conversation(&state)?;
    Ok(Json(Transcript {
        messages: convo.messages().to_vec(),
        typing: convo.is_typing(),
    }))
}

async fn api_send(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ChatInput>,
) -> Result<Json<ChatExchange>, ApiError> {
    Ok(Json(exchange(&state, &input.message).await?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::test_support::*;

    fn send(message: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "message": message }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_transcript_starts_with_greeting() {
        let app = test_router(test_app_state());
        let resp = app
            .oneshot(Request::get("/api/v1/chat").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["sender"], "bot");
        assert_eq!(messages[0]["content"], ecobuddy_core::chat::GREETING);
        assert_eq!(json["typing"], false);
    }

    #[tokio::test]
    async fn test_send_gets_keyword_reply() {
        let app = test_router(test_app_state());
        let resp = app.clone().oneshot(send("What about water?")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["user"]["content"], "What about water?");
        assert_eq!(json["reply"]["sender"], "bot");
        assert!(json["reply"]["content"]
            .as_str()
            .unwrap()
            .starts_with("Great question about water conservation!"));

        let resp = app
            .oneshot(Request::get("/api/v1/chat").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["messages"].as_array().unwrap().len(), 3);
        assert_eq!(json["typing"], false);
    }

    #[tokio::test]
    async fn test_blank_message_ignored() {
        let app = test_router(test_app_state());
        let resp = app.clone().oneshot(send("   ")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert!(json["user"].is_null());
        assert!(json["reply"].is_null());

        let resp = app
            .oneshot(Request::get("/api/v1/chat").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tip_names_a_catalog_action() {
        let app = test_router(test_app_state());
        let resp = app.oneshot(send("any advice?")).await.unwrap();
        let json = body_json(resp.into_body()).await;
        let reply = json["reply"]["content"].as_str().unwrap().to_string();
        assert!(reply.starts_with("Here's a sustainable tip: "));
        let actions = ecobuddy_core::seed::eco_actions();
        assert!(actions.iter().any(|a| reply.contains(&a.title)));
    }

    #[tokio::test]
    async fn test_shutdown_abandons_reply() {
        let state = test_app_state();
        state.shutdown.cancel();
        let app = test_router(state.clone());
        let resp = app.oneshot(send("hello")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let convo = state.conversation.lock().unwrap();
        assert!(!convo.is_typing());
        // greeting + the user's message, no reply
        assert_eq!(convo.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_form_redirects_and_renders() {
        let app = test_router(test_app_state());
        let req = Request::builder()
            .method("POST")
            .uri("/chatbot")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("message=tell+me+about+food"))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let resp = app
            .oneshot(Request::get("/chatbot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("tell me about food"));
        assert!(html.contains("Your diet has a significant environmental impact."));
    }
}
