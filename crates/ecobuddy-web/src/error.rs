use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use ecobuddy_core::error::EcoError;

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    status: u16,
    message: String,
}

/// Error for HTML pages. Renders a minimal error page.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.message);
        }
        let page = ErrorTemplate {
            status: self.status.as_u16(),
            message: self.message.clone(),
        };
        match page.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, self.message).into_response(),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        Self::internal(format!("template error: {e}"))
    }
}

impl From<EcoError> for AppError {
    fn from(e: EcoError) -> Self {
        Self {
            status: status_for(&e),
            message: e.to_string(),
        }
    }
}

/// Error for JSON endpoints: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.message);
        }
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<EcoError> for ApiError {
    fn from(e: EcoError) -> Self {
        Self {
            status: status_for(&e),
            message: e.to_string(),
        }
    }
}

fn status_for(e: &EcoError) -> StatusCode {
    match e {
        EcoError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        EcoError::Auth(_) => StatusCode::UNAUTHORIZED,
        EcoError::NotFound(_) => StatusCode::NOT_FOUND,
        EcoError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&EcoError::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&EcoError::Auth("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&EcoError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&EcoError::Backend("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_response_status() {
        let resp = ApiError::bad_request("missing field").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
