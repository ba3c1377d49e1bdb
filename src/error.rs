use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Backend(String),
    Network(reqwest::Error),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "{msg}"),
            Self::Backend(msg) => write!(f, "Media backend error: {msg}"),
            Self::Network(e) => write!(f, "Media backend unreachable: {e}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::BadRequest(msg) => {
                tracing::warn!(status = 400, "{msg}");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            Self::Backend(_) | Self::Network(_) => {
                let details = self.to_string();
                tracing::error!("{details}");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Media backend request failed", "details": details })),
                )
                    .into_response()
            }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e)
    }
}
