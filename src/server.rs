//! HTTP surface for the chat service.
//!
//! Routes:
//! - `GET  /messages`              transcript with counts
//! - `POST /messages`              `{ "message": "..." }`, answer a message
//! - `GET|POST /messages/`         same as `/messages` (the bundled client posts here)
//! - `POST /messages/add-response` `{ "keyword": "...", "answer": "..." }`
//! - `GET  /messages/stats`        bot categories and message total
//! - `POST /messages/clear`        empty the transcript
//! - `GET  /health`

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, warn};

use crate::chatbot::service::{AddOutcome, ChatService, Cleared, ServiceError, SubmitOutcome};
use crate::chatbot::transcript::{Stats, TranscriptSummary};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ServiceError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, ErrorBody { error: msg, details: None })
            }
            ServiceError::Persistence(e) => {
                error!("Persistence failure: {e}");
                let error = if e.is_corrupt() {
                    "Corrupted messages file."
                } else {
                    "Failed to save chat data."
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody { error: error.to_string(), details: Some(e.to_string()) },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

fn bad_body(rejection: JsonRejection) -> ServiceError {
    warn!("Rejected request body: {}", rejection.body_text());
    ServiceError::InvalidInput("Invalid request body.".to_string())
}

/// Build the router. Files under `static_dir` are served for any other path.
pub fn router(chat: Arc<ChatService>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/messages", get(list_messages).post(submit_message))
        .route("/messages/", get(list_messages).post(submit_message))
        .route("/messages/add-response", post(add_response))
        .route("/messages/stats", get(stats))
        .route("/messages/clear", post(clear))
        .route("/health", get(health));

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(cors).with_state(chat)
}

async fn list_messages(State(chat): State<Arc<ChatService>>) -> Json<TranscriptSummary> {
    Json(chat.list_transcript().await)
}

async fn submit_message(
    State(chat): State<Arc<ChatService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SubmitOutcome>, ServiceError> {
    let Json(body) = payload.map_err(bad_body)?;
    let outcome = chat.submit_message(body.get("message")).await?;
    Ok(Json(outcome))
}

async fn add_response(
    State(chat): State<Arc<ChatService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AddOutcome>, ServiceError> {
    let Json(body) = payload.map_err(bad_body)?;
    let keyword = body.get("keyword").and_then(Value::as_str);
    let answer = body.get("answer").and_then(Value::as_str);
    let outcome = chat.add_personalized_response(keyword, answer).await?;
    Ok(Json(outcome))
}

async fn stats(State(chat): State<Arc<ChatService>>) -> Json<Stats> {
    Json(chat.get_stats().await)
}

async fn clear(State(chat): State<Arc<ChatService>>) -> Result<Json<Cleared>, ServiceError> {
    Ok(Json(chat.clear_transcript().await?))
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
