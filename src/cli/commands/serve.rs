//! HTTP API server for chat integrations.
//!
//! `POST /chat` answers a question about a video inside a session;
//! `/uptime` and `/health` are for keep-alive pings and monitoring.

use crate::cli::{content_preview, Output};
use crate::config::Settings;
use crate::error::SporError;
use crate::orchestrator::ChatOrchestrator;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state.
struct AppState {
    orchestrator: ChatOrchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<&str>, port: Option<u16>, settings: &Settings) -> anyhow::Result<()> {
    let orchestrator = ChatOrchestrator::from_settings(settings)?;
    let state = Arc::new(AppState { orchestrator });

    let host = host.unwrap_or(&settings.server.host);
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Spor API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Chat", "POST /chat");
    Output::kv("Uptime", "GET|HEAD /uptime");
    Output::kv("Health", "GET  /health");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat))
        .route("/uptime", get(uptime).head(uptime))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ChatRequest {
    session_id: String,
    question: String,
    /// YouTube video ID or URL
    video_id: String,
}

#[derive(Serialize, Deserialize)]
struct ChatResponse {
    answer: String,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    videos: usize,
    sessions: usize,
}

// === Handlers ===

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    match state
        .orchestrator
        .answer(&req.video_id, &req.session_id, &req.question)
        .await
    {
        Ok(answer) => {
            info!(
                "[Video: {}] Q: {} -> A: {}",
                req.video_id,
                content_preview(&req.question, 80),
                content_preview(&answer, 80)
            );
            Json(ChatResponse { answer }).into_response()
        }
        Err(e) => {
            let status = match e {
                SporError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error!("Chat request for {} failed: {}", req.video_id, e);
            (status, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}

async fn uptime() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        videos: state.orchestrator.videos().len().await,
        sessions: state.orchestrator.sessions().len().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{lecture, RecordingIndex, ScriptedSource};
    use crate::rag::testing::EchoGenerator;
    use serde::de::DeserializeOwned;

    fn state_with(generator: EchoGenerator) -> Arc<AppState> {
        let orchestrator = ChatOrchestrator::with_components(
            &Settings::default(),
            ScriptedSource::with(lecture()),
            Arc::new(RecordingIndex::default()),
            Arc::new(generator),
        )
        .unwrap();
        Arc::new(AppState { orchestrator })
    }

    fn request(video_id: &str, question: &str) -> Json<ChatRequest> {
        Json(ChatRequest {
            session_id: "web-1".to_string(),
            question: question.to_string(),
            video_id: video_id.to_string(),
        })
    }

    async fn body<T: DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_returns_answer() {
        let state = state_with(EchoGenerator::default());

        let response = chat(State(state.clone()), request("vid", "summarize the video")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let parsed: ChatResponse = body(response).await;
        assert_eq!(parsed.answer, "answer to: summarize the video");
        assert_eq!(state.orchestrator.sessions().len().await, 1);
    }

    #[tokio::test]
    async fn test_chat_generation_failure_is_500() {
        let state = state_with(EchoGenerator {
            fail: true,
            ..Default::default()
        });

        let response = chat(State(state), request("vid", "summarize")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let parsed: ErrorResponse = body(response).await;
        assert!(parsed.error.contains("model unavailable"));
    }

    #[tokio::test]
    async fn test_chat_empty_question_is_400() {
        let state = state_with(EchoGenerator::default());

        let response = chat(State(state), request("vid", "   ")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_uptime_and_health() {
        let response = uptime().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let parsed: serde_json::Value = body(response).await;
        assert_eq!(parsed, serde_json::json!({ "status": "alive" }));

        let state = state_with(EchoGenerator::default());
        chat(State(state.clone()), request("vid", "summarize")).await;

        let parsed: serde_json::Value = body(health(State(state)).await.into_response()).await;
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["videos"], 1);
        assert_eq!(parsed["sessions"], 1);
    }
}
