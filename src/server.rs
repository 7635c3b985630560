use std::sync::Arc;

use axum::{
    extract::State,
    http::Method,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::models::{ChatAnswer, ChatRequest};
use crate::rag::RagOrchestrator;

const INDEX_PAGE: &str = include_str!("../static/index.html");

pub struct AppState {
    pub orchestrator: RagOrchestrator,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_page))
        .route("/chat", post(chat_handler))
        .route("/api/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatAnswer> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    let answer = state
        .orchestrator
        .answer(&request.message)
        .instrument(span)
        .await;
    Json(answer)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let index = state.orchestrator.retrieval().index();

    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "knowledge_base": {
            "chunks": index.len(),
            "dimension": index.dimension(),
        }
    }))
}
