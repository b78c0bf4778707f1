//! Routes and handlers.

use crate::error::ApiError;
use crate::state::{AppState, ChatMessage};
use crate::users::UserError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/chat/:email", get(get_chat).post(save_chat))
        .route("/cache", get(get_cache).delete(clear_cache))
        .route("/ask", post(ask))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub cached: bool,
    pub used_prompt: Option<String>,
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

async fn root() -> Json<Value> {
    message("RAG backend API is running.")
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Json<Value>, ApiError> {
    state
        .users
        .register(&body.email, &body.password)
        .map_err(user_error)?;
    Ok(message("User registered successfully"))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Json<Value>, ApiError> {
    state
        .users
        .login(&body.email, &body.password)
        .map_err(user_error)?;
    Ok(message("Login successful"))
}

fn user_error(err: UserError) -> ApiError {
    let status = match err {
        UserError::EmailTaken | UserError::IncorrectPassword => StatusCode::BAD_REQUEST,
        UserError::EmailNotFound => StatusCode::NOT_FOUND,
        UserError::Hash(_) | UserError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::detail(status, err.to_string())
}

async fn save_chat(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(body): Json<ChatMessage>,
) -> Json<Value> {
    state.chats.append(&email, body);
    message("Message saved")
}

async fn get_chat(State(state): State<AppState>, Path(email): Path<String>) -> Json<Value> {
    Json(json!({ "history": state.chats.history(&email) }))
}

async fn get_cache(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    Ok(Json(state.pipeline.cache().entries()?))
}

async fn clear_cache(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.pipeline.cache().clear()?;
    Ok(message("Cache cleared."))
}

async fn ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(body) = body?;
    if body.prompt.trim().is_empty() {
        return Err(ApiError::error(StatusCode::BAD_REQUEST, "Prompt is empty"));
    }

    let answer = state.pipeline.ask(&body.prompt).await?;

    Ok(Json(AskResponse {
        answer: answer.answer,
        cached: answer.cached,
        used_prompt: answer.used_prompt,
    }))
}
