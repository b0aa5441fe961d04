use crate::engine::FunctionDescriptor;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct FunctionsResponse {
    pub system_prompt: &'static str,
    /// Changes whenever the function set changes; clients can cache on it.
    pub fingerprint: String,
    pub base_url: Option<String>,
    pub functions: Vec<FunctionDescriptor>,
}

/// GET /functions - The function set and system prompt for a chat completion request.
pub async fn functions_handler(State(state): State<Arc<AppState>>) -> Json<FunctionsResponse> {
    let chatterbox = &state.chatterbox;

    metrics::counter!("functions_requests_total").increment(1);

    Json(FunctionsResponse {
        system_prompt: chatterbox.system_prompt(),
        fingerprint: chatterbox.fingerprint().to_string(),
        base_url: chatterbox.base_url().map(str::to_string),
        functions: chatterbox.functions().to_vec(),
    })
}
