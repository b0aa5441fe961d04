use crate::engine::{AssistantMessage, RequestDescriptor};
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub call_id: Uuid,
    /// The resolved call (payload, path, method, entry); null for plain messages.
    pub call: Option<Value>,
    /// The request to send; null for plain messages.
    pub request: Option<RequestDescriptor>,
}

/// POST /resolve - Map an assistant message's function call to an HTTP request.
///
/// # Flow
/// 1. Reject oversized argument strings
/// 2. Resolve the function name and decode the arguments
/// 3. Interpolate path parameters and split the rest into query or body
///
/// A message without a function call is not an error: both fields come back null.
pub async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Json(message): Json<AssistantMessage>,
) -> Result<Json<ResolveResponse>> {
    let call_id = Uuid::new_v4();
    let span = tracing::info_span!("resolve", %call_id);

    span.in_scope(|| {
        let start_time = std::time::Instant::now();
        metrics::counter!("resolve_requests_total").increment(1);

        let result = resolve_message(&state, &message, call_id);

        let elapsed = start_time.elapsed();
        metrics::histogram!("resolve_latency_ms").record(elapsed.as_secs_f64() * 1000.0);

        match &result {
            Ok(response) => tracing::info!(
                function = message.function_call.as_ref().map(|c| c.name.as_str()).unwrap_or("-"),
                url = response.request.as_ref().map(|r| r.url.as_str()).unwrap_or("-"),
                elapsed_us = elapsed.as_micros() as u64,
                "Resolve completed"
            ),
            Err(e) => {
                metrics::counter!("resolve_failures_total", "kind" => e.kind()).increment(1);
                tracing::debug!(error = %e, "Resolve failed");
            }
        }

        result.map(Json)
    })
}

fn resolve_message(
    state: &AppState,
    message: &AssistantMessage,
    call_id: Uuid,
) -> Result<ResolveResponse> {
    if let Some(call) = &message.function_call {
        let max = state.config.max_argument_bytes;
        if call.arguments.len() > max {
            return Err(AppError::ValidationError(format!(
                "function_call.arguments exceeds the maximum of {} bytes",
                max
            )));
        }
    }

    let chatterbox = &state.chatterbox;
    let Some(call) = chatterbox.parse_message(message)? else {
        return Ok(ResolveResponse {
            call_id,
            call: None,
            request: None,
        });
    };

    let request = chatterbox.build_request(&call)?;
    let call = serde_json::to_value(&call)
        .map_err(|e| AppError::Internal(format!("unserializable call: {}", e)))?;

    Ok(ResolveResponse {
        call_id,
        call: Some(call),
        request: Some(request),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatterbox::Chatterbox;
    use crate::config::Config;
    use crate::document::{ApiDocument, DocumentSource};
    use crate::engine::{CollisionPolicy, FunctionCall, TagFilter};
    use serde_json::json;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn chat_state() -> Arc<AppState> {
        let doc = ApiDocument::from_value(json!({
            "openapi": "3.0.0",
            "info": { "title": "Chat", "version": "1.0" },
            "servers": [{ "url": "http://localhost:3000" }],
            "paths": {
                "/chats": { "get": { "tags": ["Chat"], "summary": "List chats" } }
            }
        }))
        .unwrap();
        let chatterbox =
            Chatterbox::from_document(&doc, &TagFilter::default(), CollisionPolicy::Reject).unwrap();
        let config = Config::with_source(DocumentSource::parse("chat.json"));
        Arc::new(AppState::with_chatterbox(chatterbox, config))
    }

    #[tokio::test]
    async fn test_resolve_logs_inside_call_id_span() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let message = AssistantMessage {
            role: "assistant".to_string(),
            content: None,
            function_call: Some(FunctionCall {
                name: "List_chats".to_string(),
                arguments: r#"{"limit":5}"#.to_string(),
            }),
        };
        let Json(response) = resolve_handler(State(chat_state()), Json(message))
            .await
            .unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let line = output
            .lines()
            .find(|line| line.contains("Resolve completed"))
            .unwrap();
        assert!(line.contains(&format!("resolve{{call_id={}}}", response.call_id)));
        assert_eq!(response.request.unwrap().url, "http://localhost:3000/chats");
    }
}
