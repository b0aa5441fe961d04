//! Call resolution: maps a model's function invocation back to the
//! indexed operation and decodes its arguments.

use crate::document::HttpMethod;
use crate::engine::index::{EndpointEntry, EndpointIndex};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Function call emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

/// An assistant message from a chat completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

/// An invocation bound to its operation.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedCall<'a> {
    pub payload: Map<String, Value>,
    pub path: &'a str,
    pub method: HttpMethod,
    pub entry: &'a EndpointEntry,
}

/// Decode `arguments` and look `name` up in the index.
///
/// Arguments are decoded before the lookup. No validation against the
/// function's parameter schema is performed.
pub fn resolve<'a>(index: &'a EndpointIndex, name: &str, arguments: &str) -> Result<ResolvedCall<'a>> {
    let payload = decode_arguments(name, arguments)?;

    let entry = index.get(name).ok_or_else(|| AppError::UnknownFunction {
        name: name.to_string(),
    })?;

    tracing::debug!(
        function = name,
        method = %entry.method,
        path = %entry.path,
        arguments = payload.len(),
        "Invocation resolved"
    );

    Ok(ResolvedCall {
        payload,
        path: &entry.path,
        method: entry.method,
        entry,
    })
}

/// `Ok(None)` when the message carries no function call.
pub fn resolve_message<'a>(
    index: &'a EndpointIndex,
    message: &AssistantMessage,
) -> Result<Option<ResolvedCall<'a>>> {
    message
        .function_call
        .as_ref()
        .map(|call| resolve(index, &call.name, &call.arguments))
        .transpose()
}

fn decode_arguments(function: &str, arguments: &str) -> Result<Map<String, Value>> {
    let malformed = |reason: String| AppError::MalformedArguments {
        function: function.to_string(),
        reason,
    };

    match serde_json::from_str::<Value>(arguments).map_err(|e| malformed(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(malformed(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
