//! Structural validation and local `$ref` dereferencing of API documents.
//!
//! The loader accepts raw JSON text or an already parsed [`Value`], inlines
//! every local `#/...` reference, and then checks the handful of structural
//! rules the translation engine depends on. Any failure surfaces as a single
//! [`AppError::InvalidDocument`] carrying the underlying cause.

use crate::document::types::{ApiDocument, PathItem, Server};
use crate::error::{AppError, Result};
use serde_json::{Map, Value};

const REF_KEY: &str = "$ref";

impl ApiDocument {
    /// Parse raw text as JSON, then validate it.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| AppError::InvalidDocument {
            reason: format!("document is not valid JSON: {}", e),
        })?;
        Self::from_value(value)
    }

    /// Dereference and validate structured document data.
    pub fn from_value(value: Value) -> Result<Self> {
        let resolved = dereference(&value)?;
        let root = resolved.as_object().ok_or_else(|| invalid("document root must be an object"))?;

        let openapi = root
            .get("openapi")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("missing 'openapi' version field"))?;
        if !openapi.starts_with("3.") {
            return Err(invalid(format!(
                "unsupported OpenAPI version '{}', expected 3.x",
                openapi
            )));
        }

        if !root.get("info").is_some_and(Value::is_object) {
            return Err(invalid("missing 'info' object"));
        }

        let servers = extract_servers(root)?;
        let paths = extract_paths(root)?;

        tracing::debug!(
            openapi,
            servers = servers.len(),
            paths = paths.len(),
            "API document validated"
        );

        Ok(Self {
            openapi: openapi.to_string(),
            servers,
            paths,
        })
    }
}

fn invalid(reason: impl Into<String>) -> AppError {
    AppError::InvalidDocument {
        reason: reason.into(),
    }
}

fn extract_servers(root: &Map<String, Value>) -> Result<Vec<Server>> {
    let raw = root
        .get("servers")
        .cloned()
        .ok_or_else(|| invalid("missing 'servers'; at least one server URL is required"))?;
    let servers: Vec<Server> = serde_json::from_value(raw)
        .map_err(|e| invalid(format!("malformed 'servers': {}", e)))?;

    match servers.first() {
        None => Err(invalid("'servers' is empty; at least one server URL is required")),
        Some(first) if first.url.trim().is_empty() => Err(invalid("servers[0].url is empty")),
        Some(_) => Ok(servers),
    }
}

fn extract_paths(root: &Map<String, Value>) -> Result<Vec<(String, PathItem)>> {
    let Some(raw) = root.get("paths") else {
        return Ok(Vec::new());
    };
    let paths = raw
        .as_object()
        .ok_or_else(|| invalid("'paths' must be an object"))?;

    let mut out = Vec::with_capacity(paths.len());
    for (path, item) in paths {
        if !path.starts_with('/') {
            return Err(invalid(format!("path '{}' must start with '/'", path)));
        }
        let item: PathItem = serde_json::from_value(item.clone())
            .map_err(|e| invalid(format!("malformed path item '{}': {}", path, e)))?;
        out.push((path.clone(), item));
    }
    Ok(out)
}

/// Inline every local `$ref` in `root`.
///
/// Sibling keys next to a `$ref` are overlaid onto the referenced object.
/// A reference that re-enters itself is left in place unresolved.
pub fn dereference(root: &Value) -> Result<Value> {
    let mut stack = Vec::new();
    resolve_node(root, root, &mut stack)
}

fn resolve_node(node: &Value, root: &Value, stack: &mut Vec<String>) -> Result<Value> {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get(REF_KEY).and_then(|r| r.as_str()) {
                return resolve_reference(reference, map, root, stack);
            }
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), resolve_node(value, root, stack)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_node(item, root, stack))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn resolve_reference(
    reference: &str,
    node: &Map<String, Value>,
    root: &Value,
    stack: &mut Vec<String>,
) -> Result<Value> {
    let Some(pointer) = reference.strip_prefix('#') else {
        return Err(invalid(format!(
            "external reference '{}' is not supported",
            reference
        )));
    };

    if stack.iter().any(|r| r == reference) {
        tracing::debug!(reference, "Circular reference left unresolved");
        return Ok(Value::Object(node.clone()));
    }

    let target = root
        .pointer(pointer)
        .ok_or_else(|| invalid(format!("unresolvable reference '{}'", reference)))?;

    stack.push(reference.to_string());
    let resolved = resolve_node(target, root, stack);
    stack.pop();
    let mut resolved = resolved?;

    if let Value::Object(target_map) = &mut resolved {
        for (key, value) in node {
            if key != REF_KEY {
                target_map.insert(key.clone(), resolve_node(value, root, stack)?);
            }
        }
    }
    Ok(resolved)
}
