//! Schema translation: one OpenAI-style function descriptor per indexed
//! operation, merging path/query parameters with request body fields.

use crate::document::{ParameterLocation, RequestBody};
use crate::engine::index::{EndpointEntry, EndpointIndex};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const JSON_MEDIA_TYPE: &str = "application/json";

/// Type used for a parameter whose schema declares none.
const DEFAULT_PARAMETER_TYPE: &str = "string";

/// A callable function as exposed to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: ParameterSchema,
}

/// JSON-Schema object describing a function's arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

/// A body property schema, either plain or wrapped in `allOf`.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertySchema {
    Plain(Value),
    Composed(Vec<Value>),
}

impl PropertySchema {
    pub fn classify(schema: &Value) -> Self {
        match schema.get("allOf").and_then(|a| a.as_array()) {
            Some(branches) => Self::Composed(branches.clone()),
            None => Self::Plain(schema.clone()),
        }
    }

    /// The schema to expose. Only single-branch composition unwraps;
    /// `Err` carries the branch count otherwise.
    pub fn unwrap_single(self) -> std::result::Result<Value, usize> {
        match self {
            Self::Plain(schema) => Ok(schema),
            Self::Composed(mut branches) if branches.len() == 1 => Ok(branches.remove(0)),
            Self::Composed(branches) => Err(branches.len()),
        }
    }
}

/// Build the descriptor for one entry. Never modifies the entry.
pub fn translate(entry: &EndpointEntry) -> Result<FunctionDescriptor> {
    let mut parameters = ParameterSchema::default();

    for param in entry.effective_parameters() {
        if !matches!(param.location, ParameterLocation::Path | ParameterLocation::Query) {
            tracing::debug!(
                function = %entry.name,
                parameter = %param.name,
                location = ?param.location,
                "Parameter location not exposed to the model"
            );
            continue;
        }

        let mut property = Map::new();
        property.insert(
            "type".to_string(),
            json!(param.schema_type().unwrap_or(DEFAULT_PARAMETER_TYPE)),
        );
        if let Some(description) = &param.description {
            property.insert("description".to_string(), json!(description));
        }
        parameters
            .properties
            .insert(param.name.clone(), Value::Object(property));

        if param.required {
            parameters.required.push(param.name.clone());
        }
    }

    if let Some(body) = &entry.operation.request_body {
        merge_body(entry, body, &mut parameters)?;
    }

    Ok(FunctionDescriptor {
        name: entry.name.clone(),
        description: entry.operation.description.clone(),
        parameters,
    })
}

/// Descriptors for every entry, in index order.
pub fn translate_all(index: &EndpointIndex) -> Result<Vec<FunctionDescriptor>> {
    index.iter().map(translate).collect()
}

fn merge_body(entry: &EndpointEntry, body: &RequestBody, parameters: &mut ParameterSchema) -> Result<()> {
    let schema = json_schema(&body.content).ok_or_else(|| AppError::UnsupportedMediaType {
        operation: entry.name.clone(),
        reason: format!(
            "no JSON media type (found: {})",
            if body.content.is_empty() {
                "none".to_string()
            } else {
                body.content.keys().cloned().collect::<Vec<_>>().join(", ")
            }
        ),
    })?;

    let composed = |property: &str, branches: usize| AppError::UnsupportedMediaType {
        operation: entry.name.clone(),
        reason: format!(
            "'{}' is composed of {} allOf branches; only single-branch composition is supported",
            property, branches
        ),
    };

    let schema = PropertySchema::classify(schema)
        .unwrap_single()
        .map_err(|branches| composed("requestBody", branches))?;

    if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
        for (name, property) in properties {
            let property = PropertySchema::classify(property)
                .unwrap_single()
                .map_err(|branches| composed(name.as_str(), branches))?;
            parameters.properties.insert(name.clone(), property);
        }
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        parameters
            .required
            .extend(required.iter().filter_map(|r| r.as_str()).map(String::from));
    }

    Ok(())
}

/// The schema of the JSON representation: `application/json` first, then any
/// `+json` structured-syntax type. Media type parameters are ignored.
fn json_schema(content: &Map<String, Value>) -> Option<&Value> {
    let essence = |media_type: &str| {
        media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    };

    let media = content
        .iter()
        .find(|(k, _)| essence(k) == JSON_MEDIA_TYPE)
        .or_else(|| content.iter().find(|(k, _)| essence(k).ends_with("+json")))
        .map(|(_, v)| v)?;

    Some(media.get("schema").unwrap_or(&Value::Null))
}
