//! Request building: turns a resolved call into a transport-agnostic HTTP
//! request descriptor.
//!
//! Path templates accept two placeholder grammars at once, `{name}` and
//! `:name`. Interpolation is a single left-to-right pass over the template, so the
//! substitution order never depends on payload key order.

use crate::document::HttpMethod;
use crate::engine::resolve::ResolvedCall;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Final request shape, ready for any HTTP client.
///
/// Exactly one of `params` and `data` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// A path template with `{name}` and `:name` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate<'a> {
    template: &'a str,
}

impl<'a> PathTemplate<'a> {
    pub fn parse(template: &'a str) -> Self {
        Self { template }
    }

    /// Placeholder names in template order, either grammar.
    ///
    /// Colon names are read as `[A-Za-z0-9_]+`. At render time a colon
    /// placeholder also matches a payload key spelled out after the `:`.
    pub fn placeholders(&self) -> impl Iterator<Item = &'a str> + '_ {
        let mut rest = self.template;
        std::iter::from_fn(move || loop {
            let pos = rest.find(is_placeholder_start)?;
            let token = &rest[pos..];
            let name = match token.as_bytes()[0] {
                b'{' => brace_end(token).map(|end| (&token[1..end - 1], end)),
                _ => {
                    let len = identifier_len(&token[1..]);
                    (len > 0).then(|| (&token[1..=len], len + 1))
                }
            };
            match name {
                Some((name, end)) => {
                    rest = &token[end..];
                    return Some(name);
                }
                None => rest = &token[1..],
            }
        })
    }

    /// Substitute every placeholder whose name is a key of `values`.
    ///
    /// Returns the rendered path and the set of keys consumed. Placeholders
    /// without a value are kept verbatim.
    pub fn render<'v>(&self, values: &'v Map<String, Value>) -> (String, HashSet<&'v str>) {
        let mut out = String::with_capacity(self.template.len());
        let mut consumed = HashSet::new();
        let mut rest = self.template;

        while let Some(pos) = rest.find(is_placeholder_start) {
            out.push_str(&rest[..pos]);
            let token = &rest[pos..];

            let (matched, end) = if token.starts_with('{') {
                match brace_end(token) {
                    Some(end) => (key_value(values, &token[1..end - 1]), end),
                    None => (None, 1),
                }
            } else {
                match colon_match(&token[1..], values) {
                    Some(pair) => (Some(pair), pair.0.len() + 1),
                    None => (None, 1),
                }
            };

            match matched {
                Some((key, value)) => {
                    out.push_str(&value_to_path_string(value));
                    consumed.insert(key.as_str());
                }
                None => out.push_str(&token[..end]),
            }
            rest = &token[end..];
        }

        out.push_str(rest);
        (out, consumed)
    }
}

/// End (exclusive) of a non-empty `{name}` token at the start of `token`.
fn brace_end(token: &str) -> Option<usize> {
    token[1..]
        .find('}')
        .map(|close| close + 2)
        .filter(|&end| end > 2)
}

fn is_placeholder_start(c: char) -> bool {
    c == '{' || c == ':'
}

fn key_value<'v>(values: &'v Map<String, Value>, name: &str) -> Option<(&'v String, &'v Value)> {
    values.iter().find(|(key, _)| key.as_str() == name)
}

fn identifier_len(text: &str) -> usize {
    text.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count()
}

/// The payload key a `:` placeholder names, given the text after the colon.
///
/// The identifier token matches as a whole; any other key matches when it is
/// spelled out in full and followed by `/`, `.` or the end of the path. The
/// longest candidate wins.
fn colon_match<'v>(after: &str, values: &'v Map<String, Value>) -> Option<(&'v String, &'v Value)> {
    let len = identifier_len(after);
    let identifier = (len > 0)
        .then(|| key_value(values, &after[..len]))
        .flatten();

    let spelled_out = values.iter().filter(|(key, _)| {
        !key.is_empty()
            && after.starts_with(key.as_str())
            && matches!(after[key.len()..].chars().next(), None | Some('/') | Some('.'))
    });

    identifier
        .into_iter()
        .chain(spelled_out)
        .max_by_key(|(key, _)| key.len())
}

/// String form of an argument value when placed in a URL path.
fn value_to_path_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Builds [`RequestDescriptor`]s against a fixed base URL.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    base_url: Option<String>,
}

impl RequestBuilder {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Interpolate path placeholders and route the remaining arguments to
    /// `params` (get) or `data` (everything else).
    ///
    /// The call's payload is left untouched.
    pub fn build(&self, call: &ResolvedCall<'_>) -> Result<RequestDescriptor> {
        let base_url = self.base_url.as_deref().ok_or(AppError::MissingBaseUrl)?;

        let template = PathTemplate::parse(call.path);
        let (path, consumed) = template.render(&call.payload);

        let remaining: Map<String, Value> = call
            .payload
            .iter()
            .filter(|(key, _)| !consumed.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let url = format!("{}{}", base_url.trim_end_matches('/'), path);

        tracing::debug!(
            function = %call.entry.name,
            method = %call.method,
            url = %url,
            path_arguments = consumed.len(),
            remaining = remaining.len(),
            "Request descriptor built"
        );

        let (params, data) = if call.method.is_read() {
            (Some(remaining), None)
        } else {
            (None, Some(remaining))
        };

        Ok(RequestDescriptor {
            url,
            method: call.method,
            params,
            data,
        })
    }
}
