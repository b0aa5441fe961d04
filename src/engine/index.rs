//! Endpoint indexing: selects tagged operations and keys them by a
//! function name derived from their summary.

use crate::document::{ApiDocument, HttpMethod, Operation, Parameter};
use crate::error::{AppError, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

/// Longest function name the chat-completion API accepts.
pub const MAX_FUNCTION_NAME_LENGTH: usize = 64;

/// Replacement for every whitespace character in a derived name.
const NAME_SEPARATOR: char = '_';

/// Derive a function name from an operation summary.
///
/// Whitespace becomes `_`, then the result is cut to the first 64 characters.
pub fn format_name(summary: &str) -> String {
    summary
        .chars()
        .map(|c| if c.is_whitespace() { NAME_SEPARATOR } else { c })
        .take(MAX_FUNCTION_NAME_LENGTH)
        .collect()
}

/// Tag allow-list. Empty means every tagged operation is included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: BTreeSet<String>,
}

impl TagFilter {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list, ignoring blanks.
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn matches(&self, tags: &[String]) -> bool {
        self.tags.is_empty() || tags.iter().any(|t| self.tags.contains(t))
    }
}

/// What to do when two operations derive the same function name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Fail the build with [`AppError::DuplicateOperationName`].
    Reject,
    /// Append `_2`, `_3`, ... to later names, in document order.
    #[default]
    Suffix,
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" | "error" => Ok(Self::Reject),
            "suffix" | "" => Ok(Self::Suffix),
            other => Err(format!(
                "unknown collision policy '{}', expected 'suffix' or 'reject'",
                other
            )),
        }
    }
}

/// One indexed operation.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointEntry {
    pub name: String,
    pub path: String,
    pub method: HttpMethod,
    pub operation: Operation,
    /// Path-item level parameters that apply to this operation too.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shared_parameters: Vec<Parameter>,
}

impl EndpointEntry {
    /// `"post /chats/{chatId}"`, used in logs and error messages.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Shared then operation parameters; an operation parameter with the same
    /// name and location replaces the shared one in place.
    pub fn effective_parameters(&self) -> Vec<&Parameter> {
        let own = self.operation.parameters.as_deref().unwrap_or_default();
        let mut merged: Vec<&Parameter> = self
            .shared_parameters
            .iter()
            .map(|shared| {
                own.iter()
                    .find(|p| p.name == shared.name && p.location == shared.location)
                    .unwrap_or(shared)
            })
            .collect();
        for param in own {
            let overrides_shared = self
                .shared_parameters
                .iter()
                .any(|s| s.name == param.name && s.location == param.location);
            if !overrides_shared {
                merged.push(param);
            }
        }
        merged
    }
}

/// Function name → endpoint mapping, in insertion order.
///
/// Built once per loaded document and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct EndpointIndex {
    entries: Vec<EndpointEntry>,
    by_name: HashMap<String, usize>,
}

impl EndpointIndex {
    pub fn build(doc: &ApiDocument, filter: &TagFilter, policy: CollisionPolicy) -> Result<Self> {
        let mut index = Self::default();
        let mut skipped = 0usize;

        for (path, method, operation, item) in doc.operations() {
            if operation.tags().is_empty() || !filter.matches(operation.tags()) {
                skipped += 1;
                continue;
            }

            let summary = operation
                .summary
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| AppError::MissingOperationName {
                    path: path.to_string(),
                    method: method.to_string(),
                })?;

            let derived = format_name(summary);
            let name = index.claim_name(derived, path, method, policy)?;

            tracing::debug!(function = %name, %method, path, "Indexed operation");

            index.insert(EndpointEntry {
                name,
                path: path.to_string(),
                method,
                operation: operation.clone(),
                shared_parameters: item.parameters.clone(),
            });
        }

        tracing::info!(
            indexed = index.len(),
            skipped,
            tag_filter = ?filter,
            "Endpoint index built"
        );

        Ok(index)
    }

    fn claim_name(
        &self,
        derived: String,
        path: &str,
        method: HttpMethod,
        policy: CollisionPolicy,
    ) -> Result<String> {
        let Some(existing) = self.get(&derived) else {
            return Ok(derived);
        };

        match policy {
            CollisionPolicy::Reject => Err(AppError::DuplicateOperationName {
                name: derived,
                first: existing.label(),
                second: format!("{} {}", method, path),
            }),
            CollisionPolicy::Suffix => {
                let name = (2usize..)
                    .map(|n| with_suffix(&derived, n))
                    .find(|candidate| !self.by_name.contains_key(candidate))
                    .unwrap_or_default();
                tracing::warn!(
                    derived = %derived,
                    assigned = %name,
                    first = %existing.label(),
                    second = %format!("{} {}", method, path),
                    "Function name collision disambiguated"
                );
                Ok(name)
            }
        }
    }

    fn insert(&mut self, entry: EndpointEntry) {
        self.by_name.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }

    pub fn get(&self, name: &str) -> Option<&EndpointEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `base_n`, with `base` shortened so the result stays within the name limit.
fn with_suffix(base: &str, n: usize) -> String {
    let suffix = format!("{}{}", NAME_SEPARATOR, n);
    let keep = MAX_FUNCTION_NAME_LENGTH.saturating_sub(suffix.chars().count());
    let mut name: String = base.chars().take(keep).collect();
    name.push_str(&suffix);
    name
}
