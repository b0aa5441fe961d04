use crate::document::{ApiDocument, DocumentSource};
use crate::engine::{
    resolve, resolve_message, translate_all, AssistantMessage, CollisionPolicy, EndpointIndex,
    FunctionDescriptor, RequestBuilder, RequestDescriptor, ResolvedCall, TagFilter,
};
use crate::error::Result;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// System prompt that steers the model towards function calls and away from
/// implementation details in user-facing replies.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the front end for an API back end. Interact with the user and when there is a good option for a function to use, please write the function call for that. Please ensure that the responses provided to the user are abstracted from the underlying implementation and technical jargon. Describe functionalities in a user-friendly manner with non-technical speech without code details.";

/// A loaded API exposed as a chat function set.
///
/// Holds the endpoint index, the descriptors derived from it and the request
/// builder bound to the document's base URL. Immutable once built; share it
/// behind an `Arc` for concurrent resolution.
#[derive(Debug, Clone)]
pub struct Chatterbox {
    index: EndpointIndex,
    functions: Vec<FunctionDescriptor>,
    builder: RequestBuilder,
    fingerprint: String,
}

impl Chatterbox {
    /// Index, translate and bind the base URL of an already validated document.
    pub fn from_document(
        document: &ApiDocument,
        filter: &TagFilter,
        policy: CollisionPolicy,
    ) -> Result<Self> {
        let index = EndpointIndex::build(document, filter, policy)?;
        let functions = translate_all(&index)?;
        let builder = RequestBuilder::new(document.base_url().map(str::to_string));
        let fingerprint = fingerprint(builder.base_url(), &functions)?;

        tracing::info!(
            functions = functions.len(),
            base_url = builder.base_url().unwrap_or_default(),
            fingerprint = %fingerprint,
            "Function set ready"
        );

        Ok(Self {
            index,
            functions,
            builder,
            fingerprint,
        })
    }

    /// Load from a file or URL, then build.
    pub async fn load(
        source: &DocumentSource,
        filter: &TagFilter,
        policy: CollisionPolicy,
        fetch_timeout: Duration,
    ) -> Result<Self> {
        let document = source.load(fetch_timeout).await?;
        Self::from_document(&document, filter, policy)
    }

    /// Replace the document's base URL, e.g. to target a staging server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        self.builder = RequestBuilder::new(Some(base_url.into()));
        self.fingerprint = fingerprint(self.builder.base_url(), &self.functions)?;
        Ok(self)
    }

    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn endpoints(&self) -> &EndpointIndex {
        &self.index
    }

    pub fn base_url(&self) -> Option<&str> {
        self.builder.base_url()
    }

    pub fn system_prompt(&self) -> &'static str {
        DEFAULT_SYSTEM_PROMPT
    }

    /// SHA-256 over the base URL and function set. Changes whenever the
    /// descriptors a client cached would be stale.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn resolve(&self, name: &str, arguments: &str) -> Result<ResolvedCall<'_>> {
        resolve(&self.index, name, arguments)
    }

    /// `Ok(None)` when the message is plain text.
    pub fn parse_message(&self, message: &AssistantMessage) -> Result<Option<ResolvedCall<'_>>> {
        resolve_message(&self.index, message)
    }

    pub fn build_request(&self, call: &ResolvedCall<'_>) -> Result<RequestDescriptor> {
        self.builder.build(call)
    }

    /// Resolve and build in one step.
    pub fn to_request(&self, message: &AssistantMessage) -> Result<Option<RequestDescriptor>> {
        self.parse_message(message)?
            .map(|call| self.build_request(&call))
            .transpose()
    }
}

fn fingerprint(base_url: Option<&str>, functions: &[FunctionDescriptor]) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(base_url.unwrap_or_default().as_bytes());
    hasher.update(b"\n");
    hasher.update(serde_json::to_vec(functions)?);
    Ok(hex::encode(hasher.finalize()))
}
