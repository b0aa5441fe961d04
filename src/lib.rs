//! Chatterbox - OpenAPI to LLM function calling bridge
//!
//! Turns a validated OpenAPI document into function descriptors a chat model
//! can call, and maps the model's function calls back into transport-agnostic
//! HTTP request descriptors.

pub mod chatterbox;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod state;

// Re-export key types for convenience
pub use chatterbox::{Chatterbox, DEFAULT_SYSTEM_PROMPT};
pub use config::Config;
pub use document::{ApiDocument, DocumentSource, HttpMethod};
pub use engine::{
    AssistantMessage, CollisionPolicy, EndpointEntry, EndpointIndex, FunctionCall,
    FunctionDescriptor, RequestBuilder, RequestDescriptor, ResolvedCall, TagFilter,
};
pub use error::{AppError, Result};
pub use handlers::{functions_handler, health_handler, ready_handler, resolve_handler};
pub use state::AppState;
