//! The bidirectional translation engine.
//!
//! `index` and `translate` run once per loaded document and produce the
//! function set shown to the model; `resolve` and `request` run once per
//! model invocation against the same read-only index.

pub mod index;
pub mod request;
pub mod resolve;
pub mod translate;

pub use index::{format_name, CollisionPolicy, EndpointEntry, EndpointIndex, TagFilter};
pub use request::{PathTemplate, RequestBuilder, RequestDescriptor};
pub use resolve::{resolve, resolve_message, AssistantMessage, FunctionCall, ResolvedCall};
pub use translate::{translate, translate_all, FunctionDescriptor, ParameterSchema, PropertySchema};
