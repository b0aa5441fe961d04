//! Document Source boundary.
//!
//! Loads an OpenAPI 3.x document from a file or URL, inlines local `$ref`s
//! and validates the structure the indexer relies on.

pub mod loader;
pub mod source;
pub mod types;

pub use loader::dereference;
pub use source::DocumentSource;
pub use types::{
    ApiDocument, HttpMethod, Operation, Parameter, ParameterLocation, PathItem, RequestBody,
    Server,
};
