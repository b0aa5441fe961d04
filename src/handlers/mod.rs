pub mod functions;
pub mod health;
pub mod resolve;

pub use functions::functions_handler;
pub use health::{health_handler, ready_handler};
pub use resolve::resolve_handler;
