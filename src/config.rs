use crate::document::DocumentSource;
use crate::engine::{CollisionPolicy, TagFilter};
use anyhow::Context;
use std::env;
use std::time::Duration;

pub struct Config {
    pub host: String,
    pub port: u16,
    /// Where to load the OpenAPI document from (file path or http(s) URL).
    pub document_source: DocumentSource,
    /// Tags whose operations are exposed. Empty exposes every tagged operation.
    pub tag_filter: TagFilter,
    /// Overrides `servers[0].url` when set.
    pub base_url: Option<String>,
    pub collision_policy: CollisionPolicy,
    pub fetch_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    /// Largest accepted `function_call.arguments` string, in bytes.
    pub max_argument_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// `DOCUMENT_SOURCE` is the only required variable.
    pub fn from_env() -> anyhow::Result<Self> {
        let document_source = env::var("DOCUMENT_SOURCE")
            .context("DOCUMENT_SOURCE must be set to an OpenAPI document path or URL")?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            document_source: DocumentSource::parse(&document_source),
            tag_filter: TagFilter::parse(&env::var("TAG_FILTER").unwrap_or_default()),
            base_url: env::var("BASE_URL").ok().filter(|u| !u.trim().is_empty()),
            collision_policy: env::var("COLLISION_POLICY")
                .unwrap_or_default()
                .parse::<CollisionPolicy>()
                .map_err(anyhow::Error::msg)?,
            fetch_timeout_secs: env::var("FETCH_TIMEOUT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            max_argument_bytes: env::var("MAX_ARGUMENT_BYTES")
                .unwrap_or_else(|_| "65536".to_string())
                .parse()?,
        })
    }

    /// Configuration for a given source with every other setting at its default.
    pub fn with_source(document_source: DocumentSource) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            document_source,
            tag_filter: TagFilter::default(),
            base_url: None,
            collision_policy: CollisionPolicy::default(),
            fetch_timeout_secs: 10,
            shutdown_timeout_secs: 5,
            max_argument_bytes: 65536,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
