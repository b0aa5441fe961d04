//! Where an API document comes from: a local file or an HTTP(S) URL.

use crate::document::types::ApiDocument;
use crate::error::{AppError, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    File(PathBuf),
    Url(String),
}

impl DocumentSource {
    /// `http://` and `https://` prefixes select a URL source, anything else is a file path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }

    /// Read or fetch the document text, then parse and validate it.
    ///
    /// This is the only asynchronous step; indexing starts only after it
    /// returns successfully.
    pub async fn load(&self, fetch_timeout: Duration) -> Result<ApiDocument> {
        let start = std::time::Instant::now();
        let text = match self {
            Self::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| self.fetch_error(e.to_string()))?
            }
            Self::Url(url) => self.fetch(url, fetch_timeout).await?,
        };

        let document = ApiDocument::from_json(&text)?;
        tracing::info!(
            source = %self,
            bytes = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "API document loaded"
        );
        Ok(document)
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chatterbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| self.fetch_error(e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| self.fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.fetch_error(format!("server responded with {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| self.fetch_error(e.to_string()))
    }

    fn fetch_error(&self, reason: String) -> AppError {
        AppError::DocumentFetch {
            source_name: self.to_string(),
            reason,
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}
