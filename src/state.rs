use crate::chatterbox::Chatterbox;
use crate::config::Config;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Application state shared across all request handlers.
/// The function set is read-only after load, so handlers share it without locking.
pub struct AppState {
    pub chatterbox: Arc<Chatterbox>,
    /// Flag indicating the service is ready (document loaded and indexed)
    pub ready: AtomicBool,
    pub config: Arc<Config>,
}

impl AppState {
    /// Load the configured document and build the function set.
    ///
    /// Indexing starts only after the document has been fetched and
    /// validated; any failure aborts startup.
    pub async fn new(config: Config) -> Result<Self> {
        tracing::info!(source = %config.document_source, "Loading API document...");

        let mut chatterbox = Chatterbox::load(
            &config.document_source,
            &config.tag_filter,
            config.collision_policy,
            config.fetch_timeout(),
        )
        .await?;

        if let Some(base_url) = &config.base_url {
            tracing::info!(base_url = %base_url, "Overriding document base URL");
            chatterbox = chatterbox.with_base_url(base_url.clone())?;
        }

        let state = Self::with_chatterbox(chatterbox, config);
        state.warmup()?;
        Ok(state)
    }

    /// Wrap an already built function set. The state is not ready until
    /// [`AppState::warmup`] succeeds.
    pub fn with_chatterbox(chatterbox: Chatterbox, config: Config) -> Self {
        metrics::gauge!("indexed_functions").set(chatterbox.functions().len() as f64);

        Self {
            chatterbox: Arc::new(chatterbox),
            ready: AtomicBool::new(false),
            config: Arc::new(config),
        }
    }

    /// Resolve and build an argument-less call for every function, then mark
    /// the service ready. Fails when a function cannot be turned into a
    /// request, e.g. because no base URL is known.
    pub fn warmup(&self) -> Result<()> {
        tracing::info!("Running function set warmup...");

        for function in self.chatterbox.functions() {
            let call = self.chatterbox.resolve(&function.name, "{}")?;
            self.chatterbox.build_request(&call)?;
        }

        self.ready.store(true, Ordering::SeqCst);
        tracing::info!(
            functions = self.chatterbox.functions().len(),
            "Function set warmup completed successfully"
        );
        Ok(())
    }

    /// Check if the service is ready to handle requests.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
