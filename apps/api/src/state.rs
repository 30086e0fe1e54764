use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::dispatcher::RetryingDispatcher;
use crate::llm_client::GeminiInvoker;
use crate::tailor::catalog::Catalog;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything in here is read-only; each request runs its own dispatch.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: RetryingDispatcher,
    /// Resume catalogs used to build prompts and filter returned ids.
    pub catalog: Arc<Catalog>,
    pub config: Config,
}

impl AppState {
    /// Wires the Gemini invoker and the retrying dispatcher from configuration.
    pub fn new(config: Config, catalog: Arc<Catalog>) -> Self {
        let invoker = GeminiInvoker::new(
            config.api_base.clone(),
            config.api_key_env.clone(),
            config.upstream_timeout,
        );
        let dispatcher =
            RetryingDispatcher::new(Arc::new(invoker), config.models.clone(), config.retry.clone())
                .with_deadline(config.request_timeout);

        Self {
            dispatcher,
            catalog,
            config,
        }
    }
}
