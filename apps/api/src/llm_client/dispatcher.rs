//! Retrying dispatcher — walks the ordered model list with a bounded attempt budget.
//!
//! Per model: up to `max_attempts` tries. Success returns at once. A fatal failure
//! abandons the model without further attempts. A retryable failure sleeps for the
//! server hint (or exponential backoff + jitter) and tries the same model again.
//! When every model is exhausted the last remembered failure is returned.
//!
//! Models and attempts run strictly in sequence; nothing is raced in parallel.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{ApiKey, LlmError, ModelInvoker};
use crate::models::tailor::TailorResult;

/// Classified result of a single model call.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(TailorResult),
    RetryableFailure(LlmError),
    FatalFailure(LlmError),
}

impl From<Result<TailorResult, LlmError>> for AttemptOutcome {
    fn from(result: Result<TailorResult, LlmError>) -> Self {
        match result {
            Ok(content) => AttemptOutcome::Success(content),
            Err(e) if e.is_retryable() => AttemptOutcome::RetryableFailure(e),
            Err(e) => AttemptOutcome::FatalFailure(e),
        }
    }
}

/// A successful dispatch and how it was reached.
#[derive(Debug)]
pub struct DispatchReport {
    pub result: TailorResult,
    pub model: String,
    /// Total model calls made across all models, including the successful one.
    pub attempts: u32,
}

#[derive(Clone)]
pub struct RetryingDispatcher {
    invoker: Arc<dyn ModelInvoker>,
    models: Vec<String>,
    policy: RetryPolicy,
    deadline: Option<Duration>,
}

impl RetryingDispatcher {
    pub fn new(invoker: Arc<dyn ModelInvoker>, models: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            invoker,
            models,
            policy,
            deadline: None,
        }
    }

    /// Caps the wall-clock time of one whole dispatch, sleeps included.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub async fn dispatch(
        &self,
        prompt: &str,
        api_key: Option<&ApiKey>,
    ) -> Result<DispatchReport, LlmError> {
        match self.deadline {
            Some(limit) => tokio::time::timeout(limit, self.run(prompt, api_key))
                .await
                .map_err(|_| {
                    warn!("Dispatch abandoned after the {}s deadline", limit.as_secs());
                    LlmError::DeadlineExceeded(limit)
                })?,
            None => self.run(prompt, api_key).await,
        }
    }

    async fn run(&self, prompt: &str, api_key: Option<&ApiKey>) -> Result<DispatchReport, LlmError> {
        let mut last_error: Option<LlmError> = None;
        let mut attempts = 0u32;

        for model in &self.models {
            for attempt in 0..self.policy.max_attempts {
                attempts += 1;

                match AttemptOutcome::from(self.invoker.invoke(model, prompt, api_key).await) {
                    AttemptOutcome::Success(result) => {
                        info!(
                            "Model {model} succeeded on attempt {} ({attempts} calls in total)",
                            attempt + 1
                        );
                        return Ok(DispatchReport {
                            result,
                            model: model.clone(),
                            attempts,
                        });
                    }
                    AttemptOutcome::FatalFailure(e) => {
                        warn!("Model {model} failed permanently, moving on: {e}");
                        last_error = Some(e);
                        break;
                    }
                    AttemptOutcome::RetryableFailure(e) => {
                        if attempt + 1 >= self.policy.max_attempts {
                            warn!(
                                "Model {model} still failing after {} attempts, moving on: {e}",
                                self.policy.max_attempts
                            );
                            last_error = Some(e);
                            break;
                        }

                        let delay = self.policy.backoff_delay(attempt, e.retry_after());
                        warn!(
                            "Model {model} attempt {}/{} failed, retrying after {}ms: {e}",
                            attempt + 1,
                            self.policy.max_attempts,
                            delay.as_millis()
                        );
                        last_error = Some(e);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::NoModelsConfigured))
    }
}
