//! Axum route handlers for the Tailor API.

use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::ApiKey;
use crate::models::tailor::{Language, TailorRequest, TailorResult};
use crate::state::AppState;
use crate::tailor::prompts::build_tailor_prompt;

/// POST /api/tailor
///
/// Tailors the resume summary and picks relevant catalog ids for a job title.
/// The body is parsed by hand so that a missing or non-string `jobTitle` yields the
/// documented 400 instead of an extractor rejection.
pub async fn handle_tailor(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TailorResult>, AppError> {
    let request = parse_tailor_request(&body)?;

    let span = info_span!(
        "tailor",
        request_id = %Uuid::new_v4(),
        language = request.language.code()
    );
    tailor(&state, request).instrument(span).await.map(Json)
}

/// Any other method on /api/tailor.
pub async fn handle_method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn tailor(state: &AppState, request: TailorRequest) -> Result<TailorResult, AppError> {
    info!("Tailoring resume for {:?}", request.job_title);

    let prompt = build_tailor_prompt(&request.job_title, request.language, &state.catalog)?;
    debug!("Prompt built ({} chars)", prompt.len());

    let api_key = ApiKey::from_env(&state.config.api_key_env);
    let report = state.dispatcher.dispatch(&prompt, api_key.as_ref()).await?;

    let (result, _dropped) = state.catalog.retain_known(report.result);
    info!(
        "Tailored content ready from {} after {} call(s): {} experiences, {} skills",
        report.model,
        report.attempts,
        result.relevant_experience_ids.len(),
        result.relevant_skill_ids.len()
    );
    Ok(result)
}

/// `{ "jobTitle": string, "language"?: "en" | "fa" }`. An empty body counts as `{}`.
fn parse_tailor_request(body: &[u8]) -> Result<TailorRequest, AppError> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(body).map_err(|e| AppError::InvalidBody(e.to_string()))?
    };

    let job_title = value
        .get("jobTitle")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::MissingJobTitle)?;

    Ok(TailorRequest {
        job_title: job_title.to_string(),
        language: Language::from_code(value.get("language").and_then(Value::as_str)),
    })
}
