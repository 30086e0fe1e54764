//! Gemini `generateContent` wire types, limited to what the tailor call uses.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<'a> {
    pub contents: Vec<Content<'a>>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content<'a> {
    pub role: &'a str,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Part<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: &'static str,
    pub response_schema: Value,
}

impl<'a> GenerateContentRequest<'a> {
    /// A single user turn constrained to the three-key tailor JSON object.
    pub fn structured(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: tailor_response_schema(),
            },
        }
    }
}

/// Response schema for `summary`, `relevant_experience_ids` and `relevant_skill_ids`.
pub fn tailor_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "relevant_experience_ids": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "relevant_skill_ids": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if present.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Google API error envelope: `{ "error": { "code", "message", "status", "details" } }`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<Value>,
}

impl ApiErrorEnvelope {
    /// `retryDelay` of the first `google.rpc.RetryInfo` detail, e.g. `"13s"`.
    pub fn retry_delay(&self) -> Option<&str> {
        self.error
            .details
            .iter()
            .filter(|d| {
                d.get("@type")
                    .and_then(Value::as_str)
                    .map_or(true, |t| t.ends_with("RetryInfo"))
            })
            .find_map(|d| d.get("retryDelay").and_then(Value::as_str))
    }
}
