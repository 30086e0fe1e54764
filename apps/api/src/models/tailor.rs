use serde::{Deserialize, Serialize};

/// Response language requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    En,
    Fa,
}

impl Language {
    /// Only `"fa"` selects Persian; anything else, including absence, is English.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("fa") => Language::Fa,
            _ => Language::En,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fa => "fa",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fa => "Persian (Farsi)",
        }
    }

    /// Response-language instruction embedded in the prompt.
    pub fn instruction(self) -> &'static str {
        match self {
            Language::En => "Respond in English. Keep proper nouns unchanged.",
            Language::Fa => {
                "Respond in Persian (Farsi). Translate all narrative content into fluent, \
                professional Persian while keeping proper nouns (company, product, tool names) \
                in their original form."
            }
        }
    }
}

/// A validated inbound tailor call.
#[derive(Debug, Clone, PartialEq)]
pub struct TailorRequest {
    pub job_title: String,
    pub language: Language,
}

/// Structured content returned by the model and, after catalog filtering, to the caller.
/// Field names are part of the public HTTP contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailorResult {
    pub summary: String,
    #[serde(default)]
    pub relevant_experience_ids: Vec<String>,
    #[serde(default)]
    pub relevant_skill_ids: Vec<String>,
}
