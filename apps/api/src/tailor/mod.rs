// Resume tailoring: catalogs, prompt building and the HTTP handler.
// All Gemini calls go through llm_client.

pub mod catalog;
pub mod handlers;
pub mod prompts;
