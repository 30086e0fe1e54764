// Prompt template for resume tailoring.
// Placeholders are filled in a single pass over the template, so neither the job
// title nor catalog text is ever scanned for placeholders.

use crate::errors::AppError;
use crate::models::tailor::Language;
use crate::tailor::catalog::{Catalog, CatalogItem};

/// Tone directive shared by every tailoring prompt.
pub const TONE_INSTRUCTION: &str = "\
    **Tone of Voice Instructions:** The user's core values are teamwork and authenticity. \
    The generated text must reflect this. Use a humble yet confident, action-oriented, and \
    team-focused tone (\"we\" for team achievements). Avoid buzzwords, exaggeration, or \
    language that sounds like a \"lone star\". The summary should be grounded in the provided facts.";

/// Tailoring prompt template.
/// Replace: {language_instruction}, {tone_instruction}, {highlights}, {experiences},
///          {skills}, {summary_language}, {job_title}
pub const TAILOR_PROMPT_TEMPLATE: &str = r#"Analyze the following resume content and tailor it for the job title: "{job_title}".

{language_instruction}

{tone_instruction}

1.  **Rewrite the Summary:** Create a professional summary (3-4 sentences) that highlights the most relevant aspects for this specific role, while adhering to the specified tone.
       - Look at everything in the resume and use all of the information it offers, including every role listed below.{highlights}
       - Every time you rewrite the summary, mention the resume owner's ability to use generative AI and their fast learning.
2.  **Select Relevant Experiences:** From the list of experiences below, identify the IDs of the bullet points that are most relevant to the job title. Return only the IDs.
3.  **Select Relevant Skills:** From the list of skills below, identify the IDs of the skills that are most relevant. Return only the IDs.

**Experiences:**
{experiences}

**Skills:**
{skills}

The "summary" field must be written entirely in {summary_language} and follow the tone instructions above. Do not translate or modify the experience or skill IDs; return them exactly as provided.

Return a JSON object with three keys: "summary", "relevant_experience_ids", and "relevant_skill_ids"."#;

/// Builds the tailoring prompt. Pure: same inputs, same output.
pub fn build_tailor_prompt(
    job_title: &str,
    language: Language,
    catalog: &Catalog,
) -> Result<String, AppError> {
    if job_title.trim().is_empty() {
        return Err(AppError::MissingJobTitle);
    }

    let highlights = render_highlights(&catalog.highlights);
    let experiences = render_items(&catalog.experiences);
    let skills = render_items(&catalog.skills);

    Ok(fill_template(
        TAILOR_PROMPT_TEMPLATE,
        &[
            ("language_instruction", language.instruction()),
            ("tone_instruction", TONE_INSTRUCTION),
            ("highlights", highlights.as_str()),
            ("experiences", experiences.as_str()),
            ("skills", skills.as_str()),
            ("summary_language", language.display_name()),
            ("job_title", job_title),
        ],
    ))
}

/// Substitutes `{name}` placeholders found in `template`. Substituted values are
/// copied as-is; unknown `{...}` sequences are left untouched.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Extra emphasis appended to the "use everything" instruction.
fn render_highlights(highlights: &[String]) -> String {
    match highlights {
        [] => String::new(),
        [only] => format!(" Make sure to draw on {only}."),
        [init @ .., last] => format!(" Make sure to draw on {} and {last}.", init.join(", ")),
    }
}

/// One `[id: ...] text` line per item.
fn render_items(items: &[CatalogItem]) -> String {
    items
        .iter()
        .map(|item| format!("[id: {}] {}", item.id, item.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_job_title_verbatim() {
        let prompt = build_tailor_prompt("Community Manager", Language::En, &Catalog::builtin()).unwrap();
        assert!(prompt.contains(r#"for the job title: "Community Manager"."#));
    }

    #[test]
    fn test_prompt_lists_every_catalog_id() {
        let catalog = Catalog::builtin();
        for language in [Language::En, Language::Fa] {
            let prompt = build_tailor_prompt("Growth Lead", language, &catalog).unwrap();
            for item in catalog.experiences.iter().chain(&catalog.skills) {
                assert!(
                    prompt.contains(&format!("[id: {}] {}", item.id, item.text)),
                    "missing {}",
                    item.id
                );
            }
        }
    }

    #[test]
    fn test_english_prompt_instructions() {
        let prompt = build_tailor_prompt("Growth Lead", Language::En, &Catalog::builtin()).unwrap();
        assert!(prompt.contains(Language::En.instruction()));
        assert!(prompt.contains("must be written entirely in English"));
        assert!(!prompt.contains("Persian"));
    }

    #[test]
    fn test_persian_prompt_instructions() {
        let prompt = build_tailor_prompt("Growth Lead", Language::Fa, &Catalog::builtin()).unwrap();
        assert!(prompt.contains(Language::Fa.instruction()));
        assert!(prompt.contains("must be written entirely in Persian (Farsi)"));
        assert!(prompt.contains("Do not translate or modify the experience or skill IDs"));
    }

    #[test]
    fn test_prompt_carries_tone_ai_fluency_and_output_contract() {
        let prompt = build_tailor_prompt("Designer", Language::En, &Catalog::builtin()).unwrap();
        assert!(prompt.contains("team-focused tone"));
        assert!(prompt.contains("generative AI"));
        assert!(prompt.contains("fast learning"));
        assert!(prompt.contains(
            r#""summary", "relevant_experience_ids", and "relevant_skill_ids""#
        ));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let catalog = Catalog::builtin();
        let first = build_tailor_prompt("Product Owner", Language::Fa, &catalog).unwrap();
        let second = build_tailor_prompt("Product Owner", Language::Fa, &catalog).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_placeholder_like_job_title_is_not_expanded() {
        let prompt = build_tailor_prompt("{skills} Lead", Language::En, &Catalog::builtin()).unwrap();
        assert!(prompt.contains(r#"job title: "{skills} Lead""#));
    }

    #[test]
    fn test_prompt_uses_injected_catalog() {
        let catalog = Catalog {
            experiences: vec![CatalogItem {
                id: "exp-x".to_string(),
                text: "Ran the Rust meetup".to_string(),
            }],
            skills: vec![],
            highlights: vec![],
        };
        let prompt = build_tailor_prompt("Organizer", Language::En, &catalog).unwrap();
        assert!(prompt.contains("[id: exp-x] Ran the Rust meetup"));
        assert!(!prompt.contains("exp-mentor-1"));
        assert!(!prompt.contains("Make sure to draw on"));
    }

    #[test]
    fn test_catalog_text_with_braces_is_listed_verbatim() {
        let catalog = Catalog {
            experiences: vec![CatalogItem {
                id: "exp-1".to_string(),
                text: "Led {job_title} hiring in {summary_language}".to_string(),
            }],
            skills: vec![CatalogItem {
                id: "skill-1".to_string(),
                text: "Templating with {skills} and {".to_string(),
            }],
            highlights: vec![],
        };
        let prompt = build_tailor_prompt("Designer", Language::En, &catalog).unwrap();
        assert!(prompt.contains("[id: exp-1] Led {job_title} hiring in {summary_language}"));
        assert!(prompt.contains("[id: skill-1] Templating with {skills} and {"));
        assert!(prompt.contains(r#"job title: "Designer"."#));
    }

    #[test]
    fn test_builtin_prompt_highlights_nasiba_and_magazine() {
        let prompt = build_tailor_prompt("Growth Lead", Language::En, &Catalog::builtin()).unwrap();
        assert!(prompt.contains(
            "Make sure to draw on the Nasiba experience and the New-Samaneh magazine."
        ));
    }

    #[test]
    fn test_fill_template_leaves_unknown_placeholders() {
        let filled = fill_template("{a} {b} {a", &[("a", "{b}")]);
        assert_eq!(filled, "{b} {b} {a");
    }

    #[test]
    fn test_job_title_whitespace_is_kept() {
        let prompt = build_tailor_prompt("  Data Analyst ", Language::En, &Catalog::builtin()).unwrap();
        assert!(prompt.contains(r#"job title: "  Data Analyst "."#));
    }

    #[test]
    fn test_empty_job_title_is_rejected() {
        assert!(matches!(
            build_tailor_prompt("   ", Language::En, &Catalog::builtin()),
            Err(AppError::MissingJobTitle)
        ));
    }
}
