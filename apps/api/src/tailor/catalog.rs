//! Experience and skill catalogs — the fixed resume dataset the prompt is built from
//! and the universe of identifiers the model may return.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::tailor::TailorResult;

/// One catalog line, tagged with a stable identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub text: String,
}

impl CatalogItem {
    fn new(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub experiences: Vec<CatalogItem>,
    pub skills: Vec<CatalogItem>,
    /// Parts of the resume the summary should always draw on.
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl Catalog {
    /// The built-in resume dataset.
    pub fn builtin() -> Self {
        Self {
            experiences: vec![
                CatalogItem::new("exp-mentor-1", "Supported members in growing toward future team; continued informal mentoring afterward."),
                CatalogItem::new("exp-mentor-2", "Still mentor team in events like 'Exir Job Expo' and 'From Konkor to Job' (with guests like Amin Aramesh and Mohammad Hadi Shirani)."),
                CatalogItem::new("exp-director-1", "Rebuilt and led a student Magazine from zero, growing it into an active community with multiple departments with more than 20 active members."),
                CatalogItem::new("exp-director-2", "Founded 'NoPa' podcast and producing over 22 episodes and more than 4000 times listened (organic growth), organized key events, including 'A bridge to the future'."),
                CatalogItem::new("exp-director-3", "Worked with Tapsell to provide free training access and invited their CMO to join an on-campus panel."),
                CatalogItem::new("exp-director-4", "Played a supporting role in creating a shared team culture and longer-term commitment."),
                CatalogItem::new("exp-associate-1", "Taught myself GA4 & GTM; used them to help the team make sense of key metrics."),
                CatalogItem::new("exp-associate-2", "Initiated and executed SMS campaigns and basic content production."),
                CatalogItem::new("exp-associate-3", "Joined business team to talk to merchants and support outreach."),
                CatalogItem::new("exp-associate-4", "Represented Nasiba in Iran Fintech Association."),
                CatalogItem::new("exp-associate-5", "Brought in three interns via university network; facilitated external collaborations."),
            ],
            skills: vec![
                CatalogItem::new("skill-comm-1", "Working Across Functional Roles"),
                CatalogItem::new("skill-comm-2", "Negotiation & Partnership Management"),
                CatalogItem::new("skill-comm-3", "Public Speaking and Group Facilitation"),
                CatalogItem::new("skill-comm-4", "Storytelling & Internal Motivation"),
                CatalogItem::new("skill-lead-1", "Team Building from Scratch"),
                CatalogItem::new("skill-lead-2", "Talent Identification & Mentorship"),
                CatalogItem::new("skill-lead-3", "Facilitating Group Progress in Uncertain Situations"),
                CatalogItem::new("skill-lead-4", "Listening and Conflict Navigation"),
                CatalogItem::new("skill-lead-5", "Creating Shared Sense of Ownership"),
                CatalogItem::new("skill-tech-1", "GA4 & GTM"),
                CatalogItem::new("skill-tech-2", "Leveraging AI tools for efficiency"),
                CatalogItem::new("skill-tech-3", "Trello"),
                CatalogItem::new("skill-tech-4", "Excel (PivotTables, Lookups) & Power BI"),
                CatalogItem::new("skill-tech-5", "Microsoft Office, Canva"),
            ],
            highlights: vec![
                "the Nasiba experience".to_string(),
                "the New-Samaneh magazine".to_string(),
            ],
        }
    }

    /// Loads `{ "experiences": [...], "skills": [...] }` from disk and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&raw)
            .with_context(|| format!("Catalog file {} is not valid JSON", path.display()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Rejects empty or duplicate identifiers across both catalogs.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for item in self.experiences.iter().chain(&self.skills) {
            if item.id.trim().is_empty() {
                bail!("Catalog contains an item with an empty id");
            }
            if !seen.insert(item.id.as_str()) {
                bail!("Catalog id '{}' appears more than once", item.id);
            }
        }
        Ok(())
    }

    pub fn contains_experience(&self, id: &str) -> bool {
        self.experiences.iter().any(|e| e.id == id)
    }

    pub fn contains_skill(&self, id: &str) -> bool {
        self.skills.iter().any(|s| s.id == id)
    }

    /// Drops identifiers the catalogs do not know (and repeats), keeping order.
    /// Returns the cleaned result and the dropped identifiers.
    pub fn retain_known(&self, result: TailorResult) -> (TailorResult, Vec<String>) {
        let mut dropped = Vec::new();
        let relevant_experience_ids =
            keep_known(result.relevant_experience_ids, |id| self.contains_experience(id), &mut dropped);
        let relevant_skill_ids =
            keep_known(result.relevant_skill_ids, |id| self.contains_skill(id), &mut dropped);

        if !dropped.is_empty() {
            warn!("Model returned unknown catalog ids, dropped: {dropped:?}");
        }

        (
            TailorResult {
                summary: result.summary,
                relevant_experience_ids,
                relevant_skill_ids,
            },
            dropped,
        )
    }
}

fn keep_known(
    ids: Vec<String>,
    known: impl Fn(&str) -> bool,
    dropped: &mut Vec<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(ids.len());
    for id in ids {
        if !known(id.as_str()) {
            dropped.push(id);
        } else if seen.insert(id.clone()) {
            kept.push(id);
        }
    }
    kept
}
