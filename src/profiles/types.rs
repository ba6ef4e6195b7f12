use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{ThresholdCatalog, Weights};

/// A named, persisted bundle of weights and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub weights: Weights,
    pub thresholds: ThresholdCatalog,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_default: bool,
}

/// The caller-supplied part of a profile; ids and timestamps are assigned on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub weights: Weights,
    #[serde(default = "ThresholdCatalog::builtin")]
    pub thresholds: ThresholdCatalog,
    #[serde(default)]
    pub is_default: bool,
}

impl ProfileDraft {
    pub fn new(name: &str, weights: Weights) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            weights,
            thresholds: ThresholdCatalog::builtin(),
            is_default: false,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn thresholds(mut self, thresholds: ThresholdCatalog) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Lowercase, hyphen-separated id derived from a profile name.
pub fn slugify(name: &str) -> String {
    let mut slug = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    let trimmed = slug.trim_matches('-').to_string();
    if trimmed.is_empty() {
        "profile".to_string()
    } else {
        trimmed
    }
}

/// First id derived from `name` that `taken` does not already contain.
pub fn unique_id<'a>(name: &str, taken: impl Iterator<Item = &'a str> + Clone) -> String {
    let base = slugify(name);
    let is_taken = |candidate: &str| taken.clone().any(|id| id == candidate);

    if !is_taken(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !is_taken(candidate.as_str()))
        .unwrap_or(base)
}
