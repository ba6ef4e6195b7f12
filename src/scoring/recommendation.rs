use serde::{Deserialize, Serialize};

/// Overall-score cut-offs for the underwriting recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendationBands {
    #[serde(default = "default_approve_at")]
    pub approve_at: u8,
    #[serde(default = "default_review_at")]
    pub review_at: u8,
}

fn default_approve_at() -> u8 {
    75
}

fn default_review_at() -> u8 {
    50
}

impl Default for RecommendationBands {
    fn default() -> Self {
        Self {
            approve_at: default_approve_at(),
            review_at: default_review_at(),
        }
    }
}

/// Underwriting recommendation derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    Review,
    Decline,
    InsufficientData,
}

impl Recommendation {
    pub fn from_overall(overall: Option<u8>, bands: &RecommendationBands) -> Self {
        match overall {
            None => Recommendation::InsufficientData,
            Some(score) if score >= bands.approve_at => Recommendation::Approve,
            Some(score) if score >= bands.review_at => Recommendation::Review,
            Some(_) => Recommendation::Decline,
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Recommendation::Approve => "approve",
            Recommendation::Review => "manual review",
            Recommendation::Decline => "decline",
            Recommendation::InsufficientData => "insufficient data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let bands = RecommendationBands::default();
        assert_eq!(Recommendation::from_overall(Some(75), &bands), Recommendation::Approve);
        assert_eq!(Recommendation::from_overall(Some(74), &bands), Recommendation::Review);
        assert_eq!(Recommendation::from_overall(Some(50), &bands), Recommendation::Review);
        assert_eq!(Recommendation::from_overall(Some(49), &bands), Recommendation::Decline);
        assert_eq!(
            Recommendation::from_overall(None, &bands),
            Recommendation::InsufficientData
        );
    }

    #[test]
    fn test_partial_bands_yaml() {
        let bands: RecommendationBands = serde_saphyr::from_str("approve_at: 80").unwrap();
        assert_eq!(bands.approve_at, 80);
        assert_eq!(bands.review_at, 50);
    }
}
