use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scoring::{LoanType, RecommendationBands};

/// Application configuration.
///
/// Example YAML:
/// ```yaml
/// default_loan_type: equipment
/// profiles_path: /srv/underwriting/profiles.json
/// log_level: info
/// recommendation:
///   approve_at: 80
///   review_at: 55
/// thresholds: /srv/underwriting/thresholds.yaml
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Loan type used until one is selected (default: general)
    #[serde(default)]
    pub default_loan_type: LoanType,

    /// Where saved scoring profiles live (default: ~/.config/loan-score/profiles.json)
    #[serde(default)]
    pub profiles_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set (default: warn)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Overall-score cut-offs for approve / review / decline
    #[serde(default)]
    pub recommendation: RecommendationBands,

    /// YAML threshold catalog replacing the built-in tables while no profile is loaded
    #[serde(default)]
    pub thresholds: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_loan_type: LoanType::General,
            profiles_path: None,
            log_level: default_log_level(),
            recommendation: RecommendationBands::default(),
            thresholds: None,
        }
    }
}
