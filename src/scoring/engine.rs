use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use super::evaluator::{evaluate_parameter, ParameterResult};
use super::recommendation::{Recommendation, RecommendationBands};
use super::thresholds::ThresholdCatalog;
use super::weights::{CategoryId, LoanType, Weights};
use crate::borrower::{BorrowerData, CategoryInput};

/// Where the active weights came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigSource {
    Preset { loan_type: LoanType },
    Profile { id: String, name: String },
}

/// Immutable configuration snapshot handed to [`calculate_scores`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveConfig {
    pub source: ConfigSource,
    pub weights: Weights,
    pub thresholds: ThresholdCatalog,
}

/// Score breakdown for one enabled category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub traditional_mapping: String,
    pub weight: f64,
    pub parameters: Vec<ParameterResult>,
    pub raw_score: u32,
    pub max_score: u32,
    /// `None` when the category has no parameters to score.
    pub score: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub borrower_id: String,
    pub borrower_name: String,
    pub loan_type: LoanType,
    pub source: ConfigSource,
    pub categories: Vec<CategoryScore>,
    /// Sum of raw points over scored categories.
    pub total_score: u32,
    pub max_possible_score: u32,
    /// `None` when no enabled, scored category carries weight.
    pub overall: Option<u8>,
}

/// Flat output contract: `{ <category>: 0-100 | null, overall: 0-100 | null }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMap {
    #[serde(flatten)]
    pub categories: BTreeMap<String, Option<u8>>,
    pub overall: Option<u8>,
}

impl ScoreReport {
    pub fn score_map(&self) -> ScoreMap {
        ScoreMap {
            categories: self
                .categories
                .iter()
                .map(|c| (c.id.as_str().to_string(), c.score))
                .collect(),
            overall: self.overall,
        }
    }

    pub fn category(&self, id: CategoryId) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Every parameter scored by fallback rather than a rule match.
    pub fn defaulted_parameters(&self) -> impl Iterator<Item = (CategoryId, &ParameterResult)> {
        self.categories.iter().flat_map(|category| {
            category
                .parameters
                .iter()
                .filter(|p| p.is_defaulted())
                .map(move |p| (category.id, p))
        })
    }

    pub fn recommendation(&self, bands: &RecommendationBands) -> Recommendation {
        Recommendation::from_overall(self.overall, bands)
    }
}

/// Score a borrower under an explicit configuration.
///
/// Pure: no I/O, no shared state, and the input is never modified.
pub fn calculate_scores(borrower: &BorrowerData, config: &ActiveConfig) -> ScoreReport {
    let categories: Vec<CategoryScore> = CategoryId::ALL
        .into_iter()
        .filter_map(|id| {
            let input = borrower.categories.get(&id)?;
            if !input.enabled {
                return None;
            }
            let mut category = score_category(id, input, &config.thresholds);
            category.weight = config.weights.get(id);
            Some(category)
        })
        .collect();

    let scored = categories.iter().filter(|c| c.score.is_some());
    let total_score = scored.clone().map(|c| c.raw_score).sum();
    let max_possible_score = scored.map(|c| c.max_score).sum();

    let overall = aggregate_overall(&categories);
    if overall.is_none() {
        warn!(
            borrower = %borrower.id,
            "no enabled category carries weight; overall score undefined"
        );
    }

    ScoreReport {
        borrower_id: borrower.id.clone(),
        borrower_name: borrower.name.clone(),
        loan_type: borrower.loan_type,
        source: config.source.clone(),
        categories,
        total_score,
        max_possible_score,
        overall,
    }
}

/// Evaluate every parameter of one category and normalize to 0-100.
///
/// The parameter set is the catalog's parameters for the category plus any
/// extra ids the input supplies. The returned weight is 0; the caller fills it.
pub fn score_category(
    id: CategoryId,
    input: &CategoryInput,
    catalog: &ThresholdCatalog,
) -> CategoryScore {
    let mut parameter_ids: BTreeSet<&str> = catalog.parameters_for(id).map(|(pid, _)| pid).collect();
    parameter_ids.extend(input.parameters.keys().map(String::as_str));

    let parameters: Vec<ParameterResult> = parameter_ids
        .into_iter()
        .map(|pid| {
            let definition = catalog.get(pid).filter(|def| def.category == id);
            let raw_value = input.parameters.get(pid).and_then(Option::as_ref);
            evaluate_parameter(pid, definition, raw_value)
        })
        .collect();

    let raw_score: u32 = parameters.iter().map(|p| u32::from(p.points)).sum();
    let max_score = parameters.len() as u32 * 2;

    let score = if max_score == 0 {
        warn!(category = %id, "category has no parameters; excluded from overall score");
        None
    } else {
        Some((raw_score as f64 / max_score as f64 * 100.0).round() as u8)
    };

    CategoryScore {
        id,
        name: id.name().to_string(),
        description: id.description().to_string(),
        traditional_mapping: id.traditional_mapping().to_string(),
        weight: 0.0,
        parameters,
        raw_score,
        max_score,
        score,
    }
}

/// Weighted mean of category scores.
///
/// Divides by the sum of the weights actually in play, so weight sets that
/// do not total 100 still land in 0-100. Categories without a score or with
/// a non-positive weight sit out of both sums. Sums that overflow yield `None`.
pub fn aggregate_overall(categories: &[CategoryScore]) -> Option<u8> {
    let (contribution, weight_sum) = categories
        .iter()
        .filter_map(|c| c.score.map(|score| (score, c.weight)))
        .filter(|(_, weight)| weight.is_finite() && *weight > 0.0)
        .fold((0.0_f64, 0.0_f64), |(contribution, weight_sum), (score, weight)| {
            (contribution + f64::from(score) / 100.0 * weight, weight_sum + weight)
        });

    if !(weight_sum > 0.0 && weight_sum.is_finite() && contribution.is_finite()) {
        return None;
    }
    let overall = (contribution / weight_sum * 100.0).round();
    overall.is_finite().then(|| overall.clamp(0.0, 100.0) as u8)
}
