use super::thresholds::{RangeBand, ThresholdCatalog, ThresholdRule};
use super::weights::Weights;

/// Weights live on a 0-100 scale.
const MAX_WEIGHT: f64 = 100.0;

/// Validate category weights.
/// Returns all validation errors at once (not just the first).
pub fn validate_weights(weights: &Weights) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (category, weight) in weights.iter() {
        if !weight.is_finite() {
            errors.push(format!("weights.{}: must be a finite number", category));
        } else if weight < 0.0 {
            errors.push(format!(
                "weights.{}: must be non-negative, got {}",
                category, weight
            ));
        } else if weight > MAX_WEIGHT {
            errors.push(format!(
                "weights.{}: must be at most {}, got {}",
                category, MAX_WEIGHT, weight
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a threshold catalog's rules.
/// Returns all validation errors at once (not just the first).
pub fn validate_thresholds(catalog: &ThresholdCatalog) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (id, definition) in catalog.iter() {
        if definition.name.trim().is_empty() {
            errors.push(format!("thresholds.{}.name: must not be empty", id));
        }

        match &definition.rule {
            ThresholdRule::Range(rule) => {
                if rule.bands().iter().all(Option::is_none) {
                    errors.push(format!("thresholds.{}: range rule has no bands", id));
                }
                let named = [
                    ("good", &rule.good),
                    ("average", &rule.average),
                    ("negative", &rule.negative),
                ];
                for (status, band) in named {
                    if let Some(band) = band {
                        check_range_band(id, status, band, &mut errors);
                    }
                }
            }
            ThresholdRule::Count(rule) => {
                if rule.bands().iter().all(Option::is_none) {
                    errors.push(format!("thresholds.{}: count rule has no bands", id));
                }
            }
            ThresholdRule::Label(rule) => {
                if rule.bands().iter().all(|labels| labels.is_empty()) {
                    errors.push(format!("thresholds.{}: label rule has no labels", id));
                }
                let named = [
                    ("good", &rule.good),
                    ("average", &rule.average),
                    ("negative", &rule.negative),
                ];
                for (status, labels) in named {
                    if labels.iter().any(|label| label.trim().is_empty()) {
                        errors.push(format!(
                            "thresholds.{}.{}: labels must not be empty",
                            id, status
                        ));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_range_band(id: &str, status: &str, band: &RangeBand, errors: &mut Vec<String>) {
    let bounds = [("min", band.min), ("max", band.max)];
    for (label, bound) in bounds {
        if matches!(bound, Some(value) if !value.is_finite()) {
            errors.push(format!(
                "thresholds.{}.{}.{}: must be a finite number",
                id, status, label
            ));
        }
    }

    if let (Some(min), Some(max)) = (band.min, band.max) {
        if min > max {
            errors.push(format!(
                "thresholds.{}.{}: min {} exceeds max {}",
                id, status, min, max
            ));
        }
    }
}

/// Validate everything a scoring profile carries.
pub fn validate_profile(
    name: &str,
    weights: &Weights,
    thresholds: &ThresholdCatalog,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push("name: must not be empty".to_string());
    }
    if let Err(mut weight_errors) = validate_weights(weights) {
        errors.append(&mut weight_errors);
    }
    if let Err(mut threshold_errors) = validate_thresholds(thresholds) {
        errors.append(&mut threshold_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
