use serde::{Deserialize, Serialize};
use tracing::debug;

use super::thresholds::{Classification, Classify, ParameterDefinition, Status};
use crate::borrower::RawValue;

/// Why a parameter fell back to `negative` without a rule match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultReason {
    /// No value was supplied.
    Missing,
    /// The value does not fit the rule's shape (text for a number, etc).
    Unparseable,
    /// The value fits the shape but no band contains it.
    NoMatchingBand,
    /// The parameter id is not in the threshold catalog.
    UnknownParameter,
}

impl DefaultReason {
    pub fn describe(&self) -> &'static str {
        match self {
            DefaultReason::Missing => "value missing",
            DefaultReason::Unparseable => "value could not be parsed",
            DefaultReason::NoMatchingBand => "value outside every band",
            DefaultReason::UnknownParameter => "parameter not in catalog",
        }
    }
}

/// One evaluated parameter. Built fresh on every scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterResult {
    pub id: String,
    pub name: String,
    pub raw_value: Option<RawValue>,
    pub status: Status,
    pub points: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    /// Set when the points were assigned by fallback rather than a rule match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaulted: Option<DefaultReason>,
}

impl ParameterResult {
    pub fn is_defaulted(&self) -> bool {
        self.defaulted.is_some()
    }
}

/// Classify one raw value against its parameter's rule.
///
/// Never fails: a missing definition, a missing value, or an unclassifiable
/// value all yield `negative` with 0 points and a [`DefaultReason`].
pub fn evaluate_parameter(
    id: &str,
    definition: Option<&ParameterDefinition>,
    raw_value: Option<&RawValue>,
) -> ParameterResult {
    let name = definition
        .map(|def| def.name.clone())
        .unwrap_or_else(|| id.to_string());
    let data_source = definition.and_then(|def| def.data_source.clone());

    let outcome = match (definition, raw_value) {
        (None, _) => Err(DefaultReason::UnknownParameter),
        (Some(_), None) => Err(DefaultReason::Missing),
        (Some(_), Some(value)) if value.is_blank() => Err(DefaultReason::Missing),
        (Some(def), Some(value)) => match def.rule.classify(value) {
            Classification::Matched(status) => Ok(status),
            Classification::NoMatch => Err(DefaultReason::NoMatchingBand),
            Classification::Unparseable => Err(DefaultReason::Unparseable),
        },
    };

    let (status, defaulted) = match outcome {
        Ok(status) => (status, None),
        Err(reason) => {
            debug!(
                parameter = id,
                reason = reason.describe(),
                "parameter defaulted to negative"
            );
            (Status::Negative, Some(reason))
        }
    };

    ParameterResult {
        id: id.to_string(),
        name,
        raw_value: raw_value.cloned(),
        status,
        points: status.points(),
        data_source,
        defaulted,
    }
}
