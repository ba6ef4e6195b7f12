use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::scoring::{CategoryId, LoanType};

/// Raw borrower metrics as supplied by the application form or document
/// extraction. Read-only input to scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BorrowerData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub loan_type: LoanType,
    #[serde(default)]
    pub loan_amount: Option<f64>,
    /// Categories absent from this map are treated as disabled.
    #[serde(default)]
    pub categories: BTreeMap<CategoryId, CategoryInput>,
}

/// Raw parameter values for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryInput {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Parameter id -> raw value; `null` marks a value that was requested
    /// but never supplied.
    #[serde(default)]
    pub parameters: BTreeMap<String, Option<RawValue>>,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for CategoryInput {
    fn default() -> Self {
        Self {
            enabled: true,
            parameters: BTreeMap::new(),
        }
    }
}

impl CategoryInput {
    pub fn with(mut self, parameter: &str, value: impl Into<RawValue>) -> Self {
        self.parameters.insert(parameter.to_string(), Some(value.into()));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A raw metric: a number, a count, or a categorical label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Numeric view. Text such as `"$1,200"` or `"35%"` is accepted.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => {
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| !matches!(c, ',' | '%' | '$' | '_'))
                    .collect();
                cleaned.parse().ok()?
            }
        };
        value.is_finite().then_some(value)
    }

    /// Count view: a non-negative whole number.
    pub fn as_count(&self) -> Option<u64> {
        let n = self.as_number()?;
        if n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 {
            Some(n as u64)
        } else {
            None
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s.trim()),
            RawValue::Number(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, RawValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<u32> for RawValue {
    fn from(value: u32) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}
