use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ScoringError;
use crate::profiles::ScoringProfile;

/// The six fixed underwriting categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    Creditworthiness,
    Financial,
    Cashflow,
    Legal,
    Equipment,
    Property,
}

impl CategoryId {
    pub const ALL: [CategoryId; 6] = [
        CategoryId::Creditworthiness,
        CategoryId::Financial,
        CategoryId::Cashflow,
        CategoryId::Legal,
        CategoryId::Equipment,
        CategoryId::Property,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryId::Creditworthiness => "creditworthiness",
            CategoryId::Financial => "financial",
            CategoryId::Cashflow => "cashflow",
            CategoryId::Legal => "legal",
            CategoryId::Equipment => "equipment",
            CategoryId::Property => "property",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CategoryId::Creditworthiness => "Creditworthiness",
            CategoryId::Financial => "Financial Strength",
            CategoryId::Cashflow => "Cash Flow",
            CategoryId::Legal => "Legal & Compliance",
            CategoryId::Equipment => "Equipment Collateral",
            CategoryId::Property => "Property Collateral",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CategoryId::Creditworthiness => "Credit bureau standing and repayment track record",
            CategoryId::Financial => "Balance sheet health and operating profitability",
            CategoryId::Cashflow => "Ability to service debt from operating cash",
            CategoryId::Legal => "Liens, litigation and regulatory standing",
            CategoryId::Equipment => "Value and condition of financed equipment",
            CategoryId::Property => "Value and condition of pledged real estate",
        }
    }

    /// Which of the five Cs of credit the category maps onto.
    pub fn traditional_mapping(&self) -> &'static str {
        match self {
            CategoryId::Creditworthiness => "Character",
            CategoryId::Financial => "Capital",
            CategoryId::Cashflow => "Capacity",
            CategoryId::Legal => "Conditions",
            CategoryId::Equipment | CategoryId::Property => "Collateral",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse loan classification that picks a built-in weight preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    #[default]
    General,
    Equipment,
    #[serde(alias = "real-estate", alias = "real_estate")]
    RealEstate,
}

impl LoanType {
    pub const ALL: [LoanType; 3] = [LoanType::General, LoanType::Equipment, LoanType::RealEstate];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanType::General => "general",
            LoanType::Equipment => "equipment",
            LoanType::RealEstate => "realestate",
        }
    }
}

impl FromStr for LoanType {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(LoanType::General),
            "equipment" => Ok(LoanType::Equipment),
            "realestate" | "real-estate" | "real_estate" => Ok(LoanType::RealEstate),
            _ => Err(ScoringError::UnknownLoanType(s.to_string())),
        }
    }
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category weight mapping on a 0-100 scale.
///
/// Weights are not required to sum to 100; the score aggregator divides by
/// the actual sum of the weights in play. Categories missing from the map
/// weigh 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<CategoryId, f64>);

impl Weights {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, category: CategoryId, weight: f64) -> Self {
        self.0.insert(category, weight);
        self
    }

    pub fn get(&self, category: CategoryId) -> f64 {
        self.0.get(&category).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, f64)> + '_ {
        self.0.iter().map(|(category, weight)| (*category, *weight))
    }
}

impl FromIterator<(CategoryId, f64)> for Weights {
    fn from_iter<I: IntoIterator<Item = (CategoryId, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Built-in weight preset for a loan type. Every preset sums to 100.
pub fn preset(loan_type: LoanType) -> Weights {
    use CategoryId::*;

    let table: [(CategoryId, f64); 6] = match loan_type {
        LoanType::General => [
            (Creditworthiness, 30.0),
            (Financial, 25.0),
            (Cashflow, 25.0),
            (Legal, 20.0),
            (Equipment, 0.0),
            (Property, 0.0),
        ],
        LoanType::Equipment => [
            (Creditworthiness, 30.0),
            (Financial, 20.0),
            (Cashflow, 15.0),
            (Legal, 15.0),
            (Equipment, 20.0),
            (Property, 0.0),
        ],
        LoanType::RealEstate => [
            (Creditworthiness, 25.0),
            (Financial, 15.0),
            (Cashflow, 20.0),
            (Legal, 10.0),
            (Equipment, 0.0),
            (Property, 30.0),
        ],
    };

    table.into_iter().collect()
}

/// Which configuration currently drives scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveSelection {
    NoProfile { loan_type: LoanType },
    ProfileLoaded { profile: Box<ScoringProfile> },
}

impl ActiveSelection {
    pub fn profile_id(&self) -> Option<&str> {
        match self {
            ActiveSelection::NoProfile { .. } => None,
            ActiveSelection::ProfileLoaded { profile } => Some(&profile.id),
        }
    }
}

/// A loaded profile's weights win; otherwise the loan type preset applies.
pub fn resolve_weights(selection: &ActiveSelection) -> Weights {
    match selection {
        ActiveSelection::NoProfile { loan_type } => preset(*loan_type),
        ActiveSelection::ProfileLoaded { profile } => profile.weights.clone(),
    }
}
