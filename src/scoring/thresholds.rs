use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::weights::CategoryId;
use crate::borrower::RawValue;

/// Classification bucket for a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Good,
    Average,
    Negative,
}

impl Status {
    /// Evaluation order; the first matching band wins.
    pub const ORDER: [Status; 3] = [Status::Good, Status::Average, Status::Negative];

    pub fn points(&self) -> u8 {
        match self {
            Status::Good => 2,
            Status::Average => 1,
            Status::Negative => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Good => "good",
            Status::Average => "average",
            Status::Negative => "negative",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying one rule to one raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Matched(Status),
    NoMatch,
    Unparseable,
}

/// A rule shape that can classify raw values.
///
/// New rule shapes implement this and get a variant on [`ThresholdRule`];
/// nothing downstream of the evaluator needs to change.
pub trait Classify {
    fn classify(&self, value: &RawValue) -> Classification;
}

fn first_match<B: ?Sized>(
    bands: [Option<&B>; 3],
    matches: impl Fn(&B) -> bool,
) -> Classification {
    Status::ORDER
        .into_iter()
        .zip(bands)
        .find_map(|(status, band)| band.filter(|b| matches(*b)).map(|_| status))
        .map(Classification::Matched)
        .unwrap_or(Classification::NoMatch)
}

/// Inclusive numeric band. A missing bound is open on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeBand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl RangeBand {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good: Option<RangeBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<RangeBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative: Option<RangeBand>,
}

impl RangeRule {
    pub fn bands(&self) -> [Option<&RangeBand>; 3] {
        [self.good.as_ref(), self.average.as_ref(), self.negative.as_ref()]
    }
}

impl Classify for RangeRule {
    fn classify(&self, value: &RawValue) -> Classification {
        match value.as_number() {
            Some(n) => first_match(self.bands(), |band| band.contains(n)),
            None => Classification::Unparseable,
        }
    }
}

/// Comparison operator for count rules, written as `<`, `<=`, `>`, `>=` or `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Comparator {
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Equal,
}

impl Comparator {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "<" => Ok(Comparator::LessThan),
            "<=" => Ok(Comparator::LessEqual),
            ">" => Ok(Comparator::GreaterThan),
            ">=" => Ok(Comparator::GreaterEqual),
            "==" | "=" => Ok(Comparator::Equal),
            other => bail!("Invalid comparator: {}", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::LessThan => "<",
            Comparator::LessEqual => "<=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterEqual => ">=",
            Comparator::Equal => "==",
        }
    }

    pub fn compare(&self, value: u64, threshold: u64) -> bool {
        match self {
            Comparator::LessThan => value < threshold,
            Comparator::LessEqual => value <= threshold,
            Comparator::GreaterThan => value > threshold,
            Comparator::GreaterEqual => value >= threshold,
            Comparator::Equal => value == threshold,
        }
    }
}

impl TryFrom<String> for Comparator {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Comparator::parse(&value)
    }
}

impl From<Comparator> for String {
    fn from(value: Comparator) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountBand {
    pub count: u64,
    pub comparator: Comparator,
}

impl CountBand {
    pub fn new(comparator: Comparator, count: u64) -> Self {
        Self { count, comparator }
    }

    pub fn matches(&self, value: u64) -> bool {
        self.comparator.compare(value, self.count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good: Option<CountBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<CountBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative: Option<CountBand>,
}

impl CountRule {
    pub fn bands(&self) -> [Option<&CountBand>; 3] {
        [self.good.as_ref(), self.average.as_ref(), self.negative.as_ref()]
    }
}

impl Classify for CountRule {
    fn classify(&self, value: &RawValue) -> Classification {
        match value.as_count() {
            Some(n) => first_match(self.bands(), |band| band.matches(n)),
            None => Classification::Unparseable,
        }
    }
}

/// Exact categorical match (trimmed, ASCII case-insensitive).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub good: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub average: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub negative: Vec<String>,
}

impl LabelRule {
    pub fn bands(&self) -> [&[String]; 3] {
        [&self.good, &self.average, &self.negative]
    }
}

impl Classify for LabelRule {
    fn classify(&self, value: &RawValue) -> Classification {
        let Some(label) = value.as_label() else {
            return Classification::Unparseable;
        };
        let [good, average, negative] = self.bands();
        let bands = [Some(good), Some(average), Some(negative)];
        first_match(bands, |accepted| {
            accepted
                .iter()
                .any(|candidate| candidate.trim().eq_ignore_ascii_case(label))
        })
    }
}

/// Per-parameter rule, tagged by `kind` in YAML/JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ThresholdRule {
    Range(RangeRule),
    Count(CountRule),
    Label(LabelRule),
}

impl Classify for ThresholdRule {
    fn classify(&self, value: &RawValue) -> Classification {
        match self {
            ThresholdRule::Range(rule) => rule.classify(value),
            ThresholdRule::Count(rule) => rule.classify(value),
            ThresholdRule::Label(rule) => rule.classify(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDefinition {
    pub name: String,
    pub category: CategoryId,
    pub rule: ThresholdRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
}

/// Parameter id -> definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdCatalog(BTreeMap<String, ParameterDefinition>);

impl ThresholdCatalog {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, id: &str, definition: ParameterDefinition) {
        self.0.insert(id.to_string(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&ParameterDefinition> {
        self.0.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterDefinition)> {
        self.0.iter().map(|(id, def)| (id.as_str(), def))
    }

    pub fn parameters_for(
        &self,
        category: CategoryId,
    ) -> impl Iterator<Item = (&str, &ParameterDefinition)> {
        self.iter().filter(move |(_, def)| def.category == category)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The stock underwriting tables.
    pub fn builtin() -> Self {
        use CategoryId::*;
        use Comparator::*;

        let mut catalog = Self::new();
        let mut add = |id: &str, name: &str, category: CategoryId, source: &str, rule: ThresholdRule| {
            catalog.insert(
                id,
                ParameterDefinition {
                    name: name.to_string(),
                    category,
                    rule,
                    data_source: Some(source.to_string()),
                },
            );
        };

        // Character
        add(
            "credit_score",
            "Credit Score",
            Creditworthiness,
            "credit bureau",
            range(at_least(700.0), between(650.0, 700.0), at_most(650.0)),
        );
        add(
            "payment_history",
            "Late Payments (24 mo)",
            Creditworthiness,
            "credit bureau",
            count(band(LessEqual, 0), band(LessEqual, 2), band(GreaterThan, 2)),
        );
        add(
            "credit_utilization",
            "Credit Utilization %",
            Creditworthiness,
            "credit bureau",
            range(at_most(30.0), between(30.0, 50.0), at_least(50.0)),
        );
        add(
            "bankruptcies",
            "Bankruptcies",
            Creditworthiness,
            "public records",
            count(band(Equal, 0), None, band(GreaterEqual, 1)),
        );
        add(
            "personal_guarantee",
            "Personal Guarantee",
            Creditworthiness,
            "application",
            labels(&["provided"], &["partial", "limited"], &["none", "declined"]),
        );

        // Capital
        add(
            "current_ratio",
            "Current Ratio",
            Financial,
            "financial statements",
            range(at_least(1.5), between(1.0, 1.5), at_most(1.0)),
        );
        add(
            "debt_to_equity",
            "Debt to Equity",
            Financial,
            "financial statements",
            range(at_most(1.0), between(1.0, 2.0), at_least(2.0)),
        );
        add(
            "net_profit_margin",
            "Net Profit Margin %",
            Financial,
            "financial statements",
            range(at_least(10.0), between(5.0, 10.0), at_most(5.0)),
        );
        add(
            "years_in_business",
            "Years in Business",
            Financial,
            "application",
            range(at_least(5.0), between(2.0, 5.0), at_most(2.0)),
        );

        // Capacity
        add(
            "dscr",
            "Debt Service Coverage",
            Cashflow,
            "bank statements",
            range(at_least(1.25), between(1.0, 1.25), at_most(1.0)),
        );
        add(
            "operating_cash_flow_trend",
            "Operating Cash Flow Trend",
            Cashflow,
            "bank statements",
            labels(&["increasing"], &["stable"], &["declining"]),
        );
        add(
            "days_receivable",
            "Days Sales Outstanding",
            Cashflow,
            "accounting system",
            range(at_most(30.0), between(30.0, 60.0), at_least(60.0)),
        );
        add(
            "cash_reserve_months",
            "Cash Reserves (months)",
            Cashflow,
            "bank statements",
            range(at_least(6.0), between(3.0, 6.0), at_most(3.0)),
        );

        // Conditions
        add(
            "tax_liens",
            "Tax Liens",
            Legal,
            "public records",
            count(band(Equal, 0), None, band(GreaterEqual, 1)),
        );
        add(
            "litigation",
            "Open Litigation",
            Legal,
            "public records",
            count(band(Equal, 0), band(LessEqual, 1), band(GreaterThan, 1)),
        );
        add(
            "regulatory_compliance",
            "Regulatory Compliance",
            Legal,
            "compliance review",
            labels(
                &["compliant"],
                &["pending", "minor_findings"],
                &["non_compliant"],
            ),
        );
        add(
            "ucc_filings",
            "UCC Filings",
            Legal,
            "public records",
            count(band(LessEqual, 1), band(LessEqual, 3), band(GreaterThan, 3)),
        );

        // Collateral
        add(
            "equipment_age",
            "Equipment Age (years)",
            Equipment,
            "equipment appraisal",
            range(at_most(3.0), between(3.0, 7.0), at_least(7.0)),
        );
        add(
            "equipment_ltv",
            "Equipment Loan to Value %",
            Equipment,
            "equipment appraisal",
            range(at_most(80.0), between(80.0, 100.0), at_least(100.0)),
        );
        add(
            "resale_market",
            "Resale Market",
            Equipment,
            "equipment appraisal",
            labels(&["strong"], &["moderate"], &["weak"]),
        );
        add(
            "maintenance_records",
            "Maintenance Records",
            Equipment,
            "equipment appraisal",
            labels(&["complete"], &["partial"], &["missing"]),
        );
        add(
            "property_ltv",
            "Property Loan to Value %",
            Property,
            "property appraisal",
            range(at_most(70.0), between(70.0, 80.0), at_least(80.0)),
        );
        add(
            "occupancy_rate",
            "Occupancy Rate %",
            Property,
            "rent roll",
            range(at_least(90.0), between(75.0, 90.0), at_most(75.0)),
        );
        add(
            "property_condition",
            "Property Condition",
            Property,
            "property inspection",
            labels(&["excellent", "good"], &["fair"], &["poor"]),
        );
        add(
            "environmental_review",
            "Environmental Review",
            Property,
            "environmental report",
            labels(&["clear"], &["phase_ii_required"], &["contaminated"]),
        );

        catalog
    }
}

fn at_least(min: f64) -> RangeBand {
    RangeBand::at_least(min)
}

fn at_most(max: f64) -> RangeBand {
    RangeBand::at_most(max)
}

fn between(min: f64, max: f64) -> RangeBand {
    RangeBand::between(min, max)
}

fn range(good: RangeBand, average: RangeBand, negative: RangeBand) -> ThresholdRule {
    ThresholdRule::Range(RangeRule {
        good: Some(good),
        average: Some(average),
        negative: Some(negative),
    })
}

fn band(comparator: Comparator, count: u64) -> Option<CountBand> {
    Some(CountBand::new(comparator, count))
}

fn count(
    good: Option<CountBand>,
    average: Option<CountBand>,
    negative: Option<CountBand>,
) -> ThresholdRule {
    ThresholdRule::Count(CountRule {
        good,
        average,
        negative,
    })
}

fn labels(good: &[&str], average: &[&str], negative: &[&str]) -> ThresholdRule {
    let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
    ThresholdRule::Label(LabelRule {
        good: owned(good),
        average: owned(average),
        negative: owned(negative),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> RawValue {
        RawValue::Number(n)
    }

    #[test]
    fn test_range_inclusive_boundaries_first_match() {
        let rule = RangeRule {
            good: Some(RangeBand::at_least(700.0)),
            average: Some(RangeBand::between(650.0, 700.0)),
            negative: Some(RangeBand::at_most(650.0)),
        };
        // 700 sits in both good and average; good is checked first
        assert_eq!(rule.classify(&num(700.0)), Classification::Matched(Status::Good));
        assert_eq!(rule.classify(&num(650.0)), Classification::Matched(Status::Average));
        assert_eq!(rule.classify(&num(649.0)), Classification::Matched(Status::Negative));
    }

    #[test]
    fn test_range_gap_is_no_match() {
        let rule = RangeRule {
            good: Some(RangeBand::at_least(10.0)),
            average: None,
            negative: Some(RangeBand::at_most(5.0)),
        };
        assert_eq!(rule.classify(&num(7.0)), Classification::NoMatch);
    }

    #[test]
    fn test_range_unparseable_text() {
        let rule = RangeRule {
            good: Some(RangeBand::at_least(1.0)),
            ..Default::default()
        };
        assert_eq!(
            rule.classify(&RawValue::from("unknown")),
            Classification::Unparseable
        );
    }

    #[test]
    fn test_comparator_greater_equal_is_inclusive() {
        let rule = CountRule {
            good: Some(CountBand::new(Comparator::Equal, 0)),
            average: None,
            negative: Some(CountBand::new(Comparator::GreaterEqual, 2)),
        };
        assert_eq!(rule.classify(&num(2.0)), Classification::Matched(Status::Negative));
        assert_eq!(rule.classify(&num(0.0)), Classification::Matched(Status::Good));
        assert_eq!(rule.classify(&num(1.0)), Classification::NoMatch);
    }

    #[test]
    fn test_comparator_parse() {
        assert_eq!(Comparator::parse(">=").unwrap(), Comparator::GreaterEqual);
        assert_eq!(Comparator::parse(" < ").unwrap(), Comparator::LessThan);
        assert_eq!(Comparator::parse("=").unwrap(), Comparator::Equal);
        assert!(Comparator::parse("=>").is_err());
    }

    #[test]
    fn test_count_rejects_fraction() {
        let rule = CountRule {
            good: Some(CountBand::new(Comparator::LessEqual, 1)),
            ..Default::default()
        };
        assert_eq!(rule.classify(&num(0.5)), Classification::Unparseable);
    }

    #[test]
    fn test_label_match_case_insensitive() {
        let rule = LabelRule {
            good: vec!["compliant".to_string()],
            average: vec!["pending".to_string()],
            negative: vec!["non_compliant".to_string()],
        };
        assert_eq!(
            rule.classify(&RawValue::from("Compliant")),
            Classification::Matched(Status::Good)
        );
        assert_eq!(
            rule.classify(&RawValue::from("pending")),
            Classification::Matched(Status::Average)
        );
        assert_eq!(rule.classify(&RawValue::from("audited")), Classification::NoMatch);
        assert_eq!(rule.classify(&num(1.0)), Classification::Unparseable);
    }

    #[test]
    fn test_points() {
        assert_eq!(Status::Good.points(), 2);
        assert_eq!(Status::Average.points(), 1);
        assert_eq!(Status::Negative.points(), 0);
    }

    #[test]
    fn test_builtin_covers_every_category() {
        let catalog = ThresholdCatalog::builtin();
        for category in CategoryId::ALL {
            assert!(
                catalog.parameters_for(category).count() >= 4,
                "{} has too few parameters",
                category
            );
        }
    }

    #[test]
    fn test_rule_yaml_shapes() {
        let yaml = r#"
credit_score:
  name: Credit Score
  category: creditworthiness
  rule:
    kind: range
    good: { min: 720 }
    average: { min: 680, max: 720 }
    negative: { max: 680 }
tax_liens:
  name: Tax Liens
  category: legal
  rule:
    kind: count
    good: { count: 0, comparator: "==" }
    negative: { count: 1, comparator: ">=" }
compliance:
  name: Compliance
  category: legal
  data_source: compliance review
  rule:
    kind: label
    good: [compliant]
    negative: [non_compliant]
"#;
        let catalog: ThresholdCatalog = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(catalog.len(), 3);

        let liens = catalog.get("tax_liens").unwrap();
        assert_eq!(
            liens.rule,
            ThresholdRule::Count(CountRule {
                good: Some(CountBand::new(Comparator::Equal, 0)),
                average: None,
                negative: Some(CountBand::new(Comparator::GreaterEqual, 1)),
            })
        );
        assert_eq!(
            catalog.get("compliance").unwrap().data_source.as_deref(),
            Some("compliance review")
        );
    }

    #[test]
    fn test_invalid_comparator_rejected_on_parse() {
        let yaml = r#"
liens:
  name: Liens
  category: legal
  rule:
    kind: count
    good: { count: 0, comparator: "~" }
"#;
        assert!(serde_saphyr::from_str::<ThresholdCatalog>(yaml).is_err());
    }
}
