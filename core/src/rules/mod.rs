//! Assignment policy: an ordered, immutable list of rules.
//!
//! RULE: a RuleSet is built once (at process start) and never mutated.
//! It is passed explicitly to whoever evaluates it; there is no global.

mod config;
mod engine;

pub use config::DEFAULT_RULES_PATH;
pub use engine::{evaluate, AssignmentDecision, AssignmentInput, NO_MATCH_REASON};

use crate::{domain::CaseStage, error::CollectionsResult};
use serde::{Deserialize, Serialize};

/// Inclusive `min`, inclusive `max`, exclusive `gt`. Unset bounds are
/// ignored; a condition with no bounds matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
}

impl NumericCondition {
    pub fn at_least(min: f64) -> Self {
        Self { min: Some(min), ..Self::default() }
    }

    pub fn at_most(max: f64) -> Self {
        Self { max: Some(max), ..Self::default() }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max), gt: None }
    }

    pub fn greater_than(gt: f64) -> Self {
        Self { gt: Some(gt), ..Self::default() }
    }

    pub fn matches(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min)
            && self.max.map_or(true, |max| value <= max)
            && self.gt.map_or(true, |gt| value > gt)
    }
}

/// Both conditions must hold. A missing condition holds vacuously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpd: Option<NumericCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<NumericCondition>,
}

impl RuleConditions {
    pub fn matches(&self, dpd: f64, risk_score: f64) -> bool {
        self.dpd.map_or(true, |c| c.matches(dpd))
            && self.risk_score.map_or(true, |c| c.matches(risk_score))
    }
}

/// What a matching rule does to the in-flight decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<CaseStage>,
    /// Queue label. Always replaces the assignee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_group: Option<String>,
    /// Named assignee. Only applied when `override_assignee` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, rename = "override")]
    pub override_assignee: bool,
}

/// Selects how a matching rule is phrased in the audit reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// `dpd=<dpd> -> <group or stage>`
    Dpd,
    /// `riskScore=<score> -> <assignee>[ override]`
    Risk,
    /// The rule name, verbatim.
    Custom,
}

impl RuleCategory {
    /// Category implied by the naming convention of older rule files
    /// that carry no explicit tag.
    pub fn from_rule_name(name: &str) -> Self {
        if name.starts_with("DPD") {
            RuleCategory::Dpd
        } else if name.starts_with("RISK") {
            RuleCategory::Risk
        } else {
            RuleCategory::Custom
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,
    pub category: RuleCategory,
    pub when: RuleConditions,
    pub then: RuleAction,
}

impl Rule {
    /// Build a rule whose category follows its name prefix.
    pub fn new(name: impl Into<String>, when: RuleConditions, then: RuleAction) -> Self {
        let name = name.into();
        Self {
            category: RuleCategory::from_rule_name(&name),
            name,
            when,
            then,
        }
    }

    pub fn with_category(mut self, category: RuleCategory) -> Self {
        self.category = category;
        self
    }
}

/// Validated, ordered policy. Evaluation order is list order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Validate and freeze a rule list. Every problem found is reported
    /// in a single `InvalidRuleSet` error.
    pub fn new(rules: Vec<Rule>) -> CollectionsResult<Self> {
        config::validate(&rules)?;
        Ok(Self { rules })
    }

    /// An empty policy: every run reports that no rules matched.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }
}
