//! Rule-file loading and load-time validation.
//!
//! The rule file is read once at startup. An invalid file is fatal:
//! callers must not serve assignments with a policy that failed here.

use super::{NumericCondition, Rule, RuleAction, RuleCategory, RuleConditions, RuleSet};
use crate::error::{CollectionsError, CollectionsResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Location of the shipped policy, relative to the workspace root.
pub const DEFAULT_RULES_PATH: &str = "data/rules/assignment_rules.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleDefinition {
    name: String,
    #[serde(default)]
    category: Option<RuleCategory>,
    #[serde(default)]
    when: RuleConditions,
    #[serde(default)]
    then: RuleAction,
}

impl From<RuleDefinition> for Rule {
    fn from(def: RuleDefinition) -> Self {
        let category = def
            .category
            .unwrap_or_else(|| RuleCategory::from_rule_name(&def.name));
        Rule {
            name: def.name,
            category,
            when: def.when,
            then: def.then,
        }
    }
}

/// Accept both `{ "rules": [...] }` and a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleFile {
    Wrapped { rules: Vec<RuleDefinition> },
    Bare(Vec<RuleDefinition>),
}

impl RuleSet {
    /// Read and validate the rule file at `path`.
    pub fn load(path: impl AsRef<Path>) -> CollectionsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CollectionsError::RuleSource {
            path: path.display().to_string(),
            source,
        })?;
        let rule_set = Self::from_json(&content)?;
        log::info!(
            "Loaded {} assignment rules from {}",
            rule_set.len(),
            path.display()
        );
        Ok(rule_set)
    }

    pub fn from_json(json: &str) -> CollectionsResult<Self> {
        let definitions = match serde_json::from_str::<RuleFile>(json)? {
            RuleFile::Wrapped { rules } => rules,
            RuleFile::Bare(rules) => rules,
        };
        Self::new(definitions.into_iter().map(Rule::from).collect())
    }
}

/// Collect every structural problem; warn about rules that load but
/// probably do not do what their author meant.
pub(super) fn validate(rules: &[Rule]) -> CollectionsResult<()> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();

    for (index, rule) in rules.iter().enumerate() {
        let label = if rule.name.trim().is_empty() {
            problems.push(format!("rule #{index} has an empty name"));
            format!("rule #{index}")
        } else {
            if !seen.insert(rule.name.as_str()) {
                problems.push(format!("duplicate rule name '{}'", rule.name));
            }
            format!("rule '{}'", rule.name)
        };

        if let Some(cond) = &rule.when.dpd {
            check_condition(&label, "dpd", cond, &mut problems);
        }
        if let Some(cond) = &rule.when.risk_score {
            check_condition(&label, "riskScore", cond, &mut problems);
        }

        let then = &rule.then;
        let labels = [
            ("assignGroup", &then.assign_group),
            ("assignedTo", &then.assigned_to),
        ];
        for (field, value) in labels {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                problems.push(format!("{label}: {field} is empty"));
            }
        }
        if then.override_assignee && then.assigned_to.is_none() {
            log::warn!("{label}: override is set without assignedTo; it has no effect");
        }
        if !then.override_assignee && then.assigned_to.is_some() {
            log::warn!("{label}: assignedTo without override never changes the assignee");
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CollectionsError::InvalidRuleSet { problems })
    }
}

fn check_condition(label: &str, field: &str, cond: &NumericCondition, problems: &mut Vec<String>) {
    for (bound, value) in [("min", cond.min), ("max", cond.max), ("gt", cond.gt)] {
        if value.is_some_and(|v| !v.is_finite()) {
            problems.push(format!("{label}: {field}.{bound} is not a finite number"));
        }
    }
    if let (Some(min), Some(max)) = (cond.min, cond.max) {
        if min > max {
            problems.push(format!("{label}: {field}.min ({min}) exceeds {field}.max ({max})"));
        }
    }
    if cond.gt.is_some() && cond.min.is_some() {
        problems.push(format!(
            "{label}: {field} combines gt and min; use one lower bound"
        ));
    }
    if let (Some(gt), Some(max)) = (cond.gt, cond.max) {
        if gt >= max {
            problems.push(format!(
                "{label}: {field}.gt ({gt}) leaves nothing at or below {field}.max ({max})"
            ));
        }
    }
}
