//! Pure rule evaluation: (case attributes, policy) → decision.
//!
//! The fold is sequential and last-write-wins per field. A rule that
//! does not set a field leaves whatever an earlier rule in the same run
//! put there; nothing is reset to the persisted value mid-fold.

use super::{Rule, RuleCategory, RuleSet};
use crate::{domain::CaseStage, types::Dpd};
use serde::{Deserialize, Serialize};

pub const NO_MATCH_REASON: &str = "No rules matched; assignment unchanged";

const REASON_SEPARATOR: &str = "; ";

/// Rendering of a missing assignee inside audit reasons.
const UNASSIGNED: &str = "null";

/// Attributes of the case being routed, as currently persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentInput<'a> {
    pub dpd: Dpd,
    pub risk_score: f64,
    pub current_stage: CaseStage,
    pub current_assigned_to: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDecision {
    pub stage: CaseStage,
    pub assigned_to: Option<String>,
    /// Names of matching rules, in evaluation order.
    pub matched_rules: Vec<String>,
    pub reason: String,
}

/// Walk `rules` in order and fold every matching rule into the decision.
pub fn evaluate(input: &AssignmentInput<'_>, rules: &RuleSet) -> AssignmentDecision {
    let mut stage = input.current_stage;
    let mut assigned_to = input.current_assigned_to.map(str::to_owned);
    let mut matched_rules = Vec::new();
    let mut reason_parts = Vec::new();

    let dpd = f64::from(input.dpd);
    for rule in rules.rules() {
        if !rule.when.matches(dpd, input.risk_score) {
            continue;
        }

        matched_rules.push(rule.name.clone());

        if let Some(next) = rule.then.stage {
            stage = next;
        }
        if let Some(group) = &rule.then.assign_group {
            assigned_to = Some(group.clone());
        }
        if rule.then.override_assignee {
            if let Some(agent) = &rule.then.assigned_to {
                assigned_to = Some(agent.clone());
            }
        }

        reason_parts.push(reason_fragment(rule, input, stage, assigned_to.as_deref()));
    }

    let reason = if reason_parts.is_empty() {
        NO_MATCH_REASON.to_string()
    } else {
        reason_parts.join(REASON_SEPARATOR)
    };

    AssignmentDecision {
        stage,
        assigned_to,
        matched_rules,
        reason,
    }
}

/// `stage` and `assigned_to` are the values after `rule` was applied.
fn reason_fragment(
    rule: &Rule,
    input: &AssignmentInput<'_>,
    stage: CaseStage,
    assigned_to: Option<&str>,
) -> String {
    match rule.category {
        RuleCategory::Dpd => {
            let target = rule.then.assign_group.as_deref().unwrap_or(stage.as_str());
            format!("dpd={} -> {}", input.dpd, target)
        }
        RuleCategory::Risk => {
            let target = rule
                .then
                .assigned_to
                .as_deref()
                .or(assigned_to)
                .unwrap_or(UNASSIGNED);
            let suffix = if rule.then.override_assignee { " override" } else { "" };
            format!("riskScore={} -> {}{}", input.risk_score, target, suffix)
        }
        RuleCategory::Custom => rule.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{NumericCondition, RuleAction, RuleConditions};

    fn dpd_rule(name: &str, cond: NumericCondition, stage: CaseStage, group: &str) -> Rule {
        Rule::new(
            name,
            RuleConditions { dpd: Some(cond), risk_score: None },
            RuleAction {
                stage: Some(stage),
                assign_group: Some(group.into()),
                ..RuleAction::default()
            },
        )
    }

    fn risk_override(name: &str, cond: NumericCondition, agent: &str) -> Rule {
        Rule::new(
            name,
            RuleConditions { dpd: None, risk_score: Some(cond) },
            RuleAction {
                assigned_to: Some(agent.into()),
                override_assignee: true,
                ..RuleAction::default()
            },
        )
    }

    fn policy() -> RuleSet {
        RuleSet::new(vec![
            dpd_rule("DPD_8_30", NumericCondition::between(8.0, 30.0), CaseStage::Hard, "Tier2"),
            dpd_rule("DPD_GT_30", NumericCondition::greater_than(30.0), CaseStage::Legal, "Legal"),
            risk_override("RISK_GT_80_OVERRIDE", NumericCondition::greater_than(80.0), "SeniorAgent"),
        ])
        .unwrap()
    }

    fn input(dpd: Dpd, risk_score: f64) -> AssignmentInput<'static> {
        AssignmentInput {
            dpd,
            risk_score,
            current_stage: CaseStage::Soft,
            current_assigned_to: Some("Tier1"),
        }
    }

    #[test]
    fn dpd_rule_alone_routes_to_legal() {
        let decision = evaluate(&input(40, 78.0), &policy());
        assert_eq!(decision.stage, CaseStage::Legal);
        assert_eq!(decision.assigned_to.as_deref(), Some("Legal"));
        assert_eq!(decision.matched_rules, vec!["DPD_GT_30"]);
        assert_eq!(decision.reason, "dpd=40 -> Legal");
    }

    #[test]
    fn risk_override_wins_over_earlier_group() {
        let decision = evaluate(&input(12, 92.0), &policy());
        assert_eq!(decision.stage, CaseStage::Hard);
        assert_eq!(decision.assigned_to.as_deref(), Some("SeniorAgent"));
        assert_eq!(decision.matched_rules, vec!["DPD_8_30", "RISK_GT_80_OVERRIDE"]);
        assert_eq!(
            decision.reason,
            "dpd=12 -> Tier2; riskScore=92 -> SeniorAgent override"
        );
    }

    #[test]
    fn no_match_keeps_current_values() {
        let decision = evaluate(&input(3, 10.0), &policy());
        assert_eq!(decision.stage, CaseStage::Soft);
        assert_eq!(decision.assigned_to.as_deref(), Some("Tier1"));
        assert!(decision.matched_rules.is_empty());
        assert_eq!(decision.reason, NO_MATCH_REASON);
    }

    #[test]
    fn later_group_rule_beats_earlier_override() {
        let rules = RuleSet::new(vec![
            risk_override("RISK_ANY", NumericCondition::default(), "SeniorAgent"),
            dpd_rule("DPD_ANY", NumericCondition::default(), CaseStage::Hard, "Tier2"),
        ])
        .unwrap();
        let decision = evaluate(&input(10, 50.0), &rules);
        assert_eq!(decision.assigned_to.as_deref(), Some("Tier2"));
        assert_eq!(decision.reason, "riskScore=50 -> SeniorAgent override; dpd=10 -> Tier2");
    }

    #[test]
    fn unset_fields_carry_the_in_run_value_forward() {
        // Second rule only sets a group; stage must stay at what rule one set,
        // not fall back to the persisted SOFT.
        let rules = RuleSet::new(vec![
            Rule::new(
                "ESCALATE",
                RuleConditions::default(),
                RuleAction { stage: Some(CaseStage::Legal), ..RuleAction::default() },
            ),
            Rule::new(
                "QUEUE",
                RuleConditions::default(),
                RuleAction { assign_group: Some("Recoveries".into()), ..RuleAction::default() },
            ),
        ])
        .unwrap();
        let decision = evaluate(&input(1, 1.0), &rules);
        assert_eq!(decision.stage, CaseStage::Legal);
        assert_eq!(decision.assigned_to.as_deref(), Some("Recoveries"));
        assert_eq!(decision.reason, "ESCALATE; QUEUE");
    }

    #[test]
    fn dpd_reason_without_group_names_the_resulting_stage() {
        let rules = RuleSet::new(vec![Rule::new(
            "DPD_STAGE_ONLY",
            RuleConditions::default(),
            RuleAction { stage: Some(CaseStage::Hard), ..RuleAction::default() },
        )])
        .unwrap();
        assert_eq!(evaluate(&input(9, 1.0), &rules).reason, "dpd=9 -> HARD");
    }

    #[test]
    fn risk_reason_without_override_or_assignee() {
        let rules = RuleSet::new(vec![Rule::new(
            "RISK_WATCH",
            RuleConditions { dpd: None, risk_score: Some(NumericCondition::at_least(60.0)) },
            RuleAction::default(),
        )])
        .unwrap();
        let mut unassigned = input(2, 61.5);
        unassigned.current_assigned_to = None;
        let decision = evaluate(&unassigned, &rules);
        assert_eq!(decision.reason, "riskScore=61.5 -> null");
        assert_eq!(decision.assigned_to, None);
    }

    #[test]
    fn explicit_category_overrides_name_convention() {
        let rules = RuleSet::new(vec![Rule::new(
            "DPD_LOOKING_NAME",
            RuleConditions::default(),
            RuleAction { assign_group: Some("Tier1".into()), ..RuleAction::default() },
        )
        .with_category(RuleCategory::Custom)])
        .unwrap();
        assert_eq!(evaluate(&input(4, 1.0), &rules).reason, "DPD_LOOKING_NAME");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let rules = policy();
        let first = evaluate(&input(12, 92.0), &rules);
        for _ in 0..10 {
            assert_eq!(evaluate(&input(12, 92.0), &rules), first);
        }
    }
}
