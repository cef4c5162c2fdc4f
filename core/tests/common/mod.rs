//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use collections_core::{
    domain::{CaseRecord, CaseStage, LoanStatus, NewCustomer, NewLoan},
    rules::{NumericCondition, Rule, RuleAction, RuleConditions},
    types::Dpd,
    CaseStore, RuleSet,
};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub fn migrated_store() -> CaseStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = CaseStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

/// Customer + loan due `dpd` days before `now()`, then a freshly opened case.
pub fn open_case(store: &mut CaseStore, dpd: Dpd, risk_score: f64) -> CaseRecord {
    let customer_id = store
        .insert_customer(&NewCustomer {
            name: format!("Debtor dpd={dpd} risk={risk_score}"),
            phone: None,
            email: None,
            country: Some("US".into()),
            risk_score,
        })
        .unwrap();
    let loan_id = store
        .insert_loan(&NewLoan {
            customer_id,
            principal: 10_000.0,
            outstanding: 4_000.0,
            due_date: now() - Duration::days(i64::from(dpd)),
            status: LoanStatus::Delinquent,
        })
        .unwrap();
    store.open_case(customer_id, loan_id, now()).unwrap()
}

pub fn dpd_rule(name: &str, when: NumericCondition, stage: CaseStage, group: &str) -> Rule {
    Rule::new(
        name,
        RuleConditions { dpd: Some(when), risk_score: None },
        RuleAction {
            stage: Some(stage),
            assign_group: Some(group.into()),
            ..RuleAction::default()
        },
    )
}

pub fn risk_override(name: &str, when: NumericCondition, agent: &str) -> Rule {
    Rule::new(
        name,
        RuleConditions { dpd: None, risk_score: Some(when) },
        RuleAction {
            assigned_to: Some(agent.into()),
            override_assignee: true,
            ..RuleAction::default()
        },
    )
}

/// The shipped policy.
pub fn standard_policy() -> RuleSet {
    RuleSet::load(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/rules/assignment_rules.json"
    ))
    .unwrap()
}
