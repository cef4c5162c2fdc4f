//! assign-runner: command-line driver for the collections case engine.
//!
//! Usage:
//!   assign-runner --db collections.db --seed-demo
//!   assign-runner --db collections.db --case 2 --expected-version 0
//!   assign-runner --db collections.db --history 2
//!   assign-runner --rules data/rules/assignment_rules.json --case 1

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use collections_core::{
    domain::{ActionOutcome, ActionType, LoanStatus, NewAction, NewCustomer, NewLoan},
    rules::DEFAULT_RULES_PATH,
    types::{CaseId, Version},
    AssignmentCoordinator, CaseStore, CollectionsError, RuleSet,
};
use std::env;
use std::process::ExitCode;

/// Demo borrowers: (name, country, risk score, days overdue).
const DEMO_PORTFOLIO: &[(&str, &str, f64, i64)] = &[
    ("Anita Rao", "IN", 45.0, 5),
    ("Carlos Mendez", "MX", 92.0, 12),
    ("Mina Khan", "PK", 78.0, 40),
];

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReport<'a> {
    error: String,
    kind: &'a str,
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or("collections.db");
    let rules_path = flag_value(&args, "--rules").unwrap_or(DEFAULT_RULES_PATH);
    let seed_demo = args.iter().any(|a| a == "--seed-demo");
    let case_id: Option<CaseId> = parse_flag(&args, "--case")?;
    let expected_version: Option<Version> = parse_flag(&args, "--expected-version")?;
    let history: Option<CaseId> = parse_flag(&args, "--history")?;

    // A bad policy is fatal: never route cases with a half-loaded rule set.
    let rules = RuleSet::load(rules_path)
        .with_context(|| format!("loading assignment rules from {rules_path}"))?;
    log::info!("Policy: {}", rules.names().collect::<Vec<_>>().join(", "));

    let mut store = CaseStore::open(db).with_context(|| format!("opening {db}"))?;
    store.migrate()?;
    let coordinator = AssignmentCoordinator::new(rules);

    if seed_demo {
        seed_demo_portfolio(&mut store, &coordinator)?;
    }

    if let Some(case_id) = case_id {
        match coordinator.assign(&mut store, case_id, expected_version) {
            Ok(outcome) => println!("{}", serde_json::to_string_pretty(&outcome)?),
            Err(err) => return report(&err),
        }
    }

    if let Some(case_id) = history {
        match store.case_detail(case_id) {
            Ok(detail) => print_history(&store, &detail)?,
            Err(err) => return report(&err),
        }
    }

    if !seed_demo && case_id.is_none() && history.is_none() {
        println!("collections db ready: {db}");
        println!("  rules:  {} loaded from {rules_path}", coordinator.rules().len());
        println!("  try:    --seed-demo | --case <id> | --history <id>");
    }

    Ok(ExitCode::SUCCESS)
}

fn seed_demo_portfolio(store: &mut CaseStore, coordinator: &AssignmentCoordinator) -> Result<()> {
    let now = Utc::now();
    println!("=== DEMO PORTFOLIO ===");

    for &(name, country, risk_score, days_overdue) in DEMO_PORTFOLIO {
        let customer_id = store.insert_customer(&NewCustomer {
            name: name.to_string(),
            phone: None,
            email: None,
            country: Some(country.to_string()),
            risk_score,
        })?;
        let loan_id = store.insert_loan(&NewLoan {
            customer_id,
            principal: 25_000.0,
            outstanding: 8_000.0,
            due_date: now - Duration::days(days_overdue),
            status: LoanStatus::Delinquent,
        })?;
        let case = store.open_case(customer_id, loan_id, now)?;
        store.record_action(
            case.id,
            &NewAction {
                action_type: ActionType::Call,
                outcome: ActionOutcome::NoAnswer,
                notes: "Initial contact attempt".to_string(),
            },
        )?;

        let outcome = coordinator.assign(store, case.id, Some(case.version))?;
        println!(
            "  case {:>3} | {:<14} | dpd {:>3} | {:<5} | {:<12} | {}",
            case.id,
            name,
            case.dpd,
            outcome.stage,
            outcome.assigned_to.as_deref().unwrap_or("-"),
            outcome.decision.reason
        );
    }
    Ok(())
}

fn print_history(
    store: &CaseStore,
    detail: &collections_core::domain::CaseDetail,
) -> Result<()> {
    let case = &detail.case;
    println!("=== CASE {} ===", case.id);
    println!("  customer:  {} (risk {:.1})", detail.customer.name, detail.customer.risk_score);
    println!("  dpd:       {}", case.dpd);
    println!("  stage:     {}", case.stage);
    println!("  status:    {}", case.status);
    println!("  assignee:  {}", case.assigned_to.as_deref().unwrap_or("-"));
    println!("  version:   {}", case.version);

    println!();
    println!("=== ASSIGNMENT AUDIT (oldest first) ===");
    let decisions = store.decisions_for_case(case.id)?;
    if decisions.is_empty() {
        println!("  (No assignment runs yet)");
    }
    for d in &decisions {
        println!(
            "  {} | {} | [{}] {}",
            d.created_at.format("%Y-%m-%d %H:%M:%S"),
            d.run_id,
            d.matched_rules.join(", "),
            d.reason
        );
    }

    if !detail.actions.is_empty() {
        println!();
        println!("=== CONTACT LOG (newest first) ===");
        for a in &detail.actions {
            println!(
                "  {} | {} | {} | {}",
                a.created_at.format("%Y-%m-%d %H:%M:%S"),
                a.action_type,
                a.outcome,
                a.notes
            );
        }
    }
    Ok(())
}

/// Print a domain error as JSON on stderr. Conflicts exit with 2 so
/// callers can tell "re-read and retry" apart from hard failures.
fn report(err: &CollectionsError) -> Result<ExitCode> {
    let (kind, code) = match err {
        CollectionsError::Conflict(_) => ("conflict", 2),
        CollectionsError::NotFound { .. } => ("not_found", 3),
        CollectionsError::InvalidInput(_) => ("invalid_input", 4),
        _ if err.is_retryable() => ("store_unavailable", 5),
        _ => ("internal", 1),
    };
    let report = ErrorReport {
        error: err.to_string(),
        kind,
    };
    eprintln!("{}", serde_json::to_string(&report)?);
    Ok(ExitCode::from(code))
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_flag<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    flag_value(args, flag)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("invalid value for {flag}: {raw}"))
        })
        .transpose()
}
