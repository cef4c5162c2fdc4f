//! Assignment coordinator: one assignment run for one case.
//!
//! EXECUTION ORDER (inside a single unit of work):
//!   1. Read case + customer                 (missing → NotFound)
//!   2. Check caller's expected version      (stale → Conflict, no audit)
//!   3. Evaluate the rule set                (pure)
//!   4. Conditional write if anything changed (lost race → Conflict)
//!   5. Append exactly one audit decision
//!   6. Commit
//!
//! RULES:
//!   - Any error rolls back the whole unit; state and audit land together or not at all.
//!   - No server-side retry. A conflict is reported to the caller, who must re-read.

use crate::{
    domain::{CaseStage, CaseStatus},
    error::{CollectionsError, CollectionsResult, ConflictKind},
    rules::{self, AssignmentInput, RuleSet},
    store::{ConditionalCaseUpdate, NewDecision, TransactionalStore, UnitOfWork},
    types::{CaseId, Version},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Appended to the audit reason when a run leaves the case untouched.
pub const NO_CHANGE_SUFFIX: &str = "; no case field changes";

/// Audit part of an assignment result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSummary {
    pub matched_rules: Vec<String>,
    pub reason: String,
}

/// What the caller gets back from a committed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    pub case_id: CaseId,
    pub stage: CaseStage,
    pub assigned_to: Option<String>,
    pub version: Version,
    pub decision: DecisionSummary,
}

pub struct AssignmentCoordinator {
    rules: RuleSet,
}

impl AssignmentCoordinator {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run the policy against `case_id` and persist the result.
    ///
    /// `expected_version`, when given, must equal the stored version or
    /// the run is rejected before the policy is evaluated.
    pub fn assign<S: TransactionalStore>(
        &self,
        store: &mut S,
        case_id: CaseId,
        expected_version: Option<Version>,
    ) -> CollectionsResult<AssignmentOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let mut unit = store.begin()?;

        match self.run(&mut unit, &run_id, case_id, expected_version) {
            Ok(outcome) => {
                unit.commit()?;
                log::info!(
                    "[{run_id}] case {case_id} assigned: stage={} assigned_to={} version={}",
                    outcome.stage,
                    outcome.assigned_to.as_deref().unwrap_or("-"),
                    outcome.version
                );
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback() {
                    log::error!("[{run_id}] rollback failed for case {case_id}: {rollback_err}");
                }
                if err.is_conflict() {
                    log::warn!("[{run_id}] case {case_id}: {err}");
                } else {
                    log::error!("[{run_id}] case {case_id} assignment failed: {err}");
                }
                Err(err)
            }
        }
    }

    fn run<U: UnitOfWork>(
        &self,
        unit: &mut U,
        run_id: &str,
        case_id: CaseId,
        expected_version: Option<Version>,
    ) -> CollectionsResult<AssignmentOutcome> {
        let current = unit
            .read_case_with_customer(case_id)?
            .ok_or_else(|| CollectionsError::case_not_found(case_id))?;
        let case = &current.case;

        if let Some(expected) = expected_version {
            if expected != case.version {
                return Err(CollectionsError::Conflict(ConflictKind::StaleVersion {
                    expected,
                    current: case.version,
                }));
            }
        }

        let decision = rules::evaluate(
            &AssignmentInput {
                dpd: case.dpd,
                risk_score: current.customer.risk_score,
                current_stage: case.stage,
                current_assigned_to: case.assigned_to.as_deref(),
            },
            &self.rules,
        );
        log::debug!(
            "[{run_id}] case {case_id} matched {:?}: {}",
            decision.matched_rules,
            decision.reason
        );

        let should_update = decision.stage != case.stage
            || decision.assigned_to != case.assigned_to
            || case.status != CaseStatus::InProgress;

        let (version, reason) = if should_update {
            let changed = unit.conditional_update_case(&ConditionalCaseUpdate {
                case_id,
                expected_version: case.version,
                stage: decision.stage,
                assigned_to: decision.assigned_to.as_deref(),
                status: CaseStatus::InProgress,
            })?;
            if changed == 0 {
                return Err(CollectionsError::Conflict(ConflictKind::ConcurrentUpdate {
                    case_id,
                }));
            }
            (case.version + 1, decision.reason)
        } else {
            (case.version, format!("{}{NO_CHANGE_SUFFIX}", decision.reason))
        };

        unit.insert_decision(&NewDecision {
            case_id,
            run_id,
            matched_rules: &decision.matched_rules,
            reason: &reason,
        })?;

        Ok(AssignmentOutcome {
            case_id: case.id,
            stage: decision.stage,
            assigned_to: decision.assigned_to,
            version,
            decision: DecisionSummary {
                matched_rules: decision.matched_rules,
                reason,
            },
        })
    }
}
