//! The assignment unit of work: one transaction spanning the case read,
//! the conditional write and the audit insert.
//!
//! RULE: nothing an assignment run writes is visible unless `commit()`
//! succeeds. Dropping an uncommitted unit rolls it back.

use super::{case, customer, CaseStore};
use crate::{
    domain::{CaseStage, CaseStatus, CaseWithCustomer},
    error::CollectionsResult,
    types::{CaseId, DecisionId, Version},
};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

/// Compare-and-swap on the case version.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionalCaseUpdate<'a> {
    pub case_id: CaseId,
    /// The write applies only while the stored version still equals this.
    pub expected_version: Version,
    pub stage: CaseStage,
    pub assigned_to: Option<&'a str>,
    pub status: CaseStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewDecision<'a> {
    pub case_id: CaseId,
    pub run_id: &'a str,
    pub matched_rules: &'a [String],
    pub reason: &'a str,
}

/// Typed operations available inside one atomic unit of work.
pub trait UnitOfWork {
    fn read_case_with_customer(
        &mut self,
        case_id: CaseId,
    ) -> CollectionsResult<Option<CaseWithCustomer>>;

    /// Returns the number of rows changed: 1 on success, 0 when the
    /// version moved underneath the caller.
    fn conditional_update_case(
        &mut self,
        update: &ConditionalCaseUpdate<'_>,
    ) -> CollectionsResult<usize>;

    /// Append one audit row. Audit rows are never updated or deleted.
    fn insert_decision(&mut self, decision: &NewDecision<'_>) -> CollectionsResult<DecisionId>;

    fn commit(self) -> CollectionsResult<()>;

    fn rollback(self) -> CollectionsResult<()>;
}

/// A store that can open assignment units of work.
pub trait TransactionalStore {
    type Unit<'a>: UnitOfWork
    where
        Self: 'a;

    fn begin(&mut self) -> CollectionsResult<Self::Unit<'_>>;
}

pub struct SqliteUnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl TransactionalStore for CaseStore {
    type Unit<'a> = SqliteUnitOfWork<'a>;

    /// Immediate: the unit holds the write lock from its first read, so
    /// writes elsewhere in the database cannot invalidate it mid-run.
    /// Readers on other connections are not blocked (WAL); competing
    /// units wait up to `BUSY_TIMEOUT` for the lock.
    fn begin(&mut self) -> CollectionsResult<SqliteUnitOfWork<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteUnitOfWork { tx })
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn read_case_with_customer(
        &mut self,
        case_id: CaseId,
    ) -> CollectionsResult<Option<CaseWithCustomer>> {
        let sql = format!(
            "SELECT {}, {} FROM collection_case c
             JOIN customer cu ON cu.id = c.customer_id
             WHERE c.id = ?1",
            case::CASE_COLUMNS,
            customer::CUSTOMER_COLUMNS,
        );
        let found = self
            .tx
            .query_row(&sql, params![case_id], |row| {
                Ok(CaseWithCustomer {
                    case: case::case_from_row(row, 0)?,
                    customer: customer::customer_from_row(row, case::CASE_COLUMN_COUNT)?,
                })
            })
            .optional()?;
        Ok(found)
    }

    fn conditional_update_case(
        &mut self,
        update: &ConditionalCaseUpdate<'_>,
    ) -> CollectionsResult<usize> {
        let changed = self.tx.execute(
            "UPDATE collection_case
             SET stage = ?1, assigned_to = ?2, status = ?3,
                 version = version + 1, updated_at = ?4
             WHERE id = ?5 AND version = ?6",
            params![
                update.stage,
                update.assigned_to,
                update.status,
                Utc::now(),
                update.case_id,
                update.expected_version as i64,
            ],
        )?;
        Ok(changed)
    }

    fn insert_decision(&mut self, decision: &NewDecision<'_>) -> CollectionsResult<DecisionId> {
        let matched = serde_json::to_string(decision.matched_rules)?;
        self.tx.execute(
            "INSERT INTO rule_decision (case_id, run_id, matched_rules, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                decision.case_id,
                decision.run_id,
                matched,
                decision.reason,
                Utc::now(),
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    fn commit(self) -> CollectionsResult<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> CollectionsResult<()> {
        self.tx.rollback()?;
        Ok(())
    }
}
