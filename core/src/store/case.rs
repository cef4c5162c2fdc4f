use super::CaseStore;
use crate::{
    domain::{CaseDetail, CaseRecord, CaseStatus, RECENT_DECISION_LIMIT},
    dpd,
    error::{CollectionsError, CollectionsResult},
    types::{CaseId, CustomerId, LoanId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

/// Column list for `case_from_row`; the table is aliased `c`.
pub(super) const CASE_COLUMNS: &str = "c.id, c.customer_id, c.loan_id, c.dpd, c.stage, c.status,
     c.assigned_to, c.version, c.created_at, c.updated_at";

pub(super) const CASE_COLUMN_COUNT: usize = 10;

pub(super) fn case_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<CaseRecord> {
    Ok(CaseRecord {
        id: row.get(base)?,
        customer_id: row.get(base + 1)?,
        loan_id: row.get(base + 2)?,
        dpd: row.get(base + 3)?,
        stage: row.get(base + 4)?,
        status: row.get(base + 5)?,
        assigned_to: row.get(base + 6)?,
        version: row.get::<_, i64>(base + 7)? as u64,
        created_at: row.get(base + 8)?,
        updated_at: row.get(base + 9)?,
    })
}

impl CaseStore {
    // ── Case intake ───────────────────────────────────────────────

    /// Open a collection case for a delinquent loan.
    ///
    /// DPD and the initial stage are derived from the loan's due date as
    /// of `now`. New cases start OPEN, unassigned, at version 0.
    pub fn open_case(
        &mut self,
        customer_id: CustomerId,
        loan_id: LoanId,
        now: DateTime<Utc>,
    ) -> CollectionsResult<CaseRecord> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let customer_exists = tx
            .query_row(
                "SELECT 1 FROM customer WHERE id = ?1",
                params![customer_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !customer_exists {
            return Err(CollectionsError::NotFound { entity: "Customer", id: customer_id });
        }

        let (owner, due_date): (CustomerId, DateTime<Utc>) = tx
            .query_row(
                "SELECT customer_id, due_date FROM loan WHERE id = ?1",
                params![loan_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(CollectionsError::NotFound { entity: "Loan", id: loan_id })?;
        if owner != customer_id {
            return Err(CollectionsError::InvalidInput(format!(
                "loan {loan_id} does not belong to customer {customer_id}"
            )));
        }

        let (dpd, stage) = dpd::intake(due_date, now);
        tx.execute(
            "INSERT INTO collection_case (
                customer_id, loan_id, dpd, stage, status, assigned_to, version,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0, ?6, ?6)",
            params![customer_id, loan_id, dpd, stage, CaseStatus::Open, now],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        log::info!("Opened case {id} for loan {loan_id}: dpd={dpd} stage={stage}");
        Ok(CaseRecord {
            id,
            customer_id,
            loan_id,
            dpd,
            stage,
            status: CaseStatus::Open,
            assigned_to: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    // ── Reads ─────────────────────────────────────────────────────

    pub fn case_by_id(&self, case_id: CaseId) -> CollectionsResult<Option<CaseRecord>> {
        let sql = format!("SELECT {CASE_COLUMNS} FROM collection_case c WHERE c.id = ?1");
        let found = self
            .conn
            .query_row(&sql, params![case_id], |row| case_from_row(row, 0))
            .optional()?;
        Ok(found)
    }

    /// Case with its customer, loan, contact history and latest decisions.
    pub fn case_detail(&self, case_id: CaseId) -> CollectionsResult<CaseDetail> {
        let case = self
            .case_by_id(case_id)?
            .ok_or_else(|| CollectionsError::case_not_found(case_id))?;
        let customer = self.customer(case.customer_id)?.ok_or(CollectionsError::NotFound {
            entity: "Customer",
            id: case.customer_id,
        })?;
        let loan = self.loan(case.loan_id)?.ok_or(CollectionsError::NotFound {
            entity: "Loan",
            id: case.loan_id,
        })?;
        let actions = self.actions_for_case(case_id)?;
        let recent_decisions = self.recent_decisions(case_id, RECENT_DECISION_LIMIT)?;

        Ok(CaseDetail {
            case,
            customer,
            loan,
            actions,
            recent_decisions,
        })
    }
}
