use super::CaseStore;
use crate::{
    domain::{CustomerRecord, LoanRecord, NewCustomer, NewLoan},
    error::{CollectionsError, CollectionsResult},
    types::{CustomerId, LoanId},
};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

/// Column list for `customer_from_row`; the table is aliased `cu`.
pub(super) const CUSTOMER_COLUMNS: &str =
    "cu.id, cu.name, cu.phone, cu.email, cu.country, cu.risk_score";

pub(super) fn customer_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<CustomerRecord> {
    Ok(CustomerRecord {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        phone: row.get(base + 2)?,
        email: row.get(base + 3)?,
        country: row.get(base + 4)?,
        risk_score: row.get(base + 5)?,
    })
}

impl CaseStore {
    // ── Customer ──────────────────────────────────────────────────

    pub fn insert_customer(&self, c: &NewCustomer) -> CollectionsResult<CustomerId> {
        if !c.risk_score.is_finite() {
            return Err(CollectionsError::InvalidInput(format!(
                "risk score for '{}' must be a finite number",
                c.name
            )));
        }
        self.conn.execute(
            "INSERT INTO customer (name, phone, email, country, risk_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![&c.name, &c.phone, &c.email, &c.country, c.risk_score, Utc::now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn customer(&self, customer_id: CustomerId) -> CollectionsResult<Option<CustomerRecord>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customer cu WHERE cu.id = ?1");
        let found = self
            .conn
            .query_row(&sql, params![customer_id], |row| customer_from_row(row, 0))
            .optional()?;
        Ok(found)
    }

    // ── Loan ──────────────────────────────────────────────────────

    pub fn insert_loan(&self, l: &NewLoan) -> CollectionsResult<LoanId> {
        if self.customer(l.customer_id)?.is_none() {
            return Err(CollectionsError::NotFound { entity: "Customer", id: l.customer_id });
        }
        self.conn.execute(
            "INSERT INTO loan (customer_id, principal, outstanding, due_date, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                l.customer_id,
                l.principal,
                l.outstanding,
                l.due_date,
                l.status,
                Utc::now()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn loan(&self, loan_id: LoanId) -> CollectionsResult<Option<LoanRecord>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, customer_id, principal, outstanding, due_date, status
                 FROM loan WHERE id = ?1",
                params![loan_id],
                |row| {
                    Ok(LoanRecord {
                        id: row.get(0)?,
                        customer_id: row.get(1)?,
                        principal: row.get(2)?,
                        outstanding: row.get(3)?,
                        due_date: row.get(4)?,
                        status: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }
}
