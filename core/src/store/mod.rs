//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The coordinator and the tools call store methods; they never execute SQL.

mod audit;
mod case;
mod customer;
mod unit_of_work;

pub use unit_of_work::{
    ConditionalCaseUpdate, NewDecision, SqliteUnitOfWork, TransactionalStore, UnitOfWork,
};

use crate::{
    domain::{ActionOutcome, ActionType, CaseStage, CaseStatus, LoanStatus},
    error::CollectionsResult,
};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;
use std::time::Duration;

/// How long a connection waits on another writer's lock before the
/// operation fails as a (retryable) store error.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct CaseStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl CaseStore {
    pub fn open(path: &str) -> CollectionsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL lets assignment runs read while another run writes.
        // Shared-memory and :memory: databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CollectionsResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Open a second connection to the same database, e.g. one per worker
    /// thread. For in-memory databases this returns a new, isolated database.
    pub fn reopen(&self) -> CollectionsResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> CollectionsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_collections.sql"))?;
        Ok(())
    }
}

// Enums are stored as their wire names.
macro_rules! sql_text_enum {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|e: String| FromSqlError::Other(e.into()))
                }
            }
        )+
    };
}

sql_text_enum!(CaseStage, CaseStatus, LoanStatus, ActionType, ActionOutcome);
