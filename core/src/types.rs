//! Shared primitive types used across the collections core.

/// Row identifier of a collection case.
pub type CaseId = i64;

pub type CustomerId = i64;

pub type LoanId = i64;

pub type DecisionId = i64;

/// Optimistic-concurrency token. Advances by exactly one per state change.
pub type Version = u64;

/// Days past due. Never negative.
pub type Dpd = u32;
