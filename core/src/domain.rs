//! Collections domain model: cases, customers, loans, audit records.
//!
//! Enum wire names are SCREAMING_SNAKE_CASE everywhere: in JSON, in the
//! database, and in audit reasons.

use crate::types::{CaseId, CustomerId, DecisionId, Dpd, LoanId, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generates `as_str`, `Display` and `FromStr` for a fieldless enum
/// from one table of variant ↔ wire-name pairs.
macro_rules! wire_enum {
    ($ty:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($ty::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($ty), " '{}'"),
                        other
                    )),
                }
            }
        }
    };
}

/// Delinquency severity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStage {
    Soft,
    Hard,
    Legal,
}

wire_enum!(CaseStage { Soft => "SOFT", Hard => "HARD", Legal => "LEGAL" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

wire_enum!(CaseStatus {
    Open => "OPEN",
    InProgress => "IN_PROGRESS",
    Resolved => "RESOLVED",
    Closed => "CLOSED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Current,
    Delinquent,
    Closed,
}

wire_enum!(LoanStatus {
    Current => "CURRENT",
    Delinquent => "DELINQUENT",
    Closed => "CLOSED",
});

/// Contact channel used by an agent working a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Call,
    Sms,
    Email,
    Whatsapp,
    Visit,
}

wire_enum!(ActionType {
    Call => "CALL",
    Sms => "SMS",
    Email => "EMAIL",
    Whatsapp => "WHATSAPP",
    Visit => "VISIT",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionOutcome {
    NoAnswer,
    PromiseToPay,
    Paid,
    Refused,
    WrongNumber,
    CallbackRequested,
}

wire_enum!(ActionOutcome {
    NoAnswer => "NO_ANSWER",
    PromiseToPay => "PROMISE_TO_PAY",
    Paid => "PAID",
    Refused => "REFUSED",
    WrongNumber => "WRONG_NUMBER",
    CallbackRequested => "CALLBACK_REQUESTED",
});

// ── Records ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub principal: f64,
    pub outstanding: f64,
    pub due_date: DateTime<Utc>,
    pub status: LoanStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub id: CaseId,
    pub customer_id: CustomerId,
    pub loan_id: LoanId,
    pub dpd: Dpd,
    pub stage: CaseStage,
    pub status: CaseStatus,
    pub assigned_to: Option<String>,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The read side of an assignment run: the case joined with its customer.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseWithCustomer {
    pub case: CaseRecord,
    pub customer: CustomerRecord,
}

/// One row of the append-only assignment audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub id: DecisionId,
    pub case_id: CaseId,
    pub run_id: String,
    pub matched_rules: Vec<String>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogEntry {
    pub id: i64,
    pub case_id: CaseId,
    pub action_type: ActionType,
    pub outcome: ActionOutcome,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Everything an agent sees when opening a case.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
    pub case: CaseRecord,
    pub customer: CustomerRecord,
    pub loan: LoanRecord,
    /// Newest first.
    pub actions: Vec<ActionLogEntry>,
    /// Newest first, capped at `RECENT_DECISION_LIMIT`.
    pub recent_decisions: Vec<DecisionRecord>,
}

pub const RECENT_DECISION_LIMIT: usize = 10;

// ── Inputs ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoan {
    pub customer_id: CustomerId,
    pub principal: f64,
    pub outstanding: f64,
    pub due_date: DateTime<Utc>,
    pub status: LoanStatus,
}

pub const MAX_ACTION_NOTES_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAction {
    pub action_type: ActionType,
    pub outcome: ActionOutcome,
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for stage in CaseStage::ALL {
            assert_eq!(stage.as_str().parse::<CaseStage>().unwrap(), *stage);
        }
        for status in CaseStatus::ALL {
            assert_eq!(status.as_str().parse::<CaseStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&CaseStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let stage: CaseStage = serde_json::from_str("\"LEGAL\"").unwrap();
        assert_eq!(stage, CaseStage::Legal);
        assert_eq!(CaseStage::Legal.to_string(), "LEGAL");
    }

    #[test]
    fn unknown_wire_name_is_rejected() {
        let err = "URGENT".parse::<CaseStage>().unwrap_err();
        assert!(err.contains("URGENT"), "{err}");
    }
}
