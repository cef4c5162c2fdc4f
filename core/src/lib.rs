//! Collections case assignment engine.
//!
//! Derives delinquency stage from days past due, routes cases through an
//! ordered rule policy, and records every routing decision in an
//! append-only audit trail. Case writes use optimistic concurrency on a
//! per-case version.

pub mod coordinator;
pub mod domain;
pub mod dpd;
pub mod error;
pub mod rules;
pub mod store;
pub mod types;

pub use coordinator::{AssignmentCoordinator, AssignmentOutcome, DecisionSummary};
pub use error::{CollectionsError, CollectionsResult, ConflictKind};
pub use rules::RuleSet;
pub use store::CaseStore;
