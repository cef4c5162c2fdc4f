//! Days-past-due derivation and intake staging.
//!
//! Thresholds:
//!   dpd  0..=7   → SOFT
//!   dpd  8..=30  → HARD
//!   dpd 31..     → LEGAL

use crate::{
    domain::CaseStage,
    error::{CollectionsError, CollectionsResult},
    types::Dpd,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

pub const HARD_STAGE_MIN_DPD: Dpd = 8;
pub const LEGAL_STAGE_MIN_DPD: Dpd = 31;

/// Whole days elapsed since `due_date`, floored, never negative.
/// A due date in the future yields 0.
pub fn days_past_due(due_date: DateTime<Utc>, now: DateTime<Utc>) -> Dpd {
    // num_days() truncates toward zero, which equals floor for the
    // non-negative durations we keep.
    let days = (now - due_date).num_days();
    if days <= 0 {
        0
    } else {
        Dpd::try_from(days).unwrap_or(Dpd::MAX)
    }
}

pub fn stage_for_dpd(dpd: Dpd) -> CaseStage {
    if dpd >= LEGAL_STAGE_MIN_DPD {
        CaseStage::Legal
    } else if dpd >= HARD_STAGE_MIN_DPD {
        CaseStage::Hard
    } else {
        CaseStage::Soft
    }
}

/// DPD and initial stage for a case opened at `now`.
pub fn intake(due_date: DateTime<Utc>, now: DateTime<Utc>) -> (Dpd, CaseStage) {
    let dpd = days_past_due(due_date, now);
    (dpd, stage_for_dpd(dpd))
}

/// Parse a due date given either as an RFC 3339 timestamp or a bare
/// `YYYY-MM-DD` date (taken as midnight UTC).
pub fn parse_due_date(input: &str) -> CollectionsResult<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| CollectionsError::InvalidInput(format!("invalid due date '{input}'")))
}
