use super::CaseStore;
use crate::{
    domain::{ActionLogEntry, DecisionRecord, NewAction, MAX_ACTION_NOTES_LEN},
    error::{CollectionsError, CollectionsResult},
    types::CaseId,
};
use chrono::Utc;
use rusqlite::{params, Row};

const DECISION_COLUMNS: &str = "id, case_id, run_id, matched_rules, reason, created_at";

fn decision_from_row(row: &Row<'_>) -> rusqlite::Result<DecisionRecord> {
    let matched: String = row.get(3)?;
    let matched_rules = serde_json::from_str(&matched).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(DecisionRecord {
        id: row.get(0)?,
        case_id: row.get(1)?,
        run_id: row.get(2)?,
        matched_rules,
        reason: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl CaseStore {
    // ── Rule decisions (read side; writes go through the unit of work) ──

    /// Full audit trail for a case, oldest first.
    pub fn decisions_for_case(&self, case_id: CaseId) -> CollectionsResult<Vec<DecisionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DECISION_COLUMNS} FROM rule_decision
             WHERE case_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![case_id], decision_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Latest `limit` decisions, newest first.
    pub fn recent_decisions(
        &self,
        case_id: CaseId,
        limit: usize,
    ) -> CollectionsResult<Vec<DecisionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DECISION_COLUMNS} FROM rule_decision
             WHERE case_id = ?1 ORDER BY id DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![case_id, limit as i64], decision_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn decision_count(&self, case_id: CaseId) -> CollectionsResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM rule_decision WHERE case_id = ?1",
            params![case_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    // ── Action log ────────────────────────────────────────────────

    /// Record an agent's contact attempt on a case.
    pub fn record_action(
        &self,
        case_id: CaseId,
        action: &NewAction,
    ) -> CollectionsResult<ActionLogEntry> {
        if action.notes.chars().count() > MAX_ACTION_NOTES_LEN {
            return Err(CollectionsError::InvalidInput(format!(
                "notes exceed {MAX_ACTION_NOTES_LEN} characters"
            )));
        }
        if self.case_by_id(case_id)?.is_none() {
            return Err(CollectionsError::case_not_found(case_id));
        }

        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO action_log (case_id, action_type, outcome, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![case_id, action.action_type, action.outcome, &action.notes, created_at],
        )?;
        let entry = ActionLogEntry {
            id: self.conn.last_insert_rowid(),
            case_id,
            action_type: action.action_type,
            outcome: action.outcome,
            notes: action.notes.clone(),
            created_at,
        };
        log::debug!(
            "Case {case_id}: logged {} with outcome {}",
            entry.action_type,
            entry.outcome
        );
        Ok(entry)
    }

    /// Contact history for a case, newest first.
    pub fn actions_for_case(&self, case_id: CaseId) -> CollectionsResult<Vec<ActionLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, case_id, action_type, outcome, notes, created_at
             FROM action_log WHERE case_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![case_id], |row| {
            Ok(ActionLogEntry {
                id: row.get(0)?,
                case_id: row.get(1)?,
                action_type: row.get(2)?,
                outcome: row.get(3)?,
                notes: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
