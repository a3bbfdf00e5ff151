//! Reconciliation orchestrator.
//!
//! Pairs each session write with the ledger entries that keep the aggregate
//! counters in step with it. Two independent flows run over the same
//! aggregates:
//!
//! - the lifecycle flow (create, update, delete, batch update), which books
//!   [`compute_delta`] of every existing session, and
//! - the verification flow, which books [`HoursDelta::for_verification`]
//!   to the student and teacher once, when an instructor signs a session off.
//!
//! Every operation is one `IMMEDIATE` transaction covering the session row
//! and all counter changes.

use chrono::Utc;
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, LedgerConfig};
use crate::error::{Error, Result};
use crate::hours::{compute_delta, HoursDelta};
use crate::ledger;
use crate::session::{Session, SessionDraft, SessionPatch};
use crate::storage::sessions;

/// Stateless reconciliation service.
///
/// Holds only policy; the connection is passed into every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciler {
    verification_accrual: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(&LedgerConfig::default())
    }
}

impl Reconciler {
    /// Create a reconciler with the given ledger policy.
    #[must_use]
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            verification_accrual: config.verification_accrual,
        }
    }

    /// Create a reconciler from the full configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.ledger)
    }

    /// Persist a new session and book its hours.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerWrite`] if the transaction fails (for example
    /// on a duplicate id) and [`Error::HoursOutOfRange`] if an hour value
    /// cannot be stored. Nothing is written in either case.
    pub fn create_session(&self, conn: &mut Connection, draft: SessionDraft) -> Result<Session> {
        let session = Session::from_draft(draft, Utc::now());

        let tx = ledger::begin(conn, "create")?;
        let session = create_in(&tx, &session).map_err(|e| e.into_ledger_write("create"))?;
        ledger::commit(tx, "create")?;

        info!("Created {} session {}", session.session_type, session.id);
        Ok(session)
    }

    /// Patch a session and move its hours from the old snapshot to the new.
    ///
    /// The reversal of the old vector and the application of the new one
    /// commit together with the row update, so relations may change freely
    /// (hours move from the old student to the new one, for example).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if no session has `id`, otherwise
    /// the same errors as [`Reconciler::create_session`].
    pub fn update_session(
        &self,
        conn: &mut Connection,
        id: &str,
        patch: &SessionPatch,
    ) -> Result<Session> {
        let tx = ledger::begin(conn, "update")?;
        let session = update_in(&tx, id, patch).map_err(|e| e.into_ledger_write("update"))?;
        ledger::commit(tx, "update")?;

        info!("Updated session {}", session.id);
        Ok(session)
    }

    /// Take a session's hours back out of the ledger and delete it.
    ///
    /// Returns the removed session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if no session has `id`, or
    /// [`Error::LedgerWrite`] if the transaction fails.
    pub fn delete_session(&self, conn: &mut Connection, id: &str) -> Result<Session> {
        let tx = ledger::begin(conn, "delete")?;
        let session = delete_in(&tx, id).map_err(|e| e.into_ledger_write("delete"))?;
        ledger::commit(tx, "delete")?;

        info!("Deleted session {}", session.id);
        Ok(session)
    }

    /// Run every item as an independent [`Reconciler::update_session`].
    ///
    /// A missing or failing item is recorded in the report and never stops
    /// the rest of the batch.
    pub fn batch_update(&self, conn: &mut Connection, items: &[BatchUpdateItem]) -> BatchReport {
        let results = items
            .iter()
            .map(|item| {
                let outcome = match self.update_session(conn, &item.id, &item.patch) {
                    Ok(_) => BatchOutcome::Updated,
                    Err(e) if e.is_not_found() => BatchOutcome::NotFound,
                    Err(e) => {
                        warn!("Batch update of session {} failed: {}", item.id, e);
                        BatchOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                BatchItemResult {
                    id: item.id.clone(),
                    outcome,
                }
            })
            .collect();

        let report = BatchReport { results };
        info!(
            "Batch update: {} updated, {} not found, {} failed",
            report.updated(),
            report.not_found(),
            report.failed()
        );
        report
    }

    /// Record an instructor sign-off.
    ///
    /// On the first transition to verified the flag is set and, if
    /// verification accrual is enabled, the session's confirmed hours are
    /// added to its student and teacher (never the aircraft). Any other
    /// request changes nothing and says why.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if no session has `id`, or
    /// [`Error::LedgerWrite`] if the transaction fails.
    pub fn apply_verification(
        &self,
        conn: &mut Connection,
        id: &str,
        verified: bool,
    ) -> Result<VerificationOutcome> {
        let tx = ledger::begin(conn, "verify")?;
        let outcome = self
            .verify_in(&tx, id, verified)
            .map_err(|e| e.into_ledger_write("verify"))?;
        ledger::commit(tx, "verify")?;

        if outcome.applied() {
            info!("Verified session {}", id);
        } else {
            info!("Verification of session {} skipped: {}", id, outcome);
        }
        Ok(outcome)
    }

    fn verify_in(
        &self,
        tx: &Transaction<'_>,
        id: &str,
        verified: bool,
    ) -> Result<VerificationOutcome> {
        let session = load(tx, id)?;

        let outcome = match (session.verified_by_instructor, verified) {
            (true, true) => VerificationOutcome::AlreadyVerified,
            (true, false) => VerificationOutcome::OneWay,
            (false, false) => VerificationOutcome::NotVerified,
            (false, true) => VerificationOutcome::Applied,
        };
        if outcome != VerificationOutcome::Applied {
            return Ok(outcome);
        }

        sessions::set_verified(tx, id, true)?;
        if self.verification_accrual {
            ledger::apply_in(
                tx,
                &HoursDelta::for_verification(&session),
                &session.targets().without_aircraft(),
            )?;
        }
        Ok(outcome)
    }
}

fn load(conn: &Connection, id: &str) -> Result<Session> {
    sessions::get_session(conn, id)?.ok_or_else(|| Error::session_not_found(id))
}

// Both return the row as stored, with hours rounded to the stored scale.
fn create_in(tx: &Transaction<'_>, draft: &Session) -> Result<Session> {
    sessions::insert_session(tx, draft)?;
    let session = load(tx, &draft.id)?;
    ledger::apply_in(tx, &compute_delta(&session), &session.targets())?;
    Ok(session)
}

fn update_in(tx: &Transaction<'_>, id: &str, patch: &SessionPatch) -> Result<Session> {
    let old = load(tx, id)?;

    sessions::update_session(tx, &old.patched(patch, Utc::now()))?;
    let new = load(tx, id)?;
    ledger::reverse_in(tx, &compute_delta(&old), &old.targets())?;
    ledger::apply_in(tx, &compute_delta(&new), &new.targets())?;
    Ok(new)
}

fn delete_in(tx: &Transaction<'_>, id: &str) -> Result<Session> {
    let session = load(tx, id)?;

    ledger::reverse_in(tx, &compute_delta(&session), &session.targets())?;
    sessions::delete_session(tx, id)?;
    Ok(session)
}

/// One element of a batch update: the session id plus the patch fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpdateItem {
    /// Session to update.
    pub id: String,
    /// Fields to change.
    #[serde(flatten)]
    pub patch: SessionPatch,
}

/// Result of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The session was updated and its hours reconciled.
    Updated,
    /// No session has this id.
    NotFound,
    /// The update was rolled back.
    Failed {
        /// Why the update failed.
        error: String,
    },
}

/// A batch item's id and outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemResult {
    /// Session id from the request.
    pub id: String,
    /// What happened to it.
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

/// Per-item results of a batch update, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// One entry per request item.
    pub results: Vec<BatchItemResult>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&BatchOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Number of items updated.
    #[must_use]
    pub fn updated(&self) -> usize {
        self.count(|o| *o == BatchOutcome::Updated)
    }

    /// Number of items whose session did not exist.
    #[must_use]
    pub fn not_found(&self) -> usize {
        self.count(|o| *o == BatchOutcome::NotFound)
    }

    /// Number of items that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Failed { .. }))
    }
}

/// What a verification request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The session became verified and its hours were booked.
    Applied,
    /// The session was already verified; nothing changed.
    AlreadyVerified,
    /// Un-verify requested on an unverified session; nothing changed.
    NotVerified,
    /// Un-verify requested on a verified session; sign-offs are final.
    OneWay,
}

impl VerificationOutcome {
    /// Whether counters were changed.
    #[must_use]
    pub fn applied(self) -> bool {
        self == Self::Applied
    }

    /// Machine-readable reason for a no-op.
    #[must_use]
    pub fn reason(self) -> Option<&'static str> {
        match self {
            Self::Applied => None,
            Self::AlreadyVerified => Some("already_verified"),
            Self::NotVerified => Some("not_verified"),
            Self::OneWay => Some("one_way"),
        }
    }

    /// The `{applied, reason}` form returned to callers.
    #[must_use]
    pub fn report(self) -> VerificationReport {
        VerificationReport {
            applied: self.applied(),
            reason: self.reason(),
        }
    }
}

impl std::fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason().unwrap_or("applied"))
    }
}

/// Serialized verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Whether counters were changed.
    pub applied: bool,
    /// Why nothing changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}
