//! `flightledger` - Flight-hours ledger and reconciliation engine
//!
//! This library keeps the denormalized hour counters of students, instructors
//! and aircraft consistent with the flight sessions recorded against them.
//! Sessions are stored in `SQLite`; every lifecycle event books or reverses
//! an [`HoursDelta`] inside one transaction.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod hours;
pub mod ledger;
pub mod logging;
pub mod reconcile;
pub mod session;
pub mod storage;

pub use config::{Config, LedgerConfig};
pub use error::{Error, Result};
pub use hours::{compute_delta, HoursDelta};
pub use ledger::{apply_delta, reverse_delta, AppliedTargets, Targets};
pub use logging::init_logging;
pub use reconcile::{
    BatchOutcome, BatchReport, BatchUpdateItem, Reconciler, VerificationOutcome,
    VerificationReport,
};
pub use session::{Session, SessionDraft, SessionFilter, SessionPatch, SessionStatus, SessionType};
pub use storage::{Storage, StorageStats};
